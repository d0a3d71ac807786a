use noodles::sam::alignment::record::Flags;
use rnaseqeval_rs::alignment::{AlignmentGroup, AlignmentRecord, Segment};
use rnaseqeval_rs::annotation::{Exon, GeneModel};
use rnaseqeval_rs::config::EvalConfig;
use rnaseqeval_rs::evaluate::{evaluate_group, ExonMaps};
use rnaseqeval_rs::index::AnnotationIndex;
use rnaseqeval_rs::reconstruct::fragment_spliced;

fn seg(start: u32, end: u32) -> Segment {
    Segment { start, end }
}

fn record(pos: u32, cigar: &str) -> AlignmentRecord {
    AlignmentRecord::new("q1", "chr1", Flags::empty(), pos, cigar.parse().expect("valid CIGAR"))
}

fn model(id: &str, gene_id: &str, strand: char, exons: &[(u32, u32)]) -> GeneModel {
    let exons = exons.iter().map(|&(start, end)| Exon { start, end }).collect();
    GeneModel::new(id, gene_id, "chr1", strand, exons).expect("model has exons")
}

/// Gene [100, 400) with exons [100, 200) and [300, 400).
fn two_exon_index() -> AnnotationIndex {
    AnnotationIndex::new(vec![model("t1", "g1", '+', &[(100, 200), (300, 400)])])
}

fn six_exons() -> Vec<Segment> {
    (1..=6).map(|i| seg(i * 100, i * 100 + 50)).collect()
}

#[test]
fn skipped_exon_is_spliced_and_good_when_boundaries_match() {
    let exons = six_exons();
    let mut maps = ExonMaps::new(6);
    maps.record_hit(2, seg(220, 250), exons[1]);
    maps.record_hit(3, seg(300, 350), exons[2]);
    maps.record_hit(5, seg(500, 520), exons[4]);

    assert_eq!(maps.hit_list(), vec![2, 3, 5]);
    let status = maps.classify(3).expect("consistent maps");
    assert!(status.spliced);
    assert!(status.good);
}

#[test]
fn incomplete_interior_exon_is_not_good() {
    let exons = six_exons();
    let mut maps = ExonMaps::new(6);
    maps.record_hit(2, seg(220, 250), exons[1]);
    maps.record_hit(3, seg(300, 340), exons[2]);
    maps.record_hit(5, seg(500, 520), exons[4]);

    let status = maps.classify(3).expect("consistent maps");
    assert!(status.spliced);
    assert!(!status.good);
}

#[test]
fn last_exon_must_be_entered_at_its_start() {
    let exons = six_exons();
    let mut maps = ExonMaps::new(6);
    maps.record_hit(2, seg(220, 250), exons[1]);
    maps.record_hit(3, seg(310, 350), exons[2]);

    let status = maps.classify(2).expect("consistent maps");
    assert!(!status.good);
}

#[test]
fn single_exon_hit_is_good_and_not_spliced() {
    let exons = six_exons();
    let mut maps = ExonMaps::new(6);
    maps.record_hit(1, seg(120, 130), exons[0]);

    let status = maps.classify(1).expect("consistent maps");
    assert!(status.good);
    assert!(!status.spliced);
    assert_eq!(maps.covered(), 1);
    assert_eq!(maps.complete_count(), 0);
}

#[test]
fn no_hits_is_neither_good_nor_spliced() {
    let status = ExonMaps::new(3).classify(1).expect("consistent maps");
    assert!(!status.good);
    assert!(!status.spliced);
}

#[test]
fn flag_without_hit_is_an_error() {
    let mut maps = ExonMaps::new(2);
    if let Some(state) = maps.get_mut(2) {
        state.complete = true;
    }
    assert!(maps.validate().is_err());
    assert!(maps.classify(1).is_err());
}

#[test]
fn exact_two_exon_alignment_is_good_spliced_hit() {
    let index = two_exon_index();
    let group = fragment_spliced(&record(100, "100M100N100M"));
    assert_eq!(group.span(), seg(100, 400));

    let eval = evaluate_group(&group, &index, &EvalConfig::default()).expect("evaluation");
    assert!(eval.hit);
    assert!(!eval.partial);
    assert!(eval.exon_hit);
    assert!(!eval.exon_partial);
    assert!(eval.spliced);
    assert!(eval.good);
    assert!(!eval.bad_split);
    assert_eq!(eval.exon_count, 2);
    assert_eq!(eval.distinct_genes, 1);

    let gene = &eval.genes[0];
    assert!(gene.inside);
    assert_eq!(gene.bases_inside, 300);
    assert_eq!(gene.maps.complete_count(), 2);
    assert_eq!(gene.exon_bases, vec![100, 100]);
}

#[test]
fn other_strand_is_a_miss() {
    let index = two_exon_index();
    let mut rec = record(120, "50M");
    rec.flags = Flags::REVERSE_COMPLEMENTED;
    let eval = evaluate_group(&AlignmentGroup::single(rec), &index, &EvalConfig::default())
        .expect("evaluation");
    assert!(!eval.hit);
    assert!(!eval.exon_hit);
    assert!(!eval.good);
    assert!(eval.genes.is_empty());
}

#[test]
fn chromosome_names_are_resolved_before_lookup() {
    let index = two_exon_index();
    let mut rec = record(120, "50M");
    rec.rname = "Homo sapiens chromosome 1, primary assembly".to_string();
    let eval = evaluate_group(&AlignmentGroup::single(rec), &index, &EvalConfig::default())
        .expect("evaluation");
    assert!(eval.hit);
}

#[test]
fn alignment_crossing_gene_start_is_partial() {
    let index = two_exon_index();
    let group = AlignmentGroup::single(record(50, "100M"));
    let eval = evaluate_group(&group, &index, &EvalConfig::default()).expect("evaluation");
    assert!(eval.hit);
    assert!(eval.partial);
    assert!(eval.exon_hit);
    assert!(eval.exon_partial);
    assert_eq!(eval.genes[0].bases_inside, 50);
}

#[test]
fn intronic_alignment_is_inside_miss() {
    let index = two_exon_index();
    let group = AlignmentGroup::single(record(220, "60M"));
    let eval = evaluate_group(&group, &index, &EvalConfig::default()).expect("evaluation");
    assert!(eval.hit);
    assert!(!eval.partial);
    assert!(!eval.exon_hit);
    assert!(eval.inside_miss());
    assert!(!eval.good);
}

#[test]
fn minimum_overlap_filters_small_exon_contacts() {
    let index = two_exon_index();
    let group = AlignmentGroup::single(record(195, "20M"));
    let config = EvalConfig {
        min_overlap_bases: 10,
        ..EvalConfig::default()
    };
    let eval = evaluate_group(&group, &index, &config).expect("evaluation");
    assert!(eval.hit);
    assert!(!eval.exon_hit);

    let eval = evaluate_group(&group, &index, &EvalConfig::default()).expect("evaluation");
    assert!(eval.exon_hit);
    assert!(eval.exon_partial);
}

#[test]
fn overlapping_genes_make_a_multi_gene_alignment() {
    let index = AnnotationIndex::new(vec![
        model("t1", "g1", '+', &[(100, 200), (300, 400)]),
        model("t2", "g2", '+', &[(150, 250)]),
    ]);
    let group = AlignmentGroup::single(record(160, "30M"));
    let eval = evaluate_group(&group, &index, &EvalConfig::default()).expect("evaluation");
    assert_eq!(eval.genes.len(), 2);
    assert!(eval.multi_gene());
    assert!(eval.multi_exon());
    assert!(!eval.good);
}

#[test]
fn isoforms_of_one_gene_are_not_multi_gene() {
    let index = AnnotationIndex::new(vec![
        model("t1", "g1", '+', &[(100, 200), (300, 400)]),
        model("t2", "g1", '+', &[(100, 200), (300, 450)]),
    ]);
    let group = AlignmentGroup::single(record(120, "30M"));
    let eval = evaluate_group(&group, &index, &EvalConfig::default()).expect("evaluation");
    assert_eq!(eval.genes.len(), 2);
    assert_eq!(eval.distinct_genes, 1);
    assert!(eval.good);
}

#[test]
fn more_parts_than_exons_is_a_bad_split() {
    let index = AnnotationIndex::new(vec![model("t1", "g1", '+', &[(100, 1000)])]);
    let group = AlignmentGroup {
        members: vec![record(100, "50M"), record(300, "50M"), record(600, "50M")],
    };
    let eval = evaluate_group(&group, &index, &EvalConfig::default()).expect("evaluation");
    assert!(eval.hit);
    assert!(eval.bad_split);
    assert!(!eval.good);
    assert_eq!(eval.genes[0].maps.get(1).map(|s| s.hits), Some(3));
    assert_eq!(eval.genes[0].maps.multicover_count(), 1);
}

#[test]
fn index_returns_models_in_annotation_order() {
    let index = AnnotationIndex::new(vec![
        model("a", "g1", '+', &[(100, 200)]),
        model("b", "g2", '+', &[(150, 300)]),
        model("c", "g3", '-', &[(150, 300)]),
        model("d", "g4", '+', &[(500, 600)]),
    ]);
    assert_eq!(index.overlapping("chr1", '+', seg(180, 190), 1), vec![0, 1]);
    assert_eq!(index.overlapping("chr1", '-', seg(180, 190), 1), vec![2]);
    assert!(index.overlapping("chr2", '+', seg(180, 190), 1).is_empty());
    // Half-open: an alignment ending where a gene starts does not touch it.
    assert!(index.overlapping("chr1", '+', seg(400, 500), 1).is_empty());
}

#[test]
fn coordinates_past_i32_range_are_not_indexed() {
    let far = 3_000_000_000u32;
    let index = AnnotationIndex::new(vec![
        model("near", "g1", '+', &[(100, 200)]),
        model("far", "g2", '+', &[(far, far + 100)]),
    ]);
    assert_eq!(index.len(), 2);
    assert!(index.overlapping("chr1", '+', seg(far + 10, far + 20), 1).is_empty());
    // A query running past the range still finds what it can.
    assert_eq!(index.overlapping("chr1", '+', seg(150, far + 20), 1), vec![0]);
}
