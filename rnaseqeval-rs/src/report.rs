use crate::alignment::AlignmentGroup;
use crate::annotation::GeneModel;
use crate::cigar::{self, BaseCounts};
use crate::evaluate::GroupEvaluation;
use crate::reconstruct::ReconstructStats;
use crate::reference::ReferenceDb;
use anyhow::{Context, Result};
use std::fmt;

/// Per-gene-model counters. Index 0 is the gene itself, index `i` exon `i`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneTable {
    pub model_id: String,
    pub gene_id: String,
    /// Alignments overlapping the gene / each exon.
    pub expressed: Vec<u64>,
    /// Bases covered, counted once per overlapping alignment.
    pub coverage: Vec<u64>,
}

impl GeneTable {
    fn new(model: &GeneModel) -> Self {
        let n = model.exon_count() + 1;
        Self {
            model_id: model.id.clone(),
            gene_id: model.gene_id.clone(),
            expressed: vec![0; n],
            coverage: vec![0; n],
        }
    }

    fn merge(&mut self, other: &GeneTable) {
        for (a, b) in self.expressed.iter_mut().zip(&other.expressed) {
            *a += b;
        }
        for (a, b) in self.coverage.iter_mut().zip(&other.coverage) {
            *a += b;
        }
    }
}

/// Values derived once all groups are in. `None` when the denominator is 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Derived {
    pub good_alignment_percent: Option<f64>,
    pub bad_alignment_percent: Option<f64>,
    pub match_fraction: Option<f64>,
    pub mismatch_fraction: Option<f64>,
    pub insert_fraction: Option<f64>,
    pub delete_fraction: Option<f64>,
    pub avg_mapping_quality: Option<f64>,
    pub bases_aligned_fraction: Option<f64>,
    pub avg_gene_length: Option<f64>,
    pub avg_exon_length: Option<f64>,
}

/// Everything one evaluation run measures.
///
/// Reference and annotation summaries are fixed when the report is built;
/// the remaining counters accumulate group by group and are the only fields
/// touched by [`Report::merge`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    pub reference_length: u64,
    pub chrom_lengths: Vec<(String, u64)>,

    pub reconstruction: ReconstructStats,

    pub has_annotation: bool,
    pub num_genes: u64,
    pub num_multiexon_genes: u64,
    pub max_exons_per_gene: u64,
    pub num_exons: u64,
    pub total_gene_length: u64,
    pub min_gene_length: u64,
    pub max_gene_length: u64,
    pub min_exon_length: u64,
    pub max_exon_length: u64,
    pub total_exon_length: u64,

    pub num_good_quality: u64,
    pub num_zero_quality: u64,
    pub min_mapping_quality: u8,
    pub max_mapping_quality: u8,
    pub sum_mapping_quality: u64,

    pub sum_read_length: u64,
    pub sum_bases_aligned: u64,
    pub bases: BaseCounts,

    // One increment per (group, hit gene model).
    pub num_cover_some_exons: u64,
    pub num_cover_all_exons: u64,
    pub num_equal_exons: u64,
    pub num_partial_exons: u64,
    pub num_multicover_exons: u64,
    pub num_good_starts: u64,
    pub num_good_ends: u64,
    pub num_possible_spliced_alignment: u64,
    pub num_good_gene_hits: u64,
    pub num_bad_gene_hits: u64,

    // One increment per group.
    pub num_evaluated_groups: u64,
    pub num_hit_alignments: u64,
    pub num_partial_alignments: u64,
    pub num_missed_alignments: u64,
    pub num_exon_hit: u64,
    pub num_exon_partial: u64,
    pub num_exon_miss: u64,
    pub num_good_alignment: u64,
    pub num_bad_alignment: u64,
    pub num_multi_gene_alignments: u64,
    pub num_multi_exon_alignments: u64,
    pub num_cover_no_exons: u64,
    pub num_inside_miss_alignments: u64,
    pub num_bad_split_alignments: u64,

    pub genes: Vec<GeneTable>,
    pub num_genes_covered: u64,
    pub num_exons_covered: u64,

    pub derived: Derived,
}

impl Report {
    pub fn new(reference: &ReferenceDb) -> Self {
        Self {
            reference_length: reference.total_length(),
            chrom_lengths: reference.chrom_lengths(),
            ..Default::default()
        }
    }

    /// Summarise the annotation and allocate one coverage table per model.
    pub fn with_annotation(mut self, models: &[GeneModel]) -> Self {
        self.has_annotation = true;
        self.num_genes = models.len() as u64;
        self.max_exons_per_gene = 1;

        for model in models {
            let exons = model.exon_count() as u64;
            if exons > 1 {
                self.num_multiexon_genes += 1;
            }
            self.max_exons_per_gene = self.max_exons_per_gene.max(exons);
            self.num_exons += exons;

            let glen = u64::from(model.length());
            self.total_gene_length += glen;
            self.min_gene_length = min_nonzero(self.min_gene_length, glen);
            self.max_gene_length = self.max_gene_length.max(glen);

            for exon in &model.exons {
                let elen = u64::from(exon.length());
                self.total_exon_length += elen;
                self.min_exon_length = min_nonzero(self.min_exon_length, elen);
                self.max_exon_length = self.max_exon_length.max(elen);
            }

            self.genes.push(GeneTable::new(model));
        }
        self
    }

    /// Mapping quality, read length and base composition for one group.
    /// Every member's chromosome must be present in `reference`.
    pub fn record_alignment(&mut self, group: &AlignmentGroup, reference: &ReferenceDb) -> Result<()> {
        let Some(first) = group.first() else {
            return Ok(());
        };
        self.sum_read_length += u64::from(first.cigar.read_len());

        let mut aligned = 0u64;
        for member in &group.members {
            match member.mapq {
                Some(q) if q > 0 => {
                    self.num_good_quality += 1;
                    self.sum_mapping_quality += u64::from(q);
                    self.min_mapping_quality = if self.min_mapping_quality == 0 {
                        q
                    } else {
                        self.min_mapping_quality.min(q)
                    };
                    self.max_mapping_quality = self.max_mapping_quality.max(q);
                }
                _ => self.num_zero_quality += 1,
            }

            let seq = reference
                .sequence_for(&member.rname)
                .with_context(|| format!("while evaluating query '{}'", member.qname))?;
            let counts = cigar::extend(&member.cigar, &member.sequence, seq, member.pos).base_counts();
            aligned += counts.aligned();
            self.bases.add(&counts);
        }
        self.sum_bases_aligned += aligned;
        Ok(())
    }

    /// Fold one group's annotation classification into the counters.
    pub fn record_evaluation(&mut self, eval: &GroupEvaluation) {
        self.num_evaluated_groups += 1;

        for gene in &eval.genes {
            let maps = &gene.maps;
            let covered = maps.covered() as u64;
            let equal = maps.complete_count() as u64;

            if covered > 0 {
                self.num_cover_some_exons += 1;
            }
            if covered as usize == maps.len() {
                self.num_cover_all_exons += 1;
            }
            self.num_equal_exons += equal;
            self.num_partial_exons += covered - equal;
            self.num_multicover_exons += maps.multicover_count() as u64;
            self.num_good_starts += maps.start_count() as u64;
            self.num_good_ends += maps.end_count() as u64;

            if gene.status.spliced {
                self.num_possible_spliced_alignment += 1;
            }
            if gene.status.good {
                self.num_good_gene_hits += 1;
            } else {
                self.num_bad_gene_hits += 1;
            }

            if let Some(table) = self.genes.get_mut(gene.model) {
                table.expressed[0] += 1;
                table.coverage[0] += gene.bases_inside;
                for (exon, state) in maps.iter() {
                    table.expressed[exon] += u64::from(state.hits);
                    table.coverage[exon] += gene.exon_bases[exon - 1];
                }
            }
        }

        match (eval.hit, eval.partial) {
            (true, false) => self.num_hit_alignments += 1,
            (true, true) => self.num_partial_alignments += 1,
            (false, _) => self.num_missed_alignments += 1,
        }
        match (eval.exon_hit, eval.exon_partial) {
            (true, false) => self.num_exon_hit += 1,
            (true, true) => self.num_exon_partial += 1,
            (false, _) => self.num_exon_miss += 1,
        }
        if eval.good {
            self.num_good_alignment += 1;
        } else {
            self.num_bad_alignment += 1;
        }

        if eval.multi_exon() {
            self.num_multi_exon_alignments += 1;
        } else if eval.exon_count == 0 {
            self.num_cover_no_exons += 1;
        }
        if eval.multi_gene() {
            self.num_multi_gene_alignments += 1;
        }
        if eval.inside_miss() {
            self.num_inside_miss_alignments += 1;
        }
        if eval.bad_split {
            self.num_bad_split_alignments += 1;
        }
    }

    /// Add the accumulated counters of a partial report built from the same
    /// reference and annotation.
    pub fn merge(&mut self, other: &Report) {
        self.num_good_quality += other.num_good_quality;
        self.num_zero_quality += other.num_zero_quality;
        self.sum_mapping_quality += other.sum_mapping_quality;
        self.min_mapping_quality = match (self.min_mapping_quality, other.min_mapping_quality) {
            (0, q) | (q, 0) => q,
            (a, b) => a.min(b),
        };
        self.max_mapping_quality = self.max_mapping_quality.max(other.max_mapping_quality);

        self.sum_read_length += other.sum_read_length;
        self.sum_bases_aligned += other.sum_bases_aligned;
        self.bases.add(&other.bases);

        self.num_cover_some_exons += other.num_cover_some_exons;
        self.num_cover_all_exons += other.num_cover_all_exons;
        self.num_equal_exons += other.num_equal_exons;
        self.num_partial_exons += other.num_partial_exons;
        self.num_multicover_exons += other.num_multicover_exons;
        self.num_good_starts += other.num_good_starts;
        self.num_good_ends += other.num_good_ends;
        self.num_possible_spliced_alignment += other.num_possible_spliced_alignment;
        self.num_good_gene_hits += other.num_good_gene_hits;
        self.num_bad_gene_hits += other.num_bad_gene_hits;

        self.num_evaluated_groups += other.num_evaluated_groups;
        self.num_hit_alignments += other.num_hit_alignments;
        self.num_partial_alignments += other.num_partial_alignments;
        self.num_missed_alignments += other.num_missed_alignments;
        self.num_exon_hit += other.num_exon_hit;
        self.num_exon_partial += other.num_exon_partial;
        self.num_exon_miss += other.num_exon_miss;
        self.num_good_alignment += other.num_good_alignment;
        self.num_bad_alignment += other.num_bad_alignment;
        self.num_multi_gene_alignments += other.num_multi_gene_alignments;
        self.num_multi_exon_alignments += other.num_multi_exon_alignments;
        self.num_cover_no_exons += other.num_cover_no_exons;
        self.num_inside_miss_alignments += other.num_inside_miss_alignments;
        self.num_bad_split_alignments += other.num_bad_split_alignments;

        for (a, b) in self.genes.iter_mut().zip(&other.genes) {
            a.merge(b);
        }
    }

    /// Compute covered gene/exon tallies and the derived percentages.
    pub fn finalize(&mut self) {
        self.num_genes_covered = self.genes.iter().filter(|t| t.expressed[0] > 0).count() as u64;
        self.num_exons_covered = self
            .genes
            .iter()
            .map(|t| t.expressed[1..].iter().filter(|&&c| c > 0).count() as u64)
            .sum();

        let judged = self.num_good_alignment + self.num_bad_alignment;
        let total = self.bases.total();
        let d = &mut self.derived;
        d.good_alignment_percent = ratio(self.num_good_alignment, judged).map(|r| 100.0 * r);
        d.bad_alignment_percent = ratio(self.num_bad_alignment, judged).map(|r| 100.0 * r);
        d.match_fraction = ratio(self.bases.matches, total);
        d.mismatch_fraction = ratio(self.bases.mismatches, total);
        d.insert_fraction = ratio(self.bases.insertions, total);
        d.delete_fraction = ratio(self.bases.deletions, total);
        d.avg_mapping_quality = ratio(self.sum_mapping_quality, self.num_good_quality);
        d.bases_aligned_fraction = ratio(self.sum_bases_aligned, self.sum_read_length);
        d.avg_gene_length = ratio(self.total_gene_length, self.num_genes);
        d.avg_exon_length = ratio(self.total_exon_length, self.num_exons);
    }
}

fn min_nonzero(current: u64, value: u64) -> u64 {
    if current == 0 { value } else { current.min(value) }
}

fn ratio(num: u64, den: u64) -> Option<f64> {
    (den > 0).then(|| num as f64 / den as f64)
}

struct Opt(Option<f64>);

impl fmt::Display for Opt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{:.4}", v),
            None => f.write_str("-"),
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.reconstruction;
        let d = &self.derived;

        writeln!(f, "Reference")?;
        writeln!(f, "  length: {}", self.reference_length)?;
        for (name, len) in &self.chrom_lengths {
            writeln!(f, "  {}: {}", name, len)?;
        }

        writeln!(f, "Alignments")?;
        writeln!(f, "  records: {}", r.num_alignments)?;
        writeln!(f, "  queries: {}", r.num_unique_alignments)?;
        writeln!(f, "  evaluated alignments: {}", r.num_real_alignments)?;
        writeln!(f, "  split alignments (after reconstruction): {}", r.num_real_split_alignments)?;
        writeln!(f, "  unaligned queries: {}", r.num_non_alignments)?;
        writeln!(f, "  alignments split on N operations: {}", r.num_split_alignments)?;
        writeln!(f, "  queries with unreconciled records: {}", r.num_multi_alignments)?;
        writeln!(f, "  possibly split alignments: {}", r.num_possibly_split_alignments)?;

        writeln!(f, "Mapping quality")?;
        writeln!(f, "  good quality: {}", self.num_good_quality)?;
        writeln!(f, "  zero quality: {}", self.num_zero_quality)?;
        writeln!(f, "  min: {}", self.min_mapping_quality)?;
        writeln!(f, "  max: {}", self.max_mapping_quality)?;
        writeln!(f, "  average: {}", Opt(d.avg_mapping_quality))?;

        writeln!(f, "Bases")?;
        writeln!(f, "  read length: {}", self.sum_read_length)?;
        writeln!(f, "  bases aligned: {}", self.sum_bases_aligned)?;
        writeln!(f, "  aligned fraction: {}", Opt(d.bases_aligned_fraction))?;
        writeln!(f, "  match: {} ({})", self.bases.matches, Opt(d.match_fraction))?;
        writeln!(f, "  mismatch: {} ({})", self.bases.mismatches, Opt(d.mismatch_fraction))?;
        writeln!(f, "  insert: {} ({})", self.bases.insertions, Opt(d.insert_fraction))?;
        writeln!(f, "  delete: {} ({})", self.bases.deletions, Opt(d.delete_fraction))?;

        if !self.has_annotation {
            return Ok(());
        }

        writeln!(f, "Annotation")?;
        writeln!(f, "  genes: {}", self.num_genes)?;
        writeln!(f, "  multi-exon genes: {}", self.num_multiexon_genes)?;
        writeln!(f, "  max exons per gene: {}", self.max_exons_per_gene)?;
        writeln!(f, "  exons: {}", self.num_exons)?;
        writeln!(f, "  total gene length: {}", self.total_gene_length)?;
        writeln!(f, "  gene length min/max/avg: {}/{}/{}", self.min_gene_length, self.max_gene_length, Opt(d.avg_gene_length))?;
        writeln!(f, "  exon length min/max/avg: {}/{}/{}", self.min_exon_length, self.max_exon_length, Opt(d.avg_exon_length))?;

        writeln!(f, "Gene hits")?;
        writeln!(f, "  cover some exons: {}", self.num_cover_some_exons)?;
        writeln!(f, "  cover all exons: {}", self.num_cover_all_exons)?;
        writeln!(f, "  exons matched exactly: {}", self.num_equal_exons)?;
        writeln!(f, "  exons matched partially: {}", self.num_partial_exons)?;
        writeln!(f, "  exons covered by several parts: {}", self.num_multicover_exons)?;
        writeln!(f, "  exon starts matched: {}", self.num_good_starts)?;
        writeln!(f, "  exon ends matched: {}", self.num_good_ends)?;
        writeln!(f, "  spliced: {}", self.num_possible_spliced_alignment)?;
        writeln!(f, "  good / bad: {} / {}", self.num_good_gene_hits, self.num_bad_gene_hits)?;

        writeln!(f, "Alignment classification")?;
        writeln!(f, "  evaluated: {}", self.num_evaluated_groups)?;
        writeln!(f, "  hit / partial / missed: {} / {} / {}", self.num_hit_alignments, self.num_partial_alignments, self.num_missed_alignments)?;
        writeln!(f, "  exon hit / partial / missed: {} / {} / {}", self.num_exon_hit, self.num_exon_partial, self.num_exon_miss)?;
        writeln!(f, "  inside gene, no exon: {}", self.num_inside_miss_alignments)?;
        writeln!(f, "  multi-gene: {}", self.num_multi_gene_alignments)?;
        writeln!(f, "  multi-exon: {}", self.num_multi_exon_alignments)?;
        writeln!(f, "  no exon: {}", self.num_cover_no_exons)?;
        writeln!(f, "  bad split: {}", self.num_bad_split_alignments)?;
        writeln!(f, "  good: {} ({}%)", self.num_good_alignment, Opt(d.good_alignment_percent))?;
        writeln!(f, "  bad: {} ({}%)", self.num_bad_alignment, Opt(d.bad_alignment_percent))?;
        writeln!(f, "  genes covered: {}", self.num_genes_covered)?;
        writeln!(f, "  exons covered: {}", self.num_exons_covered)?;

        writeln!(f, "Gene coverage")?;
        for table in self.genes.iter().filter(|t| t.expressed[0] > 0) {
            writeln!(
                f,
                "  {}\t{}\t{:?}\t{:?}",
                table.model_id, table.gene_id, table.expressed, table.coverage
            )?;
        }
        Ok(())
    }
}
