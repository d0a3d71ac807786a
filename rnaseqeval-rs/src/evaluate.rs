//! Compare an alignment group against the gene models it overlaps.

use crate::alignment::{AlignmentGroup, Segment};
use crate::annotation::GeneModel;
use crate::config::EvalConfig;
use crate::index::AnnotationIndex;
use crate::reference::chrom_name;
use crate::types::{HashSet, HashSetExt, ModelIdx};
use anyhow::{bail, Result};

/// Per-exon bookkeeping for one (group, gene model) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExonState {
    /// Members overlapping the exon.
    pub hits: u32,
    /// Some member spans exactly this exon.
    pub complete: bool,
    /// Some member starts on the exon start.
    pub start: bool,
    /// Some member ends on the exon end.
    pub end: bool,
}

impl ExonState {
    fn has_flags(&self) -> bool {
        self.complete || self.start || self.end
    }
}

/// Exon states keyed by 1-based exon index. One entry per exon of the model,
/// so every index always carries all four fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExonMaps {
    states: Vec<ExonState>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpliceStatus {
    pub good: bool,
    pub spliced: bool,
}

impl ExonMaps {
    pub fn new(exon_count: usize) -> Self {
        Self {
            states: vec![ExonState::default(); exon_count],
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn get(&self, exon: usize) -> Option<&ExonState> {
        exon.checked_sub(1).and_then(|i| self.states.get(i))
    }

    pub fn get_mut(&mut self, exon: usize) -> Option<&mut ExonState> {
        exon.checked_sub(1).and_then(|i| self.states.get_mut(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &ExonState)> {
        self.states.iter().enumerate().map(|(i, s)| (i + 1, s))
    }

    /// Record one member overlapping `exon`. Boundary flags use exact
    /// equality; a complete match sets both boundary flags too.
    pub fn record_hit(&mut self, exon: usize, member: Segment, exon_seg: Segment) {
        let Some(state) = self.get_mut(exon) else {
            return;
        };
        state.hits += 1;
        let starts = member.start == exon_seg.start;
        let ends = member.end == exon_seg.end;
        if starts && ends {
            state.complete = true;
        }
        state.start |= starts;
        state.end |= ends;
    }

    /// Sorted indices of exons with a nonzero hit count.
    pub fn hit_list(&self) -> Vec<usize> {
        self.iter().filter(|(_, s)| s.hits > 0).map(|(i, _)| i).collect()
    }

    pub fn covered(&self) -> usize {
        self.states.iter().filter(|s| s.hits > 0).count()
    }

    pub fn complete_count(&self) -> usize {
        self.states.iter().filter(|s| s.complete).count()
    }

    pub fn start_count(&self) -> usize {
        self.states.iter().filter(|s| s.start).count()
    }

    pub fn end_count(&self) -> usize {
        self.states.iter().filter(|s| s.end).count()
    }

    /// Exons hit by more than one member.
    pub fn multicover_count(&self) -> usize {
        self.states.iter().filter(|s| s.hits > 1).count()
    }

    /// An exon nobody hit cannot carry a complete/start/end flag.
    pub fn validate(&self) -> Result<()> {
        for (exon, state) in self.iter() {
            if state.hits == 0 && state.has_flags() {
                bail!(
                    "exon {} has hit count 0 but complete/start/end = {}/{}/{}",
                    exon,
                    state.complete,
                    state.start,
                    state.end
                );
            }
        }
        Ok(())
    }

    /// Decide whether the hit pattern is a good and/or spliced alignment.
    ///
    /// Spliced: consecutive hit exons are not adjacent, or a split group
    /// crosses from one hit exon to another. Good: the interior hit exons are
    /// all complete, the last hit exon is entered at its start and the first
    /// one is left at its end. The two ends may be partial, so a single hit
    /// exon is always good.
    pub fn classify(&self, members: usize) -> Result<SpliceStatus> {
        self.validate()?;

        let hits = self.hit_list();
        let (Some(&first), Some(&last)) = (hits.first(), hits.last()) else {
            return Ok(SpliceStatus::default());
        };
        if hits.len() == 1 {
            return Ok(SpliceStatus { good: true, spliced: false });
        }

        let skipped = hits.windows(2).any(|w| w[1] != w[0] + 1);
        let spliced = skipped || members > 1;

        let middle_ok = hits[1..hits.len() - 1]
            .iter()
            .all(|&i| self.get(i).is_some_and(|s| s.complete));
        let last_ok = self.get(last).is_some_and(|s| s.start);
        let first_ok = self.get(first).is_some_and(|s| s.end);

        Ok(SpliceStatus {
            good: middle_ok && last_ok && first_ok,
            spliced,
        })
    }
}

/// Outcome for one gene model overlapped by a group.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneHit {
    pub model: ModelIdx,
    /// Group span lies inside the gene interval.
    pub inside: bool,
    /// Bases of the group span inside the gene interval.
    pub bases_inside: u64,
    pub maps: ExonMaps,
    /// Bases of members inside each exon, indexed like `maps` minus one.
    pub exon_bases: Vec<u64>,
    /// (member, exon) overlaps.
    pub exon_overlaps: usize,
    /// Some overlapping member reaches outside an exon it overlaps.
    pub exon_partial: bool,
    /// More members than the model has exons.
    pub bad_split: bool,
    pub status: SpliceStatus,
}

/// Classification of one alignment group. The default value is a miss.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupEvaluation {
    pub genes: Vec<GeneHit>,
    /// Distinct gene identifiers among `genes`.
    pub distinct_genes: usize,
    pub hit: bool,
    pub partial: bool,
    pub exon_hit: bool,
    pub exon_partial: bool,
    /// (member, exon) overlaps across all hit models.
    pub exon_count: usize,
    pub bad_split: bool,
    pub spliced: bool,
    pub good: bool,
}

impl GroupEvaluation {
    pub fn multi_gene(&self) -> bool {
        self.distinct_genes > 1
    }

    pub fn multi_exon(&self) -> bool {
        self.exon_count > 1
    }

    /// Inside a gene but touching none of its exons, e.g. purely intronic.
    pub fn inside_miss(&self) -> bool {
        self.hit && !self.exon_hit
    }
}

/// Evaluate one group against the models on its chromosome and strand.
pub fn evaluate_group(
    group: &AlignmentGroup,
    annotation: &AnnotationIndex,
    config: &EvalConfig,
) -> Result<GroupEvaluation> {
    let mut eval = GroupEvaluation::default();
    let Some(first) = group.first() else {
        return Ok(eval);
    };

    let chrom = chrom_name(&first.rname);
    let span = group.span();
    let strand = group.strand();
    let min_overlap = config.min_overlap_bases.max(1);

    let mut gene_ids: HashSet<&str> = HashSet::new();
    for idx in annotation.overlapping(&chrom, strand, span, min_overlap) {
        let Some(model) = annotation.model(idx) else {
            continue;
        };
        let gene = evaluate_gene(group, idx, model, span, min_overlap)?;
        if gene.bad_split {
            tracing::warn!(
                qname = %first.qname,
                gene = %model.id,
                parts = group.len(),
                exons = model.exon_count(),
                "bad split alignment with more parts than the annotation has exons"
            );
        }
        gene_ids.insert(model.gene_id.as_str());
        eval.genes.push(gene);
    }

    eval.distinct_genes = gene_ids.len();
    eval.hit = !eval.genes.is_empty();
    eval.partial = eval.hit && !eval.genes.iter().any(|g| g.inside);
    eval.exon_count = eval.genes.iter().map(|g| g.exon_overlaps).sum();
    eval.exon_hit = eval.exon_count > 0;
    eval.exon_partial = eval.exon_hit && eval.genes.iter().any(|g| g.exon_partial);
    eval.bad_split = eval.genes.iter().any(|g| g.bad_split);
    eval.spliced = eval.genes.iter().any(|g| g.status.spliced);
    eval.good = eval.distinct_genes == 1
        && !eval.bad_split
        && eval.genes.iter().any(|g| g.status.good);

    Ok(eval)
}

fn evaluate_gene(
    group: &AlignmentGroup,
    idx: ModelIdx,
    model: &GeneModel,
    span: Segment,
    min_overlap: u32,
) -> Result<GeneHit> {
    let mut maps = ExonMaps::new(model.exon_count());
    let mut exon_bases = vec![0u64; model.exon_count()];
    let mut exon_overlaps = 0usize;
    let mut exon_partial = false;

    for member in group.extents() {
        for (i, exon) in model.exons.iter().enumerate() {
            let exon_seg = exon.segment();
            let shared = member.overlap(&exon_seg);
            if shared < min_overlap {
                continue;
            }
            maps.record_hit(i + 1, member, exon_seg);
            exon_bases[i] += u64::from(shared);
            exon_overlaps += 1;
            if !exon_seg.contains(&member) {
                exon_partial = true;
            }
        }
    }

    let status = maps.classify(group.len())?;

    Ok(GeneHit {
        model: idx,
        inside: model.contains(&span),
        bases_inside: u64::from(model.bases_inside(&span)),
        maps,
        exon_bases,
        exon_overlaps,
        exon_partial,
        bad_split: group.len() > model.exon_count(),
        status,
    })
}
