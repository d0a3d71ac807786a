use crate::alignment::Segment;
use crate::annotation::GeneModel;
use crate::reference::chrom_name;
use crate::types::{HashMap, HashMapExt, ModelIdx};
use coitrees::{BasicCOITree, Interval, IntervalTree as CoitreeIntervalTree};

/// Gene models plus one interval tree per (chromosome, strand).
///
/// Chromosome keys are resolved with [`chrom_name`], so annotation and
/// alignment names only need to agree after resolution.
pub struct AnnotationIndex {
    models: Vec<GeneModel>,
    trees: HashMap<(String, char), BasicCOITree<ModelIdx, u32>>,
}

impl AnnotationIndex {
    /// `models` are expected sorted by start (see `annotation::sort_models`).
    pub fn new(models: Vec<GeneModel>) -> Self {
        let mut intervals: HashMap<(String, char), Vec<Interval<ModelIdx>>> = HashMap::new();
        for (idx, model) in models.iter().enumerate() {
            // COITree intervals are end-inclusive; convert [start, end) -> [start, end-1].
            let (Ok(first), Ok(last)) = (
                i32::try_from(model.start),
                i32::try_from(model.end.saturating_sub(1)),
            ) else {
                tracing::warn!(
                    model = %model.id,
                    start = model.start,
                    end = model.end,
                    "gene model beyond the indexable coordinate range; skipping"
                );
                continue;
            };
            if last < first {
                continue;
            }
            intervals
                .entry((chrom_name(&model.seqname), model.strand))
                .or_default()
                .push(Interval::new(first, last, idx));
        }

        let trees = intervals
            .into_iter()
            .map(|(key, ivs)| (key, BasicCOITree::new(&ivs)))
            .collect();

        Self { models, trees }
    }

    pub fn models(&self) -> &[GeneModel] {
        &self.models
    }

    pub fn model(&self, idx: ModelIdx) -> Option<&GeneModel> {
        self.models.get(idx)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Models on `chrom`/`strand` sharing at least `min_overlap` bases with
    /// `span`, in annotation order.
    pub fn overlapping(&self, chrom: &str, strand: char, span: Segment, min_overlap: u32) -> Vec<ModelIdx> {
        let mut hits: Vec<ModelIdx> = Vec::new();
        if span.is_empty() {
            return hits;
        }
        let Some(tree) = self.trees.get(&(chrom.to_string(), strand)) else {
            return hits;
        };

        // Nothing indexed starts past i32::MAX, so a longer query is clamped.
        let Ok(q_first) = i32::try_from(span.start) else {
            return hits;
        };
        let q_last = i32::try_from(span.end.saturating_sub(1)).unwrap_or(i32::MAX);
        tree.query(q_first, q_last, |node| {
            hits.push(node.metadata.clone());
        });

        hits.retain(|&idx| self.models[idx].segment().overlap(&span) >= min_overlap.max(1));
        hits.sort_unstable();
        hits
    }
}
