/// Largest genomic gap, in bases, between two records of one read for them to
/// still be joined into a single split alignment.
pub const DISTANCE_THRESHOLD: u32 = 10_000;

#[derive(Debug, Clone)]
pub struct EvalConfig {
    pub distance_threshold: u32,
    /// Bases a gene or exon must share with an alignment to count as hit.
    pub min_overlap_bases: u32,
    pub threads: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            distance_threshold: DISTANCE_THRESHOLD,
            min_overlap_bases: 1,
            threads: 1,
        }
    }
}
