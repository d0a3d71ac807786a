use clap::Parser;
use rnaseqeval_rs::config::{EvalConfig, DISTANCE_THRESHOLD};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "rnaseqeval-rs",
    about = "Evaluate RNA-seq alignments against a reference genome and gene annotation",
    version
)]
pub struct Args {
    /// Reference genome FASTA
    pub reference: PathBuf,

    /// Alignments to evaluate (SAM, or BAM by extension)
    pub alignments: PathBuf,

    /// Gene annotation (GTF/GFF3/BED); without it only reference statistics are reported
    #[arg(short = 'a', long = "annotation", value_name = "GTF/GFF/BED")]
    pub annotation: Option<PathBuf>,

    /// Write the report here instead of stdout
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Number of threads (CPUs) to use
    #[arg(short = 'p', long = "threads", default_value_t = 1)]
    pub threads: u8,

    /// Maximum distance between parts of one split alignment
    #[arg(long, default_value_t = DISTANCE_THRESHOLD)]
    pub distance_threshold: u32,

    /// Minimum shared bases for an alignment to count as overlapping a gene or exon
    #[arg(long = "min-overlap", default_value_t = 1)]
    pub min_overlap: u32,

    /// Set logging level to WARN
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

impl Args {
    pub fn config(&self) -> EvalConfig {
        EvalConfig {
            distance_threshold: self.distance_threshold,
            min_overlap_bases: self.min_overlap.max(1),
            threads: usize::from(self.threads.max(1)),
        }
    }
}
