//! rnaseqeval-rs: evaluate RNA-seq read alignments against a reference
//! genome and a gene annotation.
//!
//! # Library usage
//!
//! ```no_run
//! use rnaseqeval_rs::{AnnotationIndex, EvalConfig, ReferenceDb, evaluate_alignments};
//! use rnaseqeval_rs::annotation::load_gene_models;
//! use rnaseqeval_rs::sam_input::load_alignments;
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let reference = ReferenceDb::load(Path::new("genome.fa"))?;
//! let index = AnnotationIndex::new(load_gene_models(Path::new("genes.gtf"))?);
//! let queries = load_alignments(Path::new("reads.sam"))?;
//! let report = evaluate_alignments(&reference, queries, Some(&index), &EvalConfig::default())?;
//! println!("{}", report);
//! # Ok(())
//! # }
//! ```

pub(crate) mod types;

pub mod alignment;
pub mod annotation;
pub mod cigar;
pub mod config;
pub mod evaluate;
pub mod index;
pub mod pipeline;
pub mod reconstruct;
pub mod reference;
pub mod report;
pub mod sam_input;

pub use alignment::{AlignmentGroup, AlignmentRecord, Segment};
pub use annotation::{Exon, GeneModel};
pub use cigar::{Cigar, ExtendedCigar};
pub use config::EvalConfig;
pub use evaluate::{ExonMaps, GroupEvaluation, evaluate_group};
pub use index::AnnotationIndex;
pub use pipeline::evaluate_alignments;
pub use reference::ReferenceDb;
pub use report::Report;
