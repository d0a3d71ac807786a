mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use mimalloc::MiMalloc;
use rnaseqeval_rs::annotation::load_gene_models;
use rnaseqeval_rs::index::AnnotationIndex;
use rnaseqeval_rs::pipeline::evaluate_alignments;
use rnaseqeval_rs::reference::ReferenceDb;
use rnaseqeval_rs::sam_input::load_alignments;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> Result<()> {
    let args = cli::Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            if args.quiet {
                EnvFilter::new("warn")
            } else {
                EnvFilter::new("info")
            }
        });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config = args.config();
    let reference = ReferenceDb::load(&args.reference)?;
    let annotation = match &args.annotation {
        Some(path) => Some(AnnotationIndex::new(load_gene_models(path)?)),
        None => None,
    };
    let queries = load_alignments(&args.alignments)?;

    let report = evaluate_alignments(&reference, queries, annotation.as_ref(), &config)?;

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    write!(out, "{}", report)?;
    out.flush()?;

    tracing::info!(
        records = report.reconstruction.num_alignments,
        groups = report.reconstruction.num_real_alignments,
        good = report.num_good_alignment,
        bad = report.num_bad_alignment,
        "rnaseqeval-rs: evaluation complete"
    );
    Ok(())
}
