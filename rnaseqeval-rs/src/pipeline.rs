use crate::alignment::{AlignmentGroup, AlignmentRecord};
use crate::config::EvalConfig;
use crate::evaluate::evaluate_group;
use crate::index::AnnotationIndex;
use crate::reconstruct::reconstruct_all;
use crate::reference::ReferenceDb;
use crate::report::Report;
use anyhow::{anyhow, Result};
use crossfire::mpmc;
use std::ops::Range;
use std::thread;

/// Groups handed to a worker at a time.
const CHUNK_GROUPS: usize = 256;

struct WorkItem {
    range: Range<usize>,
}

struct ResultItem {
    groups: usize,
    result: Result<Report>,
}

/// Reconstruct every query, evaluate each group against the reference and
/// (when given) the annotation, and return the finalized report.
pub fn evaluate_alignments(
    reference: &ReferenceDb,
    queries: Vec<Vec<AlignmentRecord>>,
    annotation: Option<&AnnotationIndex>,
    config: &EvalConfig,
) -> Result<Report> {
    let mut template = Report::new(reference);
    if let Some(index) = annotation {
        template = template.with_annotation(index.models());
    }

    let (groups, stats) = reconstruct_all(queries, config);

    let mut report = if config.threads > 1 && groups.len() > CHUNK_GROUPS {
        evaluate_parallel(&groups, reference, annotation, config, &template)?
    } else {
        evaluate_sequential(&groups, reference, annotation, config, &template)?
    };

    report.reconstruction = stats;
    report.finalize();
    Ok(report)
}

fn evaluate_range(
    groups: &[AlignmentGroup],
    reference: &ReferenceDb,
    annotation: Option<&AnnotationIndex>,
    config: &EvalConfig,
    report: &mut Report,
) -> Result<()> {
    for group in groups {
        report.record_alignment(group, reference)?;
        if let Some(index) = annotation {
            let eval = evaluate_group(group, index, config)?;
            report.record_evaluation(&eval);
        }
    }
    Ok(())
}

fn evaluate_sequential(
    groups: &[AlignmentGroup],
    reference: &ReferenceDb,
    annotation: Option<&AnnotationIndex>,
    config: &EvalConfig,
    template: &Report,
) -> Result<Report> {
    let mut report = template.clone();
    let mut progress = Progress::new(groups.len());
    for (i, chunk) in groups.chunks(CHUNK_GROUPS).enumerate() {
        evaluate_range(chunk, reference, annotation, config, &mut report)?;
        progress.advance(i * CHUNK_GROUPS + chunk.len());
    }
    Ok(report)
}

fn evaluate_parallel(
    groups: &[AlignmentGroup],
    reference: &ReferenceDb,
    annotation: Option<&AnnotationIndex>,
    config: &EvalConfig,
    template: &Report,
) -> Result<Report> {
    crossfire::detect_backoff_cfg();
    let worker_count = config.threads;
    let cap = worker_count.saturating_mul(4).max(8);
    let (tx_work, rx_work) = mpmc::bounded_blocking::<WorkItem>(cap);
    let (tx_res, rx_res) = mpmc::unbounded_blocking::<ResultItem>();

    let mut report = template.clone();
    let mut progress = Progress::new(groups.len());

    thread::scope(|scope| -> Result<()> {
        for _ in 0..worker_count {
            let rx_work = rx_work.clone();
            let tx_res = tx_res.clone();
            scope.spawn(move || {
                while let Ok(item) = rx_work.recv() {
                    let chunk = &groups[item.range];
                    let mut partial = template.clone();
                    let result = evaluate_range(chunk, reference, annotation, config, &mut partial)
                        .map(|_| partial);
                    let _ = tx_res.send(ResultItem { groups: chunk.len(), result });
                }
            });
        }
        drop(tx_res);

        let mut total_items = 0usize;
        let mut start = 0usize;
        while start < groups.len() {
            let end = (start + CHUNK_GROUPS).min(groups.len());
            tx_work
                .send(WorkItem { range: start..end })
                .map_err(|_| anyhow!("worker channel closed"))?;
            total_items += 1;
            start = end;
        }
        drop(tx_work);

        let mut evaluated = 0usize;
        for _ in 0..total_items {
            let res = rx_res
                .recv()
                .map_err(|_| anyhow!("worker result channel closed"))?;
            report.merge(&res.result?);
            evaluated += res.groups;
            progress.advance(evaluated);
        }
        Ok(())
    })?;

    Ok(report)
}

/// Debug-level progress at every tenth of the groups.
struct Progress {
    total: usize,
    next_decile: usize,
}

impl Progress {
    fn new(total: usize) -> Self {
        Self { total, next_decile: 1 }
    }

    fn advance(&mut self, done: usize) {
        if self.total == 0 {
            return;
        }
        while self.next_decile <= 10 && done * 10 >= self.next_decile * self.total {
            tracing::debug!(
                percent = self.next_decile * 10,
                done,
                total = self.total,
                "evaluation progress"
            );
            self.next_decile += 1;
        }
    }
}
