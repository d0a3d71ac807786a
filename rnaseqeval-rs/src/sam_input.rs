use crate::alignment::AlignmentRecord;
use crate::cigar::{kind_to_code, Cigar};
use crate::types::{HashMap, HashMapExt};
use anyhow::{Context, Result};
use noodles::sam::alignment::RecordBuf;
use noodles::{bam, sam};
use std::io;
use std::path::Path;

/// Read a SAM or BAM file (BAM when the extension is `.bam`) and group its
/// records by query name, in order of first appearance. Within a query the
/// records keep file order, so the first one is the primary.
pub fn load_alignments(path: &Path) -> Result<Vec<Vec<AlignmentRecord>>> {
    let is_bam = path
        .extension()
        .and_then(|s| s.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("bam"));

    let queries = if is_bam {
        let mut reader = bam::io::reader::Builder
            .build_from_path(path)
            .with_context(|| format!("failed to open BAM {}", path.display()))?;
        let header = reader.read_header()?;
        group_by_query(&header, reader.record_bufs(&header))
    } else {
        let mut reader = sam::io::reader::Builder::default()
            .build_from_path(path)
            .with_context(|| format!("failed to open SAM {}", path.display()))?;
        let header = reader.read_header()?;
        group_by_query(&header, reader.record_bufs(&header))
    }
    .with_context(|| format!("failed to read alignments from {}", path.display()))?;

    tracing::info!(
        queries = queries.len(),
        records = queries.iter().map(Vec::len).sum::<usize>(),
        "loaded alignments"
    );
    Ok(queries)
}

fn group_by_query(
    header: &sam::Header,
    records: impl Iterator<Item = io::Result<RecordBuf>>,
) -> Result<Vec<Vec<AlignmentRecord>>> {
    let mut slot_by_name: HashMap<String, usize> = HashMap::new();
    let mut queries: Vec<Vec<AlignmentRecord>> = Vec::new();

    for result in records {
        let record = convert_record(header, &result?);
        let slot = *slot_by_name.entry(record.qname.clone()).or_insert_with(|| {
            queries.push(Vec::new());
            queries.len() - 1
        });
        queries[slot].push(record);
    }
    Ok(queries)
}

/// Convert a noodles record into the evaluator's record type.
pub fn convert_record(header: &sam::Header, record: &RecordBuf) -> AlignmentRecord {
    let qname = record.name().map(|n| n.to_string()).unwrap_or_default();
    let rname = record
        .reference_sequence_id()
        .and_then(|id| header.reference_sequences().get_index(id))
        .map(|(name, _)| name.to_string())
        .unwrap_or_else(|| "*".to_string());
    let pos = record
        .alignment_start()
        .map_or(0, |p| u32::try_from(p.get()).unwrap_or(u32::MAX));

    let mut cigar = Cigar::default();
    for op in record.cigar().as_ref() {
        let len = u32::try_from(op.len()).unwrap_or(u32::MAX);
        cigar.push(len, kind_to_code(op.kind()));
    }

    let mut aln = AlignmentRecord::new(&qname, &rname, record.flags(), pos, cigar);
    aln.mapq = record.mapping_quality().map(|q| q.get());
    aln.sequence = record.sequence().as_ref().to_vec();
    aln.quality = record.quality_scores().as_ref().to_vec();
    aln
}
