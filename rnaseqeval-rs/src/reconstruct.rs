//! Turn the raw records of one query into a canonical alignment group.
//!
//! An intron shows up either as a skip inside one record's CIGAR or as
//! several records of the same read placed near each other. Both become an
//! [`AlignmentGroup`] with one member per aligned block.

use crate::alignment::{AlignmentGroup, AlignmentRecord};
use crate::cigar::Cigar;
use crate::config::EvalConfig;
use noodles::sam::alignment::record::cigar::op::Kind as CigarKind;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconstructStats {
    /// Raw records seen.
    pub num_alignments: u64,
    /// Distinct query names.
    pub num_unique_alignments: u64,
    /// Groups accepted for evaluation.
    pub num_real_alignments: u64,
    /// Accepted groups with more than one member.
    pub num_real_split_alignments: u64,
    /// Queries dropped because the primary record is unmapped.
    pub num_non_alignments: u64,
    /// Primaries fragmented on interior skips.
    pub num_split_alignments: u64,
    /// Queries with records that could not be joined to the primary.
    pub num_multi_alignments: u64,
    /// Groups joined from several physical records.
    pub num_possibly_split_alignments: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reconstruction {
    Unmapped,
    Fragmented(AlignmentGroup),
    Joined {
        group: AlignmentGroup,
        /// Records left out because they were incompatible with the group.
        discarded: usize,
    },
}

/// Reconstruct one query. The first record is the primary.
pub fn reconstruct_query(records: Vec<AlignmentRecord>, config: &EvalConfig) -> Reconstruction {
    let mut records = records.into_iter();
    let Some(primary) = records.next() else {
        return Reconstruction::Unmapped;
    };
    if primary.is_unmapped() {
        return Reconstruction::Unmapped;
    }

    if primary.cigar.has_interior_skip() {
        return Reconstruction::Fragmented(fragment_spliced(&primary));
    }

    let mut members = vec![primary];
    let mut discarded = 0usize;
    for candidate in records.by_ref() {
        let compatible = members
            .iter()
            .all(|m| possible_split_alignment(m, &candidate, config.distance_threshold));
        if !compatible {
            discarded = 1;
            break;
        }
        members.push(candidate);
    }
    discarded += records.count();

    Reconstruction::Joined {
        group: AlignmentGroup { members },
        discarded,
    }
}

/// Split a record whose CIGAR skips over introns into hard-clipped fragments,
/// one per aligned block.
///
/// Skips of one base are kept inside the current fragment. The mapping
/// position and the clip adjustment move on M/=/X and on insertions, never on
/// deletions. Soft and hard clips only advance the read offset, so a leading
/// clip shifts neither the next fragment's `pos` nor its `clipped_pos`
/// beyond what the aligned bases account for.
pub fn fragment_spliced(record: &AlignmentRecord) -> AlignmentGroup {
    let read_len = record.cigar.read_len();
    let mut members = Vec::new();

    let mut query_off: u32 = 0;
    let mut mapping_pos: u32 = record.pos;
    let mut clip_adj: i64 = i64::from(record.pos) - record.clipped_pos;
    let mut seq_start = 0usize;
    let mut seq_off = 0usize;

    let mut pos = record.pos;
    let mut clipped_pos = record.clipped_pos;
    let mut cigar = Cigar::default();

    for op in record.cigar.iter() {
        if op.is_skip() && op.len > 1 {
            cigar.push(read_len.saturating_sub(query_off), b'H');
            members.push(derive_fragment(
                record,
                pos,
                clipped_pos,
                std::mem::take(&mut cigar),
                seq_start..seq_off,
            ));

            mapping_pos = mapping_pos.saturating_add(op.len);
            pos = mapping_pos;
            clipped_pos = i64::from(mapping_pos) - clip_adj;
            cigar.push(query_off, b'H');
            seq_start = seq_off;
            continue;
        }

        cigar.push(op.len, op.code);
        let Some(kind) = op.kind() else {
            continue;
        };
        if kind.consumes_read() {
            seq_off += op.len as usize;
        }
        match kind {
            CigarKind::Match
            | CigarKind::SequenceMatch
            | CigarKind::SequenceMismatch
            | CigarKind::Insertion => {
                query_off += op.len;
                clip_adj += i64::from(op.len);
                mapping_pos = mapping_pos.saturating_add(op.len);
            }
            CigarKind::SoftClip | CigarKind::HardClip => query_off += op.len,
            CigarKind::Deletion | CigarKind::Skip | CigarKind::Pad => {}
        }
    }

    members.push(derive_fragment(record, pos, clipped_pos, cigar, seq_start..seq_off));
    AlignmentGroup { members }
}

fn derive_fragment(
    source: &AlignmentRecord,
    pos: u32,
    clipped_pos: i64,
    cigar: Cigar,
    seq_range: std::ops::Range<usize>,
) -> AlignmentRecord {
    let slice = |bytes: &[u8]| -> Vec<u8> {
        let end = seq_range.end.min(bytes.len());
        let start = seq_range.start.min(end);
        bytes[start..end].to_vec()
    };
    AlignmentRecord {
        pos,
        clipped_pos,
        cigar,
        sequence: slice(&source.sequence),
        quality: slice(&source.quality),
        ..source.clone()
    }
}

/// Whether two records of one read can be parts of the same split alignment:
/// same chromosome, strand and template segment, extents closer than
/// `threshold` bases, and each placing a different part of the read.
pub fn possible_split_alignment(a: &AlignmentRecord, b: &AlignmentRecord, threshold: u32) -> bool {
    if a.is_unmapped() || b.is_unmapped() {
        return false;
    }
    let (a_start, a_end) = a.cigar.query_range();
    let (b_start, b_end) = b.cigar.query_range();
    let disjoint_query = a_end <= b_start || b_end <= a_start;

    a.rname == b.rname
        && a.is_reverse() == b.is_reverse()
        && a.mate_segment() == b.mate_segment()
        && disjoint_query
        && a.extent().gap(&b.extent()) < threshold
}

/// Reconstruct every query and sort the resulting groups by the position of
/// their first member.
pub fn reconstruct_all(
    queries: Vec<Vec<AlignmentRecord>>,
    config: &EvalConfig,
) -> (Vec<AlignmentGroup>, ReconstructStats) {
    let mut stats = ReconstructStats::default();
    let mut groups = Vec::with_capacity(queries.len());

    for records in queries {
        stats.num_alignments += records.len() as u64;
        stats.num_unique_alignments += 1;

        match reconstruct_query(records, config) {
            Reconstruction::Unmapped => stats.num_non_alignments += 1,
            Reconstruction::Fragmented(group) => {
                stats.num_split_alignments += 1;
                groups.push(group);
            }
            Reconstruction::Joined { group, discarded } => {
                if discarded > 0 {
                    stats.num_multi_alignments += 1;
                }
                if group.is_split() {
                    stats.num_possibly_split_alignments += 1;
                }
                groups.push(group);
            }
        }
    }

    groups.sort_by_key(|g| g.position());

    stats.num_real_alignments = groups.len() as u64;
    stats.num_real_split_alignments = groups.iter().filter(|g| g.is_split()).count() as u64;

    tracing::debug!(
        groups = stats.num_real_alignments,
        split = stats.num_real_split_alignments,
        fragmented = stats.num_split_alignments,
        multi = stats.num_multi_alignments,
        unmapped = stats.num_non_alignments,
        "reconstructed alignment groups"
    );

    (groups, stats)
}
