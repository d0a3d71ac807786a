use anyhow::{anyhow, bail, Result};
use noodles::sam::alignment::record::cigar::op::Kind as CigarKind;
use std::fmt;
use std::str::FromStr;

/// One run of a compact CIGAR: run length plus the SAM operation character.
///
/// The code is kept as the raw byte so that an unrecognised operation survives
/// parsing and is reported by the interpreter instead of rejected up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CigarOp {
    pub len: u32,
    pub code: u8,
}

impl CigarOp {
    pub fn new(len: u32, code: u8) -> Self {
        Self { len, code }
    }

    pub fn kind(&self) -> Option<CigarKind> {
        kind_from_code(self.code)
    }

    pub fn is_skip(&self) -> bool {
        self.kind() == Some(CigarKind::Skip)
    }
}

pub fn kind_from_code(code: u8) -> Option<CigarKind> {
    match code {
        b'M' => Some(CigarKind::Match),
        b'I' => Some(CigarKind::Insertion),
        b'D' => Some(CigarKind::Deletion),
        b'N' => Some(CigarKind::Skip),
        b'S' => Some(CigarKind::SoftClip),
        b'H' => Some(CigarKind::HardClip),
        b'P' => Some(CigarKind::Pad),
        b'=' => Some(CigarKind::SequenceMatch),
        b'X' => Some(CigarKind::SequenceMismatch),
        _ => None,
    }
}

pub fn kind_to_code(kind: CigarKind) -> u8 {
    match kind {
        CigarKind::Match => b'M',
        CigarKind::Insertion => b'I',
        CigarKind::Deletion => b'D',
        CigarKind::Skip => b'N',
        CigarKind::SoftClip => b'S',
        CigarKind::HardClip => b'H',
        CigarKind::Pad => b'P',
        CigarKind::SequenceMatch => b'=',
        CigarKind::SequenceMismatch => b'X',
    }
}

/// Compact CIGAR as read from an alignment record. An empty operation list is
/// the `*` (unmapped) sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cigar {
    pub ops: Vec<CigarOp>,
}

impl Cigar {
    pub fn new(ops: Vec<CigarOp>) -> Self {
        Self { ops }
    }

    pub fn is_unmapped(&self) -> bool {
        self.ops.is_empty()
    }

    /// Append without merging into the previous run.
    pub fn push(&mut self, len: u32, code: u8) {
        if len == 0 {
            return;
        }
        self.ops.push(CigarOp::new(len, code));
    }

    pub fn iter(&self) -> impl Iterator<Item = &CigarOp> {
        self.ops.iter()
    }

    /// Bases of the query present in SEQ (M, I, S, =, X).
    pub fn query_len(&self) -> u32 {
        self.sum_where(|k| {
            matches!(
                k,
                CigarKind::Match
                    | CigarKind::Insertion
                    | CigarKind::SoftClip
                    | CigarKind::SequenceMatch
                    | CigarKind::SequenceMismatch
            )
        })
    }

    /// Full read length including hard-clipped bases.
    pub fn read_len(&self) -> u32 {
        self.query_len() + self.sum_where(|k| k == CigarKind::HardClip)
    }

    /// Reference bases consumed (M, =, X, D, N).
    pub fn reference_len(&self) -> u32 {
        self.sum_where(|k| k.consumes_reference())
    }

    /// Soft clip at the alignment start, looking past a leading hard clip.
    pub fn leading_soft_clip(&self) -> u32 {
        self.ops
            .iter()
            .skip_while(|op| op.kind() == Some(CigarKind::HardClip))
            .take_while(|op| op.kind() == Some(CigarKind::SoftClip))
            .map(|op| op.len)
            .sum()
    }

    /// Read bases placed on the reference, as a half-open range of read
    /// offsets: everything clipped at the start (hard or soft) comes before
    /// it, the M/I/=/X bases make it up.
    pub fn query_range(&self) -> (u32, u32) {
        let start: u32 = self
            .ops
            .iter()
            .take_while(|op| {
                matches!(op.kind(), Some(CigarKind::HardClip | CigarKind::SoftClip))
            })
            .map(|op| op.len)
            .sum();
        let aligned = self.sum_where(|k| {
            matches!(
                k,
                CigarKind::Match
                    | CigarKind::Insertion
                    | CigarKind::SequenceMatch
                    | CigarKind::SequenceMismatch
            )
        });
        (start, start + aligned)
    }

    /// True when some operation other than the first and last is a skip
    /// longer than one base. Skips cannot legally open or close a CIGAR.
    pub fn has_interior_skip(&self) -> bool {
        if self.ops.len() < 3 {
            return false;
        }
        self.ops[1..self.ops.len() - 1]
            .iter()
            .any(|op| op.is_skip() && op.len > 1)
    }

    fn sum_where(&self, pred: impl Fn(CigarKind) -> bool) -> u32 {
        self.ops
            .iter()
            .filter(|op| op.kind().is_some_and(&pred))
            .map(|op| op.len)
            .sum()
    }
}

impl FromStr for Cigar {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        if s == "*" {
            return Ok(Self::default());
        }
        if s.is_empty() {
            bail!("empty CIGAR string");
        }

        let mut ops = Vec::new();
        let mut len: Option<u32> = None;
        for b in s.bytes() {
            if b.is_ascii_digit() {
                let digit = u32::from(b - b'0');
                let next = len
                    .unwrap_or(0)
                    .checked_mul(10)
                    .and_then(|v| v.checked_add(digit))
                    .ok_or_else(|| anyhow!("CIGAR run length overflows in '{}'", s))?;
                len = Some(next);
            } else {
                let n = len
                    .take()
                    .ok_or_else(|| anyhow!("CIGAR operation '{}' has no length in '{}'", b as char, s))?;
                if n == 0 {
                    bail!("zero-length CIGAR operation '{}' in '{}'", b as char, s);
                }
                ops.push(CigarOp::new(n, b));
            }
        }
        if len.is_some() {
            bail!("CIGAR '{}' ends with a dangling run length", s);
        }
        Ok(Self { ops })
    }
}

impl fmt::Display for Cigar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ops.is_empty() {
            return f.write_str("*");
        }
        for op in &self.ops {
            write!(f, "{}{}", op.len, op.code as char)?;
        }
        Ok(())
    }
}

/// Operation kinds of an extended CIGAR, where alignment matches have been
/// resolved against the reference into matches and mismatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtOp {
    Match,
    Mismatch,
    Insert,
    Delete,
    Skip,
    SoftClip,
    HardClip,
    Pad,
}

impl ExtOp {
    pub fn code(self) -> char {
        match self {
            ExtOp::Match => '=',
            ExtOp::Mismatch => 'X',
            ExtOp::Insert => 'I',
            ExtOp::Delete => 'D',
            ExtOp::Skip => 'N',
            ExtOp::SoftClip => 'S',
            ExtOp::HardClip => 'H',
            ExtOp::Pad => 'P',
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtendedCigar {
    pub ops: Vec<(u32, ExtOp)>,
}

impl ExtendedCigar {
    pub fn add_operation(&mut self, len: u32, op: ExtOp) {
        if len == 0 {
            return;
        }
        if let Some((prev_len, prev_op)) = self.ops.last_mut()
            && *prev_op == op
        {
            *prev_len += len;
            return;
        }
        self.ops.push((len, op));
    }

    pub fn query_len(&self) -> u32 {
        self.ops
            .iter()
            .filter(|(_, op)| {
                matches!(
                    op,
                    ExtOp::Match | ExtOp::Mismatch | ExtOp::Insert | ExtOp::SoftClip
                )
            })
            .map(|(len, _)| *len)
            .sum()
    }

    pub fn reference_len(&self) -> u32 {
        self.ops
            .iter()
            .filter(|(_, op)| {
                matches!(
                    op,
                    ExtOp::Match | ExtOp::Mismatch | ExtOp::Delete | ExtOp::Skip
                )
            })
            .map(|(len, _)| *len)
            .sum()
    }

    pub fn base_counts(&self) -> BaseCounts {
        let mut counts = BaseCounts::default();
        for (len, op) in &self.ops {
            let len = u64::from(*len);
            match op {
                ExtOp::Match => counts.matches += len,
                ExtOp::Mismatch => counts.mismatches += len,
                ExtOp::Insert => counts.insertions += len,
                ExtOp::Delete => counts.deletions += len,
                ExtOp::Skip | ExtOp::SoftClip | ExtOp::HardClip | ExtOp::Pad => {}
            }
        }
        counts
    }
}

impl fmt::Display for ExtendedCigar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ops.is_empty() {
            return f.write_str("*");
        }
        for (len, op) in &self.ops {
            write!(f, "{}{}", len, op.code())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BaseCounts {
    pub matches: u64,
    pub mismatches: u64,
    pub insertions: u64,
    pub deletions: u64,
}

impl BaseCounts {
    /// Query bases placed on the reference: matches, mismatches and insertions.
    pub fn aligned(&self) -> u64 {
        self.matches + self.mismatches + self.insertions
    }

    pub fn total(&self) -> u64 {
        self.matches + self.mismatches + self.insertions + self.deletions
    }

    pub fn add(&mut self, other: &BaseCounts) {
        self.matches += other.matches;
        self.mismatches += other.mismatches;
        self.insertions += other.insertions;
        self.deletions += other.deletions;
    }
}

/// Expand a compact CIGAR into an extended one.
///
/// `query` is the record's SEQ (empty when absent), `reference` the full
/// chromosome sequence and `pos` the 1-based alignment start. `M` runs are
/// resolved base by base, case-insensitively; a base with no counterpart on
/// either side counts as a mismatch. Without a query sequence every `M` base is
/// taken as a match. Unrecognised operation codes are reported and skipped.
pub fn extend(cigar: &Cigar, query: &[u8], reference: &[u8], pos: u32) -> ExtendedCigar {
    let mut out = ExtendedCigar::default();
    let mut qi = 0usize;
    let mut ri = pos.saturating_sub(1) as usize;

    for op in cigar.iter() {
        let len = op.len as usize;
        let Some(kind) = op.kind() else {
            tracing::warn!(
                op = %(op.code as char),
                len = op.len,
                "invalid CIGAR operation; skipping"
            );
            continue;
        };
        match kind {
            CigarKind::Match => {
                if query.is_empty() {
                    out.add_operation(op.len, ExtOp::Match);
                } else {
                    for k in 0..len {
                        let same = match (query.get(qi + k), reference.get(ri + k)) {
                            (Some(q), Some(r)) => q.eq_ignore_ascii_case(r),
                            _ => false,
                        };
                        out.add_operation(1, if same { ExtOp::Match } else { ExtOp::Mismatch });
                    }
                }
                qi += len;
                ri += len;
            }
            CigarKind::SequenceMatch => {
                out.add_operation(op.len, ExtOp::Match);
                qi += len;
                ri += len;
            }
            CigarKind::SequenceMismatch => {
                out.add_operation(op.len, ExtOp::Mismatch);
                qi += len;
                ri += len;
            }
            CigarKind::Insertion => {
                out.add_operation(op.len, ExtOp::Insert);
                qi += len;
            }
            CigarKind::Deletion => {
                out.add_operation(op.len, ExtOp::Delete);
                ri += len;
            }
            CigarKind::Skip => {
                out.add_operation(op.len, ExtOp::Skip);
                ri += len;
            }
            CigarKind::SoftClip => {
                out.add_operation(op.len, ExtOp::SoftClip);
                qi += len;
            }
            CigarKind::HardClip => out.add_operation(op.len, ExtOp::HardClip),
            CigarKind::Pad => out.add_operation(op.len, ExtOp::Pad),
        }
    }

    out
}
