use crate::cigar::Cigar;
use noodles::sam::alignment::record::Flags;

/// Genomic extent, 1-based half-open `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub start: u32,
    pub end: u32,
}

impl Segment {
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Bases shared by the two extents.
    pub fn overlap(&self, other: &Segment) -> u32 {
        let s = self.start.max(other.start);
        let e = self.end.min(other.end);
        e.saturating_sub(s)
    }

    pub fn contains(&self, other: &Segment) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Bases between the two extents; 0 when they touch or overlap.
    pub fn gap(&self, other: &Segment) -> u32 {
        let s = self.start.max(other.start);
        let e = self.end.min(other.end);
        s.saturating_sub(e)
    }
}

/// One physical alignment line.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentRecord {
    pub qname: String,
    pub rname: String,
    pub flags: Flags,
    /// 1-based leftmost mapping position (first aligned base).
    pub pos: u32,
    /// Position before soft-clip adjustment; may precede the chromosome start.
    pub clipped_pos: i64,
    pub cigar: Cigar,
    /// `None` when MAPQ is 255 (unavailable).
    pub mapq: Option<u8>,
    pub sequence: Vec<u8>,
    pub quality: Vec<u8>,
}

impl AlignmentRecord {
    pub fn new(qname: &str, rname: &str, flags: Flags, pos: u32, cigar: Cigar) -> Self {
        let clipped_pos = i64::from(pos) - i64::from(cigar.leading_soft_clip());
        Self {
            qname: qname.to_string(),
            rname: rname.to_string(),
            flags,
            pos,
            clipped_pos,
            cigar,
            mapq: None,
            sequence: Vec::new(),
            quality: Vec::new(),
        }
    }

    /// Flagged unmapped or carrying the `*` CIGAR.
    pub fn is_unmapped(&self) -> bool {
        self.flags.is_unmapped() || self.cigar.is_unmapped()
    }

    pub fn is_reverse(&self) -> bool {
        self.flags.is_reverse_complemented()
    }

    pub fn strand(&self) -> char {
        if self.is_reverse() { '-' } else { '+' }
    }

    /// Which template segment this record belongs to: 1 = first, 2 = last,
    /// 0 = unpaired.
    pub fn mate_segment(&self) -> u8 {
        if !self.flags.is_segmented() {
            0
        } else if self.flags.is_first_segment() {
            1
        } else if self.flags.is_last_segment() {
            2
        } else {
            0
        }
    }

    pub fn reference_len(&self) -> u32 {
        self.cigar.reference_len()
    }

    pub fn extent(&self) -> Segment {
        Segment {
            start: self.pos,
            end: self.pos.saturating_add(self.reference_len()),
        }
    }
}

/// All records that together represent one biological mapping of one read.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentGroup {
    pub members: Vec<AlignmentRecord>,
}

impl AlignmentGroup {
    pub fn single(record: AlignmentRecord) -> Self {
        Self { members: vec![record] }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_split(&self) -> bool {
        self.members.len() > 1
    }

    pub fn first(&self) -> Option<&AlignmentRecord> {
        self.members.first()
    }

    pub fn position(&self) -> u32 {
        self.first().map_or(0, |r| r.pos)
    }

    /// Strand of the first member; all members share it.
    pub fn strand(&self) -> char {
        self.first().map_or('+', |r| r.strand())
    }

    pub fn extents(&self) -> impl Iterator<Item = Segment> + '_ {
        self.members.iter().map(|r| r.extent())
    }

    /// Envelope of all member extents, intron gaps included.
    pub fn span(&self) -> Segment {
        let mut extents = self.extents();
        let Some(first) = extents.next() else {
            return Segment { start: 0, end: 0 };
        };
        extents.fold(first, |acc, e| Segment {
            start: acc.start.min(e.start),
            end: acc.end.max(e.end),
        })
    }
}
