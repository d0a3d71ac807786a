use rnaseqeval_rs::cigar::{extend, BaseCounts, Cigar, CigarOp};

fn cigar(s: &str) -> Cigar {
    s.parse().expect("valid CIGAR")
}

#[test]
fn parse_and_display_round_trip() {
    let c = cigar("5S10M200N10M2H");
    assert_eq!(c.ops.len(), 5);
    assert_eq!(c.ops[2], CigarOp::new(200, b'N'));
    assert_eq!(c.to_string(), "5S10M200N10M2H");
}

#[test]
fn star_is_unmapped_sentinel() {
    let c = cigar("*");
    assert!(c.is_unmapped());
    assert_eq!(c.to_string(), "*");
    assert_eq!(extend(&c, b"", b"ACGT", 1).ops, Vec::new());
}

#[test]
fn malformed_cigar_strings_are_rejected() {
    for bad in ["", "M10", "10", "0M", "10M5", "99999999999M"] {
        assert!(bad.parse::<Cigar>().is_err(), "accepted {:?}", bad);
    }
}

#[test]
fn lengths_follow_operation_semantics() {
    let c = cigar("2H2S3M1I2M1D2M4N2M");
    assert_eq!(c.query_len(), 2 + 3 + 1 + 2 + 2 + 2);
    assert_eq!(c.read_len(), c.query_len() + 2);
    assert_eq!(c.reference_len(), 3 + 2 + 1 + 2 + 4 + 2);
    assert_eq!(c.leading_soft_clip(), 2);
}

#[test]
fn query_range_starts_after_leading_clips() {
    assert_eq!(cigar("2H3S10M5S").query_range(), (5, 15));
    assert_eq!(cigar("4M2I3M10N4M").query_range(), (0, 13));
    assert_eq!(cigar("20S30M").query_range(), (20, 50));
}

#[test]
fn interior_skip_needs_more_than_one_base() {
    assert!(cigar("10M200N10M").has_interior_skip());
    assert!(!cigar("10M1N10M").has_interior_skip());
    assert!(!cigar("30M").has_interior_skip());
}

#[test]
fn extend_resolves_matches_and_mismatches() {
    let ext = extend(&cigar("4M"), b"ACGA", b"ACGTTT", 1);
    assert_eq!(ext.to_string(), "3=1X");

    let ext = extend(&cigar("4M"), b"acgt", b"TACGT", 2);
    assert_eq!(ext.to_string(), "4=");
}

#[test]
fn extend_without_query_sequence_assumes_matches() {
    let ext = extend(&cigar("3M2D3M"), b"", b"", 1);
    assert_eq!(ext.to_string(), "3=2D3=");
}

#[test]
fn extend_counts_bases_past_reference_end_as_mismatches() {
    let ext = extend(&cigar("3M"), b"AAA", b"AA", 1);
    assert_eq!(ext.to_string(), "2=1X");
}

#[test]
fn extend_walks_both_sequences() {
    // 2 clipped, AC match, G deleted, TT match, then an inserted base.
    let ext = extend(&cigar("2S2M1D2M1I"), b"NNACTTG", b"ACGTT", 1);
    assert_eq!(ext.to_string(), "2S2=1D2=1I");

    let c = cigar("2S2M1D2M1I");
    assert_eq!(ext.query_len(), c.query_len());
    assert_eq!(ext.reference_len(), c.reference_len());
    assert_eq!(
        ext.base_counts(),
        BaseCounts {
            matches: 4,
            mismatches: 0,
            insertions: 1,
            deletions: 1
        }
    );
}

#[test]
fn extend_keeps_lengths_over_introns() {
    let c = cigar("10M200N10M");
    let reference = vec![b'A'; 300];
    let query = vec![b'A'; 20];
    let ext = extend(&c, &query, &reference, 5);
    assert_eq!(ext.to_string(), "10=200N10=");
    assert_eq!(ext.reference_len(), c.reference_len());
    assert_eq!(ext.base_counts().aligned(), 20);
}

#[test]
fn unknown_operation_is_skipped() {
    let c = cigar("5M2Q3M");
    assert_eq!(c.ops[1], CigarOp::new(2, b'Q'));
    assert_eq!(c.ops[1].kind(), None);

    let ext = extend(&c, b"ACGTAACG", b"ACGTAACGTT", 1);
    assert_eq!(ext.to_string(), "8=");
}
