use rnaseqeval_rs::reference::{chrom_name, ReferenceDb};
use std::fs;
use std::path::PathBuf;

fn fixture(name: &str, contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("rnaseqeval-reference-{}", std::process::id()));
    fs::create_dir_all(&dir).expect("create fixture dir");
    let path = dir.join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

#[test]
fn chromosome_names_resolve() {
    assert_eq!(chrom_name("chr1"), "chr1");
    assert_eq!(chrom_name("chrX extra words"), "chrX");
    assert_eq!(chrom_name("NC_000001.11 Homo sapiens chromosome 1, GRCh38.p14"), "chr1");
    assert_eq!(chrom_name("Homo sapiens chromosome X"), "chrX");
    assert_eq!(chrom_name("NC_012920.1 Homo sapiens mitochondrion, complete genome"), "chrM");
    assert_eq!(chrom_name("chrM"), "chrM");
    assert_eq!(chrom_name("scaffold_17"), "genome");
}

#[test]
fn duplicate_chromosome_is_rejected() {
    let result = ReferenceDb::from_sequences([
        ("chr1", b"ACGT".as_slice()),
        ("Homo sapiens chromosome 1", b"TTTT".as_slice()),
    ]);
    assert!(result.is_err());
}

#[test]
fn lookup_uses_resolved_names() {
    let db = ReferenceDb::from_sequences([
        ("chromosome 2", b"ACGTACGT".as_slice()),
        ("chr1", b"AC".as_slice()),
    ])
    .expect("unique names");

    assert_eq!(db.len(), 2);
    assert_eq!(db.total_length(), 10);
    assert_eq!(db.sequence_for("chr2").expect("chr2"), b"ACGTACGT");
    assert_eq!(db.get("chr1"), Some(b"AC".as_slice()));
    assert!(db.sequence_for("chr3").is_err());
    assert_eq!(
        db.chrom_lengths(),
        vec![("chr2".to_string(), 8), ("chr1".to_string(), 2)]
    );
}

#[test]
fn load_fasta_file() {
    let path = fixture(
        "genome.fa",
        ">chr1 first\nACGTACGTAC\nGTACGT\n>NC_012920.1 Homo sapiens mitochondrion\nTTTT\n",
    );
    let db = ReferenceDb::load(&path).expect("load FASTA");
    assert_eq!(db.len(), 2);
    assert_eq!(db.sequence_for("chr1").expect("chr1"), b"ACGTACGTACGTACGT");
    assert_eq!(db.get("chrM"), Some(b"TTTT".as_slice()));
}

#[test]
fn missing_fasta_is_an_error() {
    let path = std::env::temp_dir().join("rnaseqeval-no-such-genome.fa");
    assert!(ReferenceDb::load(&path).is_err());
}
