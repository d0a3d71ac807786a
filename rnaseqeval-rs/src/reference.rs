use crate::types::HashMap;
use anyhow::{anyhow, bail, Result};
use needletail::parse_fastx_file;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static LONG_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(chromosome )(\w*)").expect("valid regex"));
static SHORT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(chr)(\w*)").expect("valid regex"));

/// Canonical chromosome name for a FASTA header, SAM reference name or
/// annotation sequence name.
///
/// Mitochondrial sequences map to `chrM`, `chromosome X` and `chrX` both map
/// to `chrX`, and anything else is taken to be a whole `genome`.
pub fn chrom_name(header: &str) -> String {
    if header.contains("mitochondrion") || header.contains("chrM") {
        return "chrM".to_string();
    }
    if let Some(caps) = LONG_NAME.captures(header) {
        return format!("chr{}", &caps[2]);
    }
    if let Some(caps) = SHORT_NAME.captures(header) {
        return format!("chr{}", &caps[2]);
    }
    "genome".to_string()
}

/// Reference sequences keyed by resolved chromosome name.
#[derive(Debug, Default)]
pub struct ReferenceDb {
    seqs: HashMap<String, Vec<u8>>,
    /// Resolved names in file order.
    names: Vec<String>,
}

impl ReferenceDb {
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = parse_fastx_file(path)
            .map_err(|e| anyhow!("failed to open FASTA {}: {}", path.display(), e))?;
        let mut db = Self::default();

        while let Some(result) = reader.next() {
            let record = result.map_err(|e| anyhow!("failed to parse FASTA record: {}", e))?;
            let header = String::from_utf8_lossy(record.id()).to_string();
            db.insert(&header, record.seq().to_vec())?;
        }

        tracing::info!(
            chromosomes = db.names.len(),
            length = db.total_length(),
            "loaded reference"
        );
        Ok(db)
    }

    pub fn from_sequences<'a>(records: impl IntoIterator<Item = (&'a str, &'a [u8])>) -> Result<Self> {
        let mut db = Self::default();
        for (header, seq) in records {
            db.insert(header, seq.to_vec())?;
        }
        Ok(db)
    }

    fn insert(&mut self, header: &str, seq: Vec<u8>) -> Result<()> {
        let name = chrom_name(header);
        if self.seqs.contains_key(&name) {
            bail!("duplicate chromosome name: {} (header '{}')", name, header);
        }
        self.names.push(name.clone());
        self.seqs.insert(name, seq);
        Ok(())
    }

    pub fn get(&self, chrom: &str) -> Option<&[u8]> {
        self.seqs.get(chrom).map(|s| s.as_slice())
    }

    /// Sequence for a SAM reference name; an unknown chromosome is fatal.
    pub fn sequence_for(&self, rname: &str) -> Result<&[u8]> {
        let chrom = chrom_name(rname);
        self.get(&chrom).ok_or_else(|| {
            anyhow!(
                "unknown chromosome name in alignments (chromname: \"{}\", rname: \"{}\")",
                chrom,
                rname
            )
        })
    }

    pub fn chrom_lengths(&self) -> Vec<(String, u64)> {
        self.names
            .iter()
            .map(|n| (n.clone(), self.seqs.get(n).map_or(0, |s| s.len() as u64)))
            .collect()
    }

    pub fn total_length(&self) -> u64 {
        self.seqs.values().map(|s| s.len() as u64).sum()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
