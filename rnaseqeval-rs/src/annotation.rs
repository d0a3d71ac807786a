use crate::alignment::Segment;
use crate::types::{HashMap, HashMapExt};
use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Gtf,
    Gff3,
    Bed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exon {
    pub start: u32,
    pub end: u32,
}

impl Exon {
    pub fn segment(&self) -> Segment {
        Segment { start: self.start, end: self.end }
    }

    pub fn length(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }
}

/// One gene model: a transcript's interval plus its exons in genomic order.
/// Exon `i` (1-based) is `exons[i - 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneModel {
    pub id: String,
    pub gene_id: String,
    pub seqname: String,
    pub strand: char,
    pub start: u32,
    pub end: u32,
    pub exons: Vec<Exon>,
}

impl GeneModel {
    /// Build a model from its exons; the gene interval is their envelope.
    /// Returns `None` when there are no exons.
    pub fn new(id: &str, gene_id: &str, seqname: &str, strand: char, mut exons: Vec<Exon>) -> Option<Self> {
        exons.sort_by_key(|e| (e.start, e.end));
        let start = exons.iter().map(|e| e.start).min()?;
        let end = exons.iter().map(|e| e.end).max()?;
        Some(Self {
            id: id.to_string(),
            gene_id: gene_id.to_string(),
            seqname: seqname.to_string(),
            strand,
            start,
            end,
            exons,
        })
    }

    pub fn segment(&self) -> Segment {
        Segment { start: self.start, end: self.end }
    }

    pub fn length(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    pub fn exon_count(&self) -> usize {
        self.exons.len()
    }

    /// Bases of `span` that fall inside the gene interval.
    pub fn bases_inside(&self, span: &Segment) -> u32 {
        self.segment().overlap(span)
    }

    pub fn contains(&self, span: &Segment) -> bool {
        self.segment().contains(span)
    }
}

pub fn detect_format(path: &Path) -> Result<InputFormat> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "gtf" => Ok(InputFormat::Gtf),
        "gff" | "gff3" => Ok(InputFormat::Gff3),
        "bed" => Ok(InputFormat::Bed),
        _ => Err(anyhow!(
            "unable to detect annotation format from extension: .{}",
            ext
        )),
    }
}

/// Load gene models from GTF/GFF3/BED, sorted by start position.
///
/// GTF/GFF are 1-based inclusive; intervals are stored 1-based half-open
/// `[start, end+1)` so they compare directly with SAM positions. BED lines
/// are 0-based half-open and shift by one.
pub fn load_gene_models(path: &Path) -> Result<Vec<GeneModel>> {
    let builders = match detect_format(path)? {
        InputFormat::Gtf => load_gtf(path),
        InputFormat::Gff3 => load_gff3(path),
        InputFormat::Bed => load_bed(path),
    }
    .with_context(|| format!("failed to load annotation {}", path.display()))?;

    let mut models: Vec<GeneModel> = Vec::with_capacity(builders.len());
    for (id, b) in builders {
        match GeneModel::new(&id, &b.gene_id, &b.seqname, b.strand, b.exons) {
            Some(model) => models.push(model),
            None => tracing::warn!(transcript = %id, "annotation entry has no exons; skipping"),
        }
    }
    sort_models(&mut models);

    tracing::info!(models = models.len(), "loaded annotation");
    Ok(models)
}

pub fn sort_models(models: &mut [GeneModel]) {
    models.sort_by(|a, b| (a.start, &a.id).cmp(&(b.start, &b.id)));
}

#[derive(Debug)]
struct ModelBuilder {
    gene_id: String,
    seqname: String,
    strand: char,
    exons: Vec<Exon>,
}

fn load_gtf(path: &Path) -> Result<HashMap<String, ModelBuilder>> {
    let reader = File::open(path)?;
    let mut reader = noodles::gtf::io::Reader::new(BufReader::new(reader));

    let mut models: HashMap<String, ModelBuilder> = HashMap::new();

    for result in reader.record_bufs() {
        let record = result?;

        let feature_type: &[u8] = record.ty().as_ref();
        if feature_type != b"transcript" && feature_type != b"exon" {
            continue;
        }

        let (start, end) = half_open(record.start().get(), record.end().get())?;

        let attrs = record.attributes();
        let transcript_id = get_record_buf_attribute(attrs, b"transcript_id")
            .ok_or_else(|| anyhow!("missing transcript_id in GTF attributes"))?;
        let gene_id = get_record_buf_attribute(attrs, b"gene_id")
            .unwrap_or_else(|| transcript_id.clone());

        let entry = models.entry(transcript_id).or_insert_with(|| ModelBuilder {
            gene_id,
            seqname: record.reference_sequence_name().to_string(),
            strand: strand_to_char(record.strand()),
            exons: Vec::new(),
        });

        if feature_type == b"exon" {
            entry.exons.push(Exon { start, end });
        }
    }

    Ok(models)
}

fn load_gff3(path: &Path) -> Result<HashMap<String, ModelBuilder>> {
    let reader = File::open(path)?;
    let mut reader = noodles::gff::io::Reader::new(BufReader::new(reader));

    let mut models: HashMap<String, ModelBuilder> = HashMap::new();

    for result in reader.record_bufs() {
        let record = result?;

        let feature_type: &[u8] = record.ty().as_ref();
        let is_exon = feature_type == b"exon";
        if !is_exon && feature_type != b"transcript" && feature_type != b"mRNA" {
            continue;
        }

        let (start, end) = half_open(record.start().get(), record.end().get())?;

        let attrs = record.attributes();
        // An exon shared by several transcripts lists all of them as parents.
        let transcript_ids = if is_exon {
            get_record_buf_attribute_values(attrs, b"Parent")
        } else {
            get_record_buf_attribute(attrs, b"ID").into_iter().collect()
        };
        if transcript_ids.is_empty() {
            return Err(anyhow!("missing transcript id in GFF3 attributes"));
        }

        for transcript_id in transcript_ids {
            let entry = models.entry(transcript_id.clone()).or_insert_with(|| ModelBuilder {
                gene_id: transcript_id,
                seqname: record.reference_sequence_name().to_string(),
                strand: strand_to_char(record.strand()),
                exons: Vec::new(),
            });

            if is_exon {
                entry.exons.push(Exon { start, end });
            } else if let Some(parent) = get_record_buf_attribute(attrs, b"Parent") {
                entry.gene_id = parent;
            }
        }
    }

    Ok(models)
}

/// One model per BED line, named after the name column. Blocks become exons;
/// a line without blocks is a single exon over the whole feature.
fn load_bed(path: &Path) -> Result<HashMap<String, ModelBuilder>> {
    let reader = File::open(path)?;
    let mut reader = noodles::bed::io::Reader::<3, _>::new(BufReader::new(reader));
    let mut record = noodles::bed::Record::<3>::default();

    let mut models: HashMap<String, ModelBuilder> = HashMap::new();

    while reader.read_record(&mut record)? != 0 {
        let seqname = record.reference_sequence_name().to_string();
        let feature_start = record.feature_start()?.get();
        let feature_end = record
            .feature_end()
            .ok_or_else(|| anyhow!("missing end in BED record"))??
            .get();
        let (start, end) = half_open(feature_start, feature_end)?;

        let fields: Vec<String> = record
            .other_fields()
            .iter()
            .map(|f| f.to_string())
            .collect();
        let field = |i: usize| fields.get(i).map(String::as_str).filter(|f| *f != ".");

        let name = field(0)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{seqname}:{start}-{end}"));
        let strand = match field(2) {
            Some("+") => '+',
            Some("-") => '-',
            _ => '.',
        };
        let exons = match (field(7), field(8)) {
            (Some(sizes), Some(starts)) => bed_blocks(start, sizes, starts)
                .with_context(|| format!("invalid blocks in BED record {name}"))?,
            _ => vec![Exon { start, end }],
        };

        if models.contains_key(&name) {
            tracing::warn!(name = %name, "duplicate BED name; skipping");
            continue;
        }
        models.insert(
            name.clone(),
            ModelBuilder {
                gene_id: name,
                seqname,
                strand,
                exons,
            },
        );
    }

    Ok(models)
}

/// Block sizes and block starts (relative to the feature start) as exons.
fn bed_blocks(start: u32, sizes: &str, starts: &str) -> Result<Vec<Exon>> {
    let parse = |list: &str| -> Result<Vec<u32>> {
        list.split(',')
            .filter(|v| !v.is_empty())
            .map(|v| v.parse::<u32>().with_context(|| format!("invalid block value: {v}")))
            .collect()
    };
    let sizes = parse(sizes)?;
    let starts = parse(starts)?;
    if sizes.len() != starts.len() {
        return Err(anyhow!(
            "{} block sizes but {} block starts",
            sizes.len(),
            starts.len()
        ));
    }

    sizes
        .into_iter()
        .zip(starts)
        .map(|(size, offset)| {
            let block_start = start
                .checked_add(offset)
                .ok_or_else(|| anyhow!("block start out of range"))?;
            let block_end = block_start
                .checked_add(size)
                .ok_or_else(|| anyhow!("block end out of range"))?;
            Ok(Exon { start: block_start, end: block_end })
        })
        .collect()
}

fn half_open(start_1: usize, end_1: usize) -> Result<(u32, u32)> {
    let start = u32::try_from(start_1).map_err(|_| anyhow!("annotation start out of range"))?;
    let end = u32::try_from(end_1.saturating_add(1))
        .map_err(|_| anyhow!("annotation end out of range"))?;
    Ok((start, end))
}

fn get_record_buf_attribute(
    attrs: &noodles::gff::feature::record_buf::Attributes,
    key: &[u8],
) -> Option<String> {
    let value = attrs.get(key)?;
    value.iter().next().map(|v| v.to_string())
}

fn get_record_buf_attribute_values(
    attrs: &noodles::gff::feature::record_buf::Attributes,
    key: &[u8],
) -> Vec<String> {
    attrs
        .get(key)
        .map(|value| value.iter().map(|v| v.to_string()).collect())
        .unwrap_or_default()
}

fn strand_to_char(strand: noodles::gff::feature::record::Strand) -> char {
    use noodles::gff::feature::record::Strand;
    match strand {
        Strand::Forward => '+',
        Strand::Reverse => '-',
        Strand::None => '.',
        Strand::Unknown => '?',
    }
}
