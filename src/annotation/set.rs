use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::feature::{Feature, FeatureNode};
use crate::model::types::{is_gene_tag, is_transcript_tag};

const MAGIC: &[u8; 4] = b"GSR1";
const VERSION_STR: &str = env!("CARGO_PKG_VERSION");

/// Top-level features of one annotation, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub features: Vec<FeatureNode>,
}

impl FeatureSet {
    pub fn new(features: Vec<FeatureNode>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn gene_count(&self) -> usize {
        self.features
            .iter()
            .filter(|f| is_gene_tag(f.primary_tag()))
            .count()
    }

    /// Transcripts under genes plus bare top-level transcripts.
    pub fn transcript_count(&self) -> usize {
        self.features.iter().map(count_transcripts).sum()
    }

    /// Sequence names in first-seen order.
    pub fn seq_ids(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for f in &self.features {
            if !out.contains(&f.seq_id()) {
                out.push(f.seq_id());
            }
        }
        out
    }

    /// Serialize with a small header (magic + crate version) and a bincode payload.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
        let mut f = BufWriter::new(f);

        f.write_all(MAGIC)?;

        let v = VERSION_STR.as_bytes();
        let len = v.len() as u16;
        f.write_all(&len.to_le_bytes())?;
        f.write_all(v)?;

        bincode::serialize_into(&mut f, self).context("serialize feature set")?;
        f.flush()?;
        Ok(())
    }

    /// Load a set written by `save()`. Rejects other files and version mismatches.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
        let mut f = BufReader::new(f);

        let mut magic = [0u8; 4];
        f.read_exact(&mut magic)?;
        if &magic != MAGIC {
            bail!("{} is not a feature cache (bad magic)", path.display());
        }

        let mut len_buf = [0u8; 2];
        f.read_exact(&mut len_buf)?;
        let len = u16::from_le_bytes(len_buf) as usize;

        let mut ver_buf = vec![0u8; len];
        f.read_exact(&mut ver_buf)?;
        let file_version = std::str::from_utf8(&ver_buf)?;
        if file_version != VERSION_STR {
            bail!(
                "feature cache version mismatch: file={}, binary={}",
                file_version,
                VERSION_STR
            );
        }

        let set: Self = bincode::deserialize_from(&mut f).context("deserialize feature set")?;
        Ok(set)
    }
}

fn count_transcripts(f: &FeatureNode) -> usize {
    if is_transcript_tag(f.primary_tag()) {
        return 1;
    }
    if is_gene_tag(f.primary_tag()) {
        return f
            .children()
            .iter()
            .filter(|c| is_transcript_tag(c.primary_tag()))
            .count();
    }
    0
}

/// Human-readable summary: totals, then one line per sequence.
impl fmt::Display for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "FeatureSet: {} top-level features, {} genes, {} transcripts",
            self.features.len(),
            self.gene_count(),
            self.transcript_count()
        )?;

        let mut per_seq: HashMap<&str, (usize, usize)> = HashMap::new();
        for feat in &self.features {
            let e = per_seq.entry(feat.seq_id()).or_default();
            if is_gene_tag(feat.primary_tag()) {
                e.0 += 1;
            }
            e.1 += count_transcripts(feat);
        }
        for seq in self.seq_ids() {
            let (genes, txs) = per_seq.get(seq).copied().unwrap_or_default();
            writeln!(f, "  - {seq}: genes={genes}, transcripts={txs}")?;
        }
        Ok(())
    }
}
