use std::collections::HashMap;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::GzDecoder;
use log::{info, warn};

use crate::annotation::io::{AnnotationReader, AnnotationRecord, Dialect, ParseError};
use crate::annotation::set::FeatureSet;
use crate::model::feature::FeatureNode;
use crate::model::types::{is_gene_tag, is_transcript_tag};
use crate::types::Coord;

/// Attribute keys used to link and name features.
///
/// Several keys may be given per role; the first one present wins.
#[derive(Debug, Clone)]
pub struct AttributeKeys {
    /// GFF3 feature identifier (usually `ID`).
    pub id_keys: Vec<String>,
    /// GFF3 parent link (usually `Parent`; comma-separated lists allowed).
    pub parent_keys: Vec<String>,
    /// GFF3 display name.
    pub name_keys: Vec<String>,

    pub gene_id_keys: Vec<String>,
    pub gene_name_keys: Vec<String>,
    pub transcript_id_keys: Vec<String>,
    pub transcript_name_keys: Vec<String>,
    pub exon_name_keys: Vec<String>,
    /// GTF transcript biotype; decides the transcript's feature tag.
    pub biotype_keys: Vec<String>,
}

impl Default for AttributeKeys {
    fn default() -> Self {
        Self {
            id_keys: vec!["ID".into()],
            parent_keys: vec!["Parent".into()],
            name_keys: vec!["Name".into()],

            gene_id_keys: vec!["gene_id".into()],
            gene_name_keys: vec!["gene_name".into(), "gene".into()],
            transcript_id_keys: vec!["transcript_id".into()],
            transcript_name_keys: vec!["transcript_name".into()],
            exon_name_keys: vec!["exon_id".into()],
            biotype_keys: vec!["transcript_biotype".into(), "transcript_type".into()],
        }
    }
}

fn owned(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|s| s.to_string()).collect()
}

/// Builds feature trees (gene -> transcript -> exon) from a GTF/GFF3 file.
#[derive(Debug, Clone, Default)]
pub struct AnnotationBuilder {
    pub keys: AttributeKeys,
}

impl AnnotationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id_keys(mut self, keys: &[&str]) -> Self {
        self.keys.id_keys = owned(keys);
        self
    }

    pub fn parent_keys(mut self, keys: &[&str]) -> Self {
        self.keys.parent_keys = owned(keys);
        self
    }

    pub fn name_keys(mut self, keys: &[&str]) -> Self {
        self.keys.name_keys = owned(keys);
        self
    }

    pub fn gene_id_key(mut self, key: &str) -> Self {
        self.keys.gene_id_keys = vec![key.to_string()];
        self
    }

    pub fn gene_name_keys(mut self, keys: &[&str]) -> Self {
        self.keys.gene_name_keys = owned(keys);
        self
    }

    pub fn transcript_id_keys(mut self, keys: &[&str]) -> Self {
        self.keys.transcript_id_keys = owned(keys);
        self
    }

    pub fn transcript_name_keys(mut self, keys: &[&str]) -> Self {
        self.keys.transcript_name_keys = owned(keys);
        self
    }

    /// Build from anything implementing `BufRead`.
    ///
    /// The dialect is taken from the first record whose attributes reveal it.
    pub fn build_from_reader<R: BufRead>(&self, reader: R) -> Result<FeatureSet, ParseError> {
        let records = AnnotationReader::new(reader)
            .records()
            .collect::<Result<Vec<_>, _>>()?;

        let dialect = records
            .iter()
            .map(|r| r.dialect)
            .find(|d| *d != Dialect::Unknown)
            .unwrap_or(Dialect::Gff3);

        let features = match dialect {
            Dialect::Gtf => self.assemble_gtf(records)?,
            _ => self.assemble_gff3(records),
        };
        let set = FeatureSet::new(features);
        info!(
            "built {} top-level features ({} genes, {} transcripts)",
            set.features.len(),
            set.gene_count(),
            set.transcript_count()
        );
        Ok(set)
    }

    /// Build from a file path; `.gz` files are decompressed on the fly.
    pub fn build_from_path<P: AsRef<Path>>(&self, path: P) -> Result<FeatureSet, ParseError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| ParseError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        let is_gz = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("gz"))
            .unwrap_or(false);

        info!("reading annotation {}", path.display());
        if is_gz {
            self.build_from_reader(BufReader::new(GzDecoder::new(file)))
        } else {
            self.build_from_reader(BufReader::new(file))
        }
    }

    // -----------------------
    // GFF3: explicit ID/Parent links
    // -----------------------

    fn assemble_gff3(&self, records: Vec<AnnotationRecord>) -> Vec<FeatureNode> {
        let mut nodes: Vec<FeatureNode> = Vec::with_capacity(records.len());
        let mut parents: Vec<Vec<String>> = Vec::with_capacity(records.len());
        let mut id_to_idx: HashMap<String, usize> = HashMap::new();

        for rec in records {
            let id = rec
                .pick_first_attr(&self.keys.id_keys)
                .unwrap_or_else(|| format!("{}:{}", rec.feature_type, rec.line_no));
            let idx = nodes.len();
            // split features (e.g. CDS over several lines) share an ID; children link to the first
            id_to_idx.entry(id.clone()).or_insert(idx);

            parents.push(
                rec.pick_first_attr(&self.keys.parent_keys)
                    .map(|raw| split_parent_list(&raw))
                    .unwrap_or_default(),
            );
            let mut node = FeatureNode::new(
                id,
                rec.feature_type.clone(),
                rec.seqname.clone(),
                rec.start,
                rec.end,
                rec.strand,
            );
            if let Some(name) = rec.pick_first_attr(&self.keys.name_keys) {
                node = node.with_name(name);
            }
            nodes.push(node);
        }

        let mut child_idx: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
        let mut roots: Vec<usize> = Vec::new();
        for (idx, parent_ids) in parents.iter().enumerate() {
            let mut linked = false;
            for pid in parent_ids {
                match id_to_idx.get(pid) {
                    Some(&p) if p != idx => {
                        child_idx[p].push(idx);
                        linked = true;
                    }
                    _ => warn!("feature '{}' refers to unknown parent '{}'", nodes[idx].id, pid),
                }
            }
            if !linked {
                roots.push(idx);
            }
        }

        let mut on_path = vec![false; nodes.len()];
        roots
            .into_iter()
            .map(|r| materialize(r, &nodes, &child_idx, &mut on_path))
            .collect()
    }

    // -----------------------
    // GTF: flat records grouped by gene_id / transcript_id
    // -----------------------

    fn assemble_gtf(&self, records: Vec<AnnotationRecord>) -> Result<Vec<FeatureNode>, ParseError> {
        let mut genes: Vec<FeatureNode> = Vec::new();
        let mut gene_key_to_idx: HashMap<String, usize> = HashMap::new();

        // transcripts are kept flat and moved under their genes at the end
        let mut transcripts: Vec<(usize, FeatureNode, Option<String>)> = Vec::new();
        let mut tx_key_to_idx: HashMap<String, usize> = HashMap::new();

        for rec in records {
            let gene_key = rec.pick_first_attr(&self.keys.gene_id_keys).ok_or_else(|| {
                ParseError::MissingAttribute {
                    line_no: rec.line_no,
                    keys: self.keys.gene_id_keys.clone(),
                }
            })?;
            let gene_idx = *gene_key_to_idx.entry(gene_key.clone()).or_insert_with(|| {
                genes.push(placeholder(&gene_key, "gene", &rec));
                genes.len() - 1
            });
            if let Some(name) = rec.pick_first_attr(&self.keys.gene_name_keys) {
                if genes[gene_idx].name.is_none() {
                    genes[gene_idx].name = Some(name);
                }
            }

            if is_gene_tag(&rec.feature_type) {
                let g = &mut genes[gene_idx];
                g.start = rec.start;
                g.end = rec.end;
                g.strand = rec.strand;
                g.primary_tag = rec.feature_type.clone();
                continue;
            }

            let tx_key = rec
                .pick_first_attr(&self.keys.transcript_id_keys)
                .ok_or_else(|| ParseError::MissingAttribute {
                    line_no: rec.line_no,
                    keys: self.keys.transcript_id_keys.clone(),
                })?;
            let tx_idx = *tx_key_to_idx.entry(tx_key.clone()).or_insert_with(|| {
                transcripts.push((gene_idx, placeholder(&tx_key, "transcript", &rec), None));
                transcripts.len() - 1
            });
            let (_, tx, biotype) = &mut transcripts[tx_idx];
            if tx.name.is_none() {
                tx.name = rec.pick_first_attr(&self.keys.transcript_name_keys);
            }
            if biotype.is_none() {
                *biotype = rec.pick_first_attr(&self.keys.biotype_keys);
            }

            if rec.feature_type.eq_ignore_ascii_case("transcript") || is_transcript_tag(&rec.feature_type) {
                tx.start = rec.start;
                tx.end = rec.end;
                tx.strand = rec.strand;
                continue;
            }

            let child_id = format!("{}:{}:{}", tx_key, rec.feature_type, rec.start);
            let mut child = FeatureNode::new(
                child_id,
                rec.feature_type.clone(),
                rec.seqname.clone(),
                rec.start,
                rec.end,
                rec.strand,
            );
            if let Some(name) = rec.pick_first_attr(&self.keys.exon_name_keys) {
                child = child.with_name(name);
            }
            tx.add_child(child);
        }

        for (gene_idx, mut tx, biotype) in transcripts {
            tx.primary_tag = transcript_tag(biotype.as_deref()).to_string();
            tx.extend_to_children();
            genes[gene_idx].add_child(tx);
        }
        for g in &mut genes {
            g.extend_to_children();
        }
        Ok(genes)
    }
}

/// Empty node whose span is grown from its children unless a record sets it.
fn placeholder(id: &str, tag: &str, rec: &AnnotationRecord) -> FeatureNode {
    FeatureNode::new(id, tag, rec.seqname.clone(), Coord::MAX, Coord::MIN, rec.strand)
}

/// GTF biotype -> feature tag. Protein-coding (or unspecified) is `mRNA`.
fn transcript_tag(biotype: Option<&str>) -> &str {
    match biotype {
        None => "mRNA",
        Some(b) if b.eq_ignore_ascii_case("protein_coding") => "mRNA",
        Some(b) if b.to_ascii_lowercase().contains("rna") => b,
        Some(_) => "ncRNA",
    }
}

fn materialize(
    idx: usize,
    nodes: &[FeatureNode],
    child_idx: &[Vec<usize>],
    on_path: &mut [bool],
) -> FeatureNode {
    on_path[idx] = true;
    let mut node = nodes[idx].clone();
    for &c in &child_idx[idx] {
        if on_path[c] {
            warn!("cyclic Parent link between '{}' and '{}'", nodes[idx].id, nodes[c].id);
            continue;
        }
        node.add_child(materialize(c, nodes, child_idx, on_path));
    }
    on_path[idx] = false;
    node
}

/// Split a GFF3 Parent list by commas; also trim whitespace.
fn split_parent_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// -------------------- tests --------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::feature::Feature;
    use crate::types::Strand;
    use std::io::Cursor;

    fn build(text: &str) -> FeatureSet {
        AnnotationBuilder::new()
            .build_from_reader(Cursor::new(text.as_bytes()))
            .unwrap()
    }

    #[test]
    fn gff3_tree_follows_parent_links() {
        // children may precede their parents
        let gff = "\
##gff-version 3
chr1\tsrc\texon\t300\t400\t.\t+\t.\tID=e2;Parent=t1
chr1\tsrc\tgene\t100\t400\t.\t+\t.\tID=g1;Name=Alpha
chr1\tsrc\tmRNA\t100\t400\t.\t+\t.\tID=t1;Parent=g1;Name=Alpha-201
chr1\tsrc\texon\t100\t200\t.\t+\t.\tID=e1;Parent=t1
";
        let set = build(gff);
        assert_eq!(set.features.len(), 1);
        let g = &set.features[0];
        assert_eq!(g.display_name(), "Alpha");
        assert_eq!(g.children.len(), 1);
        let t = &g.children[0];
        assert_eq!(t.display_name(), "Alpha-201");
        let exon_ids: Vec<_> = t.children.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(exon_ids, vec!["e2", "e1"]);
    }

    #[test]
    fn gff3_multi_parent_exon_is_shared() {
        let gff = "\
chr2\tsrc\tgene\t5\t40\t.\t-\t.\tID=g9
chr2\tsrc\tmRNA\t5\t40\t.\t-\t.\tID=tx1;Parent=g9
chr2\tsrc\tmRNA\t5\t40\t.\t-\t.\tID=tx2;Parent=g9
chr2\tsrc\texon\t5\t20\t.\t-\t.\tID=ex1;Parent=tx1,tx2
";
        let set = build(gff);
        let g = &set.features[0];
        assert_eq!(g.children.len(), 2);
        assert!(g.children.iter().all(|t| t.children.len() == 1));
        assert_eq!(g.children[1].children[0].strand, Strand::Minus);
    }

    #[test]
    fn gff3_dangling_parent_becomes_root() {
        let gff = "chr1\tsrc\tmRNA\t1\t50\t.\t+\t.\tID=t1;Parent=missing\n";
        let set = build(gff);
        assert_eq!(set.features.len(), 1);
        assert_eq!(set.features[0].id, "t1");
    }

    #[test]
    fn gff3_features_without_id_get_synthetic_ids() {
        let gff = "\
chr1\tsrc\tmRNA\t1\t50\t.\t+\t.\tID=t1
chr1\tsrc\texon\t1\t50\t.\t+\t.\tParent=t1
";
        let set = build(gff);
        assert_eq!(set.features[0].children[0].id, "exon:2");
        assert_eq!(set.features[0].children[0].name, None);
    }

    #[test]
    fn gtf_records_are_grouped_into_genes_and_transcripts() {
        let gtf = "\
chr1\tsrc\texon\t101\t150\t.\t+\t.\tgene_id \"G1\"; gene_name \"Alpha\"; transcript_id \"T1\"; transcript_name \"TxA\"; exon_id \"E1\";
chr1\tsrc\texon\t201\t250\t.\t+\t.\tgene_id \"G1\"; gene_name \"Alpha\"; transcript_id \"T1\"; transcript_name \"TxA\";
chr1\tsrc\texon\t101\t180\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T2\"; transcript_biotype \"snoRNA\";
chr1\tsrc\texon\t501\t550\t.\t-\t.\tgene_id \"G2\"; transcript_id \"T3\"; transcript_biotype \"retained_intron\";
";
        let set = build(gtf);
        assert_eq!(set.features.len(), 2);

        let g1 = &set.features[0];
        assert_eq!(g1.display_name(), "Alpha");
        assert_eq!((g1.start, g1.end), (101, 250));
        assert_eq!(g1.children.len(), 2);

        let t1 = &g1.children[0];
        assert_eq!(t1.primary_tag, "mRNA");
        assert_eq!(t1.display_name(), "TxA");
        assert_eq!((t1.start, t1.end), (101, 250));
        assert_eq!(t1.children[0].name.as_deref(), Some("E1"));
        assert_eq!(t1.children[1].name, None);

        assert_eq!(g1.children[1].primary_tag, "snoRNA");

        let g2 = &set.features[1];
        assert_eq!(g2.strand, Strand::Minus);
        assert_eq!(g2.children[0].primary_tag, "ncRNA");
    }

    #[test]
    fn gtf_explicit_gene_and_transcript_lines_set_spans() {
        let gtf = "\
chr1\tsrc\tgene\t90\t300\t.\t+\t.\tgene_id \"G1\"; gene_name \"Alpha\";
chr1\tsrc\ttranscript\t95\t260\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\"; transcript_biotype \"protein_coding\";
chr1\tsrc\texon\t101\t150\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\";
chr1\tsrc\tCDS\t120\t150\t.\t+\t0\tgene_id \"G1\"; transcript_id \"T1\";
";
        let set = build(gtf);
        let g = &set.features[0];
        assert_eq!((g.start, g.end), (90, 300));
        assert_eq!(g.primary_tag, "gene");
        let t = &g.children[0];
        assert_eq!((t.start, t.end), (95, 260));
        assert_eq!(t.primary_tag, "mRNA");
        assert_eq!(t.children.len(), 2);
    }

    #[test]
    fn gtf_missing_transcript_id_is_an_error() {
        let gtf = "chr1\tsrc\texon\t101\t150\t.\t+\t.\tgene_id \"G1\";\n";
        let err = AnnotationBuilder::new()
            .build_from_reader(Cursor::new(gtf.as_bytes()))
            .unwrap_err();
        assert!(matches!(err, ParseError::MissingAttribute { line_no: 1, .. }));
    }

    #[test]
    fn custom_keys_are_respected() {
        let gtf = "chr1\tsrc\texon\t1\t10\t.\t+\t.\tgeneid \"G1\"; txid \"T1\";\n";
        let set = AnnotationBuilder::new()
            .gene_id_key("geneid")
            .transcript_id_keys(&["txid"])
            .build_from_reader(Cursor::new(gtf.as_bytes()))
            .unwrap();
        assert_eq!(set.features[0].id, "G1");
        assert_eq!(set.features[0].children[0].id, "T1");
    }

    #[test]
    fn build_from_gz_path() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("genes.gff3.gz");
        let mut enc = GzEncoder::new(std::fs::File::create(&path).unwrap(), Compression::default());
        enc.write_all(b"chr1\tsrc\tgene\t1\t50\t.\t+\t.\tID=g1\n").unwrap();
        enc.finish().unwrap();

        let set = AnnotationBuilder::new().build_from_path(&path).unwrap();
        assert_eq!(set.features.len(), 1);
    }
}
