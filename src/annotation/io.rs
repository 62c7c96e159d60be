use std::collections::HashMap;
use std::io::BufRead;

use thiserror::Error;

use crate::types::{Coord, Strand};

/// File dialect detected from attribute syntax.
///
/// - GFF3 typically uses: key=value;key2=value2
/// - GTF typically uses: key "value"; key2 "value2";
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Gff3,
    Gtf,
    Unknown,
}

/// A single parsed record line from GTF/GFF3.
///
/// Coordinates are kept as written: 1-based, inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRecord {
    pub line_no: usize,
    pub seqname: String,
    pub source: String,
    pub feature_type: String,
    pub start: Coord,
    pub end: Coord,
    pub strand: Strand,
    pub attrs: HashMap<String, String>,
    pub dialect: Dialect,
}

impl AnnotationRecord {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(|s| s.as_str())
    }

    /// First non-empty value among `keys`.
    pub fn pick_first_attr(&self, keys: &[String]) -> Option<String> {
        keys.iter()
            .filter_map(|k| self.attr(k))
            .map(str::trim)
            .find(|v| !v.is_empty())
            .map(str::to_string)
    }
}

/// Parsing errors for GTF/GFF3.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("I/O error while reading '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line_no}: malformed GTF/GFF line ({problem}): {line}")]
    MalformedLine {
        line_no: usize,
        problem: &'static str,
        line: String,
    },

    #[error("line {line_no}: bad coordinates: {line}")]
    BadCoordinates { line_no: usize, line: String },

    #[error("line {line_no}: missing attribute, tried keys {keys:?}")]
    MissingAttribute { line_no: usize, keys: Vec<String> },
}

/// Streaming parser for GTF/GFF3 files.
///
/// Most callers want [`crate::annotation::AnnotationBuilder`], which turns
/// these records into feature trees.
///
/// ```no_run
/// use std::fs::File;
/// use std::io::BufReader;
/// use gene_subregions::annotation::io::AnnotationReader;
///
/// let file = File::open("genes.gff3").unwrap();
/// for rec in AnnotationReader::new(BufReader::new(file)).records() {
///     let rec = rec.unwrap();
///     println!("{} {} {}-{}", rec.seqname, rec.feature_type, rec.start, rec.end);
/// }
/// ```
pub struct AnnotationReader<R: BufRead> {
    reader: R,
    buf: String,
    line_no: usize,
}

impl<R: BufRead> AnnotationReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: String::new(),
            line_no: 0,
        }
    }

    /// Iterator over parsed records.
    ///
    /// Skips blank lines and `#` comment/directive lines. Stops at a
    /// `##FASTA` section.
    pub fn records(mut self) -> impl Iterator<Item = Result<AnnotationRecord, ParseError>> {
        std::iter::from_fn(move || loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => self.line_no += 1,
                Err(e) => {
                    return Some(Err(ParseError::Io {
                        path: "<reader>".to_string(),
                        source: e,
                    }))
                }
            }

            let line = self.buf.trim_end_matches(&['\n', '\r'][..]);
            if line.starts_with("##FASTA") {
                return None;
            }
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            return Some(parse_record_line(line, self.line_no));
        })
    }
}

/// Parse a single non-comment line into an `AnnotationRecord`.
pub fn parse_record_line(line: &str, line_no: usize) -> Result<AnnotationRecord, ParseError> {
    let malformed = |problem: &'static str| ParseError::MalformedLine {
        line_no,
        problem,
        line: line.to_string(),
    };

    // seqname source feature start end score strand phase attributes
    let cols: Vec<&str> = line.split('\t').collect();
    if cols.len() != 9 {
        return Err(malformed("expected 9 tab-separated columns"));
    }

    let bad_coords = || ParseError::BadCoordinates {
        line_no,
        line: line.to_string(),
    };
    let start: Coord = cols[3].trim().parse().map_err(|_| bad_coords())?;
    let end: Coord = cols[4].trim().parse().map_err(|_| bad_coords())?;
    if start < 1 || end < start {
        return Err(bad_coords());
    }

    let strand = match cols[6] {
        "+" => Strand::Plus,
        "-" => Strand::Minus,
        "." | "?" => Strand::Unknown,
        _ => return Err(malformed("strand must be one of + - . ?")),
    };

    let (dialect, attrs) = parse_attributes(cols[8]);

    Ok(AnnotationRecord {
        line_no,
        seqname: cols[0].to_string(),
        source: cols[1].to_string(),
        feature_type: cols[2].to_string(),
        start,
        end,
        strand,
        attrs,
        dialect,
    })
}

/// Parse the attributes column for either GFF3 or GTF.
///
/// If it contains '=' it is read as GFF3, else if it contains quotes as GTF,
/// else best-effort.
pub fn parse_attributes(s: &str) -> (Dialect, HashMap<String, String>) {
    let s = s.trim();

    let dialect = if s.contains('=') {
        Dialect::Gff3
    } else if s.contains('"') {
        Dialect::Gtf
    } else {
        Dialect::Unknown
    };

    let mut map = HashMap::new();
    for part in s.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let split = match dialect {
            Dialect::Gff3 => part.split_once('='),
            Dialect::Gtf => part.split_once(char::is_whitespace),
            Dialect::Unknown => part
                .split_once('=')
                .or_else(|| part.split_once(char::is_whitespace)),
        };
        let Some((key, value)) = split else {
            continue;
        };
        let key = key.trim();
        let value = unquote(value);
        if key.is_empty() || value.is_empty() {
            continue;
        }
        // GTF repeats keys such as `tag`; the first value is kept
        map.entry(key.to_string()).or_insert(value);
    }

    (dialect, map)
}

fn unquote(v: &str) -> String {
    let v = v.trim();
    let v = v.strip_prefix('"').unwrap_or(v);
    let v = v.strip_suffix('"').unwrap_or(v);
    v.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parse_gtf_line() {
        let line = "chr1\tsrc\texon\t101\t150\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\"; exon_number \"1\";";
        let rec = parse_record_line(line, 7).unwrap();

        assert_eq!(rec.dialect, Dialect::Gtf);
        assert_eq!(rec.line_no, 7);
        assert_eq!(rec.seqname, "chr1");
        assert_eq!(rec.feature_type, "exon");
        assert_eq!((rec.start, rec.end), (101, 150));
        assert_eq!(rec.strand, Strand::Plus);

        assert_eq!(rec.attr("gene_id"), Some("G1"));
        assert_eq!(rec.attr("transcript_id"), Some("T1"));
        assert_eq!(rec.attr("exon_number"), Some("1"));
    }

    #[test]
    fn parse_gff3_line() {
        let line = "chr2\tsrc\texon\t5\t20\t.\t-\t.\tID=ex1;Parent=tx1,tx2;gene_id=G9";
        let rec = parse_record_line(line, 1).unwrap();

        assert_eq!(rec.dialect, Dialect::Gff3);
        assert_eq!((rec.start, rec.end), (5, 20));
        assert_eq!(rec.strand, Strand::Minus);
        assert_eq!(rec.attr("ID"), Some("ex1"));
        assert_eq!(rec.attr("Parent"), Some("tx1,tx2"));
    }

    #[test]
    fn unstranded_records_are_accepted_here() {
        let line = "chr1\tsrc\tgene\t1\t10\t.\t.\t.\tID=g1";
        assert_eq!(parse_record_line(line, 1).unwrap().strand, Strand::Unknown);
    }

    #[test]
    fn malformed_lines_are_rejected() {
        assert!(matches!(
            parse_record_line("chr1\tsrc\texon\t1\t2", 3),
            Err(ParseError::MalformedLine { line_no: 3, .. })
        ));
        assert!(matches!(
            parse_record_line("chr1\tsrc\texon\t20\t10\t.\t+\t.\tID=a", 4),
            Err(ParseError::BadCoordinates { line_no: 4, .. })
        ));
        assert!(matches!(
            parse_record_line("chr1\tsrc\texon\t0\t10\t.\t+\t.\tID=a", 5),
            Err(ParseError::BadCoordinates { .. })
        ));
        assert!(matches!(
            parse_record_line("chr1\tsrc\texon\t1\t10\t.\tx\t.\tID=a", 6),
            Err(ParseError::MalformedLine { .. })
        ));
    }

    #[test]
    fn repeated_gtf_keys_keep_first_value() {
        let (_, attrs) = parse_attributes("gene_id \"G1\"; tag \"basic\"; tag \"CCDS\";");
        assert_eq!(attrs.get("tag").map(String::as_str), Some("basic"));
    }

    #[test]
    fn streaming_reader_skips_comments_and_stops_at_fasta() {
        let data = "\
##gff-version 3
chr1\tsrc\tgene\t1\t20\t.\t+\t.\tID=g1

chr1\tsrc\tmRNA\t1\t20\t.\t+\t.\tID=t1;Parent=g1
##FASTA
>chr1
ACGT
";
        let recs: Vec<_> = AnnotationReader::new(Cursor::new(data.as_bytes()))
            .records()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].line_no, 2);
        assert_eq!(recs[1].line_no, 4);
        assert_eq!(recs[1].feature_type, "mRNA");
    }
}
