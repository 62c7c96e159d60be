use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RegionError;

/// Case-insensitive substring test on a feature tag.
#[inline]
pub fn tag_contains(tag: &str, needle: &str) -> bool {
    tag.to_ascii_lowercase().contains(needle)
}

#[inline]
pub fn is_gene_tag(tag: &str) -> bool {
    tag_contains(tag, "gene")
}

#[inline]
pub fn is_mrna_tag(tag: &str) -> bool {
    tag.eq_ignore_ascii_case("mrna")
}

/// Any RNA tag other than mRNA (ncRNA, snoRNA, lnc_RNA, ...).
#[inline]
pub fn is_other_rna_tag(tag: &str) -> bool {
    !is_mrna_tag(tag) && tag_contains(tag, "rna")
}

#[inline]
pub fn is_transcript_tag(tag: &str) -> bool {
    is_mrna_tag(tag) || is_other_rna_tag(tag)
}

#[inline]
pub fn is_exon_tag(tag: &str) -> bool {
    tag_contains(tag, "exon")
}

#[inline]
pub fn is_cds_tag(tag: &str) -> bool {
    let t = tag.to_ascii_lowercase();
    t.contains("cds") || t.contains("utr") || t.contains("untranslated")
}

/// The region kinds that can be derived.
///
/// `AltExon` and `CommonExon` need every transcript of a gene at once; all
/// other kinds are computed per transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegionKind {
    Tss,
    Tts,
    Exon,
    FirstExon,
    LastExon,
    AltExon,
    CommonExon,
    Intron,
    FirstIntron,
    LastIntron,
    SpliceSite,
}

impl RegionKind {
    pub const ALL: [RegionKind; 11] = [
        RegionKind::Tss,
        RegionKind::Tts,
        RegionKind::Exon,
        RegionKind::FirstExon,
        RegionKind::LastExon,
        RegionKind::AltExon,
        RegionKind::CommonExon,
        RegionKind::Intron,
        RegionKind::FirstIntron,
        RegionKind::LastIntron,
        RegionKind::SpliceSite,
    ];

    /// Short label used on the command line and in output metadata.
    pub fn label(self) -> &'static str {
        match self {
            RegionKind::Tss => "tss",
            RegionKind::Tts => "tts",
            RegionKind::Exon => "exon",
            RegionKind::FirstExon => "firstExon",
            RegionKind::LastExon => "lastExon",
            RegionKind::AltExon => "altExon",
            RegionKind::CommonExon => "commonExon",
            RegionKind::Intron => "intron",
            RegionKind::FirstIntron => "firstIntron",
            RegionKind::LastIntron => "lastIntron",
            RegionKind::SpliceSite => "splice",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            RegionKind::Tss => "transcription start site",
            RegionKind::Tts => "transcription stop site",
            RegionKind::Exon => "all exons",
            RegionKind::FirstExon => "first exon",
            RegionKind::LastExon => "last exon",
            RegionKind::AltExon => "alternate exons",
            RegionKind::CommonExon => "common exons",
            RegionKind::Intron => "all introns",
            RegionKind::FirstIntron => "first intron",
            RegionKind::LastIntron => "last intron",
            RegionKind::SpliceSite => "splice sites",
        }
    }

    #[inline]
    pub fn is_gene_level(self) -> bool {
        matches!(self, RegionKind::AltExon | RegionKind::CommonExon)
    }
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for RegionKind {
    type Err = RegionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        let kind = match key.as_str() {
            "tss" | "start" => RegionKind::Tss,
            "tts" | "stop" => RegionKind::Tts,
            "exon" | "exons" => RegionKind::Exon,
            "firstexon" => RegionKind::FirstExon,
            "lastexon" => RegionKind::LastExon,
            "altexon" | "alternateexon" | "alternateexons" => RegionKind::AltExon,
            "commonexon" | "commonexons" => RegionKind::CommonExon,
            "intron" | "introns" => RegionKind::Intron,
            "firstintron" => RegionKind::FirstIntron,
            "lastintron" => RegionKind::LastIntron,
            "splice" | "splicesite" | "splicesites" => RegionKind::SpliceSite,
            _ => return Err(RegionError::UnknownRegionKind(s.to_string())),
        };
        Ok(kind)
    }
}

/// Recognised transcript subtypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TranscriptType {
    MRna,
    /// Any RNA other than mRNA.
    NcRna,
    SnRna,
    SnoRna,
    TRna,
    RRna,
    MiRna,
    LncRna,
    MiscRna,
}

impl TranscriptType {
    pub fn label(self) -> &'static str {
        match self {
            TranscriptType::MRna => "mRNA",
            TranscriptType::NcRna => "ncRNA",
            TranscriptType::SnRna => "snRNA",
            TranscriptType::SnoRna => "snoRNA",
            TranscriptType::TRna => "tRNA",
            TranscriptType::RRna => "rRNA",
            TranscriptType::MiRna => "miRNA",
            TranscriptType::LncRna => "lncRNA",
            TranscriptType::MiscRna => "misc_RNA",
        }
    }

    /// Does a feature tag belong to this subtype?
    pub fn matches(self, tag: &str) -> bool {
        let t = tag.to_ascii_lowercase();
        match self {
            TranscriptType::MRna => t == "mrna",
            TranscriptType::NcRna => is_other_rna_tag(tag),
            TranscriptType::SnRna => t == "snrna",
            TranscriptType::SnoRna => t == "snorna",
            TranscriptType::TRna => t == "trna",
            TranscriptType::RRna => t == "rrna",
            TranscriptType::MiRna => t == "mirna",
            TranscriptType::LncRna => matches!(t.as_str(), "lncrna" | "lnc_rna" | "lincrna"),
            TranscriptType::MiscRna => t == "misc_rna",
        }
    }
}

impl FromStr for TranscriptType {
    type Err = RegionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = match s.trim().to_ascii_lowercase().as_str() {
            "mrna" => TranscriptType::MRna,
            "ncrna" | "noncoding" => TranscriptType::NcRna,
            "snrna" => TranscriptType::SnRna,
            "snorna" => TranscriptType::SnoRna,
            "trna" => TranscriptType::TRna,
            "rrna" => TranscriptType::RRna,
            "mirna" => TranscriptType::MiRna,
            "lncrna" | "lnc_rna" | "lincrna" => TranscriptType::LncRna,
            "misc_rna" | "miscrna" => TranscriptType::MiscRna,
            _ => return Err(RegionError::UnknownTranscriptType(s.to_string())),
        };
        Ok(t)
    }
}

/// Which transcript subtypes a run accepts.
///
/// Built once from configuration and then only read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptTypes {
    all: bool,
    types: Vec<TranscriptType>,
}

impl Default for TranscriptTypes {
    /// mRNA only.
    fn default() -> Self {
        Self::only(&[TranscriptType::MRna])
    }
}

impl TranscriptTypes {
    /// Accept every transcript tag.
    pub fn all() -> Self {
        Self {
            all: true,
            types: Vec::new(),
        }
    }

    pub fn only(types: &[TranscriptType]) -> Self {
        let mut v: Vec<TranscriptType> = Vec::with_capacity(types.len());
        for &t in types {
            if !v.contains(&t) {
                v.push(t);
            }
        }
        Self { all: false, types: v }
    }

    /// Parse a comma-separated request such as `mRNA,snoRNA` or `all`.
    pub fn parse(request: &str) -> Result<Self, RegionError> {
        let mut types = Vec::new();
        for part in request.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            if part.eq_ignore_ascii_case("all") {
                return Ok(Self::all());
            }
            types.push(part.parse::<TranscriptType>()?);
        }
        if types.is_empty() {
            return Err(RegionError::UnknownTranscriptType(request.to_string()));
        }
        Ok(Self::only(&types))
    }

    #[inline]
    pub fn is_all(&self) -> bool {
        self.all
    }

    /// Is the mRNA flag set (directly or through `all`)?
    pub fn wants_mrna(&self) -> bool {
        self.all || self.types.contains(&TranscriptType::MRna)
    }

    /// Fine-grained subtype gate for one transcript tag.
    pub fn accepts(&self, tag: &str) -> bool {
        if self.all {
            return is_transcript_tag(tag);
        }
        self.types.iter().any(|t| t.matches(tag))
    }

    /// Label for output metadata, e.g. `mRNA,snoRNA`.
    pub fn label(&self) -> String {
        if self.all {
            return "all".to_string();
        }
        self.types
            .iter()
            .map(|t| t.label())
            .collect::<Vec<_>>()
            .join(",")
    }
}
