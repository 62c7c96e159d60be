use serde::{Deserialize, Serialize};
use std::fmt;

/// Genomic coordinate. 1-based, inclusive on both ends.
///
/// Signed so that large negative adjustments stay representable.
pub type Coord = i64;

/// Genomic strand/orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strand {
    Plus,
    Minus,
    Unknown,
}

impl Strand {
    /// Numeric form, as written in region tables.
    pub fn as_raw(self) -> i8 {
        match self {
            Strand::Plus => 1,
            Strand::Minus => -1,
            Strand::Unknown => 0,
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_raw())
    }
}

/// Signed start/stop offsets, expressed in the 5'->3' direction of a feature.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    pub start: Coord,
    pub stop: Coord,
}

impl Adjustment {
    pub fn new(start: Coord, stop: Coord) -> Self {
        Self { start, stop }
    }

    #[inline]
    pub fn is_noop(self) -> bool {
        self.start == 0 && self.stop == 0
    }
}

/// A derived sub-region of a transcript or gene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub parent_name: Option<String>,
    pub transcript_name: String,
    pub region_name: String,
    pub seq_id: String,
    pub start: Coord,
    pub stop: Coord,
    pub strand: Strand,
}

impl Region {
    pub fn new(
        transcript_name: impl Into<String>,
        region_name: impl Into<String>,
        seq_id: impl Into<String>,
        start: Coord,
        stop: Coord,
        strand: Strand,
    ) -> Self {
        Self {
            parent_name: None,
            transcript_name: transcript_name.into(),
            region_name: region_name.into(),
            seq_id: seq_id.into(),
            start,
            stop,
            strand,
        }
    }

    /// Shift start/stop relative to the feature's own orientation.
    ///
    /// On the minus strand a positive `start` offset moves the 5' end (the
    /// genomic `stop`) downstream, i.e. towards lower coordinates. The result
    /// is not checked for `start <= stop`.
    pub fn adjust(&mut self, adj: Adjustment) {
        if adj.is_noop() {
            return;
        }
        match self.strand {
            Strand::Minus => {
                self.stop -= adj.start;
                self.start -= adj.stop;
            }
            Strand::Plus | Strand::Unknown => {
                self.start += adj.start;
                self.stop += adj.stop;
            }
        }
    }
}
