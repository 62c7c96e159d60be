use crate::error::{RegionError, Result};
use crate::types::{Coord, Strand};
use serde::{Deserialize, Serialize};

/// Read-only view of an annotation feature.
///
/// Anything that can hand out these attributes (a parsed GFF3 tree, a
/// database row with lazily loaded children, ...) can be walked for regions.
/// Coordinates are 1-based inclusive with `start <= end` on either strand.
pub trait Feature {
    fn id(&self) -> &str;

    /// Display name, if the source carries one.
    fn name(&self) -> Option<&str>;

    fn seq_id(&self) -> &str;

    fn start(&self) -> Coord;

    fn end(&self) -> Coord;

    fn strand(&self) -> Strand;

    /// Feature type, e.g. `gene`, `mRNA`, `exon`. Compared case-insensitively.
    fn primary_tag(&self) -> &str;

    fn children(&self) -> &[Self]
    where
        Self: Sized;

    /// Name if present, else the id.
    fn display_name(&self) -> &str {
        self.name().unwrap_or_else(|| self.id())
    }

    /// Strand, or an error if direction-dependent arithmetic is impossible.
    fn require_strand(&self) -> Result<Strand> {
        match self.strand() {
            Strand::Unknown => Err(RegionError::UnstrandedFeature {
                id: self.id().to_string(),
            }),
            s => Ok(s),
        }
    }
}

/// Owned feature tree node, as produced by the annotation builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureNode {
    pub id: String,
    pub name: Option<String>,
    pub seq_id: String,
    pub start: Coord,
    pub end: Coord,
    pub strand: Strand,
    pub primary_tag: String,
    pub children: Vec<FeatureNode>,
}

impl FeatureNode {
    pub fn new(
        id: impl Into<String>,
        primary_tag: impl Into<String>,
        seq_id: impl Into<String>,
        start: Coord,
        end: Coord,
        strand: Strand,
    ) -> Self {
        Self {
            id: id.into(),
            name: None,
            seq_id: seq_id.into(),
            start,
            end,
            strand,
            primary_tag: primary_tag.into(),
            children: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        let name = name.trim();
        if !name.is_empty() {
            self.name = Some(name.to_string());
        }
        self
    }

    pub fn with_children(mut self, children: Vec<FeatureNode>) -> Self {
        self.children = children;
        self
    }

    pub fn add_child(&mut self, child: FeatureNode) {
        self.children.push(child);
    }

    /// Grow this feature's span so it covers all of its children.
    pub fn extend_to_children(&mut self) {
        for c in &self.children {
            self.start = self.start.min(c.start);
            self.end = self.end.max(c.end);
        }
    }
}

impl Feature for FeatureNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn seq_id(&self) -> &str {
        &self.seq_id
    }

    fn start(&self) -> Coord {
        self.start
    }

    fn end(&self) -> Coord {
        self.end
    }

    fn strand(&self) -> Strand {
        self.strand
    }

    fn primary_tag(&self) -> &str {
        &self.primary_tag
    }

    fn children(&self) -> &[Self] {
        &self.children
    }
}
