use std::fmt;

use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::dedup::dedup_regions;
use crate::error::Result;
use crate::model::feature::Feature;
use crate::model::gene::{shared_exons, ExonSharing, TranscriptSelection};
use crate::model::transcript::extract;
use crate::model::types::{is_gene_tag, is_transcript_tag, RegionKind, TranscriptTypes};
use crate::types::{Adjustment, Region};

/// Everything that shapes one run of region collection.
///
/// Built once, then only read; shared by reference across worker threads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionConfig {
    pub kind: RegionKind,
    pub selection: TranscriptSelection,
    pub adjustment: Adjustment,
    /// Prune near-duplicate regions within each gene.
    pub unique: bool,
    /// Tolerance (bp) used when `unique` is set.
    pub slop: u32,
}

impl RegionConfig {
    /// mRNA transcripts, no adjustment, no uniqueness filter.
    pub fn new(kind: RegionKind) -> Self {
        Self {
            kind,
            selection: TranscriptSelection::default(),
            adjustment: Adjustment::default(),
            unique: false,
            slop: 0,
        }
    }

    pub fn transcript_types(mut self, types: TranscriptTypes) -> Self {
        self.selection.types = types;
        self
    }

    pub fn mix_biotypes(mut self, mix: bool) -> Self {
        self.selection.mix_biotypes = mix;
        self
    }

    pub fn adjust(mut self, start: i64, stop: i64) -> Self {
        self.adjustment = Adjustment::new(start, stop);
        self
    }

    pub fn unique(mut self, slop: u32) -> Self {
        self.unique = true;
        self.slop = slop;
        self
    }

    pub fn summary(&self) -> RegionSummary {
        RegionSummary {
            kind: self.kind,
            transcript_types: self.selection.types.label(),
            adjustment: (!self.adjustment.is_noop()).then_some(self.adjustment),
            unique: self.unique,
            slop: self.slop,
        }
    }
}

/// Metadata describing how a set of regions was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionSummary {
    pub kind: RegionKind,
    pub transcript_types: String,
    pub adjustment: Option<Adjustment>,
    pub unique: bool,
    pub slop: u32,
}

impl RegionSummary {
    /// `(key, value)` pairs, in a stable order, for table headers.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let mut out = vec![
            ("region", self.kind.label().to_string()),
            ("description", self.kind.description().to_string()),
            ("transcript_types", self.transcript_types.clone()),
        ];
        if let Some(adj) = self.adjustment {
            out.push(("start_adjust", adj.start.to_string()));
            out.push(("stop_adjust", adj.stop.to_string()));
        }
        if self.unique {
            out.push(("unique", "true".to_string()));
            out.push(("slop", self.slop.to_string()));
        }
        out
    }
}

impl fmt::Display for RegionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, v) in self.entries() {
            writeln!(f, "{k}={v}")?;
        }
        Ok(())
    }
}

/// Walks genes and transcripts and collects their regions.
#[derive(Debug, Clone)]
pub struct RegionWalker {
    config: RegionConfig,
}

impl RegionWalker {
    pub fn new(config: RegionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RegionConfig {
        &self.config
    }

    /// Regions of one top-level feature: a gene or a bare transcript.
    ///
    /// Anything else (a lone exon, a repeat, ...) yields nothing.
    pub fn collect_feature<F: Feature>(&self, feature: &F) -> Result<Vec<Region>> {
        let tag = feature.primary_tag();
        if is_gene_tag(tag) {
            self.collect_gene(feature)
        } else if is_transcript_tag(tag) {
            self.collect_transcript(feature)
        } else {
            debug!("ignoring top-level {} '{}'", tag, feature.display_name());
            Ok(Vec::new())
        }
    }

    /// Regions of a transcript with no gene parent.
    pub fn collect_transcript<F: Feature>(&self, transcript: &F) -> Result<Vec<Region>> {
        if !self.config.selection.types.accepts(transcript.primary_tag()) {
            debug!(
                "skipping {} '{}': type not requested",
                transcript.primary_tag(),
                transcript.display_name()
            );
            return Ok(Vec::new());
        }
        let mut regions = extract(self.config.kind, transcript)?;
        self.apply_adjustment(&mut regions);
        Ok(regions)
    }

    /// Regions of all participating transcripts of a gene, tagged with the
    /// gene's name and optionally deduplicated.
    pub fn collect_gene<F: Feature>(&self, gene: &F) -> Result<Vec<Region>> {
        let transcripts = self.config.selection.participants(gene);
        if transcripts.is_empty() {
            debug!("gene '{}' has no requested transcripts", gene.display_name());
            return Ok(Vec::new());
        }

        let mut regions = match self.config.kind {
            RegionKind::AltExon => shared_exons(&transcripts, ExonSharing::Alternate)?,
            RegionKind::CommonExon => shared_exons(&transcripts, ExonSharing::Common)?,
            kind => {
                let mut all = Vec::new();
                for tx in &transcripts {
                    all.extend(extract(kind, *tx)?);
                }
                all
            }
        };
        self.apply_adjustment(&mut regions);

        if self.config.unique && transcripts.len() > 1 {
            let before = regions.len();
            regions = dedup_regions(regions, self.config.slop);
            if regions.len() < before {
                debug!(
                    "gene '{}': {} duplicate regions removed",
                    gene.display_name(),
                    before - regions.len()
                );
            }
        }

        let parent = gene.display_name();
        for r in &mut regions {
            r.parent_name = Some(parent.to_string());
        }
        Ok(regions)
    }

    /// Regions of many top-level features, processed in parallel.
    ///
    /// Output order follows input order. The first error aborts the run.
    pub fn collect_all<F: Feature + Sync>(&self, features: &[F]) -> Result<Vec<Region>> {
        let per_feature: Vec<Vec<Region>> = features
            .par_iter()
            .map(|f| self.collect_feature(f))
            .collect::<Result<_>>()?;

        let regions: Vec<Region> = per_feature.into_iter().flatten().collect();
        info!(
            "collected {} {} regions from {} features",
            regions.len(),
            self.config.kind.description(),
            features.len()
        );
        Ok(regions)
    }

    fn apply_adjustment(&self, regions: &mut [Region]) {
        let adj = self.config.adjustment;
        if adj.is_noop() {
            return;
        }
        for r in regions {
            r.adjust(adj);
        }
    }
}
