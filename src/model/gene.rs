use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::feature::Feature;
use crate::model::transcript::ordered_children;
use crate::model::types::{is_mrna_tag, is_other_rna_tag, TranscriptTypes};
use crate::types::{Coord, Region};

/// Transcript selection policy for one run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TranscriptSelection {
    pub types: TranscriptTypes,
    /// Allow mRNA and non-coding transcripts of the same gene together.
    pub mix_biotypes: bool,
}

impl TranscriptSelection {
    pub fn new(types: TranscriptTypes, mix_biotypes: bool) -> Self {
        Self { types, mix_biotypes }
    }

    /// Coarse biotype pre-filter over a gene's children.
    ///
    /// Splits children into mRNA and other-RNA groups; when both exist the
    /// union is used only if mixing is allowed, otherwise the mRNA group wins
    /// if mRNA was requested. Children that are neither are dropped.
    pub fn select<'a, F: Feature>(&self, gene: &'a F) -> Vec<&'a F> {
        let has_mrna = gene.children().iter().any(|c| is_mrna_tag(c.primary_tag()));
        let has_other = gene
            .children()
            .iter()
            .any(|c| is_other_rna_tag(c.primary_tag()));

        let keep: fn(&str) -> bool = match (has_mrna, has_other) {
            (true, true) if self.mix_biotypes => |t: &str| is_mrna_tag(t) || is_other_rna_tag(t),
            (true, true) if self.types.wants_mrna() => is_mrna_tag,
            (true, true) => is_other_rna_tag,
            (true, false) => is_mrna_tag,
            (false, true) => is_other_rna_tag,
            (false, false) => return Vec::new(),
        };

        gene.children()
            .iter()
            .filter(|c| keep(c.primary_tag()))
            .collect()
    }

    /// Selected transcripts that also pass the subtype gate.
    pub fn participants<'a, F: Feature>(&self, gene: &'a F) -> Vec<&'a F> {
        self.select(gene)
            .into_iter()
            .filter(|t| {
                let ok = self.types.accepts(t.primary_tag());
                if !ok {
                    debug!(
                        "skipping {} '{}' of gene '{}': type not requested",
                        t.primary_tag(),
                        t.display_name(),
                        gene.display_name()
                    );
                }
                ok
            })
            .collect()
    }
}

/// Which side of the alternate/common split to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExonSharing {
    /// Present in some, but not all, transcripts.
    Alternate,
    /// Present in every transcript.
    Common,
}

impl ExonSharing {
    /// Keep a group seen in `k` of `n` transcripts?
    #[inline]
    pub fn keeps(self, k: usize, n: usize) -> bool {
        match self {
            ExonSharing::Alternate => k < n,
            ExonSharing::Common => k == n,
        }
    }
}

/// One child occurrence: (transcript index, transcript name, child name).
type Occurrence = (usize, String, Option<String>);

/// Alternate or common exons across a gene's participating transcripts.
///
/// Exons are grouped by identical `(start, end)`; no tolerance. Groups are
/// reported in ascending coordinate order, each with one region per
/// contributing transcript/child pair. Fewer than two transcripts yields no
/// regions.
pub fn shared_exons<F: Feature>(transcripts: &[&F], sharing: ExonSharing) -> Result<Vec<Region>> {
    let n = transcripts.len();
    if n < 2 {
        return Ok(Vec::new());
    }

    let mut groups: BTreeMap<(Coord, Coord), Vec<Occurrence>> = BTreeMap::new();
    for (tx_idx, tx) in transcripts.iter().enumerate() {
        let Some(children) = ordered_children(*tx)? else {
            debug!("transcript '{}' has no exons to compare", tx.display_name());
            continue;
        };
        for c in children {
            groups
                .entry((c.start(), c.end()))
                .or_default()
                .push((tx_idx, tx.display_name().to_string(), c.name().map(str::to_string)));
        }
    }

    let mut out = Vec::new();
    for ((start, end), occurrences) in groups {
        let mut contributors: Vec<usize> = occurrences.iter().map(|o| o.0).collect();
        contributors.sort_unstable();
        contributors.dedup();
        if !sharing.keeps(contributors.len(), n) {
            continue;
        }

        let mut occurrences = occurrences;
        occurrences.sort_by_key(|o| o.0);
        for (tx_idx, tx_name, child_name) in occurrences {
            let tx = transcripts[tx_idx];
            let region_name = child_name.unwrap_or_else(|| format!("{tx_name}.{start}"));
            out.push(Region::new(
                tx_name,
                region_name,
                tx.seq_id(),
                start,
                end,
                tx.strand(),
            ));
        }
    }
    Ok(out)
}
