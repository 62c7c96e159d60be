//! Per-transcript region extraction.
//!
//! Every extractor works on the transcript's children ordered 5'->3' by
//! [`ordered_children`], so "first" and "last" never need a strand check.

use crate::error::Result;
use crate::model::feature::Feature;
use crate::model::types::{is_cds_tag, is_exon_tag, RegionKind};
use crate::types::{Coord, Region, Strand};

/// Exon children of a transcript in 5'->3' order.
///
/// Falls back to CDS/UTR children when the transcript has no exons. Returns
/// `Ok(None)` when neither is present; a transcript without a strand is an
/// error.
pub fn ordered_children<F: Feature>(transcript: &F) -> Result<Option<Vec<&F>>> {
    let strand = transcript.require_strand()?;

    let mut exons: Vec<&F> = Vec::new();
    let mut cds: Vec<&F> = Vec::new();
    for child in transcript.children() {
        let tag = child.primary_tag();
        if is_exon_tag(tag) {
            exons.push(child);
        } else if is_cds_tag(tag) {
            cds.push(child);
        }
    }

    let mut list = if !exons.is_empty() {
        exons
    } else if !cds.is_empty() {
        cds
    } else {
        return Ok(None);
    };

    // stable sorts: ties keep annotation order
    match strand {
        Strand::Minus => list.sort_by(|a, b| b.end().cmp(&a.end())),
        _ => list.sort_by_key(|c| c.start()),
    }

    Ok(Some(list))
}

/// Run the extractor for a per-transcript region kind.
///
/// Gene-level kinds (alternate/common exons) produce nothing for a lone
/// transcript.
pub fn extract<F: Feature>(kind: RegionKind, transcript: &F) -> Result<Vec<Region>> {
    match kind {
        RegionKind::Tss => tss(transcript).map(|r| vec![r]),
        RegionKind::Tts => tts(transcript).map(|r| vec![r]),
        RegionKind::Exon => exons(transcript),
        RegionKind::FirstExon => first_exon(transcript).map(Vec::from_iter),
        RegionKind::LastExon => last_exon(transcript).map(Vec::from_iter),
        RegionKind::Intron => introns(transcript),
        RegionKind::FirstIntron => {
            introns(transcript).map(|v| v.into_iter().next().into_iter().collect())
        }
        RegionKind::LastIntron => {
            introns(transcript).map(|v| v.into_iter().next_back().into_iter().collect())
        }
        RegionKind::SpliceSite => splice_sites(transcript),
        RegionKind::AltExon | RegionKind::CommonExon => {
            // still reject unstranded input consistently
            transcript.require_strand()?;
            Ok(Vec::new())
        }
    }
}

fn point<F: Feature>(transcript: &F, suffix: &str, pos: Coord, strand: Strand) -> Region {
    let name = transcript.display_name();
    Region::new(
        name,
        format!("{name}_{suffix}"),
        transcript.seq_id(),
        pos,
        pos,
        strand,
    )
}

/// Single base at the 5' end of the transcript.
pub fn tss<F: Feature>(transcript: &F) -> Result<Region> {
    let strand = transcript.require_strand()?;
    let pos = match strand {
        Strand::Minus => transcript.end(),
        _ => transcript.start(),
    };
    Ok(point(transcript, "TSS", pos, strand))
}

/// Single base at the 3' end of the transcript.
pub fn tts<F: Feature>(transcript: &F) -> Result<Region> {
    let strand = transcript.require_strand()?;
    let pos = match strand {
        Strand::Minus => transcript.start(),
        _ => transcript.end(),
    };
    Ok(point(transcript, "TTS", pos, strand))
}

fn child_region<F: Feature>(transcript: &F, child: &F, fallback: String, strand: Strand) -> Region {
    let region_name = child.name().map(str::to_string).unwrap_or(fallback);
    Region::new(
        transcript.display_name(),
        region_name,
        transcript.seq_id(),
        child.start(),
        child.end(),
        strand,
    )
}

pub fn first_exon<F: Feature>(transcript: &F) -> Result<Option<Region>> {
    let strand = transcript.require_strand()?;
    let Some(children) = ordered_children(transcript)? else {
        return Ok(None);
    };
    let fallback = format!("{}_firstExon", transcript.display_name());
    Ok(children
        .first()
        .map(|c| child_region(transcript, c, fallback, strand)))
}

pub fn last_exon<F: Feature>(transcript: &F) -> Result<Option<Region>> {
    let strand = transcript.require_strand()?;
    let Some(children) = ordered_children(transcript)? else {
        return Ok(None);
    };
    let fallback = format!("{}_lastExon", transcript.display_name());
    Ok(children
        .last()
        .map(|c| child_region(transcript, c, fallback, strand)))
}

/// Every exon, 5'->3'.
pub fn exons<F: Feature>(transcript: &F) -> Result<Vec<Region>> {
    let strand = transcript.require_strand()?;
    let Some(children) = ordered_children(transcript)? else {
        return Ok(Vec::new());
    };
    let name = transcript.display_name();
    Ok(children
        .iter()
        .enumerate()
        .map(|(i, c)| child_region(transcript, c, format!("{name}_exon{i}"), strand))
        .collect())
}

/// Gaps between consecutive exons, 5'->3'.
pub fn introns<F: Feature>(transcript: &F) -> Result<Vec<Region>> {
    let strand = transcript.require_strand()?;
    let Some(children) = ordered_children(transcript)? else {
        return Ok(Vec::new());
    };
    let name = transcript.display_name();

    let mut out = Vec::with_capacity(children.len().saturating_sub(1));
    for (i, pair) in children.windows(2).enumerate() {
        let (upstream, downstream) = (pair[0], pair[1]);
        let (start, stop) = match strand {
            Strand::Minus => (downstream.end() + 1, upstream.start() - 1),
            _ => (upstream.end() + 1, downstream.start() - 1),
        };
        out.push(Region::new(
            name,
            format!("{name}.intron{i}"),
            transcript.seq_id(),
            start,
            stop,
            strand,
        ));
    }
    Ok(out)
}

/// Single-base markers just outside each exon on its intron side(s).
///
/// The 5'-most exon only has a 3' marker and the 3'-most exon only a 5'
/// marker, so `e` exons give `2e - 2` markers.
pub fn splice_sites<F: Feature>(transcript: &F) -> Result<Vec<Region>> {
    let strand = transcript.require_strand()?;
    let Some(children) = ordered_children(transcript)? else {
        return Ok(Vec::new());
    };
    if children.len() < 2 {
        return Ok(Vec::new());
    }
    let name = transcript.display_name();
    let last = children.len() - 1;

    let mut out = Vec::with_capacity(2 * last);
    for (i, exon) in children.iter().enumerate() {
        let exon_name = exon
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{name}_exon{i}"));
        let (five_prime, three_prime) = match strand {
            Strand::Minus => (exon.end() + 1, exon.start() - 1),
            _ => (exon.start() - 1, exon.end() + 1),
        };
        if i > 0 {
            out.push(Region::new(
                name,
                format!("{exon_name}_5ss"),
                transcript.seq_id(),
                five_prime,
                five_prime,
                strand,
            ));
        }
        if i < last {
            out.push(Region::new(
                name,
                format!("{exon_name}_3ss"),
                transcript.seq_id(),
                three_prime,
                three_prime,
                strand,
            ));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegionError;
    use crate::model::feature::FeatureNode;

    // ---------- helpers ----------

    fn tx(strand: Strand, exons: &[(Coord, Coord)]) -> FeatureNode {
        let start = exons.iter().map(|e| e.0).min().unwrap_or(1);
        let end = exons.iter().map(|e| e.1).max().unwrap_or(1);
        let children = exons
            .iter()
            .enumerate()
            .map(|(i, &(s, e))| {
                FeatureNode::new(format!("T.e{i}"), "exon", "chr1", s, e, strand)
                    .with_name(format!("T.e{i}"))
            })
            .collect();
        FeatureNode::new("T", "mRNA", "chr1", start, end, strand).with_children(children)
    }

    fn spans(regions: &[Region]) -> Vec<(Coord, Coord)> {
        regions.iter().map(|r| (r.start, r.stop)).collect()
    }

    // ---------- resolver ----------

    #[test]
    fn minus_strand_children_ordered_by_descending_end() {
        let t = tx(Strand::Minus, &[(100, 200), (300, 400)]);
        let kids = ordered_children(&t).unwrap().unwrap();
        assert_eq!(kids[0].start, 300);
        assert_eq!(kids[1].start, 100);
    }

    #[test]
    fn plus_strand_children_ordered_by_ascending_start() {
        let t = tx(Strand::Plus, &[(500, 600), (100, 200), (300, 400)]);
        let kids = ordered_children(&t).unwrap().unwrap();
        let starts: Vec<_> = kids.iter().map(|c| c.start).collect();
        assert_eq!(starts, vec![100, 300, 500]);
    }

    #[test]
    fn five_prime_child_matches_extreme_coordinate() {
        let plus = tx(Strand::Plus, &[(500, 600), (120, 200), (300, 400)]);
        let kids = ordered_children(&plus).unwrap().unwrap();
        assert_eq!(kids[0].start, 120);

        let minus = tx(Strand::Minus, &[(120, 200), (500, 650), (300, 400)]);
        let kids = ordered_children(&minus).unwrap().unwrap();
        assert_eq!(kids[0].end, 650);
    }

    #[test]
    fn cds_used_when_no_exons() {
        let t = FeatureNode::new("T", "mRNA", "chr1", 100, 400, Strand::Plus).with_children(vec![
            FeatureNode::new("u", "three_prime_UTR", "chr1", 350, 400, Strand::Plus),
            FeatureNode::new("c", "CDS", "chr1", 100, 349, Strand::Plus),
            FeatureNode::new("x", "stop_codon", "chr1", 347, 349, Strand::Plus),
        ]);
        let kids = ordered_children(&t).unwrap().unwrap();
        let ids: Vec<_> = kids.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "u"]);
    }

    #[test]
    fn exons_preferred_over_cds() {
        let t = FeatureNode::new("T", "mRNA", "chr1", 100, 400, Strand::Plus).with_children(vec![
            FeatureNode::new("c", "CDS", "chr1", 150, 349, Strand::Plus),
            FeatureNode::new("e", "exon", "chr1", 100, 400, Strand::Plus),
        ]);
        let kids = ordered_children(&t).unwrap().unwrap();
        assert_eq!(kids.len(), 1);
        assert_eq!(kids[0].id, "e");
    }

    #[test]
    fn no_exon_like_children_is_none() {
        let t = FeatureNode::new("T", "mRNA", "chr1", 100, 400, Strand::Plus);
        assert!(ordered_children(&t).unwrap().is_none());
        assert!(exons(&t).unwrap().is_empty());
        assert!(introns(&t).unwrap().is_empty());
        assert!(splice_sites(&t).unwrap().is_empty());
        assert!(first_exon(&t).unwrap().is_none());
    }

    #[test]
    fn unstranded_transcript_is_fatal() {
        let t = tx(Strand::Unknown, &[(100, 200)]);
        for kind in RegionKind::ALL {
            let err = extract(kind, &t).unwrap_err();
            assert!(matches!(err, RegionError::UnstrandedFeature { .. }));
        }
    }

    // ---------- extractors ----------

    #[test]
    fn tss_and_tts_follow_strand() {
        let minus = tx(Strand::Minus, &[(100, 200), (300, 400)]);
        let r = tss(&minus).unwrap();
        assert_eq!((r.start, r.stop, r.strand), (400, 400, Strand::Minus));
        assert_eq!(r.region_name, "T_TSS");
        let r = tts(&minus).unwrap();
        assert_eq!((r.start, r.stop), (100, 100));

        let plus = tx(Strand::Plus, &[(100, 200), (300, 400)]);
        assert_eq!(tss(&plus).unwrap().start, 100);
        assert_eq!(tts(&plus).unwrap().start, 400);
        assert_eq!(tts(&plus).unwrap().region_name, "T_TTS");
    }

    #[test]
    fn first_and_last_exon_use_child_names() {
        let t = tx(Strand::Minus, &[(100, 200), (300, 400)]);
        let first = first_exon(&t).unwrap().unwrap();
        assert_eq!((first.start, first.stop), (300, 400));
        assert_eq!(first.region_name, "T.e1");
        let last = last_exon(&t).unwrap().unwrap();
        assert_eq!((last.start, last.stop), (100, 200));
    }

    #[test]
    fn unnamed_children_get_derived_names() {
        let t = FeatureNode::new("T", "mRNA", "chr1", 100, 400, Strand::Plus).with_children(vec![
            FeatureNode::new("", "exon", "chr1", 300, 400, Strand::Plus),
            FeatureNode::new("", "exon", "chr1", 100, 200, Strand::Plus),
        ]);
        // FeatureNode ids are not names; only `name` is used for regions
        let names: Vec<_> = exons(&t).unwrap().into_iter().map(|r| r.region_name).collect();
        assert_eq!(names, vec!["T_exon0", "T_exon1"]);
        assert_eq!(first_exon(&t).unwrap().unwrap().region_name, "T_firstExon");
        assert_eq!(last_exon(&t).unwrap().unwrap().region_name, "T_lastExon");
    }

    #[test]
    fn introns_on_minus_strand() {
        let t = tx(Strand::Minus, &[(100, 200), (300, 400)]);
        let introns = introns(&t).unwrap();
        assert_eq!(spans(&introns), vec![(201, 299)]);
        assert_eq!(introns[0].region_name, "T.intron0");
    }

    #[test]
    fn intron_count_is_exon_count_minus_one() {
        for strand in [Strand::Plus, Strand::Minus] {
            let t = tx(strand, &[(100, 200), (300, 400), (500, 600), (700, 800)]);
            let e = exons(&t).unwrap().len();
            assert_eq!(introns(&t).unwrap().len(), e - 1);
        }
    }

    #[test]
    fn first_and_last_intron() {
        let t = tx(Strand::Plus, &[(100, 200), (300, 400), (500, 600)]);
        let first = extract(RegionKind::FirstIntron, &t).unwrap();
        let last = extract(RegionKind::LastIntron, &t).unwrap();
        assert_eq!(spans(&first), vec![(201, 299)]);
        assert_eq!(spans(&last), vec![(401, 499)]);

        let single = tx(Strand::Plus, &[(100, 200)]);
        assert!(extract(RegionKind::FirstIntron, &single).unwrap().is_empty());
    }

    #[test]
    fn splice_sites_plus_strand() {
        let t = tx(Strand::Plus, &[(100, 200), (300, 400), (500, 600)]);
        let sites = splice_sites(&t).unwrap();
        assert_eq!(sites.len(), 4);
        assert_eq!(
            spans(&sites),
            vec![(201, 201), (299, 299), (401, 401), (499, 499)]
        );
        let names: Vec<_> = sites.iter().map(|r| r.region_name.as_str()).collect();
        assert_eq!(names, vec!["T.e0_3ss", "T.e1_5ss", "T.e1_3ss", "T.e2_5ss"]);
    }

    #[test]
    fn splice_sites_minus_strand_are_mirrored() {
        let t = tx(Strand::Minus, &[(100, 200), (300, 400)]);
        let sites = splice_sites(&t).unwrap();
        // 5'-most exon [300,400] gives its 3' marker below it
        assert_eq!(spans(&sites), vec![(299, 299), (201, 201)]);
        assert_eq!(sites[0].region_name, "T.e1_3ss");
        assert_eq!(sites[1].region_name, "T.e0_5ss");
    }

    #[test]
    fn splice_sites_of_unnamed_exons_use_five_prime_index() {
        let t = FeatureNode::new("T", "mRNA", "chr1", 100, 400, Strand::Minus).with_children(vec![
            FeatureNode::new("a", "exon", "chr1", 100, 200, Strand::Minus),
            FeatureNode::new("b", "exon", "chr1", 300, 400, Strand::Minus),
        ]);
        let sites = splice_sites(&t).unwrap();
        assert_eq!(spans(&sites), vec![(299, 299), (201, 201)]);
        let names: Vec<_> = sites.iter().map(|r| r.region_name.as_str()).collect();
        assert_eq!(names, vec!["T_exon0_3ss", "T_exon1_5ss"]);
    }

    #[test]
    fn splice_site_count_is_two_e_minus_two() {
        for n in 1..6 {
            let exons: Vec<(Coord, Coord)> = (0..n).map(|i| (i * 1000 + 1, i * 1000 + 500)).collect();
            let t = tx(Strand::Minus, &exons);
            let expected = if n >= 2 { 2 * n as usize - 2 } else { 0 };
            assert_eq!(splice_sites(&t).unwrap().len(), expected);
        }
    }

    #[test]
    fn gene_level_kinds_produce_nothing_per_transcript() {
        let t = tx(Strand::Plus, &[(100, 200), (300, 400)]);
        assert!(extract(RegionKind::AltExon, &t).unwrap().is_empty());
        assert!(extract(RegionKind::CommonExon, &t).unwrap().is_empty());
    }
}
