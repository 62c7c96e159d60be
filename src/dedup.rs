use std::collections::BTreeSet;

use crate::types::{Coord, Region};

/// Drop regions whose start falls near an earlier region's start.
///
/// Regions are scanned in order. Each survivor claims every position in
/// `[start - slop, start + slop]`; a later region is dropped if any position of
/// its own window is already claimed, even when its start lies outside the
/// earlier region's window. Greedy and order dependent: the first region wins.
///
/// Two windows of half-width `slop` touch exactly when their starts are at
/// most `2 * slop` apart, so only survivor starts are kept.
pub fn dedup_regions(regions: Vec<Region>, slop: u32) -> Vec<Region> {
    let reach = 2 * Coord::from(slop);
    let mut claimed: BTreeSet<Coord> = BTreeSet::new();

    regions
        .into_iter()
        .filter(|r| {
            let lo = r.start.saturating_sub(reach);
            let hi = r.start.saturating_add(reach);
            if claimed.range(lo..=hi).next().is_some() {
                return false;
            }
            claimed.insert(r.start);
            true
        })
        .collect()
}
