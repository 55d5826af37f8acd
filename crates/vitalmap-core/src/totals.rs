//! Running counters per category and per region.
//!
//! Counters only ever go up and saturate at `u64::MAX`. They are reset
//! only by building a new simulator.

use std::collections::BTreeMap;

use vitalmap_types::{Category, Region, RegionTally};

/// Session totals per category, plus a per-region split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningTotals {
    /// Count per configured category.
    by_category: BTreeMap<Category, u64>,

    /// Count per category for each region, parallel to the region table.
    by_region: Vec<BTreeMap<Category, u64>>,
}

impl RunningTotals {
    /// Zeroed totals for the given categories over `region_count` regions.
    pub fn new(categories: impl IntoIterator<Item = Category>, region_count: usize) -> Self {
        Self {
            by_category: categories.into_iter().map(|c| (c, 0)).collect(),
            by_region: vec![BTreeMap::new(); region_count],
        }
    }

    /// Count one event of `category` in the region at `region_index`.
    ///
    /// Returns `false` (and counts nothing) if the region index is unknown.
    #[must_use]
    pub fn record(&mut self, category: Category, region_index: usize) -> bool {
        let Some(region) = self.by_region.get_mut(region_index) else {
            return false;
        };
        let region_count = region.entry(category).or_insert(0);
        *region_count = region_count.saturating_add(1);
        let total = self.by_category.entry(category).or_insert(0);
        *total = total.saturating_add(1);
        true
    }

    /// Session total for one category.
    pub fn get(&self, category: Category) -> u64 {
        self.by_category.get(&category).copied().unwrap_or(0)
    }

    /// All category totals.
    pub const fn by_category(&self) -> &BTreeMap<Category, u64> {
        &self.by_category
    }

    /// Per-region tallies in region table order.
    pub fn region_tallies(&self, regions: &[Region]) -> Vec<RegionTally> {
        regions
            .iter()
            .zip(&self.by_region)
            .map(|(region, counts)| RegionTally {
                region_id: region.id.clone(),
                name: region.name.clone(),
                local_name: region.local_name.clone(),
                counts: counts.clone(),
                total: counts.values().fold(0_u64, |acc, n| acc.saturating_add(*n)),
            })
            .collect()
    }

    /// The `limit` regions with the highest combined total.
    ///
    /// Ties keep region table order.
    pub fn leaderboard(&self, regions: &[Region], limit: usize) -> Vec<RegionTally> {
        rank_regions(self.region_tallies(regions), limit)
    }
}

/// Sort tallies by combined total, highest first, and keep the first
/// `limit`. Equal totals keep their incoming order.
pub fn rank_regions(mut tallies: Vec<RegionTally>, limit: usize) -> Vec<RegionTally> {
    // sort_by is stable.
    tallies.sort_by(|a, b| b.total.cmp(&a.total));
    tallies.truncate(limit);
    tallies
}
