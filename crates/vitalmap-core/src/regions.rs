//! Region table and weighted region sampling.
//!
//! A [`RegionTable`] is an ordered, validated list of [`Region`]s plus a
//! precomputed weighted distribution over them. Each region is drawn with
//! probability `weight_i / sum(weight)`; regions with weight zero are kept
//! in the table (they still appear in tallies) but are never drawn.

use std::collections::BTreeSet;

use rand::Rng;
use rand::distr::weighted::WeightedIndex;
use vitalmap_types::{Region, RegionId};

use crate::error::SimulatorError;

/// An ordered, immutable region table with a weighted sampler.
#[derive(Debug, Clone)]
pub struct RegionTable {
    /// Regions in construction order.
    regions: Vec<Region>,

    /// Distribution over region indices built from the weights.
    distribution: WeightedIndex<f64>,
}

impl RegionTable {
    /// Validate the regions and build the sampling distribution.
    ///
    /// # Errors
    ///
    /// - [`SimulatorError::EmptyRegionTable`] if `regions` is empty or all
    ///   weights are zero.
    /// - [`SimulatorError::Configuration`] for a negative or non-finite
    ///   weight, out-of-range coordinates, or a duplicate region id.
    pub fn new(regions: Vec<Region>) -> Result<Self, SimulatorError> {
        if regions.is_empty() {
            return Err(SimulatorError::EmptyRegionTable);
        }

        let mut seen: BTreeSet<&RegionId> = BTreeSet::new();
        for region in &regions {
            if !region.weight.is_finite() || region.weight < 0.0 {
                return Err(SimulatorError::configuration(format!(
                    "region {} has invalid weight {}",
                    region.id, region.weight
                )));
            }
            if !(-90.0..=90.0).contains(&region.lat) || !(-180.0..=180.0).contains(&region.lon) {
                return Err(SimulatorError::configuration(format!(
                    "region {} has out-of-range coordinates ({}, {})",
                    region.id, region.lat, region.lon
                )));
            }
            if !seen.insert(&region.id) {
                return Err(SimulatorError::configuration(format!(
                    "duplicate region id {}",
                    region.id
                )));
            }
        }

        if !regions.iter().any(|r| r.weight > 0.0) {
            return Err(SimulatorError::EmptyRegionTable);
        }

        let distribution = WeightedIndex::new(regions.iter().map(|r| r.weight)).map_err(|e| {
            SimulatorError::configuration(format!("cannot build region distribution: {e}"))
        })?;

        Ok(Self {
            regions,
            distribution,
        })
    }

    /// Draw one region according to the weights.
    ///
    /// Reads the table only; the randomness comes from `rng`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<&Region, SimulatorError> {
        self.sample_indexed(rng).map(|(_, region)| region)
    }

    /// Like [`sample`](Self::sample), also returning the region's position
    /// in table order.
    pub fn sample_indexed<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<(usize, &Region), SimulatorError> {
        let index = rng.sample(&self.distribution);
        self.regions
            .get(index)
            .map(|region| (index, region))
            .ok_or(SimulatorError::EmptyRegionTable)
    }

    /// Look up a region by id.
    pub fn get(&self, id: &RegionId) -> Option<&Region> {
        self.regions.iter().find(|r| &r.id == id)
    }

    /// The regions as a slice, in table order.
    pub fn as_slice(&self) -> &[Region] {
        &self.regions
    }

    /// Number of regions (including zero-weight ones).
    pub const fn len(&self) -> usize {
        self.regions.len()
    }

    /// Always `false` for a constructed table.
    pub const fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

/// The 31 provincial-level regions of mainland China, weighted by
/// population in millions.
pub fn default_regions() -> Vec<Region> {
    PROVINCES
        .iter()
        .map(|&(id, name, local_name, lat, lon, weight)| {
            Region::new(id, name, local_name, lat, lon, weight)
        })
        .collect()
}

/// `(id, name, local name, lat, lon, weight)`
const PROVINCES: [(&str, &str, &str, f64, f64, f64); 31] = [
    ("guangdong", "Guangdong", "广东", 23.1, 113.2, 126.0),
    ("shandong", "Shandong", "山东", 36.6, 117.0, 101.0),
    ("henan", "Henan", "河南", 34.7, 113.6, 98.0),
    ("sichuan", "Sichuan", "四川", 30.6, 104.0, 83.0),
    ("jiangsu", "Jiangsu", "江苏", 32.0, 118.7, 85.0),
    ("hebei", "Hebei", "河北", 38.0, 114.5, 74.0),
    ("hunan", "Hunan", "湖南", 28.2, 112.9, 66.0),
    ("zhejiang", "Zhejiang", "浙江", 30.2, 120.1, 65.0),
    ("anhui", "Anhui", "安徽", 31.8, 117.2, 61.0),
    ("hubei", "Hubei", "湖北", 30.5, 114.3, 58.0),
    ("guangxi", "Guangxi", "广西", 22.8, 108.3, 50.0),
    ("yunnan", "Yunnan", "云南", 25.0, 102.7, 47.0),
    ("jiangxi", "Jiangxi", "江西", 28.6, 115.9, 45.0),
    ("liaoning", "Liaoning", "辽宁", 41.8, 123.4, 42.0),
    ("fujian", "Fujian", "福建", 26.0, 119.2, 41.0),
    ("shaanxi", "Shaanxi", "陕西", 34.2, 108.9, 39.0),
    ("heilongjiang", "Heilongjiang", "黑龙江", 45.7, 126.6, 31.0),
    ("shanxi", "Shanxi", "山西", 37.8, 112.5, 34.0),
    ("guizhou", "Guizhou", "贵州", 26.6, 106.6, 38.0),
    ("chongqing", "Chongqing", "重庆", 29.5, 106.5, 32.0),
    ("jilin", "Jilin", "吉林", 43.8, 125.3, 23.0),
    ("gansu", "Gansu", "甘肃", 36.0, 103.8, 24.0),
    ("inner_mongolia", "Inner Mongolia", "内蒙古", 40.8, 111.7, 24.0),
    ("xinjiang", "Xinjiang", "新疆", 43.8, 87.6, 25.0),
    ("shanghai", "Shanghai", "上海", 31.2, 121.4, 24.0),
    ("beijing", "Beijing", "北京", 39.9, 116.4, 21.0),
    ("tianjin", "Tianjin", "天津", 39.0, 117.2, 13.0),
    ("hainan", "Hainan", "海南", 20.0, 110.3, 10.0),
    ("ningxia", "Ningxia", "宁夏", 38.4, 106.2, 7.0),
    ("qinghai", "Qinghai", "青海", 36.6, 101.7, 5.0),
    ("tibet", "Tibet", "西藏", 29.6, 91.1, 3.0),
];

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::cast_precision_loss)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn region(id: &str, weight: f64) -> Region {
        Region::new(id, id.to_uppercase(), "", 30.0, 110.0, weight)
    }

    #[test]
    fn empirical_frequencies_match_weights() {
        let table = RegionTable::new(vec![
            region("a", 1.0),
            region("b", 2.0),
            region("c", 7.0),
        ])
        .unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        let draws = 20_000_u32;
        let mut counts = [0_u32; 3];
        for _ in 0..draws {
            let (idx, _) = table.sample_indexed(&mut rng).unwrap();
            counts[idx] += 1;
        }

        let weights = [0.1, 0.2, 0.7];
        let chi_square: f64 = counts
            .iter()
            .zip(weights)
            .map(|(&observed, p)| {
                let expected = f64::from(draws) * p;
                let diff = f64::from(observed) - expected;
                diff * diff / expected
            })
            .sum();

        // Critical value for 2 degrees of freedom at p = 0.001.
        assert!(chi_square < 13.816, "chi-square {chi_square} too large: {counts:?}");
    }

    #[test]
    fn zero_weight_region_is_never_drawn() {
        let table = RegionTable::new(vec![region("a", 1.0), region("b", 0.0)]).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..5_000 {
            assert_eq!(table.sample(&mut rng).unwrap().id.as_str(), "a");
        }
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn empty_or_all_zero_table_is_rejected() {
        assert_eq!(
            RegionTable::new(Vec::new()).unwrap_err(),
            SimulatorError::EmptyRegionTable
        );
        assert_eq!(
            RegionTable::new(vec![region("a", 0.0), region("b", 0.0)]).unwrap_err(),
            SimulatorError::EmptyRegionTable
        );
    }

    #[test]
    fn invalid_weights_and_duplicates_are_rejected() {
        for bad in [-1.0, f64::NAN, f64::INFINITY] {
            let err = RegionTable::new(vec![region("a", 1.0), region("b", bad)]).unwrap_err();
            assert!(matches!(err, SimulatorError::Configuration { .. }));
        }

        let err = RegionTable::new(vec![region("a", 1.0), region("a", 2.0)]).unwrap_err();
        assert!(matches!(err, SimulatorError::Configuration { .. }));

        let mut off_map = region("a", 1.0);
        off_map.lat = 123.0;
        let err = RegionTable::new(vec![off_map]).unwrap_err();
        assert!(matches!(err, SimulatorError::Configuration { .. }));
    }

    #[test]
    fn default_regions_form_a_valid_table() {
        let table = RegionTable::new(default_regions()).unwrap();
        assert_eq!(table.len(), 31);

        let first = table.as_slice().first().unwrap();
        assert_eq!(first.name, "Guangdong");
        assert_eq!(first.local_name, "广东");

        let tibet = table.get(&RegionId::from("tibet")).unwrap();
        assert!((tibet.weight - 3.0).abs() < f64::EPSILON);
        assert!(table.get(&RegionId::from("atlantis")).is_none());
    }
}
