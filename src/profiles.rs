//! Historical Yield Profiles
//!
//! Two artifact shapes refine yield estimates:
//! - Season profiles (V3): "STATE_DISTRICT_SEASON" -> category -> mean/std
//! - District profiles (V1/V2): "STATE_DISTRICT" -> crop -> avg/min/max/std,
//!   in tonnes per hectare
//!
//! Profiles only refine an estimate; they never determine it on their own.

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::crops::CropCategory;
use crate::features::normalize_key;

// ============================================================================
// Season Profiles
// ============================================================================

/// Per (location, season, category) yield statistics
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct YieldProfile {
    #[serde(default = "default_yield_mean")]
    pub yield_mean: f64,
    #[serde(default = "default_yield_std")]
    pub yield_std: f64,
    #[serde(default)]
    pub avg_area: Option<f64>,
    #[serde(default)]
    pub record_count: usize,
}

fn default_yield_mean() -> f64 {
    2000.0
}

fn default_yield_std() -> f64 {
    500.0
}

/// Raw JSON entry (the training pipeline may write null for NaN statistics)
#[derive(Debug, Deserialize)]
struct RawYieldProfile {
    yield_mean: Option<f64>,
    yield_std: Option<f64>,
    avg_area: Option<f64>,
    #[serde(default)]
    record_count: Option<usize>,
}

impl From<RawYieldProfile> for YieldProfile {
    fn from(raw: RawYieldProfile) -> Self {
        Self {
            yield_mean: raw.yield_mean.filter(|v| v.is_finite()).unwrap_or_else(default_yield_mean),
            yield_std: raw.yield_std.filter(|v| v.is_finite()).unwrap_or_else(default_yield_std),
            avg_area: raw.avg_area,
            record_count: raw.record_count.unwrap_or(0),
        }
    }
}

/// Season profile map
#[derive(Debug, Clone, Default)]
pub struct SeasonProfiles {
    profiles: FxHashMap<String, FxHashMap<CropCategory, YieldProfile>>,
}

impl SeasonProfiles {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read crop profiles: {:?}", path))?;
        let raw: HashMap<String, HashMap<String, RawYieldProfile>> = serde_json::from_str(&contents)
            .with_context(|| "Failed to parse crop profiles JSON")?;

        let mut profiles: FxHashMap<String, FxHashMap<CropCategory, YieldProfile>> = FxHashMap::default();
        for (key, crops) in raw {
            let entry = profiles.entry(normalize_key(&key)).or_default();
            for (label, profile) in crops {
                if let Some(category) = CropCategory::from_label(&label) {
                    entry.insert(category, profile.into());
                }
            }
        }

        Ok(Self { profiles })
    }

    pub fn insert(&mut self, season_location_key: &str, category: CropCategory, profile: YieldProfile) {
        self.profiles
            .entry(normalize_key(season_location_key))
            .or_default()
            .insert(category, profile);
    }

    pub fn get(&self, season_location_key: &str, category: CropCategory) -> Option<&YieldProfile> {
        self.profiles.get(season_location_key)?.get(&category)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

// ============================================================================
// District Profiles
// ============================================================================

/// Historical yield for one crop in one district (tonnes/ha)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DistrictCropHistory {
    pub avg_yield: f64,
    #[serde(default)]
    pub min_yield: Option<f64>,
    #[serde(default)]
    pub max_yield: Option<f64>,
    #[serde(default)]
    pub std_yield: Option<f64>,
    #[serde(default)]
    pub num_records: usize,
}

#[derive(Debug, Deserialize)]
struct RawDistrictProfile {
    #[serde(default)]
    crops: HashMap<String, DistrictCropHistory>,
}

/// District profile map, keyed by normalized "STATE_DISTRICT" then crop label
#[derive(Debug, Clone, Default)]
pub struct DistrictProfiles {
    districts: FxHashMap<String, FxHashMap<String, DistrictCropHistory>>,
}

impl DistrictProfiles {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read district profiles: {:?}", path))?;
        let raw: HashMap<String, RawDistrictProfile> = serde_json::from_str(&contents)
            .with_context(|| "Failed to parse district profiles JSON")?;

        let districts = raw
            .into_iter()
            .map(|(key, profile)| {
                let crops = profile
                    .crops
                    .into_iter()
                    .map(|(crop, history)| (normalize_key(&crop), history))
                    .collect();
                (normalize_key(&key), crops)
            })
            .collect();

        Ok(Self { districts })
    }

    pub fn insert(&mut self, location_key: &str, crop: &str, history: DistrictCropHistory) {
        self.districts
            .entry(normalize_key(location_key))
            .or_default()
            .insert(normalize_key(crop), history);
    }

    /// History for a crop label in a district
    pub fn get(&self, location_key: &str, crop: &str) -> Option<&DistrictCropHistory> {
        self.districts.get(location_key)?.get(&normalize_key(crop))
    }

    /// Mean avg_yield across a district's crops (feeds the Spread21 schema)
    pub fn district_yield_mean(&self, location_key: &str) -> Option<f64> {
        let crops = self.districts.get(location_key)?;
        if crops.is_empty() {
            return None;
        }
        let total: f64 = crops.values().map(|c| c.avg_yield).sum();
        Some(total / crops.len() as f64)
    }

    pub fn len(&self) -> usize {
        self.districts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.districts.is_empty()
    }
}
