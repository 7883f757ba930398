//! Season-Affinity Resolver
//!
//! Determines which crop categories are historically grown at a location in a
//! season. Resolution order:
//! 1. Exact "STATE_DISTRICT" key in the season's historical map
//! 2. First key (in sorted order) that starts with "STATE_"
//! 3. The static default set for the season
//!
//! Keys are held in a `BTreeMap` so the state-level fallback is deterministic.

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use crate::crops::CropCategory;
use crate::features::normalize_key;
use crate::season::Season;

/// How an affinity set was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AffinityLevel {
    /// Exact district match in historical data
    District,
    /// Another district of the same state
    State,
    /// Static per-season default set
    Default,
}

/// Crop categories historically grown for one (location, season)
#[derive(Debug, Clone, PartialEq)]
pub struct AffinitySet {
    pub crops: BTreeSet<CropCategory>,
    pub level: AffinityLevel,
}

impl AffinitySet {
    pub fn contains(&self, category: CropCategory) -> bool {
        self.crops.contains(&category)
    }

    /// Whether an optional category is in the set (unknown labels never match)
    pub fn matches(&self, category: Option<CropCategory>) -> bool {
        category.map(|c| self.contains(c)).unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.crops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.crops.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = CropCategory> + '_ {
        self.crops.iter().copied()
    }
}

/// Season -> "STATE_DISTRICT" -> crop categories (read-only after load)
#[derive(Debug, Clone, Default)]
pub struct SeasonAffinityMap {
    seasons: FxHashMap<Season, BTreeMap<String, BTreeSet<CropCategory>>>,
}

impl SeasonAffinityMap {
    /// Empty map (every lookup resolves to the season defaults)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load from `season_crop_map` JSON: `{season: {"STATE_DISTRICT": [labels]}}`
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read season crop map: {:?}", path))?;

        let raw: HashMap<String, HashMap<String, Vec<String>>> = serde_json::from_str(&contents)
            .with_context(|| "Failed to parse season crop map JSON")?;

        Ok(Self::from_raw(raw))
    }

    /// Build from raw labels, normalizing keys and dropping unknown seasons/crops
    pub fn from_raw(raw: HashMap<String, HashMap<String, Vec<String>>>) -> Self {
        let mut seasons: FxHashMap<Season, BTreeMap<String, BTreeSet<CropCategory>>> =
            FxHashMap::default();

        for (season_label, locations) in raw {
            let Some(season) = Season::parse(&season_label) else {
                tracing::debug!("Skipping unknown season '{}' in crop map", season_label);
                continue;
            };

            let entry = seasons.entry(season).or_default();
            for (location, labels) in locations {
                let crops: BTreeSet<CropCategory> = labels
                    .iter()
                    .filter_map(|label| CropCategory::from_label(label))
                    .collect();
                if crops.is_empty() {
                    continue;
                }
                entry
                    .entry(normalize_key(&location))
                    .or_default()
                    .extend(crops);
            }
        }

        Self { seasons }
    }

    /// Insert a single location entry (used when building maps in code)
    ///
    /// An empty slice is ignored, as empty sets are when loading.
    pub fn insert(&mut self, season: Season, location_key: &str, crops: &[CropCategory]) {
        if crops.is_empty() {
            return;
        }
        self.seasons
            .entry(season)
            .or_default()
            .entry(normalize_key(location_key))
            .or_default()
            .extend(crops.iter().copied());
    }

    /// Number of (season, location) entries
    pub fn len(&self) -> usize {
        self.seasons.values().map(|m| m.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve the affinity set for a location and season
    ///
    /// `state` and `district` are expected normalized (trimmed, uppercased).
    /// An unknown season resolves to an empty default set.
    pub fn resolve(&self, state: &str, district: &str, season: Option<Season>) -> AffinitySet {
        let Some(season) = season else {
            return AffinitySet { crops: BTreeSet::new(), level: AffinityLevel::Default };
        };

        if let Some(locations) = self.seasons.get(&season) {
            let key = format!("{}_{}", state, district);
            if let Some(crops) = locations.get(&key) {
                return AffinitySet { crops: crops.clone(), level: AffinityLevel::District };
            }

            if !state.is_empty() {
                let prefix = format!("{}_", state);
                if let Some((_, crops)) = locations.iter().find(|(k, _)| k.starts_with(&prefix)) {
                    return AffinitySet { crops: crops.clone(), level: AffinityLevel::State };
                }
            }
        }

        AffinitySet {
            crops: season.default_crops().iter().copied().collect(),
            level: AffinityLevel::Default,
        }
    }
}
