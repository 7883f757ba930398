//! Feature Encoder
//!
//! Maps a normalized FeatureInput onto the fixed-order numeric vector a model
//! generation expects. Three schemas coexist; the schema is fixed by the loaded
//! generation and never mixed:
//!
//! | Schema | Fields | Generation |
//! |--------|--------|------------|
//! | `Legacy15` | 15 | V1 (fine classes) |
//! | `Spread21` | 21 | V2 (temperature/humidity min-max spread) |
//! | `Historical16` | 16 | V3 (historical yield/area placeholders) |
//!
//! Unknown categorical values encode to index 0. This is lossy on purpose: a
//! new district still gets a prediction.

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::features::{normalize_key, NormalizedInput};

/// Placeholder historical yield (kg/ha) when no district profile exists
pub const DEFAULT_YIELD_MEAN: f64 = 2000.0;

/// Placeholder cultivated area (ha)
pub const DEFAULT_AREA: f64 = 1000.0;

// ============================================================================
// Category Lookup
// ============================================================================

/// Ordered category list with string -> index encoding
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct CategoryLookup {
    classes: Vec<String>,
    index: FxHashMap<String, usize>,
}

impl From<Vec<String>> for CategoryLookup {
    fn from(classes: Vec<String>) -> Self {
        let mut index = FxHashMap::default();
        for (i, class) in classes.iter().enumerate() {
            // First occurrence wins for duplicate normalized labels
            index.entry(normalize_key(class)).or_insert(i);
        }
        Self { classes, index }
    }
}

impl From<CategoryLookup> for Vec<String> {
    fn from(lookup: CategoryLookup) -> Self {
        lookup.classes
    }
}

impl CategoryLookup {
    /// Index of a category, if known (case-insensitive)
    pub fn position(&self, value: &str) -> Option<usize> {
        self.index.get(&normalize_key(value)).copied()
    }

    /// Index of a category, 0 when unknown
    pub fn encode(&self, value: &str) -> usize {
        self.position(value).unwrap_or(0)
    }

    /// Category at an index, as stored at load time
    pub fn decode(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(|s| s.as_str())
    }
}

// ============================================================================
// Encoder Tables
// ============================================================================

/// Encoder document written by the training pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncoderTables {
    #[serde(default)]
    pub state_classes: CategoryLookup,
    #[serde(default)]
    pub district_classes: CategoryLookup,
    /// Absent in V1 documents (fixed season mapping applies)
    #[serde(default)]
    pub season_classes: Option<CategoryLookup>,
    #[serde(default)]
    pub crop_classes: CategoryLookup,
    #[serde(default)]
    pub feature_columns: Option<Vec<String>>,
}

impl EncoderTables {
    /// Load encoder tables from JSON
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read encoder tables: {:?}", path))?;
        serde_json::from_str(&contents).with_context(|| "Failed to parse encoder tables JSON")
    }

    /// Season index, using `season_classes` when present
    pub fn encode_season(&self, input: &NormalizedInput) -> usize {
        match &self.season_classes {
            Some(classes) => classes.encode(&input.season_label),
            None => input.season.map(|s| s.legacy_index()).unwrap_or(0),
        }
    }
}

// ============================================================================
// Feature Schemas
// ============================================================================

/// Feature layout of a model generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSchema {
    Legacy15,
    Spread21,
    Historical16,
}

const LEGACY15_COLUMNS: [&str; 15] = [
    "season_enc", "zn", "fe", "cu", "mn", "b", "s",
    "temperature", "humidity", "moisture",
    "nitrogen", "potassium", "phosphorus",
    "state_enc", "district_enc",
];

const SPREAD21_COLUMNS: [&str; 21] = [
    "state_enc", "district_enc", "season_enc",
    "zn", "fe", "cu", "mn", "b", "s",
    "yield_mean", "total_area",
    "env_temp_min", "env_temp_max", "env_temp_mean",
    "env_humidity_min", "env_humidity_max", "env_humidity_mean",
    "env_moisture_mean", "env_nitrogen_mean", "env_potassium_mean", "env_phosphorus_mean",
];

const HISTORICAL16_COLUMNS: [&str; 16] = [
    "state_enc", "district_enc", "season_enc",
    "zn", "fe", "cu", "mn", "b", "s",
    "yield_mean", "avg_area",
    "temp_mean", "humidity_mean", "nitrogen_mean", "potassium_mean", "phosphorus_mean",
];

/// Number of fields in the V2 yield regressor vector
pub const YIELD_FEATURE_COUNT: usize = 20;

impl FeatureSchema {
    pub fn name(&self) -> &'static str {
        match self {
            FeatureSchema::Legacy15 => "legacy15",
            FeatureSchema::Spread21 => "spread21",
            FeatureSchema::Historical16 => "historical16",
        }
    }

    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            FeatureSchema::Legacy15 => &LEGACY15_COLUMNS,
            FeatureSchema::Spread21 => &SPREAD21_COLUMNS,
            FeatureSchema::Historical16 => &HISTORICAL16_COLUMNS,
        }
    }

    pub fn len(&self) -> usize {
        self.columns().len()
    }

    /// Encode an input into this schema
    ///
    /// # Arguments
    /// * `input` - Normalized FeatureInput
    /// * `tables` - Encoder tables of the loaded generation
    /// * `historical_yield_mean` - District yield mean (Spread21 only; default 2000)
    pub fn encode(
        &self,
        input: &NormalizedInput,
        tables: &EncoderTables,
        historical_yield_mean: Option<f64>,
    ) -> EncodedFeatures {
        let raw = input.raw;
        let state_index = tables.state_classes.encode(&input.state);
        let district_index = tables.district_classes.encode(&input.district);
        let season_index = tables.encode_season(input);

        let (state_enc, district_enc, season_enc) =
            (state_index as f64, district_index as f64, season_index as f64);
        let micronutrients = [raw.soil_zn, raw.soil_fe, raw.soil_cu, raw.soil_mn, raw.soil_b, raw.soil_s];
        let temperature = raw.avg_temperature;
        let humidity = raw.avg_humidity;

        let mut values = Vec::with_capacity(self.len());
        match self {
            FeatureSchema::Legacy15 => {
                values.push(season_enc);
                values.extend_from_slice(&micronutrients);
                values.extend_from_slice(&[
                    temperature, humidity, raw.soil_moisture,
                    raw.soil_nitrogen, raw.soil_potassium, raw.soil_phosphorus,
                    state_enc, district_enc,
                ]);
            }
            FeatureSchema::Spread21 => {
                values.extend_from_slice(&[state_enc, district_enc, season_enc]);
                values.extend_from_slice(&micronutrients);
                values.extend_from_slice(&[
                    historical_yield_mean.unwrap_or(DEFAULT_YIELD_MEAN),
                    DEFAULT_AREA,
                ]);
                values.extend_from_slice(&temperature_humidity_spread(temperature, humidity));
                values.extend_from_slice(&[
                    raw.soil_moisture, raw.soil_nitrogen, raw.soil_potassium, raw.soil_phosphorus,
                ]);
            }
            FeatureSchema::Historical16 => {
                values.extend_from_slice(&[state_enc, district_enc, season_enc]);
                values.extend_from_slice(&micronutrients);
                values.extend_from_slice(&[
                    DEFAULT_YIELD_MEAN, DEFAULT_AREA,
                    temperature, humidity,
                    raw.soil_nitrogen, raw.soil_potassium, raw.soil_phosphorus,
                ]);
            }
        }

        debug_assert_eq!(values.len(), self.len());

        EncodedFeatures {
            schema: *self,
            values,
            state_index,
            district_index,
            season_index,
        }
    }
}

/// temp-5, temp+5, temp, max(30, hum-15), min(100, hum+15), hum
fn temperature_humidity_spread(temperature: f64, humidity: f64) -> [f64; 6] {
    [
        temperature - 5.0,
        temperature + 5.0,
        temperature,
        (humidity - 15.0).max(30.0),
        (humidity + 15.0).min(100.0),
        humidity,
    ]
}

/// Encode the 20-field vector of the V2 yield regressor for one crop label
pub fn encode_yield_features(input: &NormalizedInput, tables: &EncoderTables, crop_label: &str) -> Vec<f64> {
    let raw = input.raw;
    let mut values = Vec::with_capacity(YIELD_FEATURE_COUNT);
    values.extend_from_slice(&[
        tables.state_classes.encode(&input.state) as f64,
        tables.district_classes.encode(&input.district) as f64,
        tables.encode_season(input) as f64,
        tables.crop_classes.encode(crop_label) as f64,
        raw.soil_zn, raw.soil_fe, raw.soil_cu, raw.soil_mn, raw.soil_b, raw.soil_s,
    ]);
    values.extend_from_slice(&temperature_humidity_spread(raw.avg_temperature, raw.avg_humidity));
    values.extend_from_slice(&[
        raw.soil_moisture, raw.soil_nitrogen, raw.soil_potassium, raw.soil_phosphorus,
    ]);
    values
}

/// Encoded vector plus the categorical indices used to build it
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFeatures {
    pub schema: FeatureSchema,
    pub values: Vec<f64>,
    pub state_index: usize,
    pub district_index: usize,
    pub season_index: usize,
}
