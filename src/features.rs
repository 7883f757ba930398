//! Feature Input
//!
//! The flat prediction request: location, season and soil/weather readings.
//! Every field is optional on the wire and takes a documented default.

use serde::{Deserialize, Serialize};

use crate::external::WeatherReading;
use crate::season::Season;

pub const DEFAULT_SEASON: &str = "KHARIF";
pub const DEFAULT_TEMPERATURE: f64 = 28.0;
pub const DEFAULT_HUMIDITY: f64 = 60.0;
pub const DEFAULT_MOISTURE: f64 = 45.0;
pub const DEFAULT_NITROGEN: f64 = 100.0;
pub const DEFAULT_PHOSPHORUS: f64 = 20.0;
pub const DEFAULT_POTASSIUM: f64 = 150.0;

/// Raw prediction input (caller-owned, never mutated by the core)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureInput {
    pub state: String,
    pub district: String,
    pub season: String,

    // === Weather ===
    pub avg_temperature: f64,  // deg C
    pub avg_humidity: f64,     // %

    // === Macronutrients ===
    pub soil_moisture: f64,
    pub soil_nitrogen: f64,
    pub soil_phosphorus: f64,
    pub soil_potassium: f64,

    // === Micronutrients (% sufficiency) ===
    pub soil_zn: f64,
    pub soil_fe: f64,
    pub soil_cu: f64,
    pub soil_mn: f64,
    pub soil_b: f64,
    pub soil_s: f64,
}

impl Default for FeatureInput {
    fn default() -> Self {
        Self {
            state: String::new(),
            district: String::new(),
            season: DEFAULT_SEASON.to_string(),
            avg_temperature: DEFAULT_TEMPERATURE,
            avg_humidity: DEFAULT_HUMIDITY,
            soil_moisture: DEFAULT_MOISTURE,
            soil_nitrogen: DEFAULT_NITROGEN,
            soil_phosphorus: DEFAULT_PHOSPHORUS,
            soil_potassium: DEFAULT_POTASSIUM,
            soil_zn: 60.0,
            soil_fe: 80.0,
            soil_cu: 90.0,
            soil_mn: 85.0,
            soil_b: 70.0,
            soil_s: 75.0,
        }
    }
}

impl FeatureInput {
    /// Convenience constructor for a location and season with default readings
    pub fn new(state: &str, district: &str, season: &str) -> Self {
        Self {
            state: state.to_string(),
            district: district.to_string(),
            season: season.to_string(),
            ..Self::default()
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.avg_temperature = temperature;
        self
    }

    pub fn with_humidity(mut self, humidity: f64) -> Self {
        self.avg_humidity = humidity;
        self
    }

    /// Replace temperature and humidity with a weather reading
    pub fn with_weather(mut self, reading: &WeatherReading) -> Self {
        self.avg_temperature = reading.temperature;
        self.avg_humidity = reading.humidity;
        self
    }

    /// Trimmed, uppercased view used by every pipeline stage
    pub fn normalized(&self) -> NormalizedInput<'_> {
        let season_label = normalize_key(&self.season);
        let season_label = if season_label.is_empty() {
            DEFAULT_SEASON.to_string()
        } else {
            season_label
        };

        // Known seasons always use their canonical label, so aliases such as
        // "WHOLE_YEAR" encode and key profiles like "WHOLE YEAR"
        let season = Season::parse(&season_label);
        let season_label = match season {
            Some(season) => season.as_str().to_string(),
            None => season_label,
        };

        NormalizedInput {
            state: normalize_key(&self.state),
            district: normalize_key(&self.district),
            season,
            season_label,
            raw: self,
        }
    }
}

/// Normalized location/season keys plus the raw readings
#[derive(Debug, Clone)]
pub struct NormalizedInput<'a> {
    pub state: String,
    pub district: String,
    /// Parsed season (None for labels outside the six known seasons)
    pub season: Option<Season>,
    /// Canonical season label, or the uppercased label when it is unknown
    pub season_label: String,
    pub raw: &'a FeatureInput,
}

impl NormalizedInput<'_> {
    /// "STATE_DISTRICT" key used by affinity and district profile maps
    pub fn location_key(&self) -> String {
        format!("{}_{}", self.state, self.district)
    }

    /// "STATE_DISTRICT_SEASON" key used by season yield profiles
    pub fn season_location_key(&self) -> String {
        format!("{}_{}_{}", self.state, self.district, self.season_label)
    }

    pub fn temperature(&self) -> f64 {
        self.raw.avg_temperature
    }

    pub fn humidity(&self) -> f64 {
        self.raw.avg_humidity
    }
}

/// Trim and uppercase a location or season key
pub fn normalize_key(value: &str) -> String {
    value.trim().to_uppercase()
}
