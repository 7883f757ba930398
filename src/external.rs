//! External Collaborators
//!
//! Contracts for weather and geocoding lookups. Both are best-effort: any
//! failure resolves to fixed defaults and never reaches a prediction.
//! Geocoding results are memoized per (district, state) in a bounded cache
//! without TTL; failed lookups are not cached.
//!
//! Every call carries a deadline (`LOOKUP_TIMEOUT` unless overridden).
//! Implementors bound their network calls by it; an answer that still arrives
//! late is discarded as a timeout.

use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::LookupError;
use crate::features::{normalize_key, FeatureInput};

/// Geographic centroid of India, used when geocoding fails
pub const INDIA_CENTROID: Coordinates = Coordinates { latitude: 20.5937, longitude: 78.9629 };

/// Default deadline passed to every collaborator call
pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Geocoding cache capacity
pub const GEOCODE_CACHE_CAPACITY: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingSource {
    Live,
    Fallback,
}

/// Current weather at a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    /// Celsius
    pub temperature: f64,
    /// Percent
    pub humidity: f64,
    /// hPa
    pub pressure: f64,
    pub description: String,
    pub source: ReadingSource,
}

impl WeatherReading {
    /// Reading used when the weather collaborator fails
    pub fn fallback() -> Self {
        Self {
            temperature: 25.0,
            humidity: 60.0,
            pressure: 1013.0,
            description: "unknown".to_string(),
            source: ReadingSource::Fallback,
        }
    }
}

/// Weather lookup by coordinates
pub trait WeatherSource: Send + Sync {
    fn current(&self, location: Coordinates, timeout: Duration) -> Result<WeatherReading, LookupError>;
}

/// Coordinates lookup by (district, state)
pub trait Geocoder: Send + Sync {
    fn locate(&self, district: &str, state: &str, timeout: Duration) -> Result<Coordinates, LookupError>;
}

/// Weather and geocoding behind one fail-soft facade
pub struct LocationService {
    geocoder: Arc<dyn Geocoder>,
    weather: Arc<dyn WeatherSource>,
    coordinates: Cache<(String, String), Coordinates>,
    timeout: Duration,
}

impl LocationService {
    pub fn new(geocoder: Arc<dyn Geocoder>, weather: Arc<dyn WeatherSource>) -> Self {
        Self {
            geocoder,
            weather,
            coordinates: Cache::new(GEOCODE_CACHE_CAPACITY),
            timeout: LOOKUP_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run a collaborator call, rejecting answers that overran the deadline
    fn within_deadline<T>(&self, call: impl FnOnce(Duration) -> Result<T, LookupError>) -> Result<T, LookupError> {
        let started = Instant::now();
        let result = call(self.timeout);
        if started.elapsed() > self.timeout {
            return Err(LookupError::Timeout);
        }
        result
    }

    /// Coordinates of a district, falling back to the centroid of India
    pub fn coordinates(&self, district: &str, state: &str) -> Coordinates {
        let key = (normalize_key(district), normalize_key(state));
        if let Some(hit) = self.coordinates.get(&key) {
            return hit;
        }

        match self.within_deadline(|timeout| self.geocoder.locate(district, state, timeout)) {
            Ok(location) => {
                debug!("Geocoded {}, {} -> ({}, {})", district, state, location.latitude, location.longitude);
                self.coordinates.insert(key, location);
                location
            }
            Err(e) => {
                warn!("Geocoding failed for {}, {}: {}", district, state, e);
                INDIA_CENTROID
            }
        }
    }

    /// Current weather, falling back to fixed defaults
    pub fn weather(&self, location: Coordinates) -> WeatherReading {
        self.within_deadline(|timeout| self.weather.current(location, timeout)).unwrap_or_else(|e| {
            warn!("Weather lookup failed: {}", e);
            WeatherReading::fallback()
        })
    }

    /// Replace an input's temperature and humidity with current weather
    pub fn with_current_weather(&self, input: &FeatureInput) -> FeatureInput {
        let location = self.coordinates(&input.district, &input.state);
        input.clone().with_weather(&self.weather(location))
    }

    /// Number of cached geocoding results
    pub fn cached_locations(&self) -> u64 {
        self.coordinates.run_pending_tasks();
        self.coordinates.entry_count()
    }
}
