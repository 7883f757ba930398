//! Crop Categories
//!
//! The 16 coarse crop groups used as the unit of classification, scoring and
//! yield estimation. Each group carries its optimal temperature range and a
//! rule-based base yield.
//!
//! Fine-class models emit raw crop names (PADDY, GROUNDNUT, BAJRA...), so
//! `CropCategory::from_label` also resolves the raw names each group covers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::suitability::temperature::TemperatureRange;

/// Base yield (kg/ha) for labels that resolve to no category
pub const UNKNOWN_BASE_YIELD: f64 = 2000.0;

/// Display range for labels that resolve to no category
pub const UNKNOWN_TEMPERATURE_RANGE: TemperatureRange = TemperatureRange::new(15.0, 35.0);

/// Coarse crop grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CropCategory {
    CerealsWheat,
    CerealsRice,
    CerealsMaize,
    CerealsBarley,
    CerealsMillets,
    Pulses,
    Oilseeds,
    Sugarcane,
    Cotton,
    Jute,
    Tobacco,
    Vegetables,
    Fruits,
    Spices,
    Plantation,
    Fiber,
}

impl CropCategory {
    /// Get all categories in table order
    pub fn all() -> &'static [CropCategory] {
        &[
            CropCategory::CerealsWheat,
            CropCategory::CerealsRice,
            CropCategory::CerealsMaize,
            CropCategory::CerealsBarley,
            CropCategory::CerealsMillets,
            CropCategory::Pulses,
            CropCategory::Oilseeds,
            CropCategory::Sugarcane,
            CropCategory::Cotton,
            CropCategory::Jute,
            CropCategory::Tobacco,
            CropCategory::Vegetables,
            CropCategory::Fruits,
            CropCategory::Spices,
            CropCategory::Plantation,
            CropCategory::Fiber,
        ]
    }

    /// Canonical label used in artifacts and output
    pub fn as_str(&self) -> &'static str {
        match self {
            CropCategory::CerealsWheat => "CEREALS_WHEAT",
            CropCategory::CerealsRice => "CEREALS_RICE",
            CropCategory::CerealsMaize => "CEREALS_MAIZE",
            CropCategory::CerealsBarley => "CEREALS_BARLEY",
            CropCategory::CerealsMillets => "CEREALS_MILLETS",
            CropCategory::Pulses => "PULSES",
            CropCategory::Oilseeds => "OILSEEDS",
            CropCategory::Sugarcane => "SUGARCANE",
            CropCategory::Cotton => "COTTON",
            CropCategory::Jute => "JUTE",
            CropCategory::Tobacco => "TOBACCO",
            CropCategory::Vegetables => "VEGETABLES",
            CropCategory::Fruits => "FRUITS",
            CropCategory::Spices => "SPICES",
            CropCategory::Plantation => "PLANTATION",
            CropCategory::Fiber => "FIBER",
        }
    }

    /// Optimal growing temperature range (deg C)
    pub fn temperature_range(&self) -> TemperatureRange {
        let (min, max) = match self {
            CropCategory::CerealsWheat => (10.0, 25.0),    // Cool weather crop
            CropCategory::CerealsRice => (20.0, 35.0),
            CropCategory::CerealsMaize => (18.0, 32.0),
            CropCategory::CerealsBarley => (8.0, 22.0),
            CropCategory::CerealsMillets => (25.0, 40.0),  // Hot and dry tolerant
            CropCategory::Pulses => (15.0, 30.0),
            CropCategory::Oilseeds => (20.0, 35.0),
            CropCategory::Sugarcane => (20.0, 35.0),
            CropCategory::Cotton => (21.0, 35.0),
            CropCategory::Jute => (24.0, 37.0),
            CropCategory::Tobacco => (18.0, 28.0),
            CropCategory::Vegetables => (15.0, 30.0),
            CropCategory::Fruits => (15.0, 35.0),
            CropCategory::Spices => (20.0, 35.0),
            CropCategory::Plantation => (20.0, 30.0),
            CropCategory::Fiber => (25.0, 35.0),
        };
        TemperatureRange::new(min, max)
    }

    /// Rule-based base yield (kg/ha)
    pub fn base_yield(&self) -> f64 {
        match self {
            CropCategory::CerealsWheat => 3500.0,
            CropCategory::CerealsRice => 3000.0,
            CropCategory::CerealsMaize => 4000.0,
            CropCategory::CerealsBarley => 2800.0,
            CropCategory::CerealsMillets => 1500.0,
            CropCategory::Pulses => 1200.0,
            CropCategory::Oilseeds => 1200.0,
            CropCategory::Sugarcane => 70000.0,
            CropCategory::Cotton => 500.0,
            CropCategory::Jute => 2500.0,
            CropCategory::Tobacco => 1800.0,
            CropCategory::Vegetables => 15000.0,
            CropCategory::Fruits => 10000.0,
            CropCategory::Spices => 2000.0,
            CropCategory::Plantation => 5000.0,
            CropCategory::Fiber => 1500.0,
        }
    }

    /// Raw crop names grouped under this category
    pub fn member_crops(&self) -> &'static [&'static str] {
        match self {
            CropCategory::CerealsWheat => &["WHEAT"],
            CropCategory::CerealsRice => &["RICE", "PADDY"],
            CropCategory::CerealsMaize => &["MAIZE"],
            CropCategory::CerealsBarley => &["BARLEY"],
            CropCategory::CerealsMillets => &[
                "BAJRA", "JOWAR", "RAGI", "SMALL MILLETS", "KORRA", "SAMAI", "VARAGU", "MILLETS",
            ],
            CropCategory::Pulses => &[
                "MOONG", "URAD", "ARHAR/TUR", "GRAM", "MASOOR", "LENTIL", "HORSE-GRAM",
                "KULTHI", "MOTH", "KHESARI", "OTHER KHARIF PULSES", "OTHER RABI PULSES",
                "PEAS & BEANS", "COWPEA", "LATHYRUS", "BEANS & MUTTER",
            ],
            CropCategory::Oilseeds => &[
                "GROUNDNUT", "SOYABEAN", "SUNFLOWER", "RAPESEED", "MUSTARD", "SESAMUM",
                "CASTOR SEED", "LINSEED", "NIGER SEED", "SAFFLOWER", "OILSEEDS TOTAL",
                "OIL SEEDS", "RAPESEED &MUSTARD",
            ],
            CropCategory::Sugarcane => &["SUGARCANE"],
            CropCategory::Cotton => &["COTTON", "COTTON(LINT)"],
            CropCategory::Jute => &["JUTE", "JUTE & MESTA", "MESTA", "SANNHAMP"],
            CropCategory::Tobacco => &["TOBACCO"],
            CropCategory::Vegetables => &[
                "POTATO", "ONION", "TOMATO", "BRINJAL", "CABBAGE", "CAULIFLOWER", "BHINDI",
                "CUCUMBER", "PUMPKIN", "BITTER GOURD", "BOTTLE GOURD", "SWEET POTATO",
                "TAPIOCA", "DRUM STICK", "JACK FRUIT", "ASH GOURD",
            ],
            CropCategory::Fruits => &[
                "BANANA", "MANGO", "GRAPES", "APPLE", "ORANGE", "CITRUS FRUIT", "PAPAYA",
                "PINEAPPLE", "POMEGRANATE", "SAPOTA", "LITCHI", "GUAVA", "PLUMS", "PEAR",
                "PEACH", "BER", "LEMON", "MOSAMBI", "WATER MELON", "MUSK MELON", "KIWI",
            ],
            CropCategory::Spices => &[
                "TURMERIC", "GINGER", "CHILLIES", "DRY CHILLIES", "BLACK PEPPER", "CARDAMOM",
                "CORIANDER", "GARLIC", "ARECANUT", "BETELVINE",
            ],
            CropCategory::Plantation => &["TEA", "COFFEE", "RUBBER", "COCONUT"],
            CropCategory::Fiber => &["KAPAS", "HEMP", "SUN HEMP"],
        }
    }

    /// Resolve a category label or a raw crop name (case-insensitive)
    ///
    /// Category labels win over member names, so "COTTON" and "SUGARCANE"
    /// resolve to their own category.
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_uppercase();
        if normalized.is_empty() {
            return None;
        }

        if let Some(category) = Self::all().iter().find(|c| c.as_str() == normalized) {
            return Some(*category);
        }

        Self::all()
            .iter()
            .find(|c| c.member_crops().iter().any(|m| *m == normalized))
            .copied()
    }
}

impl fmt::Display for CropCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Temperature range for an optional category, falling back to the display range
pub fn temperature_range_for(category: Option<CropCategory>) -> TemperatureRange {
    category
        .map(|c| c.temperature_range())
        .unwrap_or(UNKNOWN_TEMPERATURE_RANGE)
}

/// Base yield (kg/ha) for an optional category
pub fn base_yield_for(category: Option<CropCategory>) -> f64 {
    category.map(|c| c.base_yield()).unwrap_or(UNKNOWN_BASE_YIELD)
}
