//! Recommendation Explanations
//!
//! Short human-readable text attached to every recommendation. Model-based
//! candidates get a score band, season line, temperature line and (when
//! backed by history) a historical line. Rule-based candidates get a
//! one-sentence season/temperature summary.

use crate::crops::temperature_range_for;
use crate::features::NormalizedInput;
use crate::scoring::{Candidate, CandidateSource};

pub struct ExplanationGenerator;

impl ExplanationGenerator {
    /// Explanation for a ranked candidate
    ///
    /// # Arguments
    /// * `candidate` - Scored candidate
    /// * `input` - Normalized input (season label and temperature are quoted)
    /// * `has_history` - Whether historical yield data backs this crop
    pub fn generate(candidate: &Candidate, input: &NormalizedInput, has_history: bool) -> String {
        match candidate.source {
            CandidateSource::Model => Self::model_based(candidate, input, has_history),
            CandidateSource::Rules => Self::rule_based(candidate, input),
        }
    }

    fn model_based(candidate: &Candidate, input: &NormalizedInput, has_history: bool) -> String {
        let crop = &candidate.label;
        let season = &input.season_label;
        let temperature = input.temperature();
        let range = temperature_range_for(candidate.category);

        let mut parts = Vec::with_capacity(4);

        parts.push(if candidate.score >= 85.0 {
            format!("{} is highly recommended for your conditions.", crop)
        } else if candidate.score >= 70.0 {
            format!("{} is well suited for your location.", crop)
        } else if candidate.score >= 55.0 {
            format!("{} is suitable for your conditions.", crop)
        } else {
            format!("{} is moderately suitable.", crop)
        });

        parts.push(if candidate.season_match {
            format!("Historically grown during {} season in your region.", season)
        } else {
            format!("Not typically grown in {} - consider alternative seasons.", season)
        });

        parts.push(if candidate.temp_suitability >= 0.8 {
            format!("Temperature ({:.1}°C) is optimal for this crop.", temperature)
        } else if candidate.temp_suitability >= 0.6 {
            format!(
                "Temperature ({:.1}°C) is suitable; optimal is {}-{}°C.",
                temperature, range.min, range.max
            )
        } else {
            format!(
                "Temperature ({:.1}°C) is not ideal; optimal is {}-{}°C.",
                temperature, range.min, range.max
            )
        });

        if has_history {
            parts.push("Based on historical data from your district.".to_string());
        }

        parts.join(" ")
    }

    fn rule_based(candidate: &Candidate, input: &NormalizedInput) -> String {
        let range = temperature_range_for(candidate.category);
        let verdict = if candidate.temp_suitability >= 0.8 {
            format!("is optimal (ideal: {}-{}°C).", range.min, range.max)
        } else {
            format!("is acceptable (optimal: {}-{}°C).", range.min, range.max)
        };

        format!(
            "{} is recommended for {} season. Temperature ({:.1}°C) {}",
            candidate.label,
            input.season_label,
            input.temperature(),
            verdict
        )
    }
}
