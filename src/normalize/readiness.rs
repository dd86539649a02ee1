use serde_json::Value;

use super::Computed;
use crate::error::InvalidInputError;
use crate::inputs::RawInputs;
use crate::models::DerivedFields;

pub const SUB_SCORES: [&str; 5] = [
    "sleepQuality",
    "fatigue",
    "muscleSoreness",
    "stressLevels",
    "mood",
];

pub const MAX_SCORE: f64 = 25.0;

pub fn readiness_status(percentage: f64) -> &'static str {
    if percentage >= 80.0 {
        "High Readiness"
    } else if percentage >= 60.0 {
        "Moderate Readiness"
    } else {
        "Low Readiness"
    }
}

/// Five 1-5 survey answers, either top-level or nested under `scores`
pub(crate) fn daily_readiness(inputs: &RawInputs) -> Result<Computed, InvalidInputError> {
    let nested = match inputs.get("scores") {
        Some(Value::Object(map)) => Some(RawInputs::from(map.clone())),
        _ => None,
    };

    let mut total = 0.0;
    for name in SUB_SCORES {
        total += match &nested {
            Some(scores) => scores
                .require_in_range(name, 1.0, 5.0)
                .map_err(|e| InvalidInputError::new(format!("scores.{}", e.field), e.reason))?,
            None => inputs.require_in_range(name, 1.0, 5.0)?,
        };
    }

    let percentage = total / MAX_SCORE * 100.0;

    let mut derived = DerivedFields::new();
    derived.insert("totalScore", Some(total));
    derived.insert("maxScore", Some(MAX_SCORE));
    derived.insert("readinessPercentage", Some(percentage));

    Ok(Computed::new(derived).with_status(readiness_status(percentage)))
}
