//! Mental-neural training sessions

use chrono::{DateTime, Utc};

use super::{mean, population_std_dev, Computed};
use crate::error::InvalidInputError;
use crate::inputs::{require_positive_value, RawInputs};
use crate::models::DerivedFields;

/// Responses at or beyond this many milliseconds count as missed
pub const RESPONSE_TIMEOUT_MS: f64 = 2000.0;

/// Responses faster than this count toward the success rate
pub const TARGET_REACTION_MS: f64 = 500.0;

fn timestamp(inputs: &RawInputs, field: &str) -> Option<DateTime<Utc>> {
    let text = inputs.text(field)?;
    match DateTime::parse_from_rfc3339(text) {
        Ok(at) => Some(at.with_timezone(&Utc)),
        Err(_) => {
            tracing::warn!(field, value = text, "Ignoring malformed session timestamp");
            None
        }
    }
}

fn percent(part: usize, total: usize) -> f64 {
    (part as f64 / total as f64 * 100.0).round()
}

/// Session metrics over `results[{reactionTime, ...}]`.
///
/// Missed responses still count toward the trial total, so they lower
/// accuracy. Averages, consistency and the score are integers.
pub(crate) fn session(inputs: &RawInputs) -> Result<Computed, InvalidInputError> {
    let results = inputs.require_array("results")?;
    if results.is_empty() {
        return Err(InvalidInputError::new("results", "at least one trial result is required"));
    }

    let times = results
        .iter()
        .enumerate()
        .map(|(index, result)| {
            require_positive_value(
                result.get("reactionTime"),
                &format!("results[{}].reactionTime", index),
            )
        })
        .collect::<Result<Vec<f64>, _>>()?;

    let valid: Vec<f64> = times.iter().copied().filter(|t| *t < RESPONSE_TIMEOUT_MS).collect();
    let total = times.len();

    let avg = mean(&valid).map(f64::round);
    let accuracy = percent(valid.len(), total);
    let success_rate = percent(times.iter().filter(|t| **t < TARGET_REACTION_MS).count(), total);
    let consistency = match valid.len() {
        0 => None,
        1 => Some(100.0),
        _ => Some((100.0 - population_std_dev(&valid) / 10.0).round().max(0.0)),
    };
    let score = avg.zip(consistency).map(|(avg, consistency)| {
        (0.4 * accuracy + 0.4 * (100.0 - avg / 10.0).max(0.0) + 0.2 * consistency).round()
    });

    let completion_time = match (timestamp(inputs, "startedAt"), timestamp(inputs, "endedAt")) {
        (Some(start), Some(end)) if end >= start => {
            Some(((end - start).num_milliseconds() as f64 / 1000.0).round())
        }
        _ => None,
    };

    let mut derived = DerivedFields::new();
    derived.insert("avgReactionTime", avg);
    derived.insert("bestReactionTime", valid.iter().copied().reduce(f64::min));
    derived.insert("worstReactionTime", valid.iter().copied().reduce(f64::max));
    derived.insert("accuracy", Some(accuracy));
    derived.insert("successRate", Some(success_rate));
    derived.insert("trialsCompleted", Some(total as f64));
    derived.insert("consistencyScore", consistency);
    derived.insert("score", score);
    derived.insert("completionTime", completion_time);

    Ok(Computed::new(derived))
}
