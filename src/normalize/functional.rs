//! Functional fitness simulations: obstacle circuits and the IOCT

use serde_json::Value;

use super::Computed;
use crate::error::InvalidInputError;
use crate::inputs::{as_number, require_positive_value, RawInputs};
use crate::models::{DerivedFields, Gender};

/// Seconds added per obstacle penalty unless the obstacle says otherwise
pub const DEFAULT_PENALTY_TIME: f64 = 5.0;

/// IOCT pass cutoffs in seconds
pub const IOCT_CUTOFF_MALE: f64 = 155.0;
pub const IOCT_CUTOFF_FEMALE: f64 = 170.0;

fn pass_fail(time: f64, cutoff: f64) -> &'static str {
    if time <= cutoff {
        "PASS"
    } else {
        "FAIL"
    }
}

/// Non-negative optional number on an array element
fn element_number(element: &Value, field: &str, default: f64) -> f64 {
    element
        .get(field)
        .and_then(as_number)
        .filter(|v| *v >= 0.0)
        .unwrap_or(default)
}

pub(crate) fn obstacle_circuit(inputs: &RawInputs) -> Result<Computed, InvalidInputError> {
    let obstacles = inputs.require_array("obstacles")?;
    if obstacles.is_empty() {
        return Err(InvalidInputError::new("obstacles", "at least one obstacle is required"));
    }

    let mut raw_time = 0.0;
    let mut penalty_time = 0.0;
    for (index, obstacle) in obstacles.iter().enumerate() {
        raw_time += require_positive_value(obstacle.get("time"), &format!("obstacles[{}].time", index))?;

        let penalties = element_number(obstacle, "penalties", 0.0);
        let per_penalty = element_number(obstacle, "penaltyTime", DEFAULT_PENALTY_TIME);
        penalty_time += penalties * per_penalty;
    }

    let adjusted = raw_time + penalty_time;

    let mut derived = DerivedFields::new();
    derived.insert("totalRawTime", Some(raw_time));
    derived.insert("totalPenaltyTime", Some(penalty_time));
    derived.insert("finalAdjustedTime", Some(adjusted));

    let computed = Computed::new(derived);
    Ok(match inputs.optional_number("cutoffTime").filter(|c| *c > 0.0) {
        Some(cutoff) => computed.with_status(pass_fail(adjusted, cutoff)),
        None => computed,
    })
}

/// Indoor obstacle course test; gender defaults to the male cutoff
pub(crate) fn ioct(inputs: &RawInputs) -> Result<Computed, InvalidInputError> {
    let completion = inputs.require_positive("completionTime")?;
    let penalties = inputs.number_or("penalties", 0.0);
    let cutoff = match inputs.gender()? {
        Some(Gender::Female) => IOCT_CUTOFF_FEMALE,
        _ => IOCT_CUTOFF_MALE,
    };

    let penalty_time = penalties * DEFAULT_PENALTY_TIME;
    let total = completion + penalty_time;

    let mut derived = DerivedFields::new();
    derived.insert("penaltyTime", Some(penalty_time));
    derived.insert("totalTime", Some(total));
    derived.insert("cutoffTime", Some(cutoff));

    Ok(Computed::new(derived).with_status(pass_fail(total, cutoff)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn inputs(value: serde_json::Value) -> RawInputs {
        RawInputs::from_value(value).unwrap()
    }

    #[test]
    fn test_circuit_sums_penalties_times_penalty_time() {
        let out = obstacle_circuit(&inputs(json!({
            "obstacles": [
                {"name": "wall", "time": 12.5, "penalties": 2},
                {"name": "rope", "time": 20.0, "penalties": 1, "penaltyTime": 10},
                {"name": "crawl", "time": 7.5}
            ],
            "cutoffTime": 60
        })))
        .unwrap();

        assert_eq!(out.derived.get("totalRawTime"), Some(40.0));
        assert_eq!(out.derived.get("totalPenaltyTime"), Some(20.0));
        assert_eq!(out.derived.get("finalAdjustedTime"), Some(60.0));
        assert_eq!(out.status.as_deref(), Some("PASS"));
    }

    #[test]
    fn test_circuit_without_cutoff_has_no_status() {
        let out = obstacle_circuit(&inputs(json!({
            "obstacles": [{"name": "wall", "time": 30}]
        })))
        .unwrap();
        assert_eq!(out.status, None);
    }

    #[test]
    fn test_circuit_error_names_obstacle() {
        let err = obstacle_circuit(&inputs(json!({
            "obstacles": [{"name": "wall", "time": 30}, {"name": "rope", "time": "slow"}]
        })))
        .unwrap_err();
        assert_eq!(err.field, "obstacles[1].time");
    }

    #[test]
    fn test_ioct_cutoffs() {
        let out = ioct(&inputs(json!({"completionTime": 150, "penalties": 1}))).unwrap();
        assert_eq!(out.derived.get("totalTime"), Some(155.0));
        assert_eq!(out.status.as_deref(), Some("PASS"));

        let out = ioct(&inputs(json!({"completionTime": 150, "penalties": 2}))).unwrap();
        assert_eq!(out.status.as_deref(), Some("FAIL"));

        let out = ioct(&inputs(json!({
            "completionTime": 150,
            "penalties": 2,
            "gender": "female"
        })))
        .unwrap();
        assert_eq!(out.status.as_deref(), Some("PASS"));
    }
}
