//! Speed, acceleration and agility tests

use serde_json::Value;

use super::Computed;
use crate::error::InvalidInputError;
use crate::inputs::{require_positive_value, RawInputs};
use crate::models::DerivedFields;

const MPS_TO_KMH: f64 = 3.6;

pub(crate) fn max_runup_speed(inputs: &RawInputs) -> Result<Computed, InvalidInputError> {
    let distance = inputs.require_positive("distance")?;
    let time = inputs.require_positive("time")?;
    let speed = distance / time;

    let mut derived = DerivedFields::new();
    derived.insert("speed", Some(speed));
    derived.insert("speedKmh", Some(speed * MPS_TO_KMH));
    Ok(Computed::new(derived))
}

/// Yo-Yo intermittent recovery; VO2max only when the final speed is known
pub(crate) fn yo_yo(inputs: &RawInputs) -> Result<Computed, InvalidInputError> {
    inputs.require_positive("level")?;
    inputs.require_positive("shuttles")?;
    inputs.require_positive("totalDistance")?;

    let final_speed = inputs.optional_number("finalSpeed").filter(|s| *s > 0.0);

    let mut derived = DerivedFields::new();
    derived.insert("vo2Max", final_speed.map(|kmh| 6.6 * kmh - 27.4));
    Ok(Computed::new(derived))
}

/// Rated directly from completion time against a gender ladder
pub(crate) fn illinois(inputs: &RawInputs) -> Result<Computed, InvalidInputError> {
    inputs.require_positive("completionTime")?;
    if inputs.gender()?.is_none() {
        return Err(InvalidInputError::missing("gender"));
    }
    Ok(Computed::default())
}

pub(crate) fn agility_505(inputs: &RawInputs) -> Result<Computed, InvalidInputError> {
    let first = inputs.require_positive("completionTime")?;
    let second = inputs.optional_number("rightTime").filter(|t| *t > 0.0);

    let mut derived = DerivedFields::new();
    derived.insert(
        "asymmetry",
        second.map(|s| (first - s).abs() / first.max(s) * 100.0),
    );
    derived.insert("averageTime", second.map(|s| (first + s) / 2.0));
    Ok(Computed::new(derived))
}

pub(crate) fn t_test(inputs: &RawInputs) -> Result<Computed, InvalidInputError> {
    inputs.require_positive("completionTime")?;
    Ok(Computed::default())
}

/// Each gate carries the segment time since the previous gate
pub(crate) fn timing_gates(inputs: &RawInputs) -> Result<Computed, InvalidInputError> {
    let gates = inputs.require_array("distances")?;
    if gates.is_empty() {
        return Err(InvalidInputError::new("distances", "at least one gate is required"));
    }

    let mut derived = DerivedFields::new();
    let mut total = 0.0;
    for (index, gate) in gates.iter().enumerate() {
        let time = require_positive_value(gate.get("time"), &format!("distances[{}].time", index))?;
        let label = gate
            .get("gate")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| (index + 1).to_string());

        derived.insert(&format!("split.{}", label), Some(time));
        total += time;
    }

    derived.insert("totalTime", Some(total));
    derived.insert("averageSplit", Some(total / gates.len() as f64));
    Ok(Computed::new(derived))
}
