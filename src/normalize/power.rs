//! Jump, force and anaerobic power tests

use super::{Computed, GRAVITY};
use crate::error::InvalidInputError;
use crate::inputs::RawInputs;
use crate::models::DerivedFields;

/// Takeoff velocity (m/s) needed to reach `height_m`
fn takeoff_velocity(height_m: f64) -> f64 {
    (2.0 * GRAVITY * height_m).sqrt()
}

fn jump_power(derived: &mut DerivedFields, height_m: f64, weight: Option<f64>) {
    let velocity = takeoff_velocity(height_m);
    let power = weight.map(|w| w * GRAVITY * velocity);

    derived.insert("takeoffVelocity", Some(velocity));
    derived.insert("power", power);
    derived.insert("relativePower", power.zip(weight).map(|(p, w)| p / w));
}

/// Weight is optional for tests where the payload may not carry it
fn optional_weight(inputs: &RawInputs) -> Option<f64> {
    inputs.optional_number("athleteWeight").filter(|w| *w > 0.0)
}

pub(crate) fn vertical_jump(inputs: &RawInputs) -> Result<Computed, InvalidInputError> {
    let height_cm = inputs.require_positive("jumpHeight")?;
    let weight = inputs.require_positive("athleteWeight")?;
    let height_m = height_cm / 100.0;

    let mut derived = DerivedFields::new();
    jump_power(&mut derived, height_m, Some(weight));

    if let Some(contact) = inputs.optional_number("contactTime").filter(|c| *c > 0.0) {
        derived.insert("reactiveStrengthIndex", Some(height_m / contact));
    }

    Ok(Computed::new(derived))
}

pub(crate) fn broad_jump(inputs: &RawInputs) -> Result<Computed, InvalidInputError> {
    let distance_cm = inputs.require_positive("jumpDistance")?;
    let weight = optional_weight(inputs);

    let mut derived = DerivedFields::new();
    jump_power(&mut derived, distance_cm / 100.0, weight);
    derived.insert("relativeDistance", weight.map(|w| distance_cm / w));

    Ok(Computed::new(derived))
}

pub(crate) fn flight_test(inputs: &RawInputs) -> Result<Computed, InvalidInputError> {
    let flight_time = inputs.require_positive("flightTime")?;
    let height_m = inputs.require_positive("jumpHeight")? / 100.0;
    let weight = optional_weight(inputs);

    let power = weight.map(|w| w * GRAVITY * height_m / flight_time);

    let mut derived = DerivedFields::new();
    derived.insert("power", power);
    derived.insert("relativePower", power.zip(weight).map(|(p, w)| p / w));

    Ok(Computed::new(derived))
}

pub(crate) fn time_to_peak_force(inputs: &RawInputs) -> Result<Computed, InvalidInputError> {
    let time_ms = inputs.require_positive("timeToPeak")?;
    let peak_force = inputs.require_positive("peakForce")?;

    let mut derived = DerivedFields::new();
    derived.insert("rateOfForceDevelopment", Some(peak_force / (time_ms / 1000.0)));

    Ok(Computed::new(derived))
}

pub(crate) fn wingate(inputs: &RawInputs) -> Result<Computed, InvalidInputError> {
    let peak = inputs.require_positive("peakPower")?;
    let mean = inputs.require_positive("meanPower")?;
    let weight = optional_weight(inputs);

    let mut derived = DerivedFields::new();
    derived.insert("relativePeakPower", weight.map(|w| peak / w));
    derived.insert("relativeMeanPower", weight.map(|w| mean / w));
    derived.insert("fatigueIndex", inputs.optional_number("fatigueIndex"));

    Ok(Computed::new(derived))
}
