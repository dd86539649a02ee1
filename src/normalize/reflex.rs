//! Reaction, coordination and reflex tests

use serde_json::Value;
use std::collections::BTreeMap;

use super::{mean, population_std_dev, Computed};
use crate::error::InvalidInputError;
use crate::inputs::{as_number, require_positive_value, RawInputs};
use crate::models::DerivedFields;

struct Trial {
    time: f64,
    accurate: bool,
}

/// Trials may be bare numbers or `{reactionTime, accuracy}` objects
fn read_trials(inputs: &RawInputs, field: &str) -> Result<Vec<Trial>, InvalidInputError> {
    inputs
        .array(field)
        .iter()
        .enumerate()
        .map(|(index, trial)| -> Result<Trial, InvalidInputError> {
            match trial {
                Value::Object(_) => Ok(Trial {
                    time: require_positive_value(
                        trial.get("reactionTime"),
                        &format!("{}[{}].reactionTime", field, index),
                    )?,
                    accurate: trial.get("accuracy").and_then(Value::as_bool).unwrap_or(true),
                }),
                other => Ok(Trial {
                    time: require_positive_value(Some(other), &format!("{}[{}]", field, index))?,
                    accurate: true,
                }),
            }
        })
        .collect()
}

/// Average, best and population standard deviation for one stimulus
fn insert_stats(derived: &mut DerivedFields, prefix: &str, times: &[f64]) {
    let avg = mean(times);
    let best = times.iter().copied().reduce(f64::min);
    let spread = avg.map(|_| population_std_dev(times));

    derived.insert(&format!("{}AvgTime", prefix), avg);
    derived.insert(&format!("{}BestTime", prefix), best);
    derived.insert(&format!("{}Consistency", prefix), spread);
}

pub(crate) fn simple_reaction_time(inputs: &RawInputs) -> Result<Computed, InvalidInputError> {
    let light = read_trials(inputs, "lightTrials")?;
    let sound = read_trials(inputs, "soundTrials")?;
    if light.is_empty() && sound.is_empty() {
        return Err(InvalidInputError::new(
            "trials",
            "at least one light or sound trial is required",
        ));
    }

    let light_times: Vec<f64> = light.iter().map(|t| t.time).collect();
    let sound_times: Vec<f64> = sound.iter().map(|t| t.time).collect();
    let combined: Vec<f64> = light_times.iter().chain(&sound_times).copied().collect();

    let mut derived = DerivedFields::new();
    insert_stats(&mut derived, "light", &light_times);
    insert_stats(&mut derived, "sound", &sound_times);
    insert_stats(&mut derived, "combined", &combined);

    let accurate = light.iter().chain(&sound).filter(|t| t.accurate).count();
    let accuracy = accurate as f64 / combined.len() as f64 * 100.0;
    let avg = mean(&combined).unwrap_or(0.0);
    let consistency_score = (100.0 - population_std_dev(&combined) / 10.0).max(0.0);
    let speed_score = (100.0 - avg / 10.0).max(0.0);

    derived.insert("accuracy", Some(accuracy));
    derived.insert("consistencyScore", Some(consistency_score));
    derived.insert(
        "score",
        Some(0.4 * accuracy + 0.4 * speed_score + 0.2 * consistency_score),
    );

    Ok(Computed::new(derived))
}

pub fn vor_interpretation(gain: f64) -> &'static str {
    if (0.8..=1.0).contains(&gain) {
        "Normal VOR gain"
    } else if gain < 0.8 {
        "Reduced VOR gain"
    } else if gain > 1.2 {
        "High VOR gain"
    } else {
        "Borderline VOR gain"
    }
}

pub(crate) fn vestibulo_ocular(inputs: &RawInputs) -> Result<Computed, InvalidInputError> {
    let head = inputs.require_positive("headVelocity")?;
    let eye = inputs.require_positive("eyeVelocity")?;
    let gain = eye / head;

    let mut derived = DerivedFields::new();
    derived.insert("gain", Some(gain));
    derived.insert("asymmetry", inputs.optional_number("asymmetry"));

    Ok(Computed::new(derived).with_status(vor_interpretation(gain)))
}

pub(crate) fn h_reflex(inputs: &RawInputs) -> Result<Computed, InvalidInputError> {
    let h_amplitude = inputs.require_number("hReflexAmplitude")?;
    if h_amplitude < 0.0 {
        return Err(InvalidInputError::new("hReflexAmplitude", "must not be negative"));
    }
    let m_amplitude = inputs.require_positive("mWaveAmplitude")?;
    let h_max = inputs.optional_number("hMax").filter(|h| *h >= 0.0);
    let latency = inputs.optional_number("latency").filter(|l| *l > 0.0);

    let ratio = h_amplitude / m_amplitude * 100.0;

    let status = if h_amplitude == 0.0 {
        "No measurable H-reflex response"
    } else if ratio > 50.0 {
        "High H/M ratio"
    } else if latency.is_some_and(|l| l >= 25.0) {
        "Prolonged latency"
    } else {
        "Within typical limits"
    };

    let mut derived = DerivedFields::new();
    derived.insert("hmRatio", Some(ratio));
    derived.insert("hMaxRatio", h_max.map(|h| h / m_amplitude));
    derived.insert("latency", latency);

    Ok(Computed::new(derived).with_status(status))
}

/// Grades run 0-4; 0 and 4 are abnormal
pub(crate) fn deep_tendon(inputs: &RawInputs) -> Result<Computed, InvalidInputError> {
    let reflexes = inputs.require_array("reflexes")?;
    if reflexes.is_empty() {
        return Err(InvalidInputError::new("reflexes", "at least one reflex is required"));
    }

    let mut total = 0.0;
    let mut abnormal = 0usize;
    let mut by_name: BTreeMap<&str, Vec<f64>> = BTreeMap::new();

    for (index, reflex) in reflexes.iter().enumerate() {
        let path = format!("reflexes[{}].score", index);
        let score = reflex
            .get("score")
            .filter(|v| !v.is_null())
            .ok_or_else(|| InvalidInputError::missing(path.as_str()))
            .and_then(|v| {
                as_number(v).ok_or_else(|| InvalidInputError::new(path.as_str(), "must be a finite number"))
            })?;
        if !(0.0..=4.0).contains(&score) {
            return Err(InvalidInputError::new(path, "must be between 0 and 4"));
        }

        total += score;
        if score == 0.0 || score == 4.0 {
            abnormal += 1;
        }
        if let Some(name) = reflex.get("name").and_then(Value::as_str) {
            by_name.entry(name).or_default().push(score);
        }
    }

    let asymmetric = by_name
        .values()
        .filter(|scores| scores.windows(2).any(|pair| pair[0] != pair[1]))
        .count();

    let status = if abnormal > 0 {
        "Abnormal reflex detected"
    } else if asymmetric > 0 {
        "Asymmetry detected"
    } else {
        "Normal"
    };

    let mut derived = DerivedFields::new();
    derived.insert("totalScore", Some(total));
    derived.insert("averageScore", Some(total / reflexes.len() as f64));
    derived.insert("abnormalCount", Some(abnormal as f64));
    derived.insert("asymmetricCount", Some(asymmetric as f64));

    Ok(Computed::new(derived).with_status(status))
}
