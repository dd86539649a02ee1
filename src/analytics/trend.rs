//! Deadband trend classification
//!
//! Changes are measured relative to the older value, so metrics in
//! milliseconds, centimetres and percent share one tolerance.

use crate::models::{Direction, Trend};

/// Signed relative change in percent, positive when `recent` is better.
///
/// `None` when the older value cannot serve as a baseline.
pub fn favorable_change(older: f64, recent: f64, direction: Direction) -> Option<f64> {
    if older == 0.0 || !older.is_finite() || !recent.is_finite() {
        return None;
    }

    let change = (recent - older) / older.abs() * 100.0;
    Some(match direction {
        Direction::LowerIsBetter => -change,
        Direction::HigherIsBetter => change,
    })
}

/// Classify a change with an inclusive deadband
pub fn classify_change(older: f64, recent: f64, direction: Direction, deadband_pct: f64) -> Trend {
    match favorable_change(older, recent, direction) {
        Some(change) if change > 0.0 && change >= deadband_pct => Trend::Improving,
        Some(change) if change < 0.0 && -change >= deadband_pct => Trend::Declining,
        _ => Trend::Stable,
    }
}

/// Rounded percent improvement; zero when there is no usable baseline
pub fn improvement_rate(older: f64, recent: f64, direction: Direction) -> i64 {
    favorable_change(older, recent, direction)
        .map(|change| change.round() as i64)
        .unwrap_or(0)
}

/// Strict majority vote over per-metric trends
pub fn majority(trends: &[Trend]) -> Trend {
    let improving = trends.iter().filter(|t| **t == Trend::Improving).count();
    let declining = trends.iter().filter(|t| **t == Trend::Declining).count();

    if improving * 2 > trends.len() {
        Trend::Improving
    } else if declining * 2 > trends.len() {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

/// Trend of a new value against the mean of earlier values of the same test
pub fn history_trend(current: f64, previous: &[f64], direction: Direction, deadband_pct: f64) -> Trend {
    match super::mean_or_zero(previous) {
        baseline if previous.is_empty() || baseline == 0.0 => Trend::Stable,
        baseline => classify_change(baseline, current, direction, deadband_pct),
    }
}
