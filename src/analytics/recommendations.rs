//! Fixed recommendation rules
//!
//! Rules are evaluated in table order against the aggregate metrics and every
//! rule that fires contributes one entry.

use crate::config::AnalyticsConfig;
use crate::models::{AnalyticsMetrics, Priority, Recommendation, TestCategory, Trend};

/// Inputs the rule table reads
#[derive(Debug, Clone, Copy)]
pub struct RuleInputs<'a> {
    pub category: TestCategory,
    pub metrics: &'a AnalyticsMetrics,
    pub overall_trend: Trend,
    /// Mean reaction accuracy, when reaction trials are in scope
    pub reaction_accuracy: Option<f64>,
}

fn recommendation(
    category: &str,
    title: &str,
    description: String,
    priority: Priority,
    action_items: &[&str],
) -> Recommendation {
    Recommendation {
        category: category.to_string(),
        title: title.to_string(),
        description,
        priority,
        action_items: action_items.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn synthesize(inputs: RuleInputs<'_>, config: &AnalyticsConfig) -> Vec<Recommendation> {
    let metrics = inputs.metrics;
    let mut out = Vec::new();

    if metrics.average_score < config.performance_cutoff {
        out.push(recommendation(
            "performance",
            "Improve Overall Performance",
            format!(
                "Your average {} score is below optimal levels.",
                inputs.category.phrase()
            ),
            Priority::High,
            &[
                "Focus on consistent training",
                "Review test preparation",
                "Consult with coach for technique improvement",
            ],
        ));
    }

    if let Some(accuracy) = inputs.reaction_accuracy {
        if accuracy < config.accuracy_cutoff {
            out.push(recommendation(
                "accuracy",
                "Improve Reaction Accuracy",
                format!(
                    "Your reaction accuracy is below the {}% target.",
                    config.accuracy_cutoff
                ),
                Priority::Medium,
                &[
                    "Prioritize correct responses over raw speed",
                    "Practice stimulus discrimination drills",
                    "Review trials with false starts",
                ],
            ));
        }
    }

    if metrics.consistency_score < config.consistency_cutoff {
        out.push(recommendation(
            "consistency",
            "Improve Performance Consistency",
            "Your performance shows high variability between tests.".to_string(),
            Priority::Medium,
            &[
                "Maintain regular training schedule",
                "Focus on technique consistency",
                "Monitor recovery and readiness",
            ],
        ));
    }

    if metrics.total_tests < config.min_tests {
        out.push(recommendation(
            "frequency",
            "Increase Testing Frequency",
            "More regular testing will provide better performance insights.".to_string(),
            Priority::Medium,
            &[
                "Schedule weekly performance tests",
                "Maintain testing consistency",
                "Track progress over time",
            ],
        ));
    }

    if inputs.overall_trend == Trend::Declining {
        out.push(recommendation(
            "trend",
            "Address Performance Decline",
            "Your performance trend shows recent decline.".to_string(),
            Priority::High,
            &[
                "Review recent training load",
                "Check for overtraining signs",
                "Adjust training intensity",
                "Focus on recovery",
            ],
        ));
    }

    out
}
