//! Mental-neural training drills
//!
//! A drill describes an exercise and its default session settings. Sessions
//! are stored as `MentalNeuralSession` test records whose inputs name the
//! drill with `drillId`.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::InvalidInputError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrillCategory {
    Reaction,
    Focus,
    Coordination,
    Memory,
    DualTask,
    Attention,
    ProcessingSpeed,
}

impl DrillCategory {
    pub const ALL: [DrillCategory; 7] = [
        DrillCategory::Reaction,
        DrillCategory::Focus,
        DrillCategory::Coordination,
        DrillCategory::Memory,
        DrillCategory::DualTask,
        DrillCategory::Attention,
        DrillCategory::ProcessingSpeed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DrillCategory::Reaction => "reaction",
            DrillCategory::Focus => "focus",
            DrillCategory::Coordination => "coordination",
            DrillCategory::Memory => "memory",
            DrillCategory::DualTask => "dual_task",
            DrillCategory::Attention => "attention",
            DrillCategory::ProcessingSpeed => "processing_speed",
        }
    }
}

impl fmt::Display for DrillCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DrillCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        DrillCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| format!("Unknown drill category: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            _ => Err(format!("Unknown difficulty: {}", s)),
        }
    }
}

/// Default settings of a session run with a drill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DrillConfig {
    /// Seconds
    pub duration: u32,
    pub trials: u32,
    /// Seconds between trials
    pub rest_between_trials: u32,
    pub difficulty: Difficulty,
    pub audio_enabled: bool,
    pub visual_cues: bool,
    /// Milliseconds
    pub stimulus_delay: u32,
    /// Milliseconds
    pub response_timeout: u32,
    /// Percent
    pub target_accuracy: f64,
    /// Milliseconds
    pub target_reaction_time: f64,
}

impl Default for DrillConfig {
    fn default() -> Self {
        Self {
            duration: 300,
            trials: 10,
            rest_between_trials: 3,
            difficulty: Difficulty::Intermediate,
            audio_enabled: true,
            visual_cues: true,
            stimulus_delay: 2000,
            response_timeout: 2000,
            target_accuracy: 80.0,
            target_reaction_time: 500.0,
        }
    }
}

/// Reference session results for one difficulty level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Norm {
    pub avg_reaction_time: f64,
    pub accuracy: f64,
    pub completion_time: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormativeData {
    pub beginner: Norm,
    pub intermediate: Norm,
    pub advanced: Norm,
}

impl Default for NormativeData {
    fn default() -> Self {
        Self {
            beginner: Norm {
                avg_reaction_time: 600.0,
                accuracy: 70.0,
                completion_time: 300.0,
            },
            intermediate: Norm {
                avg_reaction_time: 450.0,
                accuracy: 80.0,
                completion_time: 250.0,
            },
            advanced: Norm {
                avg_reaction_time: 350.0,
                accuracy: 90.0,
                completion_time: 200.0,
            },
        }
    }
}

impl NormativeData {
    pub fn for_level(&self, difficulty: Difficulty) -> &Norm {
        match difficulty {
            Difficulty::Beginner => &self.beginner,
            Difficulty::Intermediate => &self.intermediate,
            Difficulty::Advanced => &self.advanced,
        }
    }
}

/// A catalog entry sessions are run against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drill {
    pub id: String,
    pub name: String,
    pub category: DrillCategory,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Seconds
    #[serde(default = "default_duration")]
    pub estimated_duration: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub equipment_required: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default)]
    pub config: DrillConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub normative_data: NormativeData,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_duration() -> u32 {
    300
}

fn default_active() -> bool {
    true
}

impl Drill {
    pub fn new(name: impl Into<String>, category: DrillCategory) -> Result<Self, InvalidInputError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(InvalidInputError::new("name", "drill name cannot be empty"));
        }

        let now = Utc::now().trunc_subsecs(6);
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            category,
            description: String::new(),
            difficulty: Difficulty::default(),
            estimated_duration: default_duration(),
            equipment_required: Vec::new(),
            instructions: None,
            config: DrillConfig::default(),
            tags: Vec::new(),
            is_active: true,
            normative_data: NormativeData::default(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Reference results at this drill's own difficulty
    pub fn norm(&self) -> &Norm {
        self.normative_data.for_level(self.difficulty)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now().trunc_subsecs(6);
    }
}

/// Filters for drill listings
#[derive(Debug, Clone, Default)]
pub struct DrillQuery {
    pub category: Option<DrillCategory>,
    pub difficulty: Option<Difficulty>,
    pub active_only: bool,
}

impl DrillQuery {
    pub fn category(mut self, category: DrillCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    pub fn active_only(mut self) -> Self {
        self.active_only = true;
        self
    }

    pub fn matches(&self, drill: &Drill) -> bool {
        self.category.map_or(true, |c| drill.category == c)
            && self.difficulty.map_or(true, |d| drill.difficulty == d)
            && (!self.active_only || drill.is_active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_drill_defaults() {
        let drill = Drill::new("Light Board", DrillCategory::Reaction).unwrap();
        assert_eq!(drill.difficulty, Difficulty::Beginner);
        assert_eq!(drill.config.trials, 10);
        assert_eq!(drill.config.response_timeout, 2000);
        assert_eq!(drill.norm().avg_reaction_time, 600.0);
        assert!(drill.is_active);

        assert!(Drill::new("  ", DrillCategory::Focus).is_err());
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let drill: Drill = serde_json::from_value(json!({
            "id": "d1",
            "name": "Dual Count",
            "category": "dual_task",
            "difficulty": "advanced",
            "config": {"trials": 20},
            "createdAt": "2024-04-01T08:00:00Z",
            "updatedAt": "2024-04-01T08:00:00Z"
        }))
        .unwrap();

        assert_eq!(drill.config.trials, 20);
        assert_eq!(drill.config.target_reaction_time, 500.0);
        assert_eq!(drill.estimated_duration, 300);
        assert_eq!(drill.norm().accuracy, 90.0);
    }

    #[test]
    fn test_query_matches() {
        let mut drill = Drill::new("Stroop", DrillCategory::Attention)
            .unwrap()
            .with_difficulty(Difficulty::Intermediate);

        assert!(DrillQuery::default().matches(&drill));
        assert!(DrillQuery::default().category(DrillCategory::Attention).matches(&drill));
        assert!(!DrillQuery::default().difficulty(Difficulty::Advanced).matches(&drill));

        drill.is_active = false;
        assert!(DrillQuery::default().matches(&drill));
        assert!(!DrillQuery::default().active_only().matches(&drill));
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!("processing-speed".parse::<DrillCategory>().unwrap(), DrillCategory::ProcessingSpeed);
        assert_eq!("ADVANCED".parse::<Difficulty>().unwrap(), Difficulty::Advanced);
        assert!("juggling".parse::<DrillCategory>().is_err());
    }
}
