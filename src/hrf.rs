//! Health-related fitness test definitions
//!
//! A definition lists the data fields an assessment collects and the
//! calculations derived from them. A calculation is a formula over numeric
//! field ids and the ids of calculations listed before it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::formula::{FormulaEngine, FormulaError, FormulaResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HrfCategory {
    BodyComposition,
    AerobicEndurance,
    StrengthEndurance,
    Flexibility,
    Balance,
}

impl HrfCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            HrfCategory::BodyComposition => "body_composition",
            HrfCategory::AerobicEndurance => "aerobic_endurance",
            HrfCategory::StrengthEndurance => "strength_endurance",
            HrfCategory::Flexibility => "flexibility",
            HrfCategory::Balance => "balance",
        }
    }
}

impl fmt::Display for HrfCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HrfCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "body_composition" => Ok(HrfCategory::BodyComposition),
            "aerobic_endurance" => Ok(HrfCategory::AerobicEndurance),
            "strength_endurance" => Ok(HrfCategory::StrengthEndurance),
            "flexibility" => Ok(HrfCategory::Flexibility),
            "balance" => Ok(HrfCategory::Balance),
            _ => Err(format!("Unknown assessment category: {}", s)),
        }
    }
}

/// Kind of value a data field holds; only numeric kinds feed formulas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    #[default]
    Number,
    /// Elapsed time in seconds
    Time,
    Text,
    Dropdown,
    Boolean,
}

impl FieldKind {
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldKind::Number | FieldKind::Time)
    }
}

/// One value collected during an assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataField {
    pub id: String,
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Allowed values of a dropdown
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl DataField {
    pub fn number(id: &str, name: &str, unit: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind: FieldKind::Number,
            unit: Some(unit.to_string()),
            required: true,
            min: None,
            max: None,
            options: Vec::new(),
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn at_least(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn between(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn dropdown(id: &str, name: &str, options: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind: FieldKind::Dropdown,
            unit: None,
            required: false,
            min: None,
            max: None,
            options: options.iter().map(|o| o.to_string()).collect(),
        }
    }

    pub fn text(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind: FieldKind::Text,
            unit: None,
            required: false,
            min: None,
            max: None,
            options: Vec::new(),
        }
    }
}

/// A derived value; `id` becomes the derived field name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Calculation {
    pub id: String,
    pub name: String,
    pub formula: String,
    pub unit: String,
    /// Ids the formula reads; informational, checked against the formula
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

impl Calculation {
    pub fn new(id: &str, name: &str, formula: &str, unit: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            formula: formula.to_string(),
            unit: unit.to_string(),
            depends_on: FormulaEngine::extract_variables(formula),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HrfTestDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: HrfCategory,
    #[serde(default)]
    pub data_fields: Vec<DataField>,
    #[serde(default)]
    pub calculations: Vec<Calculation>,
}

impl HrfTestDefinition {
    pub fn field(&self, id: &str) -> Option<&DataField> {
        self.data_fields.iter().find(|f| f.id == id)
    }

    /// Ids must be unique, and each formula may only read numeric fields and
    /// earlier calculations
    pub fn validate(&self) -> FormulaResult<()> {
        let fail = |reason: String| Err(FormulaError::ValidationFailed(format!("{}: {}", self.id, reason)));

        if self.id.trim().is_empty() {
            return Err(FormulaError::ValidationFailed(
                "assessment id cannot be empty".to_string(),
            ));
        }

        let mut seen = BTreeSet::new();
        let mut readable = BTreeSet::new();
        for field in &self.data_fields {
            if !seen.insert(field.id.as_str()) {
                return fail(format!("duplicate id '{}'", field.id));
            }
            if field.kind.is_numeric() {
                readable.insert(field.id.as_str());
            }
        }

        for calc in &self.calculations {
            if !seen.insert(calc.id.as_str()) {
                return fail(format!("duplicate id '{}'", calc.id));
            }
            FormulaEngine::validate_formula(&calc.formula).or_else(|e| fail(format!("{}: {}", calc.id, e)))?;

            let variables = FormulaEngine::extract_variables(&calc.formula);
            if let Some(unknown) = variables.iter().find(|v| !readable.contains(v.as_str())) {
                return fail(format!("{} reads unknown value '{}'", calc.id, unknown));
            }
            if let Some(extra) = calc.depends_on.iter().find(|d| !readable.contains(d.as_str())) {
                return fail(format!("{} depends on unknown value '{}'", calc.id, extra));
            }
            readable.insert(calc.id.as_str());
        }
        Ok(())
    }
}

/// Injectable set of assessment definitions, keyed by id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HrfCatalog {
    tests: Vec<HrfTestDefinition>,
}

impl Default for HrfCatalog {
    fn default() -> Self {
        Self {
            tests: vec![
                HrfTestDefinition {
                    id: "shuttle-run-20m".to_string(),
                    name: "20m Shuttle Run".to_string(),
                    description: "Multistage shuttle run to exhaustion".to_string(),
                    category: HrfCategory::AerobicEndurance,
                    data_fields: vec![
                        DataField::number("finalLevel", "Final level", "level").at_least(1.0),
                        DataField::number("finalShuttles", "Final shuttles", "shuttles").optional(),
                        DataField::number("totalShuttles", "Total shuttles", "shuttles").optional(),
                    ],
                    calculations: vec![
                        Calculation::new("speed", "Speed reached", "8 + 0.5 * (finalLevel - 1)", "km/h"),
                        Calculation::new("vo2Max", "Estimated VO2 max", "31.025 + 3.238 * speed", "ml/kg/min"),
                    ],
                },
                HrfTestDefinition {
                    id: "sit-and-reach".to_string(),
                    name: "Sit-and-Reach".to_string(),
                    description: "Hamstring and lower back flexibility over three trials".to_string(),
                    category: HrfCategory::Flexibility,
                    data_fields: vec![
                        DataField::number("trial1", "Trial 1", "cm"),
                        DataField::number("trial2", "Trial 2", "cm"),
                        DataField::number("trial3", "Trial 3", "cm"),
                    ],
                    calculations: vec![Calculation::new(
                        "averageReach",
                        "Average of trials",
                        "(trial1 + trial2 + trial3) / 3",
                        "cm",
                    )],
                },
                HrfTestDefinition {
                    id: "y-balance".to_string(),
                    name: "Y-Balance Reach Test".to_string(),
                    description: "Average reach in three directions on one leg".to_string(),
                    category: HrfCategory::Balance,
                    data_fields: vec![
                        DataField::dropdown("legTested", "Leg tested", &["left", "right"]),
                        DataField::number("anterior", "Anterior reach", "cm").at_least(0.0),
                        DataField::number("posteromedial", "Posteromedial reach", "cm").at_least(0.0),
                        DataField::number("posterolateral", "Posterolateral reach", "cm").at_least(0.0),
                    ],
                    calculations: vec![Calculation::new(
                        "compositeScore",
                        "Composite reach score",
                        "(anterior + posteromedial + posterolateral) / 3",
                        "cm",
                    )],
                },
                HrfTestDefinition {
                    id: "one-rm".to_string(),
                    name: "1RM Testing".to_string(),
                    description: "One repetition maximum relative to body mass".to_string(),
                    category: HrfCategory::StrengthEndurance,
                    data_fields: vec![
                        DataField::number("bodyMass", "Body mass", "kg").at_least(1.0),
                        DataField::text("liftType", "Lift type"),
                        DataField::number("warmupWeight", "Warm-up weight", "kg").optional(),
                        DataField::number("oneRm", "1RM", "kg").at_least(0.0),
                        DataField::number("rpe", "Rate of perceived exertion", "RPE")
                            .optional()
                            .between(1.0, 10.0),
                    ],
                    calculations: vec![Calculation::new(
                        "relativeStrength",
                        "Relative strength",
                        "oneRm / bodyMass",
                        "kg/kg",
                    )],
                },
                skinfold("skinfold-7-site-male", "male", "1.112 - 0.00043499 * sum7 + 0.00000055 * sum7 ^ 2 - 0.00028826 * age"),
                skinfold("skinfold-7-site-female", "female", "1.097 - 0.00046971 * sum7 + 0.00000056 * sum7 ^ 2 - 0.00012828 * age"),
            ],
        }
    }
}

/// Jackson-Pollock seven-site skinfold with the sex-specific density equation
fn skinfold(id: &str, sex: &str, density: &str) -> HrfTestDefinition {
    let sites = ["chest", "axilla", "tricep", "subscapular", "abdomen", "suprailiac", "thigh"];
    let mut data_fields: Vec<DataField> = sites
        .iter()
        .map(|site| DataField::number(site, site, "mm").at_least(0.0))
        .collect();
    data_fields.push(DataField::number("age", "Age", "years").between(1.0, 120.0));

    HrfTestDefinition {
        id: id.to_string(),
        name: format!("7-Site Skinfold ({})", sex),
        description: "Body fat estimate from seven skinfold sites".to_string(),
        category: HrfCategory::BodyComposition,
        data_fields,
        calculations: vec![
            Calculation::new("sum7", "Sum of 7 skinfolds", &sites.join(" + "), "mm"),
            Calculation::new("bodyDensity", "Body density", density, "g/cm3"),
            Calculation::new("bodyFatPercent", "Body fat", "495 / bodyDensity - 450", "%"),
        ],
    }
}

impl HrfCatalog {
    pub fn new(tests: Vec<HrfTestDefinition>) -> Self {
        Self { tests }
    }

    pub fn tests(&self) -> &[HrfTestDefinition] {
        &self.tests
    }

    pub fn get(&self, id: &str) -> Option<&HrfTestDefinition> {
        self.tests.iter().find(|t| t.id == id)
    }

    pub fn by_category(&self, category: HrfCategory) -> impl Iterator<Item = &HrfTestDefinition> {
        self.tests.iter().filter(move |t| t.category == category)
    }

    /// Replace definitions with the same id, appending new ones
    pub fn merge(&mut self, overrides: impl IntoIterator<Item = HrfTestDefinition>) {
        for test in overrides {
            match self.tests.iter_mut().find(|t| t.id == test.id) {
                Some(existing) => {
                    tracing::debug!(id = %test.id, "Overriding assessment definition");
                    *existing = test;
                }
                None => self.tests.push(test),
            }
        }
    }

    pub fn validate(&self) -> FormulaResult<()> {
        self.tests.iter().try_for_each(HrfTestDefinition::validate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_is_valid() {
        let catalog = HrfCatalog::default();
        catalog.validate().unwrap();
        assert!(catalog.get("shuttle-run-20m").is_some());
        assert_eq!(catalog.by_category(HrfCategory::BodyComposition).count(), 2);
    }

    #[test]
    fn test_formula_reading_a_later_calculation_is_rejected() {
        let definition = HrfTestDefinition {
            id: "broken".to_string(),
            name: "Broken".to_string(),
            description: String::new(),
            category: HrfCategory::Balance,
            data_fields: vec![DataField::number("reach", "Reach", "cm")],
            calculations: vec![
                Calculation::new("a", "A", "b * 2", "cm"),
                Calculation::new("b", "B", "reach", "cm"),
            ],
        };
        let err = definition.validate().unwrap_err();
        assert!(err.to_string().contains("unknown value 'b'"));
    }

    #[test]
    fn test_text_fields_cannot_feed_formulas() {
        let definition = HrfTestDefinition {
            id: "lift".to_string(),
            name: "Lift".to_string(),
            description: String::new(),
            category: HrfCategory::StrengthEndurance,
            data_fields: vec![DataField::text("liftType", "Lift type")],
            calculations: vec![Calculation::new("x", "X", "liftType * 2", "kg")],
        };
        assert!(definition.validate().is_err());
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let definition = HrfTestDefinition {
            id: "dup".to_string(),
            name: "Dup".to_string(),
            description: String::new(),
            category: HrfCategory::Flexibility,
            data_fields: vec![DataField::number("reach", "Reach", "cm")],
            calculations: vec![Calculation::new("reach", "Reach again", "reach", "cm")],
        };
        assert!(definition.validate().is_err());
    }

    #[test]
    fn test_merge_replaces_by_id() {
        let mut catalog = HrfCatalog::default();
        let before = catalog.tests().len();

        let mut sit_and_reach = catalog.get("sit-and-reach").cloned().unwrap();
        sit_and_reach.name = "Modified Sit-and-Reach".to_string();
        catalog.merge(vec![sit_and_reach]);
        assert_eq!(catalog.tests().len(), before);
        assert_eq!(catalog.get("sit-and-reach").unwrap().name, "Modified Sit-and-Reach");

        catalog.merge(vec![HrfTestDefinition {
            id: "plank".to_string(),
            name: "Plank Hold".to_string(),
            description: String::new(),
            category: HrfCategory::StrengthEndurance,
            data_fields: vec![DataField::number("hold", "Hold time", "s")],
            calculations: Vec::new(),
        }]);
        assert_eq!(catalog.tests().len(), before + 1);
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!("body-composition".parse::<HrfCategory>().unwrap(), HrfCategory::BodyComposition);
        assert!("cardio".parse::<HrfCategory>().is_err());
    }
}
