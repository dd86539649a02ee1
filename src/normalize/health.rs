//! Health-related fitness: the Cooper run and catalog-defined assessments

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::Computed;
use crate::error::InvalidInputError;
use crate::formula::{FormulaEngine, FormulaError};
use crate::hrf::{FieldKind, HrfCatalog, HrfTestDefinition};
use crate::inputs::{as_number, RawInputs};
use crate::models::DerivedFields;

/// Fitness category for a Cooper VO2 max estimate
pub fn cooper_category(vo2_max: f64) -> &'static str {
    if vo2_max >= 55.0 {
        "excellent"
    } else if vo2_max >= 50.0 {
        "very_good"
    } else if vo2_max >= 45.0 {
        "good"
    } else if vo2_max < 35.0 {
        "poor"
    } else {
        "average"
    }
}

/// Twelve-minute run: VO2 max = (distance − 504.9) / 44.73, to 2 dp
pub(crate) fn cooper(inputs: &RawInputs) -> Result<Computed, InvalidInputError> {
    let distance = inputs.require_positive("distance")?;
    let vo2_max = ((distance - 504.9) / 44.73 * 100.0).round() / 100.0;

    let mut derived = DerivedFields::new();
    derived.insert("vo2Max", Some(vo2_max));
    derived.insert(
        "lapsCompleted",
        inputs.optional_number("lapsCompleted").filter(|l| *l >= 0.0),
    );

    Ok(Computed::new(derived).with_status(cooper_category(vo2_max)))
}

fn check_field_value(
    value: &Value,
    kind: FieldKind,
    options: &[String],
    path: &str,
) -> Result<Option<f64>, InvalidInputError> {
    match kind {
        FieldKind::Number | FieldKind::Time => as_number(value)
            .map(Some)
            .ok_or_else(|| InvalidInputError::new(path, "must be a finite number")),
        FieldKind::Boolean => match value {
            Value::Bool(_) => Ok(None),
            _ => Err(InvalidInputError::new(path, "must be true or false")),
        },
        FieldKind::Text => match value {
            Value::String(_) => Ok(None),
            _ => Err(InvalidInputError::new(path, "must be text")),
        },
        FieldKind::Dropdown => match value.as_str() {
            Some(choice) if options.is_empty() || options.iter().any(|o| o == choice) => Ok(None),
            _ => Err(InvalidInputError::new(
                path,
                format!("must be one of: {}", options.join(", ")),
            )),
        },
    }
}

/// Validated numeric values of the definition's data fields
fn collect_values(
    definition: &HrfTestDefinition,
    values: &Map<String, Value>,
) -> Result<BTreeMap<String, f64>, InvalidInputError> {
    let mut numbers = BTreeMap::new();

    for field in &definition.data_fields {
        let path = format!("values.{}", field.id);
        let Some(value) = values.get(&field.id).filter(|v| !v.is_null()) else {
            if field.required {
                return Err(InvalidInputError::missing(path));
            }
            continue;
        };

        let Some(number) = check_field_value(value, field.kind, &field.options, &path)? else {
            continue;
        };
        match (field.min, field.max) {
            (Some(min), Some(max)) if number < min || number > max => {
                return Err(InvalidInputError::new(path, format!("must be between {} and {}", min, max)));
            }
            (Some(min), None) if number < min => {
                return Err(InvalidInputError::new(path, format!("must be at least {}", min)));
            }
            (None, Some(max)) if number > max => {
                return Err(InvalidInputError::new(path, format!("must be at most {}", max)));
            }
            _ => {}
        }
        numbers.insert(field.id.clone(), number);
    }
    Ok(numbers)
}

/// Assessment against a catalog definition: `{testId, values: {fieldId: value}}`.
///
/// Each calculation becomes a derived field. A calculation reading an absent
/// optional value, or producing a non-finite result, is null.
pub(crate) fn assessment(
    inputs: &RawInputs,
    catalog: &HrfCatalog,
) -> Result<Computed, InvalidInputError> {
    let test_id = match inputs.get("testId") {
        None => return Err(InvalidInputError::missing("testId")),
        Some(Value::String(id)) => id.as_str(),
        Some(_) => return Err(InvalidInputError::new("testId", "must be a string")),
    };
    let definition = catalog
        .get(test_id)
        .ok_or_else(|| InvalidInputError::new("testId", format!("unknown assessment '{}'", test_id)))?;

    let empty = Map::new();
    let values = match inputs.get("values") {
        None => &empty,
        Some(Value::Object(map)) => map,
        Some(_) => return Err(InvalidInputError::new("values", "expected a JSON object")),
    };

    let mut numbers = collect_values(definition, values)?;
    let mut derived = DerivedFields::new();

    for calc in &definition.calculations {
        let value = match FormulaEngine::evaluate(&calc.formula, &numbers) {
            Ok(v) => Some(v),
            Err(FormulaError::UnknownVariable(name)) => {
                tracing::debug!(calculation = %calc.id, missing = %name, "Skipping calculation");
                None
            }
            Err(err) => {
                tracing::warn!(
                    test_id,
                    calculation = %calc.id,
                    error = %err,
                    "Assessment calculation failed"
                );
                None
            }
        };
        if let Some(v) = value {
            numbers.insert(calc.id.clone(), v);
        }
        derived.insert(&calc.id, value);
    }

    Ok(Computed::new(derived))
}
