//! Assessment formula engine
//!
//! Formulas are plain arithmetic over named values: `+ - * / ^`, parentheses,
//! decimal literals and identifiers such as `sum7` or `finalLevel`. Parsing and
//! evaluation go through `evalexpr`; every literal is evaluated as a float so
//! `1 / 2` is `0.5`, not integer division.

use evalexpr::ContextWithMutableVariables;
use std::collections::BTreeMap;
use thiserror::Error;

/// Formula engine errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormulaError {
    #[error("Invalid formula syntax: {0}")]
    InvalidSyntax(String),

    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    #[error("Evaluation error: {0}")]
    EvaluationError(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

pub type FormulaResult<T> = Result<T, FormulaError>;

const OPERATORS: &str = "+-*/^() ";

enum Token<'a> {
    Identifier(&'a str),
    Number(&'a str),
    Symbol(char),
}

/// Split a formula into identifiers, numeric literals and operator symbols
fn tokenize(formula: &str) -> FormulaResult<Vec<Token<'_>>> {
    let bytes = formula.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        let start = i;
        if c.is_ascii_alphabetic() || c == '_' {
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            tokens.push(Token::Identifier(&formula[start..i]));
        } else if c.is_ascii_digit() || c == '.' {
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                i += 1;
            }
            tokens.push(Token::Number(&formula[start..i]));
        } else if OPERATORS.contains(c) {
            tokens.push(Token::Symbol(c));
            i += 1;
        } else {
            return Err(FormulaError::InvalidSyntax(format!(
                "Invalid character in formula: '{}'",
                formula[i..].chars().next().unwrap_or(c)
            )));
        }
    }
    Ok(tokens)
}

/// Rewrite the formula so every literal is a float and reject function calls
fn float_expression(formula: &str) -> FormulaResult<String> {
    let tokens = tokenize(formula)?;
    let mut out = String::with_capacity(formula.len() + 8);

    for (index, token) in tokens.iter().enumerate() {
        match token {
            Token::Identifier(name) => {
                // evalexpr reads an identifier followed by a value as a call
                let called = tokens[index + 1..]
                    .iter()
                    .find(|t| !matches!(t, Token::Symbol(' ')))
                    .is_some_and(|t| !matches!(t, Token::Symbol(c) if *c != '('));
                if called {
                    return Err(FormulaError::InvalidSyntax(format!(
                        "Function calls are not supported: {}",
                        name
                    )));
                }
                out.push_str(name);
            }
            Token::Number(literal) => {
                if literal.matches('.').count() > 1 {
                    return Err(FormulaError::InvalidSyntax(format!(
                        "Malformed number: {}",
                        literal
                    )));
                }
                if literal.starts_with('.') {
                    out.push('0');
                }
                out.push_str(literal);
                if !literal.contains('.') {
                    out.push_str(".0");
                } else if literal.ends_with('.') {
                    out.push('0');
                }
            }
            Token::Symbol(c) => out.push(*c),
        }
    }
    Ok(out)
}

pub struct FormulaEngine;

impl FormulaEngine {
    /// Check characters, parentheses and syntax without evaluating
    pub fn validate_formula(formula: &str) -> FormulaResult<()> {
        if formula.trim().is_empty() {
            return Err(FormulaError::InvalidSyntax(
                "Formula cannot be empty".to_string(),
            ));
        }

        let mut depth = 0i32;
        for ch in formula.chars() {
            match ch {
                '(' => depth += 1,
                ')' => depth -= 1,
                _ => {}
            }
            if depth < 0 {
                return Err(FormulaError::InvalidSyntax(
                    "Unbalanced parentheses".to_string(),
                ));
            }
        }
        if depth != 0 {
            return Err(FormulaError::InvalidSyntax(
                "Unbalanced parentheses in formula".to_string(),
            ));
        }

        let expression = float_expression(formula)?;
        let _tree: evalexpr::Node = evalexpr::build_operator_tree(&expression)
            .map_err(|e| FormulaError::InvalidSyntax(e.to_string()))?;
        Ok(())
    }

    /// Identifiers referenced by a formula, in order of first use
    pub fn extract_variables(formula: &str) -> Vec<String> {
        let mut variables: Vec<String> = Vec::new();
        if let Ok(tokens) = tokenize(formula) {
            for token in tokens {
                if let Token::Identifier(name) = token {
                    if !variables.iter().any(|v| v == name) {
                        variables.push(name.to_string());
                    }
                }
            }
        }
        variables
    }

    /// Evaluate `formula` with the given variable values.
    ///
    /// Every referenced variable must be present. Non-finite results, such as
    /// a division by zero, are errors.
    pub fn evaluate(formula: &str, variables: &BTreeMap<String, f64>) -> FormulaResult<f64> {
        Self::validate_formula(formula)?;

        let mut context: evalexpr::HashMapContext = evalexpr::HashMapContext::new();
        for name in Self::extract_variables(formula) {
            let value = variables
                .get(&name)
                .copied()
                .ok_or_else(|| FormulaError::UnknownVariable(name.clone()))?;
            context
                .set_value(name, evalexpr::Value::Float(value))
                .map_err(|e| FormulaError::EvaluationError(e.to_string()))?;
        }

        let tree: evalexpr::Node = evalexpr::build_operator_tree(&float_expression(formula)?)
            .map_err(|e| FormulaError::InvalidSyntax(e.to_string()))?;
        let result = tree
            .eval_with_context(&context)
            .map_err(|e| FormulaError::EvaluationError(e.to_string()))?;

        let value = match result {
            evalexpr::Value::Float(v) => v,
            evalexpr::Value::Int(i) => i as f64,
            other => {
                return Err(FormulaError::EvaluationError(format!(
                    "Non-numeric result: {}",
                    other
                )))
            }
        };

        if !value.is_finite() {
            return Err(FormulaError::EvaluationError(format!(
                "Non-finite result: {}",
                value
            )));
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_formula_evaluate_simple_arithmetic() {
        let result = FormulaEngine::evaluate("(a + b + c) / 3", &vars(&[("a", 20.0), ("b", 22.0), ("c", 27.0)]));
        assert_eq!(result.unwrap(), 23.0);
    }

    #[test]
    fn test_integer_literals_divide_as_floats() {
        assert_eq!(FormulaEngine::evaluate("1 / 2", &BTreeMap::new()).unwrap(), 0.5);
        assert_eq!(FormulaEngine::evaluate("x * (3 / 4)", &vars(&[("x", 8.0)])).unwrap(), 6.0);
    }

    #[test]
    fn test_formula_evaluate_exponent_and_decimals() {
        let result = FormulaEngine::evaluate(
            "1.112 - 0.00043499 * sum7 + 0.00000055 * sum7 ^ 2 - 0.00028826 * age",
            &vars(&[("sum7", 100.0), ("age", 30.0)]),
        )
        .unwrap();
        let expected = 1.112 - 0.00043499 * 100.0 + 0.00000055 * 10_000.0 - 0.00028826 * 30.0;
        assert!((result - expected).abs() < 1e-12);
    }

    #[test]
    fn test_formula_evaluate_unknown_variable() {
        let err = FormulaEngine::evaluate("missing * 100", &BTreeMap::new()).unwrap_err();
        assert_eq!(err, FormulaError::UnknownVariable("missing".to_string()));
    }

    #[test]
    fn test_formula_evaluate_division_by_zero() {
        let err = FormulaEngine::evaluate("a / b", &vars(&[("a", 10.0), ("b", 0.0)])).unwrap_err();
        assert!(matches!(err, FormulaError::EvaluationError(_)));
    }

    #[test]
    fn test_formula_validate() {
        assert!(FormulaEngine::validate_formula("(duration * factor) + 1.5").is_ok());
        assert!(FormulaEngine::validate_formula("").is_err());
        assert!(FormulaEngine::validate_formula("(a + b").is_err());
        assert!(FormulaEngine::validate_formula("a; b").is_err());
        assert!(FormulaEngine::validate_formula("a b").is_err());
        assert!(matches!(
            FormulaEngine::validate_formula("floor (a)"),
            Err(FormulaError::InvalidSyntax(_))
        ));
    }

    #[test]
    fn test_formula_extract_variables() {
        assert_eq!(
            FormulaEngine::extract_variables("oneRm / bodyMass + oneRm * 0"),
            vec!["oneRm".to_string(), "bodyMass".to_string()]
        );
        assert!(FormulaEngine::extract_variables("2 * 3.5").is_empty());
    }
}
