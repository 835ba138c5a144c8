use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single violated input constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub field: String,
    pub reason: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} — {}", self.field, self.reason)
    }
}

#[derive(Debug, Error)]
pub enum PayrollTaxError {
    #[error("Invalid input: {}", join_violations(.0))]
    Validation(Vec<Violation>),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Convergence failure: {function} did not converge after {iterations} iterations (delta: {last_delta})")]
    ConvergenceFailure {
        function: String,
        iterations: u32,
        last_delta: Decimal,
    },

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl PayrollTaxError {
    /// Shorthand for a validation error with a single violation.
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        PayrollTaxError::Validation(vec![Violation::new(field, reason)])
    }

    /// The violated constraints, empty for non-validation errors.
    pub fn violations(&self) -> &[Violation] {
        match self {
            PayrollTaxError::Validation(v) => v,
            _ => &[],
        }
    }
}

impl From<serde_json::Error> for PayrollTaxError {
    fn from(e: serde_json::Error) -> Self {
        PayrollTaxError::SerializationError(e.to_string())
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
