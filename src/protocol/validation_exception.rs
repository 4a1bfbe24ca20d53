use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Value};

use crate::builder::violation::ConstraintViolations;

/// A protocol-level error response, before serialisation to bytes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireError {
    pub status: u16,
    pub error_type: String,
    pub headers: IndexMap<String, String>,
    pub document: Value,
}

/// Turns the violations of a failed build into the body of the exception
/// shape the protocol reports them with.
pub trait ValidationExceptionConversion: Send + Sync {
    fn status(&self) -> u16 {
        400
    }

    fn document(&self, violations: &ConstraintViolations) -> Value;
}

/// `smithy.framework#ValidationException`: a summary message plus one
/// `{path, message}` entry per violation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmithyValidationExceptionConversion;

impl ValidationExceptionConversion for SmithyValidationExceptionConversion {
    fn document(&self, violations: &ConstraintViolations) -> Value {
        let field_list: Vec<Value> = violations
            .iter()
            .map(|v| json!({ "path": v.path, "message": v.to_string() }))
            .collect();
        json!({
            "message": violations.to_string(),
            "fieldList": field_list,
        })
    }
}
