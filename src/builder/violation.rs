//! The constraint-violation contract of generated builders.
//!
//! Failures are never reported one at a time: a build evaluates every check of
//! every member and hands back all of them as one [`ConstraintViolations`].
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Number;

use crate::model::traits::RangeBound;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViolationCategory {
    MissingRequired,
    Length,
    Range,
    Pattern,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "category", rename_all = "camelCase")]
pub enum ViolationKind {
    MissingRequired,
    Length { length: u64, min: Option<u64>, max: Option<u64> },
    Range { value: Number, min: Option<RangeBound>, max: Option<RangeBound> },
    Pattern { value: String, pattern: String },
}

impl ViolationKind {
    pub fn category(&self) -> ViolationCategory {
        match self {
            ViolationKind::MissingRequired => ViolationCategory::MissingRequired,
            ViolationKind::Length { .. } => ViolationCategory::Length,
            ViolationKind::Range { .. } => ViolationCategory::Range,
            ViolationKind::Pattern { .. } => ViolationCategory::Pattern,
        }
    }

    /// The "Member must ..." half of the message.
    pub fn describe(&self) -> String {
        match self {
            ViolationKind::MissingRequired => "Member must not be null".to_string(),
            ViolationKind::Length { min, max, .. } => {
                format!("Member must have length {}", bounds(min.map(|m| m.to_string()), max.map(|m| m.to_string())))
            }
            ViolationKind::Range { min, max, .. } => {
                format!("Member must be {}", bounds(min.map(|m| m.to_string()), max.map(|m| m.to_string())))
            }
            ViolationKind::Pattern { pattern, .. } => {
                format!("Member must satisfy regular expression pattern: {pattern}")
            }
        }
    }
}

fn bounds(min: Option<String>, max: Option<String>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("between {min} and {max}, inclusive"),
        (Some(min), None) => format!("greater than or equal to {min}"),
        (None, Some(max)) => format!("less than or equal to {max}"),
        (None, None) => "unbounded".to_string(),
    }
}

/// One failed check, located by a JSON-pointer-like path from the root of the
/// value being built (`/items/0/name`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstraintViolation {
    pub path: String,
    #[serde(flatten)]
    pub kind: ViolationKind,
}

impl ConstraintViolation {
    pub fn new(path: impl Into<String>, kind: ViolationKind) -> Self {
        Self { path: path.into(), kind }
    }

    pub fn category(&self) -> ViolationCategory {
        self.kind.category()
    }
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ViolationKind::Length { length, .. } => write!(
                f,
                "Value with length {length} at '{}' failed to satisfy constraint: {}",
                self.path,
                self.kind.describe()
            ),
            _ => write!(
                f,
                "Value at '{}' failed to satisfy constraint: {}",
                self.path,
                self.kind.describe()
            ),
        }
    }
}

/// Every violation found while building one value, in member declaration order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct ConstraintViolations(Vec<ConstraintViolation>);

impl ConstraintViolations {
    pub fn push(&mut self, violation: ConstraintViolation) {
        self.0.push(violation);
    }

    pub fn extend(&mut self, other: ConstraintViolations) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn iter(&self) -> std::slice::Iter<'_, ConstraintViolation> { self.0.iter() }

    pub fn categories(&self) -> Vec<ViolationCategory> {
        self.0.iter().map(ConstraintViolation::category).collect()
    }

    /// `Err(self)` unless nothing was collected.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl<'a> IntoIterator for &'a ConstraintViolations {
    type Item = &'a ConstraintViolation;
    type IntoIter = std::slice::Iter<'a, ConstraintViolation>;
    fn into_iter(self) -> Self::IntoIter { self.0.iter() }
}

impl fmt::Display for ConstraintViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.0.len();
        write!(f, "{n} validation error{} detected. ", if n == 1 { "" } else { "s" })?;
        let messages: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ConstraintViolations {}

/// Why a reference build did not produce a value.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Violations(#[from] ConstraintViolations),

    /// The candidate value has the wrong JSON type for the member; generated
    /// builders rule this out statically through typed setters.
    #[error("value at '{path}' is not a valid {expected}")]
    TypeMismatch { path: String, expected: &'static str },

    #[error("builder input has no member named `{member}`")]
    UnknownMember { member: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_use_validation_exception_wording() {
        let v = ConstraintViolation::new(
            "/id",
            ViolationKind::Length { length: 0, min: Some(1), max: Some(36) },
        );
        assert_eq!(
            v.to_string(),
            "Value with length 0 at '/id' failed to satisfy constraint: Member must have length between 1 and 36, inclusive"
        );

        let v = ConstraintViolation::new("/count", ViolationKind::Range { value: 150.into(), min: None, max: Some(RangeBound::Int(100)) });
        assert_eq!(
            v.to_string(),
            "Value at '/count' failed to satisfy constraint: Member must be less than or equal to 100"
        );
    }

    #[test]
    fn aggregate_message_lists_every_violation() {
        let mut all = ConstraintViolations::default();
        all.push(ConstraintViolation::new("/a", ViolationKind::MissingRequired));
        all.push(ConstraintViolation::new(
            "/b",
            ViolationKind::Pattern { value: "x".into(), pattern: "^y$".into() },
        ));
        assert_eq!(
            all.to_string(),
            "2 validation errors detected. Value at '/a' failed to satisfy constraint: Member must not be null; \
             Value at '/b' failed to satisfy constraint: Member must satisfy regular expression pattern: ^y$"
        );
        assert_eq!(all.categories(), [ViolationCategory::MissingRequired, ViolationCategory::Pattern]);
        assert!(all.into_result().is_err());
    }
}
