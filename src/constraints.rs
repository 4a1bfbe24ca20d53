//! Constraint analysis over the model.
//!
//! Decides which shapes are constrained, which can reach a constrained shape,
//! which checks a value of a shape has to pass, and rejects trait combinations
//! the generated code could never satisfy.
use std::cmp::Ordering;
use std::collections::BTreeSet;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::builder::violation::ViolationKind;
use crate::error::{CodegenError, Result};
use crate::model::traits::{LengthTrait, RangeTrait, LENGTH, PATTERN, RANGE};
use crate::model::{Model, Shape, ShapeId, ShapeKind, Walker, VALIDATION_EXCEPTION};

// ————————————————————————————————————————————————————————————————————————————
// CHECKS
// ————————————————————————————————————————————————————————————————————————————

/// One predicate a value of a constrained shape has to satisfy.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "check", rename_all = "camelCase")]
pub enum ConstraintCheck {
    Length {
        #[serde(flatten)]
        bounds: LengthTrait,
        unit: LengthUnit,
    },
    Range(RangeTrait),
    Pattern { pattern: String },
}

/// What a `@length` bound counts in a candidate JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LengthUnit {
    /// Unicode scalar values of a string.
    Chars,
    /// UTF-8 bytes of the JSON string carrying a blob's raw content.
    Bytes,
    /// Entries of a list or map.
    Elements,
}

impl LengthUnit {
    fn of(kind: &ShapeKind) -> Self {
        match kind {
            ShapeKind::Blob => LengthUnit::Bytes,
            ShapeKind::String => LengthUnit::Chars,
            _ => LengthUnit::Elements,
        }
    }
}

/// Checks attached to a (non-member) shape, in trait declaration order.
pub fn checks_for(shape: &Shape) -> Vec<ConstraintCheck> {
    shape
        .traits
        .ids()
        .filter_map(|id| match id {
            LENGTH => shape.traits.length().map(|bounds| ConstraintCheck::Length {
                bounds,
                unit: LengthUnit::of(&shape.kind),
            }),
            RANGE => shape.traits.range().map(ConstraintCheck::Range),
            PATTERN => shape
                .traits
                .pattern()
                .map(|p| ConstraintCheck::Pattern { pattern: p.to_string() }),
            _ => None,
        })
        .collect()
}

impl ConstraintCheck {
    /// Evaluate against a JSON value. `None` means the value passes (or is of a
    /// kind this check does not measure; type errors are reported elsewhere).
    pub fn evaluate(&self, value: &Value, compiled: Option<&Regex>) -> Option<ViolationKind> {
        match self {
            ConstraintCheck::Length { bounds, unit } => {
                let measured = measure_length(value, *unit)?;
                let below = bounds.min.is_some_and(|min| measured < min);
                let above = bounds.max.is_some_and(|max| measured > max);
                (below || above).then_some(ViolationKind::Length {
                    length: measured,
                    min: bounds.min,
                    max: bounds.max,
                })
            }
            ConstraintCheck::Range(range) => {
                let Value::Number(number) = value else { return None };
                let below = range.min.is_some_and(|min| min.compare(number) == Some(Ordering::Less));
                let above = range.max.is_some_and(|max| max.compare(number) == Some(Ordering::Greater));
                (below || above).then(|| ViolationKind::Range {
                    value: number.clone(),
                    min: range.min,
                    max: range.max,
                })
            }
            ConstraintCheck::Pattern { pattern } => {
                let text = value.as_str()?;
                let matched = match compiled {
                    Some(rx) => rx.is_match(text),
                    None => Regex::new(pattern).map(|rx| rx.is_match(text)).unwrap_or(false),
                };
                (!matched).then(|| ViolationKind::Pattern {
                    value: text.to_string(),
                    pattern: pattern.clone(),
                })
            }
        }
    }
}

fn measure_length(value: &Value, unit: LengthUnit) -> Option<u64> {
    match (value, unit) {
        (Value::String(s), LengthUnit::Bytes) => Some(s.len() as u64),
        (Value::String(s), _) => Some(s.chars().count() as u64),
        (Value::Array(xs), _) => Some(xs.len() as u64),
        (Value::Object(m), _) => Some(m.len() as u64),
        _ => None,
    }
}

// ————————————————————————————————————————————————————————————————————————————
// CLASSIFICATION
// ————————————————————————————————————————————————————————————————————————————

/// Member that must be set by the caller: `@required` without `@default`.
pub fn is_required_without_default(member: &Shape) -> bool {
    member.traits.is_required() && member.traits.default_value().is_none()
}

/// The shape itself carries a constraint its values can violate.
pub fn is_directly_constrained(model: &Model, shape: &Shape) -> bool {
    let shape = model.target_of(shape);
    match &shape.kind {
        ShapeKind::String => shape.traits.length().is_some() || shape.traits.pattern().is_some(),
        ShapeKind::Blob | ShapeKind::List { .. } | ShapeKind::Map { .. } => shape.traits.length().is_some(),
        _ if shape.is_number() => shape.traits.range().is_some(),
        ShapeKind::Structure { .. } => model.members_of(shape).any(is_required_without_default),
        _ => false,
    }
}

/// The shape, or anything it transitively contains, is constrained.
pub fn can_reach_constrained(model: &Model, shape: &Shape) -> bool {
    fn go<'a>(model: &'a Model, shape: &'a Shape, seen: &mut BTreeSet<&'a ShapeId>) -> bool {
        let shape = model.target_of(shape);
        if !seen.insert(&shape.id) {
            return false;
        }
        if is_directly_constrained(model, shape) {
            return true;
        }
        match shape.kind {
            ShapeKind::Operation { .. } | ShapeKind::Service { .. } => false,
            _ => model.members_of(shape).any(|member| go(model, member, seen)),
        }
    }
    go(model, shape, &mut BTreeSet::new())
}

// ————————————————————————————————————————————————————————————————————————————
// MODEL VALIDATION
// ————————————————————————————————————————————————————————————————————————————

/// Reject constraint combinations that cannot be represented, before any
/// symbol provider is built.
///
/// Bound conflicts, bad patterns and defaults that violate their own target are
/// always fatal. Traits on unsupported shapes and operations without a
/// validation exception are fatal unless `ignore_unsupported` is set, in which
/// case they are only logged.
pub fn validate_model(model: &Model, service: &Shape, ignore_unsupported: bool) -> Result<()> {
    for shape in model.shapes() {
        validate_shape(shape, ignore_unsupported)?;
    }
    // member defaults last: their targets have passed the loop above
    for member in model.shapes().filter(|shape| shape.is_member()) {
        validate_default(model, member)?;
    }
    for shape in Walker::new(model).walk_shapes(service) {
        let ShapeKind::Operation { input: Some(input), errors, .. } = &shape.kind else {
            continue;
        };
        let constrained_input = can_reach_constrained(model, model.shape(input));
        let lists_validation = errors.iter().any(|e| e.to_string() == VALIDATION_EXCEPTION);
        if constrained_input && !lists_validation {
            let error = CodegenError::MissingValidationException { operation: shape.id.clone() };
            unsupported(error, ignore_unsupported)?;
        }
    }
    Ok(())
}

fn unsupported(error: CodegenError, ignore: bool) -> Result<()> {
    if ignore {
        tracing::warn!("{error}; continuing because unsupported constraints are ignored");
        Ok(())
    } else {
        Err(error)
    }
}

fn validate_shape(shape: &Shape, ignore_unsupported: bool) -> Result<()> {
    let unsupported_on = |detail: String| CodegenError::UnsupportedConstraint {
        shape: shape.id.clone(),
        detail,
    };
    let conflict = |detail: String| CodegenError::ConflictingConstraint {
        shape: shape.id.clone(),
        detail,
    };

    if shape.is_member() {
        for id in [LENGTH, RANGE, PATTERN] {
            if shape.traits.has(id) {
                unsupported(unsupported_on(format!("`{id}` on a member; attach it to the target shape")), ignore_unsupported)?;
            }
        }
        return Ok(());
    }

    if let Some(length) = shape.traits.length() {
        let lengthable = matches!(
            shape.kind,
            ShapeKind::String | ShapeKind::Blob | ShapeKind::List { .. } | ShapeKind::Map { .. }
        );
        if !lengthable {
            unsupported(unsupported_on(format!("`{LENGTH}` on a {} shape", shape.type_name())), ignore_unsupported)?;
        }
        if let (Some(min), Some(max)) = (length.min, length.max) {
            if min > max {
                return Err(conflict(format!("length min {min} is greater than max {max}")));
            }
        }
    }

    if let Some(range) = shape.traits.range() {
        if !shape.is_number() {
            unsupported(unsupported_on(format!("`{RANGE}` on a {} shape", shape.type_name())), ignore_unsupported)?;
        }
        if let (Some(min), Some(max)) = (range.min, range.max) {
            if min.exceeds(max) {
                return Err(conflict(format!("range min {min} is greater than max {max}")));
            }
        }
    }

    if let Some(pattern) = shape.traits.pattern() {
        if !matches!(shape.kind, ShapeKind::String) {
            unsupported(unsupported_on(format!("`{PATTERN}` on a {} shape", shape.type_name())), ignore_unsupported)?;
        }
        if let Err(error) = Regex::new(pattern) {
            return Err(conflict(format!("pattern `{pattern}` does not compile: {error}")));
        }
    }

    Ok(())
}

/// A member default has to satisfy the constraints of the member's target.
fn validate_default(model: &Model, member: &Shape) -> Result<()> {
    let Some(default) = member.traits.default_value() else {
        return Ok(());
    };
    let target = model.target_of(member);
    for check in checks_for(target) {
        if let Some(kind) = check.evaluate(default, None) {
            return Err(CodegenError::ConflictingConstraint {
                shape: member.id.clone(),
                detail: format!("default value {default} violates its target: {}", kind.describe()),
            });
        }
    }
    Ok(())
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
