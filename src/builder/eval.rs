use std::collections::BTreeMap;
use std::sync::Arc;

use regex::Regex;
use serde_json::{Map, Value};

use crate::builder::artifact::Requirement;
use crate::builder::violation::{BuildError, ConstraintViolation, ConstraintViolations, ViolationKind};
use crate::constraints::{checks_for, ConstraintCheck};
use crate::error::{CodegenError, Result};
use crate::model::{Model, Shape, ShapeKind};

/// Evaluates constraint checks over JSON candidate values, the way generated
/// builders evaluate them over typed ones.
///
/// Every pattern in the model is compiled up front so one validator can be
/// shared by concurrent builds.
pub struct Validator {
    model: Arc<Model>,
    patterns: BTreeMap<String, Regex>,
}

impl Validator {
    pub fn new(model: Arc<Model>) -> Result<Self> {
        let mut patterns = BTreeMap::new();
        for shape in model.shapes() {
            let Some(pattern) = shape.traits.pattern() else { continue };
            if patterns.contains_key(pattern) {
                continue;
            }
            let compiled = Regex::new(pattern).map_err(|error| CodegenError::ConflictingConstraint {
                shape: shape.id.clone(),
                detail: format!("pattern `{pattern}` does not compile: {error}"),
            })?;
            patterns.insert(pattern.to_string(), compiled);
        }
        Ok(Self { model, patterns })
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Type-check, evaluate the shape's own checks, then descend.
    pub fn validate(
        &self,
        shape: &Shape,
        value: Value,
        path: &str,
        out: &mut ConstraintViolations,
    ) -> Result<Value, BuildError> {
        let shape = self.model.target_of(shape);
        self.check_type(shape, &value, path)?;
        self.evaluate(&checks_for(shape), &value, path, out);
        self.descend(shape, value, path, out)
    }

    /// One structure member: apply its requirement, then validate the value
    /// against `checks` and the target's nested shapes. `Ok(None)` means the
    /// member stays unset.
    pub(crate) fn member(
        &self,
        requirement: &Requirement,
        checks: &[ConstraintCheck],
        target: &Shape,
        candidate: Option<&Value>,
        path: &str,
        out: &mut ConstraintViolations,
    ) -> Result<Option<Value>, BuildError> {
        let value = match (candidate, requirement) {
            (Some(Value::Null) | None, Requirement::Required) => {
                out.push(ConstraintViolation::new(path, ViolationKind::MissingRequired));
                return Ok(None);
            }
            (Some(Value::Null) | None, Requirement::Default { value }) => value.clone(),
            (Some(Value::Null) | None, Requirement::Optional) => return Ok(None),
            (Some(value), _) => value.clone(),
        };
        self.check_type(target, &value, path)?;
        self.evaluate(checks, &value, path, out);
        self.descend(target, value, path, out).map(Some)
    }

    fn evaluate(&self, checks: &[ConstraintCheck], value: &Value, path: &str, out: &mut ConstraintViolations) {
        for check in checks {
            let compiled = match check {
                ConstraintCheck::Pattern { pattern } => self.patterns.get(pattern),
                _ => None,
            };
            if let Some(kind) = check.evaluate(value, compiled) {
                out.push(ConstraintViolation::new(path, kind));
            }
        }
    }

    fn check_type(&self, shape: &Shape, value: &Value, path: &str) -> Result<(), BuildError> {
        let ok = match shape.kind {
            ShapeKind::Blob | ShapeKind::String => value.is_string(),
            ShapeKind::Boolean => value.is_boolean(),
            ShapeKind::Byte => fits(value, i8::MIN as i64, i8::MAX as i64),
            ShapeKind::Short => fits(value, i16::MIN as i64, i16::MAX as i64),
            ShapeKind::Integer => fits(value, i32::MIN as i64, i32::MAX as i64),
            ShapeKind::Long => value.is_i64(),
            ShapeKind::Float | ShapeKind::Double => value.is_number(),
            ShapeKind::Timestamp => value.is_number() || value.is_string(),
            ShapeKind::Document => true,
            ShapeKind::List { .. } => value.is_array(),
            ShapeKind::Map { .. } | ShapeKind::Structure { .. } => value.is_object(),
            ShapeKind::Union { .. } => value.as_object().is_some_and(|o| o.len() == 1),
            ShapeKind::Member { .. } | ShapeKind::Operation { .. } | ShapeKind::Service { .. } => false,
        };
        if ok {
            Ok(())
        } else {
            Err(BuildError::TypeMismatch { path: display_path(path), expected: shape.type_name() })
        }
    }

    fn descend(
        &self,
        shape: &Shape,
        value: Value,
        path: &str,
        out: &mut ConstraintViolations,
    ) -> Result<Value, BuildError> {
        match (&shape.kind, value) {
            (ShapeKind::List { member }, Value::Array(items)) => {
                let member = self.model.shape(member);
                let items = items
                    .into_iter()
                    .enumerate()
                    .map(|(index, item)| self.validate(member, item, &pointer(path, &index.to_string()), out))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Array(items))
            }
            (ShapeKind::Map { key, value: value_member }, Value::Object(entries)) => {
                let key = self.model.shape(key);
                let value_member = self.model.shape(value_member);
                let mut built = Map::new();
                for (k, v) in entries {
                    let entry_path = pointer(path, &k);
                    self.validate(key, Value::String(k.clone()), &entry_path, out)?;
                    built.insert(k, self.validate(value_member, v, &entry_path, out)?);
                }
                Ok(Value::Object(built))
            }
            (ShapeKind::Structure { .. }, Value::Object(fields)) => {
                self.structure(shape, fields, path, out).map(Value::Object)
            }
            (ShapeKind::Union { .. }, Value::Object(fields)) => {
                let mut built = Map::new();
                for (name, v) in fields {
                    let member = self
                        .model
                        .members_of(shape)
                        .find(|m| m.member_name() == name)
                        .ok_or_else(|| BuildError::UnknownMember { member: name.clone() })?;
                    let v = self.validate(member, v, &pointer(path, &name), out)?;
                    built.insert(name, v);
                }
                Ok(Value::Object(built))
            }
            (_, value) => Ok(value),
        }
    }

    fn structure(
        &self,
        shape: &Shape,
        mut fields: Map<String, Value>,
        path: &str,
        out: &mut ConstraintViolations,
    ) -> Result<Map<String, Value>, BuildError> {
        let mut built = Map::new();
        for member in self.model.members_of(shape) {
            let name = member.member_name();
            let target = self.model.target_of(member);
            let candidate = fields.remove(name);
            let value = self.member(
                &Requirement::of(member),
                &checks_for(target),
                target,
                candidate.as_ref(),
                &pointer(path, name),
                out,
            )?;
            if let Some(value) = value {
                built.insert(name.to_string(), value);
            }
        }
        if let Some(unknown) = fields.keys().next() {
            return Err(BuildError::UnknownMember { member: unknown.clone() });
        }
        Ok(built)
    }
}

fn fits(value: &Value, min: i64, max: i64) -> bool {
    value.as_i64().is_some_and(|n| (min..=max).contains(&n))
}

/// Append one JSON pointer segment, escaping `~` and `/`.
pub(crate) fn pointer(base: &str, segment: &str) -> String {
    format!("{base}/{}", segment.replace('~', "~0").replace('/', "~1"))
}

fn display_path(path: &str) -> String {
    if path.is_empty() { "/".to_string() } else { path.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validator(shapes: Value) -> Validator {
        let model = Model::from_json_ast(&json!({ "smithy": "2.0", "shapes": shapes }).to_string()).unwrap();
        Validator::new(Arc::new(model)).unwrap()
    }

    #[test]
    fn nested_violations_carry_pointer_paths() {
        let v = validator(json!({
            "ex#Name": { "type": "string", "traits": { "smithy.api#pattern": "^[a-z]+$" } },
            "ex#Item": {
                "type": "structure",
                "members": { "name": { "target": "ex#Name", "traits": { "smithy.api#required": {} } } }
            },
            "ex#Items": { "type": "list", "member": { "target": "ex#Item" } },
            "ex#Tags": {
                "type": "map",
                "key": { "target": "smithy.api#String" },
                "value": { "target": "ex#Name" }
            },
            "ex#Order": {
                "type": "structure",
                "members": {
                    "items": { "target": "ex#Items" },
                    "tags": { "target": "ex#Tags" }
                }
            }
        }));
        let order = v.model().shape(&"ex#Order".parse().unwrap());
        let mut out = ConstraintViolations::default();
        v.validate(
            order,
            json!({
                "items": [{ "name": "ok" }, { "name": "NO" }, {}],
                "tags": { "a/b": "Bad" }
            }),
            "",
            &mut out,
        )
        .unwrap();
        let paths: Vec<&str> = out.iter().map(|v| v.path.as_str()).collect();
        assert_eq!(paths, ["/items/1/name", "/items/2/name", "/tags/a~1b"]);
    }

    #[test]
    fn wrong_json_types_are_not_violations() {
        let v = validator(json!({
            "ex#Small": { "type": "byte" },
            "ex#Holder": { "type": "structure", "members": { "n": { "target": "ex#Small" } } }
        }));
        let holder = v.model().shape(&"ex#Holder".parse().unwrap());
        let mut out = ConstraintViolations::default();
        let err = v.validate(holder, json!({ "n": 300 }), "", &mut out).unwrap_err();
        match err {
            BuildError::TypeMismatch { path, expected } => {
                assert_eq!(path, "/n");
                assert_eq!(expected, "byte");
            }
            other => panic!("unexpected error: {other}"),
        }
        let err = v.validate(holder, json!({ "m": 1 }), "", &mut out).unwrap_err();
        assert!(matches!(err, BuildError::UnknownMember { member } if member == "m"));
    }
}
