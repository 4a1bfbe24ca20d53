//! Typed view over the trait map attached to every shape.
use std::cmp::Ordering;
use std::fmt;

use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CodegenError;
use crate::model::ShapeId;

pub const REQUIRED: &str = "smithy.api#required";
pub const DEFAULT: &str = "smithy.api#default";
pub const LENGTH: &str = "smithy.api#length";
pub const RANGE: &str = "smithy.api#range";
pub const PATTERN: &str = "smithy.api#pattern";
pub const DOCUMENTATION: &str = "smithy.api#documentation";
pub const ERROR: &str = "smithy.api#error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LengthTrait {
    #[serde(default)]
    pub min: Option<u64>,
    #[serde(default)]
    pub max: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RangeTrait {
    #[serde(default)]
    pub min: Option<RangeBound>,
    #[serde(default)]
    pub max: Option<RangeBound>,
}

/// A `@range` bound. Integral bounds stay exact so `long` values beyond
/// 2^53 compare correctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RangeBound {
    Int(i64),
    Float(OrderedFloat<f64>),
}

impl RangeBound {
    pub fn as_f64(self) -> f64 {
        match self {
            RangeBound::Int(n) => n as f64,
            RangeBound::Float(n) => n.0,
        }
    }

    /// Order of a JSON number relative to this bound.
    pub fn compare(self, value: &serde_json::Number) -> Option<Ordering> {
        let exact = value.as_i64().map(i128::from).or_else(|| value.as_u64().map(i128::from));
        match (exact, self) {
            (Some(n), RangeBound::Int(bound)) => Some(n.cmp(&i128::from(bound))),
            _ => value.as_f64()?.partial_cmp(&self.as_f64()),
        }
    }

    /// `self > other`, exactly when both are integral.
    pub fn exceeds(self, other: RangeBound) -> bool {
        match (self, other) {
            (RangeBound::Int(a), RangeBound::Int(b)) => a > b,
            (a, b) => a.as_f64() > b.as_f64(),
        }
    }
}

impl fmt::Display for RangeBound {
    /// Integral floats print without a fractional part.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeBound::Int(n) => write!(f, "{n}"),
            RangeBound::Float(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
                write!(f, "{}", n.0 as i64)
            }
            RangeBound::Float(n) => write!(f, "{}", n.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Client,
    Server,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Trait {
    Required,
    Default(Value),
    Length(LengthTrait),
    Range(RangeTrait),
    Pattern(String),
    Documentation(String),
    Error(ErrorKind),
    /// Any trait the core does not interpret (protocol traits included).
    Other(Value),
}

/// Traits keyed by absolute trait id, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Traits(IndexMap<String, Trait>);

impl Traits {
    pub fn from_ast(owner: &ShapeId, raw: IndexMap<String, Value>) -> Result<Self, CodegenError> {
        let mut out = IndexMap::with_capacity(raw.len());
        for (id, value) in raw {
            let parsed = parse_trait(&id, value).map_err(|error| CodegenError::ModelParse {
                path: format!("shapes.{owner}.traits.{id}"),
                message: error.to_string(),
            })?;
            out.insert(id, parsed);
        }
        Ok(Self(out))
    }

    pub fn insert(&mut self, id: &str, value: Trait) {
        self.0.insert(id.to_string(), value);
    }

    pub fn has(&self, id: &str) -> bool { self.0.contains_key(id) }
    pub fn get(&self, id: &str) -> Option<&Trait> { self.0.get(id) }
    pub fn ids(&self) -> impl Iterator<Item = &str> { self.0.keys().map(String::as_str) }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn is_required(&self) -> bool { self.has(REQUIRED) }

    /// An explicit `null` default is the same as no default at all.
    pub fn default_value(&self) -> Option<&Value> {
        match self.0.get(DEFAULT) {
            Some(Trait::Default(Value::Null)) | None => None,
            Some(Trait::Default(v)) => Some(v),
            Some(_) => None,
        }
    }

    pub fn length(&self) -> Option<LengthTrait> {
        match self.0.get(LENGTH) {
            Some(Trait::Length(l)) => Some(*l),
            _ => None,
        }
    }

    pub fn range(&self) -> Option<RangeTrait> {
        match self.0.get(RANGE) {
            Some(Trait::Range(r)) => Some(*r),
            _ => None,
        }
    }

    pub fn pattern(&self) -> Option<&str> {
        match self.0.get(PATTERN) {
            Some(Trait::Pattern(p)) => Some(p),
            _ => None,
        }
    }

    pub fn documentation(&self) -> Option<&str> {
        match self.0.get(DOCUMENTATION) {
            Some(Trait::Documentation(d)) => Some(d),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<ErrorKind> {
        match self.0.get(ERROR) {
            Some(Trait::Error(kind)) => Some(*kind),
            _ => None,
        }
    }
}

fn parse_trait(id: &str, value: Value) -> Result<Trait, serde_json::Error> {
    Ok(match id {
        REQUIRED => Trait::Required,
        DEFAULT => Trait::Default(value),
        LENGTH => Trait::Length(serde_json::from_value(value)?),
        RANGE => Trait::Range(serde_json::from_value(value)?),
        PATTERN => Trait::Pattern(serde_json::from_value(value)?),
        DOCUMENTATION => Trait::Documentation(serde_json::from_value(value)?),
        ERROR => Trait::Error(serde_json::from_value(value)?),
        _ => Trait::Other(value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn traits(raw: Value) -> Result<Traits, CodegenError> {
        let owner = ShapeId::parse("ns#Owner").unwrap();
        let raw: IndexMap<String, Value> = serde_json::from_value(raw).unwrap();
        Traits::from_ast(&owner, raw)
    }

    #[test]
    fn typed_accessors_read_constraint_traits() {
        let t = traits(json!({
            "smithy.api#required": {},
            "smithy.api#length": { "min": 1, "max": 36 },
            "smithy.api#range": { "max": 100 },
            "smithy.api#pattern": "^[a-z]+$",
            "aws.protocols#restJson1": {}
        }))
        .unwrap();
        assert!(t.is_required());
        assert_eq!(t.length(), Some(LengthTrait { min: Some(1), max: Some(36) }));
        assert_eq!(t.range().unwrap().min, None);
        assert_eq!(t.range().unwrap().max, Some(RangeBound::Int(100)));
        assert_eq!(t.pattern(), Some("^[a-z]+$"));
        assert!(t.has("aws.protocols#restJson1"));
    }

    #[test]
    fn range_bounds_keep_integers_exact() {
        let t = traits(json!({ "smithy.api#range": { "min": 0.5, "max": 9007199254740992i64 } })).unwrap();
        let range = t.range().unwrap();
        assert_eq!(range.min, Some(RangeBound::Float(OrderedFloat(0.5))));
        assert_eq!(range.max, Some(RangeBound::Int(9007199254740992)));

        let max = range.max.unwrap();
        let above: serde_json::Number = 9007199254740993i64.into();
        assert_eq!(max.compare(&above), Some(Ordering::Greater));
        assert_eq!(max.to_string(), "9007199254740992");
        assert_eq!(RangeBound::Float(OrderedFloat(2.0)).to_string(), "2");
    }

    #[test]
    fn null_default_counts_as_absent() {
        let t = traits(json!({ "smithy.api#default": null })).unwrap();
        assert!(t.default_value().is_none());
        let t = traits(json!({ "smithy.api#default": 0 })).unwrap();
        assert_eq!(t.default_value(), Some(&json!(0)));
    }

    #[test]
    fn malformed_trait_values_name_their_location() {
        let err = traits(json!({ "smithy.api#length": { "min": "one" } })).unwrap_err();
        match err {
            CodegenError::ModelParse { path, .. } => {
                assert_eq!(path, "shapes.ns#Owner.traits.smithy.api#length")
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
