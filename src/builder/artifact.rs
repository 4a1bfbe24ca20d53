use serde::Serialize;
use serde_json::{Map, Value};

use crate::builder::eval::{pointer, Validator};
use crate::builder::violation::{BuildError, ConstraintViolations};
use crate::constraints::{is_required_without_default, ConstraintCheck};
use crate::model::{Shape, ShapeId};
use crate::symbol::{ViolationVariant, Visibility};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Everything the emission layer needs to render one structure: the type,
/// its builder, the violation enum and the `builder()` entry point.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderArtifact {
    pub shape: ShapeId,
    pub structure: StructureDecl,
    pub builder: BuilderDecl,
    /// Absent for structures that cannot fail to build.
    pub violation: Option<ViolationEnumDecl>,
    pub convenience: ConvenienceMethod,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureDecl {
    pub name: String,
    pub symbol: String,
    pub visibility: Visibility,
    pub documentation: Option<String>,
    pub derives: Vec<&'static str>,
    pub fields: Vec<StructureField>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureField {
    pub name: String,
    pub member: ShapeId,
    pub symbol: String,
    pub documentation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderDecl {
    /// Module the builder lives in, next to its structure.
    pub module: String,
    pub name: String,
    pub fields: Vec<BuilderField>,
    pub build: BuildFn,
}

/// How a member behaves when the caller never set it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Requirement {
    /// `@required` without a default: unset is a violation.
    Required,
    /// Unset takes the model default.
    Default { value: Value },
    Optional,
}

impl Requirement {
    pub fn of(member: &Shape) -> Self {
        if is_required_without_default(member) {
            return Requirement::Required;
        }
        match member.traits.default_value() {
            Some(value) => Requirement::Default { value: value.clone() },
            None => Requirement::Optional,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderField {
    pub name: String,
    pub member: ShapeId,
    /// Member name as it appears in the model and on the wire.
    pub member_name: String,
    pub target: ShapeId,
    /// Always `Option<unconstrained>`: the builder accepts anything until `build`.
    pub stored: String,
    pub setter: Setter,
    /// Present when the stored type differs from what the public setter takes.
    pub internal_setter: Option<Setter>,
    pub requirement: Requirement,
    /// Checks on the member's target, in trait declaration order.
    pub checks: Vec<ConstraintCheck>,
    /// Type the stored value is validated into during `build`.
    pub validated_as: Option<String>,
    /// The validated value is a crate-private wrapper that `build` unwraps
    /// into the public field type.
    pub unwrap_into_public: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setter {
    pub name: String,
    pub visibility: Visibility,
    pub accepts: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildFn {
    pub returns: String,
    /// `None` when `build` is infallible.
    pub error: Option<String>,
    /// Every failing check is reported, not only the first.
    pub exhaustive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationEnumDecl {
    pub symbol: String,
    pub visibility: Visibility,
    pub variants: Vec<ViolationVariant>,
    pub wire: WireMapping,
}

/// How the protocol reports a failed build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMapping {
    pub protocol: ShapeId,
    pub exception: ShapeId,
    pub exception_symbol: String,
    pub status: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvenienceMethod {
    pub on: String,
    pub name: String,
    pub returns: String,
}

// ————————————————————————————————————————————————————————————————————————————
// REFERENCE EVALUATION
// ————————————————————————————————————————————————————————————————————————————

impl BuilderArtifact {
    pub fn field(&self, member_name: &str) -> Option<&BuilderField> {
        self.builder.fields.iter().find(|f| f.member_name == member_name)
    }

    /// Run the described `build` against candidate member values.
    ///
    /// Applies defaults, evaluates every check of every member, descends into
    /// nested aggregates, and returns either the constructed value or all the
    /// violations found.
    pub fn build(&self, validator: &Validator, fields: &Map<String, Value>) -> Result<Value, BuildError> {
        if let Some(unknown) = fields.keys().find(|key| self.field(key).is_none()) {
            return Err(BuildError::UnknownMember { member: unknown.clone() });
        }
        let mut violations = ConstraintViolations::default();
        let mut out = Map::new();
        for field in &self.builder.fields {
            let path = pointer("", &field.member_name);
            let target = validator.model().shape(&field.target);
            let value = validator.member(
                &field.requirement,
                &field.checks,
                target,
                fields.get(&field.member_name),
                &path,
                &mut violations,
            )?;
            if let Some(value) = value {
                out.insert(field.member_name.clone(), value);
            }
        }
        violations.into_result()?;
        Ok(Value::Object(out))
    }
}
