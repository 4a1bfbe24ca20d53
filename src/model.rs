//! Immutable shape graph.
//!
//! A [`Model`] can only be built through [`Model::assemble`] (or the single
//! document shorthand), which guarantees that every referenced shape exists.
//! Lookups of member targets therefore index directly.
pub mod ast;
pub mod recursion;
pub mod shape_id;
pub mod traits;
pub mod walker;

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;

use crate::error::{CodegenError, Result};
use ast::{AstAggregate, AstMember, AstModel, AstShape};

pub use shape_id::ShapeId;
pub use traits::{Trait, Traits};
pub use walker::Walker;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    Blob,
    Boolean,
    String,
    Byte,
    Short,
    Integer,
    Long,
    Float,
    Double,
    Timestamp,
    Document,
    List { member: ShapeId },
    Map { key: ShapeId, value: ShapeId },
    Structure { members: Vec<ShapeId> },
    Union { members: Vec<ShapeId> },
    Member { target: ShapeId },
    Operation {
        input: Option<ShapeId>,
        output: Option<ShapeId>,
        errors: Vec<ShapeId>,
    },
    Service { version: String, operations: Vec<ShapeId> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub id: ShapeId,
    pub kind: ShapeKind,
    pub traits: Traits,
}

impl Shape {
    pub fn new(id: ShapeId, kind: ShapeKind) -> Self {
        Self { id, kind, traits: Traits::default() }
    }

    pub fn is_member(&self) -> bool { matches!(self.kind, ShapeKind::Member { .. }) }
    pub fn is_structure(&self) -> bool { matches!(self.kind, ShapeKind::Structure { .. }) }
    pub fn is_service(&self) -> bool { matches!(self.kind, ShapeKind::Service { .. }) }

    pub fn is_number(&self) -> bool {
        matches!(
            self.kind,
            ShapeKind::Byte
                | ShapeKind::Short
                | ShapeKind::Integer
                | ShapeKind::Long
                | ShapeKind::Float
                | ShapeKind::Double
        )
    }

    /// Member ids of structures, unions, lists and maps, in declaration order.
    pub fn member_ids(&self) -> Vec<&ShapeId> {
        match &self.kind {
            ShapeKind::Structure { members } | ShapeKind::Union { members } => members.iter().collect(),
            ShapeKind::List { member } => vec![member],
            ShapeKind::Map { key, value } => vec![key, value],
            _ => Vec::new(),
        }
    }

    pub fn member_target(&self) -> Option<&ShapeId> {
        match &self.kind {
            ShapeKind::Member { target } => Some(target),
            _ => None,
        }
    }

    /// Member name for member shapes, shape name otherwise.
    pub fn member_name(&self) -> &str {
        self.id.member().unwrap_or_else(|| self.id.name())
    }

    pub fn type_name(&self) -> &'static str {
        match self.kind {
            ShapeKind::Blob => "blob",
            ShapeKind::Boolean => "boolean",
            ShapeKind::String => "string",
            ShapeKind::Byte => "byte",
            ShapeKind::Short => "short",
            ShapeKind::Integer => "integer",
            ShapeKind::Long => "long",
            ShapeKind::Float => "float",
            ShapeKind::Double => "double",
            ShapeKind::Timestamp => "timestamp",
            ShapeKind::Document => "document",
            ShapeKind::List { .. } => "list",
            ShapeKind::Map { .. } => "map",
            ShapeKind::Structure { .. } => "structure",
            ShapeKind::Union { .. } => "union",
            ShapeKind::Member { .. } => "member",
            ShapeKind::Operation { .. } => "operation",
            ShapeKind::Service { .. } => "service",
        }
    }

    /// Every shape id this shape points at (member targets, operation io, ...).
    fn references(&self) -> Vec<&ShapeId> {
        match &self.kind {
            ShapeKind::Member { target } => vec![target],
            ShapeKind::Operation { input, output, errors } => input
                .iter()
                .chain(output.iter())
                .chain(errors.iter())
                .collect(),
            ShapeKind::Service { operations, .. } => operations.iter().collect(),
            _ => self.member_ids(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Model {
    shapes: BTreeMap<ShapeId, Shape>,
    boxed_members: BTreeSet<ShapeId>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

pub const VALIDATION_EXCEPTION: &str = "smithy.framework#ValidationException";
pub const UNIT: &str = "smithy.api#Unit";

/// Prelude simple shapes plus the validation exception family every server
/// protocol maps constraint violations onto.
const PRELUDE_AST: &str = r#"{
    "smithy": "2.0",
    "shapes": {
        "smithy.api#Blob": { "type": "blob" },
        "smithy.api#Boolean": { "type": "boolean" },
        "smithy.api#String": { "type": "string" },
        "smithy.api#Byte": { "type": "byte" },
        "smithy.api#Short": { "type": "short" },
        "smithy.api#Integer": { "type": "integer" },
        "smithy.api#Long": { "type": "long" },
        "smithy.api#Float": { "type": "float" },
        "smithy.api#Double": { "type": "double" },
        "smithy.api#Timestamp": { "type": "timestamp" },
        "smithy.api#Document": { "type": "document" },
        "smithy.api#Unit": { "type": "structure", "members": {}, "traits": { "smithy.api#unitType": {} } },
        "smithy.framework#ValidationException": {
            "type": "structure",
            "members": {
                "message": { "target": "smithy.api#String", "traits": { "smithy.api#required": {} } },
                "fieldList": { "target": "smithy.framework#ValidationExceptionFieldList" }
            },
            "traits": { "smithy.api#error": "client" }
        },
        "smithy.framework#ValidationExceptionFieldList": {
            "type": "list",
            "member": { "target": "smithy.framework#ValidationExceptionField" }
        },
        "smithy.framework#ValidationExceptionField": {
            "type": "structure",
            "members": {
                "path": { "target": "smithy.api#String", "traits": { "smithy.api#required": {} } },
                "message": { "target": "smithy.api#String", "traits": { "smithy.api#required": {} } }
            }
        }
    }
}"#;

impl Model {
    /// Load a single JSON AST document (plus the prelude).
    pub fn from_json_ast(source: &str) -> Result<Self> {
        Self::assemble([source])
    }

    /// Merge several JSON AST documents into one model.
    pub fn assemble<I>(sources: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut shapes = BTreeMap::<ShapeId, Shape>::new();
        let prelude = std::iter::once(PRELUDE_AST.to_string());
        for source in prelude.chain(sources.into_iter().map(|s| s.as_ref().to_string())) {
            let ast: AstModel = crate::path_de::from_str_with_path(&source).map_err(|e| {
                CodegenError::ModelParse { path: e.path, message: e.message }
            })?;
            for (raw_id, ast_shape) in ast.shapes {
                let id = ShapeId::parse(&raw_id)?;
                for shape in lower_ast_shape(id, ast_shape)? {
                    merge_shape(&mut shapes, shape)?;
                }
            }
        }
        Self::from_shapes(shapes.into_values())
    }

    /// Build a model from already-constructed shapes, checking that every
    /// reference resolves.
    pub fn from_shapes<I: IntoIterator<Item = Shape>>(shapes: I) -> Result<Self> {
        let shapes: BTreeMap<ShapeId, Shape> = shapes.into_iter().map(|s| (s.id.clone(), s)).collect();
        for shape in shapes.values() {
            for reference in shape.references() {
                if !shapes.contains_key(reference) {
                    return Err(CodegenError::ShapeNotFound {
                        missing: reference.clone(),
                        referenced_by: shape.id.clone(),
                    });
                }
            }
        }
        let boxed_members = recursion::boxed_members(&shapes);
        Ok(Self { shapes, boxed_members })
    }

    pub fn get_shape(&self, id: &ShapeId) -> Option<&Shape> {
        self.shapes.get(id)
    }

    pub fn expect_shape(&self, id: &ShapeId, referenced_by: &ShapeId) -> Result<&Shape> {
        self.shapes.get(id).ok_or_else(|| CodegenError::ShapeNotFound {
            missing: id.clone(),
            referenced_by: referenced_by.clone(),
        })
    }

    /// Resolve a reference that construction already proved to exist.
    pub fn shape(&self, id: &ShapeId) -> &Shape {
        &self.shapes[id]
    }

    /// The shape a member points at. Non-member shapes resolve to themselves.
    pub fn target_of<'a>(&'a self, shape: &'a Shape) -> &'a Shape {
        match shape.member_target() {
            Some(target) => self.shape(target),
            None => shape,
        }
    }

    pub fn members_of<'a>(&'a self, shape: &'a Shape) -> impl Iterator<Item = &'a Shape> + 'a {
        shape.member_ids().into_iter().map(move |id| self.shape(id))
    }

    pub fn shapes(&self) -> impl Iterator<Item = &Shape> {
        self.shapes.values()
    }

    pub fn service_shapes(&self) -> impl Iterator<Item = &Shape> {
        self.shapes().filter(|s| s.is_service())
    }

    /// Member participates in a structure/union cycle and needs `Box` indirection.
    pub fn is_boxed(&self, member: &ShapeId) -> bool {
        self.boxed_members.contains(member)
    }
}

fn merge_shape(shapes: &mut BTreeMap<ShapeId, Shape>, shape: Shape) -> Result<()> {
    match shapes.get(&shape.id) {
        Some(existing) if *existing != shape => {
            Err(CodegenError::ConflictingShapeDefinition(shape.id))
        }
        Some(_) => Ok(()),
        None => {
            shapes.insert(shape.id.clone(), shape);
            Ok(())
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// AST LOWERING
// ————————————————————————————————————————————————————————————————————————————

/// One AST shape becomes the shape itself followed by its member shapes.
/// `smithy.api#Unit` as operation input or output means there is none.
fn operation_io(target: Option<ast::AstTarget>) -> Result<Option<ShapeId>> {
    match target {
        Some(t) if t.target != UNIT => ShapeId::parse(&t.target).map(Some),
        _ => Ok(None),
    }
}

fn lower_ast_shape(id: ShapeId, ast: AstShape) -> Result<Vec<Shape>> {
    let mut out = Vec::new();
    let (kind, traits) = match ast {
        AstShape::Blob(s) => (ShapeKind::Blob, s.traits),
        AstShape::Boolean(s) => (ShapeKind::Boolean, s.traits),
        AstShape::String(s) => (ShapeKind::String, s.traits),
        AstShape::Byte(s) => (ShapeKind::Byte, s.traits),
        AstShape::Short(s) => (ShapeKind::Short, s.traits),
        AstShape::Integer(s) => (ShapeKind::Integer, s.traits),
        AstShape::Long(s) => (ShapeKind::Long, s.traits),
        AstShape::Float(s) => (ShapeKind::Float, s.traits),
        AstShape::Double(s) => (ShapeKind::Double, s.traits),
        AstShape::Timestamp(s) => (ShapeKind::Timestamp, s.traits),
        AstShape::Document(s) => (ShapeKind::Document, s.traits),
        AstShape::List { member, traits } => {
            let member = lower_member(&id, "member", member, &mut out)?;
            (ShapeKind::List { member }, traits)
        }
        AstShape::Map { key, value, traits } => {
            let key = lower_member(&id, "key", key, &mut out)?;
            let value = lower_member(&id, "value", value, &mut out)?;
            (ShapeKind::Map { key, value }, traits)
        }
        AstShape::Structure(AstAggregate { members, traits }) => {
            let members = lower_members(&id, members, &mut out)?;
            (ShapeKind::Structure { members }, traits)
        }
        AstShape::Union(AstAggregate { members, traits }) => {
            let members = lower_members(&id, members, &mut out)?;
            (ShapeKind::Union { members }, traits)
        }
        AstShape::Operation { input, output, errors, traits } => {
            let kind = ShapeKind::Operation {
                input: operation_io(input)?,
                output: operation_io(output)?,
                errors: errors
                    .iter()
                    .map(|t| ShapeId::parse(&t.target))
                    .collect::<Result<_>>()?,
            };
            (kind, traits)
        }
        AstShape::Service { version, operations, traits } => {
            let operations = operations
                .iter()
                .map(|t| ShapeId::parse(&t.target))
                .collect::<Result<_>>()?;
            (ShapeKind::Service { version, operations }, traits)
        }
    };
    let traits = Traits::from_ast(&id, traits)?;
    out.insert(0, Shape { id, kind, traits });
    Ok(out)
}

fn lower_members(
    container: &ShapeId,
    members: IndexMap<String, AstMember>,
    out: &mut Vec<Shape>,
) -> Result<Vec<ShapeId>> {
    members
        .into_iter()
        .map(|(name, member)| lower_member(container, &name, member, out))
        .collect()
}

fn lower_member(
    container: &ShapeId,
    name: &str,
    member: AstMember,
    out: &mut Vec<Shape>,
) -> Result<ShapeId> {
    let id = container.with_member(name);
    let target = ShapeId::parse(&member.target)?;
    let traits = Traits::from_ast(&id, member.traits)?;
    out.push(Shape { id: id.clone(), kind: ShapeKind::Member { target }, traits });
    Ok(id)
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id(raw: &str) -> ShapeId { ShapeId::parse(raw).unwrap() }

    #[test]
    fn loads_members_in_declaration_order() {
        let model = Model::from_json_ast(&json!({
            "smithy": "2.0",
            "shapes": {
                "ex#Widget": {
                    "type": "structure",
                    "members": {
                        "zeta": { "target": "smithy.api#String" },
                        "alpha": { "target": "smithy.api#Integer", "traits": { "smithy.api#required": {} } }
                    }
                }
            }
        }).to_string()).unwrap();

        let widget = model.get_shape(&id("ex#Widget")).unwrap();
        let names: Vec<_> = model.members_of(widget).map(Shape::member_name).collect();
        assert_eq!(names, ["zeta", "alpha"]);
        let alpha = model.shape(&id("ex#Widget$alpha"));
        assert!(alpha.traits.is_required());
        assert_eq!(model.target_of(alpha).kind, ShapeKind::Integer);
    }

    #[test]
    fn prelude_is_always_present() {
        let model = Model::from_json_ast(r#"{"smithy":"2.0"}"#).unwrap();
        assert!(model.get_shape(&id("smithy.api#String")).is_some());
        assert!(model.get_shape(&id(VALIDATION_EXCEPTION)).is_some());
        assert!(model.get_shape(&id(UNIT)).is_some_and(|s| s.is_structure()));
    }

    #[test]
    fn unit_targets_resolve() {
        let model = Model::from_json_ast(&json!({
            "smithy": "2.0",
            "shapes": {
                "ex#Choice": {
                    "type": "union",
                    "members": {
                        "none": { "target": "smithy.api#Unit" },
                        "some": { "target": "smithy.api#String" }
                    }
                },
                "ex#Ping": {
                    "type": "operation",
                    "input": { "target": "smithy.api#Unit" },
                    "output": { "target": "smithy.api#Unit" }
                }
            }
        }).to_string())
        .unwrap();
        let none = model.shape(&id("ex#Choice$none"));
        assert_eq!(model.target_of(none).id, id(UNIT));
        assert_eq!(
            model.shape(&id("ex#Ping")).kind,
            ShapeKind::Operation { input: None, output: None, errors: vec![] }
        );
    }

    #[test]
    fn dangling_member_target_is_fatal() {
        let err = Model::from_json_ast(&json!({
            "smithy": "2.0",
            "shapes": {
                "ex#Widget": {
                    "type": "structure",
                    "members": { "part": { "target": "ex#Missing" } }
                }
            }
        }).to_string()).unwrap_err();
        match err {
            CodegenError::ShapeNotFound { missing, referenced_by } => {
                assert_eq!(missing, id("ex#Missing"));
                assert_eq!(referenced_by, id("ex#Widget$part"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn parse_errors_carry_json_path() {
        let err = Model::from_json_ast(r#"{"smithy":"2.0","shapes":{"ex#A":{"type":"list"}}}"#).unwrap_err();
        assert!(matches!(err, CodegenError::ModelParse { .. }), "{err}");
    }

    #[test]
    fn assembling_identical_documents_is_idempotent() {
        let doc = json!({
            "smithy": "2.0",
            "shapes": { "ex#Name": { "type": "string" } }
        }).to_string();
        let model = Model::assemble([&doc, &doc]).unwrap();
        assert!(model.get_shape(&id("ex#Name")).is_some());

        let conflicting = json!({
            "smithy": "2.0",
            "shapes": { "ex#Name": { "type": "integer" } }
        }).to_string();
        let err = Model::assemble([&doc, &conflicting]).unwrap_err();
        assert!(matches!(err, CodegenError::ConflictingShapeDefinition(_)));
    }
}
