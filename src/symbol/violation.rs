use std::sync::Arc;

use heck::{ToSnakeCase, ToUpperCamelCase};
use serde::Serialize;

use crate::builder::violation::ViolationCategory;
use crate::constraints::{can_reach_constrained, checks_for, is_required_without_default, ConstraintCheck};
use crate::model::{Model, Shape, ShapeKind};
use crate::symbol::{RustType, Symbol, SymbolProvider, Visibility};

/// One variant of a shape's `ConstraintViolation` enum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationVariant {
    pub name: String,
    /// Set for the variants that describe a failed check of the shape itself.
    pub category: Option<ViolationCategory>,
    /// Member the variant is about, for aggregates.
    pub member: Option<String>,
    /// Rendered payload type, if the variant carries one.
    pub payload: Option<String>,
}

/// Maps every shape that can fail validation to its `ConstraintViolation`
/// enum. Shapes that cannot fail map to `Infallible`, which keeps the mapping
/// total.
pub struct ConstraintViolationSymbolProvider {
    base: Arc<dyn SymbolProvider>,
    public_constrained_types: bool,
}

impl ConstraintViolationSymbolProvider {
    pub fn new(base: Arc<dyn SymbolProvider>, public_constrained_types: bool) -> Self {
        Self { base, public_constrained_types }
    }

    /// Ordered variants of the violation enum for `shape` (members resolve to
    /// their target). Empty for shapes that cannot fail.
    pub fn violation_variants(&self, shape: &Shape) -> Vec<ViolationVariant> {
        let model = self.model();
        let shape = model.target_of(shape);
        if !can_reach_constrained(model, shape) {
            return Vec::new();
        }
        let mut variants: Vec<ViolationVariant> = checks_for(shape)
            .into_iter()
            .map(|check| check_variant(shape, &check))
            .collect();

        match &shape.kind {
            ShapeKind::Structure { .. } | ShapeKind::Union { .. } => {
                for member in model.members_of(shape) {
                    let pascal = member.member_name().to_upper_camel_case();
                    if shape.is_structure() && is_required_without_default(member) {
                        variants.push(ViolationVariant {
                            name: format!("Missing{pascal}"),
                            category: Some(ViolationCategory::MissingRequired),
                            member: Some(member.member_name().to_string()),
                            payload: None,
                        });
                    }
                    if can_reach_constrained(model, member) {
                        let mut payload = self.to_symbol(member).rust_type;
                        if model.is_boxed(&member.id) {
                            payload = payload.boxed();
                        }
                        variants.push(ViolationVariant {
                            name: pascal,
                            category: None,
                            member: Some(member.member_name().to_string()),
                            payload: Some(payload.to_string()),
                        });
                    }
                }
            }
            ShapeKind::List { member } => {
                let member = model.shape(member);
                if can_reach_constrained(model, member) {
                    variants.push(ViolationVariant {
                        name: "Member".to_string(),
                        category: None,
                        member: None,
                        payload: Some(format!("(usize, {})", self.to_symbol(member))),
                    });
                }
            }
            ShapeKind::Map { key, value } => {
                for (name, id) in [("Key", key), ("Value", value)] {
                    let member = model.shape(id);
                    if can_reach_constrained(model, member) {
                        variants.push(ViolationVariant {
                            name: name.to_string(),
                            category: None,
                            member: None,
                            payload: Some(self.to_symbol(member).to_string()),
                        });
                    }
                }
            }
            _ => {}
        }
        variants
    }
}

fn check_variant(shape: &Shape, check: &ConstraintCheck) -> ViolationVariant {
    let (name, category, payload) = match check {
        ConstraintCheck::Length { .. } => ("Length", ViolationCategory::Length, "usize".to_string()),
        ConstraintCheck::Pattern { .. } => ("Pattern", ViolationCategory::Pattern, RustType::String.to_string()),
        ConstraintCheck::Range(_) => {
            let number = match shape.kind {
                ShapeKind::Byte => RustType::I8,
                ShapeKind::Short => RustType::I16,
                ShapeKind::Integer => RustType::I32,
                ShapeKind::Long => RustType::I64,
                ShapeKind::Float => RustType::F32,
                _ => RustType::F64,
            };
            ("Range", ViolationCategory::Range, number.to_string())
        }
    };
    ViolationVariant {
        name: name.to_string(),
        category: Some(category),
        member: None,
        payload: Some(payload),
    }
}

impl SymbolProvider for ConstraintViolationSymbolProvider {
    fn model(&self) -> &Model {
        self.base.model()
    }

    fn to_symbol(&self, shape: &Shape) -> Symbol {
        let model = self.model();
        let target = model.target_of(shape);
        if !can_reach_constrained(model, target) {
            return Symbol::new(RustType::Infallible);
        }
        let owner = self.base.to_symbol(target);
        let namespace = owner.rust_type.namespace().unwrap_or("crate::model");
        let module = format!("{namespace}::{}", target.id.name().to_snake_case());
        let visibility = if target.is_structure() || self.public_constrained_types {
            Visibility::Public
        } else {
            Visibility::PubCrate
        };
        Symbol::new(RustType::opaque(module, "ConstraintViolation")).with_visibility(visibility)
    }

    fn to_member_name(&self, member: &Shape) -> String {
        self.base.to_member_name(member)
    }
}
