//! Shape → target type resolution.
//!
//! Several [`SymbolProvider`]s coexist for one model because the same shape
//! needs different representations: the plain public one, the constrained
//! wrapper, the unconstrained value a builder accumulates, and the violation
//! type validation fails with. [`ServerSymbolProviders`] composes them.
pub mod base;
pub mod constrained;
pub mod providers;
pub mod rust_type;
pub mod unconstrained;
pub mod violation;

use std::fmt;

use heck::ToSnakeCase;
use serde::Serialize;

use crate::model::{Model, Shape};

pub use base::{base_symbol_provider, BaseSymbolProvider};
pub use constrained::ConstrainedShapeSymbolProvider;
pub use providers::{BaseSymbolProviderFactory, ServerSymbolProviders};
pub use rust_type::RustType;
pub use unconstrained::UnconstrainedShapeSymbolProvider;
pub use violation::{ConstraintViolationSymbolProvider, ViolationVariant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Visibility {
    Public,
    PubCrate,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Visibility::Public => "pub",
            Visibility::PubCrate => "pub(crate)",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum SymbolDefault {
    None,
    /// `Default::default()` of the type.
    RustDefault,
    /// Model-provided default, as JSON text.
    Literal(String),
}

/// A resolved type reference plus the metadata generators need to use it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Symbol {
    pub rust_type: RustType,
    pub visibility: Visibility,
    pub default: SymbolDefault,
}

impl Symbol {
    pub fn new(rust_type: RustType) -> Self {
        Self { rust_type, visibility: Visibility::Public, default: SymbolDefault::None }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_default(mut self, default: SymbolDefault) -> Self {
        self.default = default;
        self
    }

    pub fn full_name(&self) -> String { self.rust_type.to_string() }
    pub fn is_optional(&self) -> bool { self.rust_type.is_option() }
    pub fn is_boxed(&self) -> bool { self.rust_type.is_boxed() }

    /// Last path segment for generated types, the rendered type otherwise.
    pub fn name(&self) -> String {
        match self.rust_type.stripped() {
            RustType::Opaque { name, .. } => name.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.rust_type.fmt(f)
    }
}

/// One strategy for mapping shapes to symbols. Implementations must be total
/// and deterministic over the shapes of their model.
pub trait SymbolProvider: Send + Sync {
    fn model(&self) -> &Model;

    fn to_symbol(&self, shape: &Shape) -> Symbol;

    /// Field / setter name for a member shape.
    fn to_member_name(&self, member: &Shape) -> String {
        escape_keyword(member.member_name().to_snake_case())
    }
}

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum", "extern",
    "false", "fn", "for", "gen", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut",
    "pub", "ref", "return", "self", "static", "struct", "super", "trait", "true", "type", "unsafe",
    "use", "where", "while", "yield",
];

pub(crate) fn escape_keyword(name: String) -> String {
    match name.as_str() {
        // these cannot be raw identifiers
        "self" | "super" | "crate" => format!("{name}_"),
        _ if RUST_KEYWORDS.contains(&name.as_str()) => format!("r#{name}"),
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_become_raw_identifiers() {
        assert_eq!(escape_keyword("type".into()), "r#type");
        assert_eq!(escape_keyword("self".into()), "self_");
        assert_eq!(escape_keyword("count".into()), "count");
    }
}
