use std::fmt;

use serde::{Serialize, Serializer};

/// A target-language type, rendered with fully qualified paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RustType {
    String,
    Bool,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Blob,
    DateTime,
    Document,
    Vec(Box<RustType>),
    HashMap(Box<RustType>, Box<RustType>),
    Option(Box<RustType>),
    Box(Box<RustType>),
    /// Violation type of a shape that cannot fail validation.
    Infallible,
    Opaque { namespace: String, name: String },
}

impl RustType {
    pub fn opaque(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        RustType::Opaque { namespace: namespace.into(), name: name.into() }
    }

    pub fn option(self) -> Self { RustType::Option(Box::new(self)) }
    pub fn boxed(self) -> Self { RustType::Box(Box::new(self)) }

    pub fn is_option(&self) -> bool { matches!(self, RustType::Option(_)) }

    pub fn is_boxed(&self) -> bool {
        match self {
            RustType::Box(_) => true,
            RustType::Option(inner) => inner.is_boxed(),
            _ => false,
        }
    }

    /// Peel `Option` and `Box` wrappers.
    pub fn stripped(&self) -> &RustType {
        match self {
            RustType::Option(inner) | RustType::Box(inner) => inner.stripped(),
            other => other,
        }
    }

    /// Module the type is declared in, for generated (opaque) types.
    pub fn namespace(&self) -> Option<&str> {
        match self.stripped() {
            RustType::Opaque { namespace, .. } => Some(namespace),
            _ => None,
        }
    }
}

impl fmt::Display for RustType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RustType::String => f.write_str("::std::string::String"),
            RustType::Bool => f.write_str("bool"),
            RustType::I8 => f.write_str("i8"),
            RustType::I16 => f.write_str("i16"),
            RustType::I32 => f.write_str("i32"),
            RustType::I64 => f.write_str("i64"),
            RustType::F32 => f.write_str("f32"),
            RustType::F64 => f.write_str("f64"),
            RustType::Blob => f.write_str("::aws_smithy_types::Blob"),
            RustType::DateTime => f.write_str("::aws_smithy_types::DateTime"),
            RustType::Document => f.write_str("::aws_smithy_types::Document"),
            RustType::Vec(item) => write!(f, "::std::vec::Vec<{item}>"),
            RustType::HashMap(k, v) => write!(f, "::std::collections::HashMap<{k}, {v}>"),
            RustType::Option(inner) => write!(f, "::std::option::Option<{inner}>"),
            RustType::Box(inner) => write!(f, "::std::boxed::Box<{inner}>"),
            RustType::Infallible => f.write_str("::std::convert::Infallible"),
            RustType::Opaque { namespace, name } => write!(f, "{namespace}::{name}"),
        }
    }
}

impl Serialize for RustType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
