//! Wire protocol selection.
//!
//! A service names its protocols through traits (`aws.protocols#restJson1`,
//! ...). [`ServerProtocolLoader`] matches those traits against an ordered
//! registry of [`ProtocolGeneratorFactory`]s and hands back exactly one.
pub mod loader;
pub mod validation_exception;

use indexmap::IndexMap;
use serde::Serialize;

use crate::builder::violation::ConstraintViolations;
use crate::context::ServerCodegenContext;
use crate::model::ShapeId;
use crate::symbol::{Symbol, SymbolProvider};

pub use loader::{default_protocols, ServerProtocolLoader};
pub use validation_exception::{SmithyValidationExceptionConversion, ValidationExceptionConversion, WireError};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Framing {
    /// Operations bind to HTTP routes; members bind to labels, headers, payload.
    HttpBinding,
    /// Every operation is a POST to one endpoint; the target travels in a header.
    Rpc,
}

/// Where the name of an error shape goes in a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "in", content = "name", rename_all = "camelCase")]
pub enum ErrorTypeLocation {
    Header(String),
    Body(String),
}

/// Identity of the protocol a service is served with, plus the facts every
/// operation-level generator needs from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerProtocol {
    pub id: ShapeId,
    pub framing: Framing,
    pub content_type: String,
    pub error_type_location: ErrorTypeLocation,
    /// Shape constraint violations are reported as on the wire.
    pub validation_exception: ShapeId,
}

impl ServerProtocol {
    pub fn new(
        id: ShapeId,
        framing: Framing,
        content_type: &str,
        error_type_location: ErrorTypeLocation,
    ) -> Self {
        Self {
            id,
            framing,
            content_type: content_type.to_string(),
            error_type_location,
            validation_exception: validation_exception_id(),
        }
    }

    /// The response a server speaking this protocol sends for a failed build.
    pub fn validation_failure(&self, violations: &ConstraintViolations) -> WireError {
        self.validation_failure_with(&SmithyValidationExceptionConversion, violations)
    }

    pub fn validation_failure_with(
        &self,
        conversion: &dyn ValidationExceptionConversion,
        violations: &ConstraintViolations,
    ) -> WireError {
        let error_type = self.validation_exception.name().to_string();
        let mut document = conversion.document(violations);
        let mut headers = IndexMap::new();
        headers.insert("Content-Type".to_string(), self.content_type.clone());
        match &self.error_type_location {
            ErrorTypeLocation::Header(name) => {
                headers.insert(name.clone(), error_type.clone());
            }
            ErrorTypeLocation::Body(key) => {
                if let Some(body) = document.as_object_mut() {
                    body.insert(key.clone(), error_type.clone().into());
                }
            }
        }
        WireError { status: conversion.status(), error_type, headers, document }
    }
}

fn validation_exception_id() -> ShapeId {
    ShapeId::from_parts("smithy.framework", "ValidationException")
}

/// A protocol materialised against one codegen context.
#[derive(Debug, Clone)]
pub struct ServerProtocolGenerator {
    protocol: ServerProtocol,
    validation_exception: Symbol,
}

impl ServerProtocolGenerator {
    pub fn new(ctx: &ServerCodegenContext, protocol: ServerProtocol) -> Self {
        let exception = ctx.model().shape(&protocol.validation_exception);
        let validation_exception = ctx.symbol_provider().to_symbol(exception);
        Self { protocol, validation_exception }
    }

    pub fn protocol(&self) -> &ServerProtocol {
        &self.protocol
    }

    /// Generated type validation failures are converted into.
    pub fn validation_exception_symbol(&self) -> &Symbol {
        &self.validation_exception
    }
}

/// One entry of the protocol registry.
pub trait ProtocolGeneratorFactory: Send + Sync {
    /// Trait id a service carries to opt into this protocol.
    fn protocol_id(&self) -> &ShapeId;

    fn protocol(&self, ctx: &ServerCodegenContext) -> ServerProtocol;

    fn build_protocol_generator(&self, ctx: &ServerCodegenContext) -> ServerProtocolGenerator {
        ServerProtocolGenerator::new(ctx, self.protocol(ctx))
    }
}

/// Factory for a protocol fully described by its [`ServerProtocol`] value.
#[derive(Debug, Clone)]
pub struct StaticProtocolFactory {
    protocol: ServerProtocol,
}

impl StaticProtocolFactory {
    pub fn new(protocol: ServerProtocol) -> Self {
        Self { protocol }
    }
}

impl ProtocolGeneratorFactory for StaticProtocolFactory {
    fn protocol_id(&self) -> &ShapeId {
        &self.protocol.id
    }

    fn protocol(&self, _ctx: &ServerCodegenContext) -> ServerProtocol {
        self.protocol.clone()
    }
}
