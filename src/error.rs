//! Generator-side failures.
//!
//! Everything here aborts a compilation run. Constraint violations raised by
//! *generated* builders are not errors of the generator and live in
//! [`crate::builder::violation`] instead.

use crate::model::ShapeId;

pub type Result<T, E = CodegenError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    #[error("failed to parse model at JSON path {path}: {message}")]
    ModelParse { path: String, message: String },

    #[error("failed to parse settings at JSON path {path}: {message}")]
    SettingsParse { path: String, message: String },

    #[error("invalid shape id `{0}`")]
    InvalidShapeId(String),

    #[error("shape `{missing}` referenced by `{referenced_by}` does not exist in the model")]
    ShapeNotFound { missing: ShapeId, referenced_by: ShapeId },

    #[error("shape `{0}` is defined twice with different definitions")]
    ConflictingShapeDefinition(ShapeId),

    #[error("service `{0}` not found in the model")]
    ServiceNotFound(ShapeId),

    #[error("shape `{0}` is not a structure")]
    NotAStructure(ShapeId),

    #[error("shape `{shape}` has an unsupported constraint: {detail}")]
    UnsupportedConstraint { shape: ShapeId, detail: String },

    #[error("shape `{shape}` has conflicting constraints: {detail}")]
    ConflictingConstraint { shape: ShapeId, detail: String },

    #[error(
        "operation `{operation}` takes constrained input but does not list \
         `smithy.framework#ValidationException` among its errors"
    )]
    MissingValidationException { operation: ShapeId },

    #[error("service `{service}` has no supported protocol; supported protocols are [{}]", join_ids(.supported))]
    ProtocolNotFound { service: ShapeId, supported: Vec<ShapeId> },

    #[error(
        "service `{service}` declares several supported protocols [{}]; set `codegen.protocol` to pick one",
        join_ids(.candidates)
    )]
    AmbiguousProtocol { service: ShapeId, candidates: Vec<ShapeId> },

    #[error("protocol override `{protocol}` is not usable for service `{service}`; candidates are [{}]", join_ids(.candidates))]
    UnsupportedProtocolOverride {
        service: ShapeId,
        protocol: ShapeId,
        candidates: Vec<ShapeId>,
    },
}

fn join_ids(ids: &[ShapeId]) -> String {
    ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}
