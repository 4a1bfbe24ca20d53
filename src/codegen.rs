//! Compilation driver.
//!
//! Phase 1 runs once and serially: compose the symbol providers, resolve the
//! protocol, freeze everything into a [`ServerCodegenContext`]. Phase 2 fans
//! out over the structures reachable from the service; each worker only reads
//! the context.
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;

use crate::builder::{BuilderArtifact, ServerBuilderGenerator};
use crate::context::ServerCodegenContext;
use crate::error::{CodegenError, Result};
use crate::model::{Model, Shape, ShapeId, Walker, UNIT};
use crate::protocol::{ServerProtocol, ServerProtocolGenerator, ServerProtocolLoader, SmithyValidationExceptionConversion};
use crate::settings::{RustSymbolProviderConfig, ServerRustSettings};
use crate::symbol::{base_symbol_provider, ServerSymbolProviders, Symbol, SymbolProvider, Visibility};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Result of one compilation run.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Compilation {
    pub service: ShapeId,
    pub module: String,
    pub public_constrained_types: bool,
    pub protocol: ServerProtocol,
    /// One per reachable structure, ordered by shape id.
    pub artifacts: Vec<BuilderArtifact>,
    #[serde(skip)]
    context: ServerCodegenContext,
    #[serde(skip)]
    generator: ServerProtocolGenerator,
}

impl Compilation {
    pub fn context(&self) -> &ServerCodegenContext {
        &self.context
    }

    pub fn protocol_generator(&self) -> &ServerProtocolGenerator {
        &self.generator
    }

    pub fn artifact(&self, shape: &ShapeId) -> Option<&BuilderArtifact> {
        self.artifacts
            .binary_search_by(|a| a.shape.cmp(shape))
            .ok()
            .map(|index| &self.artifacts[index])
    }
}

/// The symbols every provider assigns to one shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolRow {
    pub shape: ShapeId,
    pub symbol: Symbol,
    pub unconstrained: Symbol,
    pub constrained: Symbol,
    pub constraint_violation: Symbol,
    pub pub_crate_constrained: Symbol,
}

impl SymbolRow {
    /// The public symbol names a crate-private type, directly or as a
    /// type argument.
    pub fn exposes_crate_private(&self) -> bool {
        let name = self.symbol.full_name();
        self.symbol.visibility == Visibility::PubCrate
            || name.contains("crate::constrained::")
            || name.contains("crate::unconstrained::")
    }
}

// ————————————————————————————————————————————————————————————————————————————
// DRIVER
// ————————————————————————————————————————————————————————————————————————————

/// Compile `model` for the service named in `settings` with the built-in
/// protocol registry.
pub fn compile(model: Model, settings: &ServerRustSettings) -> Result<Compilation> {
    compile_with(Arc::new(model), settings, &ServerProtocolLoader::default())
}

pub fn compile_with(
    model: Arc<Model>,
    settings: &ServerRustSettings,
    loader: &ServerProtocolLoader,
) -> Result<Compilation> {
    let service = model
        .get_shape(&settings.service)
        .filter(|shape| shape.is_service())
        .cloned()
        .ok_or_else(|| CodegenError::ServiceNotFound(settings.service.clone()))?;
    let public_constrained_types = settings.codegen_config.public_constrained_types;

    // phase 1
    let providers = ServerSymbolProviders::from(
        settings,
        model.clone(),
        &service,
        &RustSymbolProviderConfig::server(),
        public_constrained_types,
        base_symbol_provider,
    )?;
    let (protocol_id, factory) = loader.protocol_for(&service, settings.codegen_config.protocol.as_ref())?;
    let context = ServerCodegenContext::new(model, service, protocol_id, settings.clone(), providers);
    let generator = factory.build_protocol_generator(&context);

    // phase 2
    let structures = reachable_structures(&context);
    let conversion = SmithyValidationExceptionConversion;
    let mut artifacts = structures
        .par_iter()
        .map(|shape| {
            ServerBuilderGenerator::new(&context, shape, &conversion, generator.protocol()).map(|g| g.generate())
        })
        .collect::<Result<Vec<_>>>()?;
    artifacts.sort_by(|a, b| a.shape.cmp(&b.shape));

    tracing::info!(
        service = %context.service().id,
        protocol = %context.protocol(),
        structures = artifacts.len(),
        "compiled service"
    );

    Ok(Compilation {
        service: context.service().id.clone(),
        module: settings.module_name.clone(),
        public_constrained_types,
        protocol: generator.protocol().clone(),
        artifacts,
        context,
        generator,
    })
}

/// Structures reachable from the service, ordered by id. `Unit` has no
/// builder.
fn reachable_structures(ctx: &ServerCodegenContext) -> Vec<&Shape> {
    let mut out: Vec<&Shape> = Walker::new(ctx.model())
        .walk_shapes(ctx.service())
        .into_iter()
        .filter(|shape| shape.is_structure() && shape.id.to_string() != UNIT)
        .collect();
    out.sort_by(|a, b| a.id.cmp(&b.id));
    out
}

/// Every provider's symbol for every shape reachable from the service.
pub fn symbol_table(ctx: &ServerCodegenContext) -> Vec<SymbolRow> {
    let mut shapes = Walker::new(ctx.model()).walk_shapes(ctx.service());
    shapes.sort_by(|a, b| a.id.cmp(&b.id));
    shapes
        .into_iter()
        .map(|shape| SymbolRow {
            shape: shape.id.clone(),
            symbol: ctx.symbol_provider().to_symbol(shape),
            unconstrained: ctx.unconstrained_shape_symbol_provider().to_symbol(shape),
            constrained: ctx.constrained_shape_symbol_provider().to_symbol(shape),
            constraint_violation: ctx.constraint_violation_symbol_provider().to_symbol(shape),
            pub_crate_constrained: ctx.pub_crate_constrained_shape_symbol_provider().to_symbol(shape),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ServerCodegenConfig;
    use crate::testutil::server_test_rust_settings_with;
    use serde_json::json;

    fn model() -> Model {
        Model::from_json_ast(&model_json()).unwrap()
    }

    fn model_json() -> String {
        json!({
            "smithy": "2.0",
            "shapes": {
                "ex#Widgets": {
                    "type": "service",
                    "version": "2024-01-01",
                    "operations": [{ "target": "ex#PutWidget" }],
                    "traits": { "aws.protocols#restJson1": {} }
                },
                "ex#PutWidget": {
                    "type": "operation",
                    "input": { "target": "ex#PutWidgetInput" },
                    "output": { "target": "ex#PutWidgetOutput" },
                    "errors": [{ "target": "smithy.framework#ValidationException" }]
                },
                "ex#PutWidgetInput": {
                    "type": "structure",
                    "members": { "widget": { "target": "ex#Widget", "traits": { "smithy.api#required": {} } } }
                },
                "ex#PutWidgetOutput": { "type": "structure", "members": {} },
                "ex#Id": { "type": "string", "traits": { "smithy.api#length": { "min": 1, "max": 36 } } },
                "ex#Count": { "type": "integer", "traits": { "smithy.api#range": { "min": 0, "max": 100 } } },
                "ex#Widget": {
                    "type": "structure",
                    "members": {
                        "id": { "target": "ex#Id", "traits": { "smithy.api#required": {} } },
                        "count": { "target": "ex#Count" },
                        "parts": { "target": "ex#Parts" }
                    }
                },
                "ex#Parts": { "type": "list", "member": { "target": "ex#Widget" } }
            }
        })
        .to_string()
    }

    fn settings(public: bool) -> ServerRustSettings {
        let mut settings = server_test_rust_settings_with(ServerCodegenConfig {
            public_constrained_types: public,
            ..ServerCodegenConfig::default()
        });
        settings.service = ShapeId::parse("ex#Widgets").unwrap();
        settings
    }

    #[test]
    fn compilation_is_deterministic() {
        let first = serde_json::to_string(&compile(model(), &settings(true)).unwrap()).unwrap();
        for _ in 0..4 {
            let again = serde_json::to_string(&compile(model(), &settings(true)).unwrap()).unwrap();
            assert_eq!(first, again);
        }
    }

    #[test]
    fn artifacts_cover_reachable_structures_in_id_order() {
        let compilation = compile(model(), &settings(true)).unwrap();
        let shapes: Vec<String> = compilation.artifacts.iter().map(|a| a.shape.to_string()).collect();
        assert_eq!(
            shapes,
            [
                "ex#PutWidgetInput",
                "ex#PutWidgetOutput",
                "ex#Widget",
                "smithy.framework#ValidationException",
                "smithy.framework#ValidationExceptionField",
            ]
        );
        assert_eq!(compilation.protocol.id.to_string(), "aws.protocols#restJson1");
        let input = compilation.artifact(&ShapeId::parse("ex#PutWidgetInput").unwrap()).unwrap();
        assert_eq!(input.structure.symbol, "crate::input::PutWidgetInput");
    }

    #[test]
    fn hidden_constrained_types_stay_out_of_the_public_surface() {
        let compilation = compile(model(), &settings(false)).unwrap();
        let table = symbol_table(compilation.context());
        assert!(table.iter().all(|row| !row.exposes_crate_private()));
        for artifact in &compilation.artifacts {
            for field in &artifact.structure.fields {
                assert!(!field.symbol.contains("crate::constrained"), "{}", field.symbol);
            }
        }

        let id = table.iter().find(|row| row.shape.to_string() == "ex#Id").unwrap();
        assert_eq!(id.pub_crate_constrained.visibility, Visibility::PubCrate);
        assert_eq!(id.unconstrained.full_name(), "::std::string::String");
        assert_eq!(id.constraint_violation.full_name(), "crate::model::id::ConstraintViolation");
        assert_eq!(id.constraint_violation.visibility, Visibility::PubCrate);
    }

    #[test]
    fn symbol_table_is_total_over_reachable_shapes() {
        let compilation = compile(model(), &settings(true)).unwrap();
        let ctx = compilation.context();
        let reachable = Walker::new(ctx.model()).walk_shapes(ctx.service()).len();
        assert_eq!(symbol_table(ctx).len(), reachable);
    }

    #[test]
    fn unit_union_members_get_no_builder() {
        let mut doc: serde_json::Value = serde_json::from_str(&model_json()).unwrap();
        doc["shapes"]["ex#Widget"]["members"]["mode"] = json!({ "target": "ex#Mode" });
        doc["shapes"]["ex#Mode"] = json!({
            "type": "union",
            "members": { "auto": { "target": "smithy.api#Unit" }, "fixed": { "target": "ex#Count" } }
        });
        let compilation = compile(Model::from_json_ast(&doc.to_string()).unwrap(), &settings(true)).unwrap();
        assert!(compilation.artifact(&ShapeId::parse(UNIT).unwrap()).is_none());
        assert!(compilation.artifact(&ShapeId::parse("ex#Widget").unwrap()).is_some());
    }

    #[test]
    fn unknown_service_is_an_error() {
        let mut s = settings(true);
        s.service = ShapeId::parse("ex#Nope").unwrap();
        assert!(matches!(compile(model(), &s), Err(CodegenError::ServiceNotFound(_))));
    }

    #[test]
    fn missing_validation_exception_fails_compilation() {
        let model = Model::from_json_ast(&json!({
            "smithy": "2.0",
            "shapes": {
                "ex#Svc": {
                    "type": "service",
                    "operations": [{ "target": "ex#Op" }],
                    "traits": { "aws.protocols#restJson1": {} }
                },
                "ex#Op": { "type": "operation", "input": { "target": "ex#In" } },
                "ex#In": {
                    "type": "structure",
                    "members": { "a": { "target": "smithy.api#String", "traits": { "smithy.api#required": {} } } }
                }
            }
        }).to_string()).unwrap();
        let mut s = settings(true);
        s.service = ShapeId::parse("ex#Svc").unwrap();
        assert!(matches!(
            compile(model.clone(), &s),
            Err(CodegenError::MissingValidationException { .. })
        ));

        s.codegen_config.ignore_unsupported_constraints = true;
        assert!(compile(model, &s).is_ok());
    }
}
