//! Fixtures for tests of this crate and of crates that plug into it.
//!
//! Everything here may fall back to a placeholder service or protocol;
//! production entry points in [`crate::codegen`] never do.
use std::sync::Arc;

use crate::builder::{BuilderArtifact, ServerBuilderGenerator};
use crate::context::ServerCodegenContext;
use crate::error::Result;
use crate::model::{Model, Shape, ShapeId, ShapeKind};
use crate::protocol::{
    ErrorTypeLocation, Framing, ProtocolGeneratorFactory, ServerProtocol, ServerProtocolGenerator,
    ServerProtocolLoader, SmithyValidationExceptionConversion, StaticProtocolFactory,
};
use crate::settings::{RustSymbolProviderConfig, ServerCodegenConfig, ServerRustSettings};
use crate::symbol::{base_symbol_provider, ServerSymbolProviders, SymbolProvider};

/// Id of the protocol tests get when the model does not pick one.
pub fn test_protocol_id() -> ShapeId {
    ShapeId::from_parts("test", "Protocol")
}

pub fn test_protocol_factory() -> Arc<dyn ProtocolGeneratorFactory> {
    Arc::new(StaticProtocolFactory::new(ServerProtocol::new(
        test_protocol_id(),
        Framing::HttpBinding,
        "application/json",
        ErrorTypeLocation::Header("X-Amzn-Errortype".to_string()),
    )))
}

/// The built-in registry plus the placeholder protocol.
pub fn test_protocol_loader() -> ServerProtocolLoader {
    ServerProtocolLoader::default().with_factory(test_protocol_factory())
}

/// The model's first service, or an empty `test#Service` when it has none.
pub fn test_service_shape_for(model: &Model) -> Shape {
    match model.service_shapes().next() {
        Some(service) => service.clone(),
        None => Shape::new(
            ShapeId::from_parts("test", "Service"),
            ShapeKind::Service { version: "test".to_string(), operations: Vec::new() },
        ),
    }
}

pub fn server_test_rust_settings() -> ServerRustSettings {
    server_test_rust_settings_with(ServerCodegenConfig::default())
}

pub fn server_test_rust_settings_with(codegen_config: ServerCodegenConfig) -> ServerRustSettings {
    ServerRustSettings {
        service: ShapeId::from_parts("notrelevant", "notrelevant"),
        module_name: "test-module".to_string(),
        module_version: "0.0.1".to_string(),
        module_authors: vec!["notrelevant".to_string()],
        module_description: Some("not relevant".to_string()),
        module_repository: None,
        license: None,
        examples_uri: None,
        codegen_config,
        customization_config: None,
    }
}

pub fn server_test_symbol_providers(
    model: Model,
    service: Option<&Shape>,
    settings: Option<&ServerRustSettings>,
) -> Result<ServerSymbolProviders> {
    let service = service.cloned().unwrap_or_else(|| test_service_shape_for(&model));
    let settings = settings.cloned().unwrap_or_else(server_test_rust_settings);
    compose(Arc::new(model), &service, &settings)
}

fn compose(model: Arc<Model>, service: &Shape, settings: &ServerRustSettings) -> Result<ServerSymbolProviders> {
    ServerSymbolProviders::from(
        settings,
        model,
        service,
        &RustSymbolProviderConfig::server(),
        settings.codegen_config.public_constrained_types,
        base_symbol_provider,
    )
}

/// The public-surface provider alone.
pub fn server_test_symbol_provider(model: Model, service: Option<&Shape>) -> Result<Arc<dyn SymbolProvider>> {
    Ok(server_test_symbol_providers(model, service, None)?.symbol_provider)
}

pub fn server_test_codegen_context(
    model: Model,
    service: Option<Shape>,
    settings: Option<ServerRustSettings>,
    protocol: Option<ShapeId>,
) -> Result<ServerCodegenContext> {
    let service = service.unwrap_or_else(|| test_service_shape_for(&model));
    let settings = settings.unwrap_or_else(server_test_rust_settings);
    let model = Arc::new(model);
    let providers = compose(model.clone(), &service, &settings)?;
    Ok(ServerCodegenContext::new(
        model,
        service,
        protocol.unwrap_or_else(test_protocol_id),
        settings,
        providers,
    ))
}

/// The protocol of the model's service, or the placeholder when it declares
/// none (or several).
pub fn load_server_protocol(model: Model) -> Result<ServerProtocolGenerator> {
    let service = test_service_shape_for(&model);
    let (protocol, factory) = test_protocol_loader()
        .protocol_for(&service, None)
        .unwrap_or_else(|_| (test_protocol_id(), test_protocol_factory()));
    let ctx = server_test_codegen_context(model, Some(service), None, Some(protocol))?;
    Ok(factory.build_protocol_generator(&ctx))
}

/// Render a structure with the standard builder, whatever
/// `publicConstrainedTypes` says.
pub fn server_render_with_model_builder(ctx: &ServerCodegenContext, shape: &Shape) -> Result<BuilderArtifact> {
    let loader = test_protocol_loader();
    let factory = loader
        .protocol_for(ctx.service(), Some(ctx.protocol()))
        .map(|(_, factory)| factory)
        .unwrap_or_else(|_| test_protocol_factory());
    let generator = factory.build_protocol_generator(ctx);
    let conversion = SmithyValidationExceptionConversion;
    Ok(ServerBuilderGenerator::new(ctx, shape, &conversion, generator.protocol())?.generate())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn declared_protocol_wins_over_placeholder() {
        let model = Model::from_json_ast(&json!({
            "smithy": "2.0",
            "shapes": {
                "ex#Svc": { "type": "service", "version": "1", "traits": { "aws.protocols#restXml": {} } }
            }
        }).to_string()).unwrap();
        let generator = load_server_protocol(model).unwrap();
        assert_eq!(generator.protocol().id.to_string(), "aws.protocols#restXml");
        assert_eq!(generator.validation_exception_symbol().full_name(), "crate::error::ValidationException");
    }

    #[test]
    fn placeholder_protocol_without_declared_one() {
        let model = Model::from_json_ast(r#"{ "smithy": "2.0", "shapes": {} }"#).unwrap();
        let generator = load_server_protocol(model).unwrap();
        assert_eq!(generator.protocol().id, test_protocol_id());
    }
}
