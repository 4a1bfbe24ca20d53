//! The one value every generator receives.
use std::sync::Arc;

use crate::model::{Model, Shape, ShapeId};
use crate::settings::ServerRustSettings;
use crate::symbol::{
    ConstrainedShapeSymbolProvider, ConstraintViolationSymbolProvider, ServerSymbolProviders, SymbolProvider,
    UnconstrainedShapeSymbolProvider,
};

/// Model, service, settings, resolved protocol and symbol providers of one
/// compilation run. Built once before any per-shape generation starts and
/// only read afterwards, so it can be shared across worker threads.
#[derive(Clone)]
pub struct ServerCodegenContext {
    model: Arc<Model>,
    service: Shape,
    protocol: ShapeId,
    settings: ServerRustSettings,
    providers: ServerSymbolProviders,
}

impl ServerCodegenContext {
    pub fn new(
        model: Arc<Model>,
        service: Shape,
        protocol: ShapeId,
        settings: ServerRustSettings,
        providers: ServerSymbolProviders,
    ) -> Self {
        Self { model, service, protocol, settings, providers }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn model_arc(&self) -> Arc<Model> {
        self.model.clone()
    }

    pub fn service(&self) -> &Shape {
        &self.service
    }

    pub fn protocol(&self) -> &ShapeId {
        &self.protocol
    }

    pub fn settings(&self) -> &ServerRustSettings {
        &self.settings
    }

    pub fn public_constrained_types(&self) -> bool {
        self.settings.codegen_config.public_constrained_types
    }

    pub fn symbol_providers(&self) -> &ServerSymbolProviders {
        &self.providers
    }

    pub fn symbol_provider(&self) -> &dyn SymbolProvider {
        self.providers.symbol_provider.as_ref()
    }

    pub fn unconstrained_shape_symbol_provider(&self) -> &UnconstrainedShapeSymbolProvider {
        &self.providers.unconstrained_shape_symbol_provider
    }

    pub fn constrained_shape_symbol_provider(&self) -> &ConstrainedShapeSymbolProvider {
        &self.providers.constrained_shape_symbol_provider
    }

    pub fn constraint_violation_symbol_provider(&self) -> &ConstraintViolationSymbolProvider {
        &self.providers.constraint_violation_symbol_provider
    }

    pub fn pub_crate_constrained_shape_symbol_provider(&self) -> &ConstrainedShapeSymbolProvider {
        &self.providers.pub_crate_constrained_shape_symbol_provider
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::server_test_codegen_context;
    use serde_json::json;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn context_is_shareable_across_threads() {
        assert_send_sync::<ServerCodegenContext>();
    }

    #[test]
    fn test_context_defaults_to_placeholder_protocol() {
        let model = Model::from_json_ast(&json!({
            "smithy": "2.0",
            "shapes": { "ex#Plain": { "type": "structure", "members": {} } }
        }).to_string()).unwrap();
        let ctx = server_test_codegen_context(model, None, None, None).unwrap();
        assert_eq!(ctx.protocol().to_string(), "test#Protocol");
        assert_eq!(ctx.service().id.to_string(), "test#Service");
        assert!(ctx.public_constrained_types());
    }
}
