use std::sync::Arc;

use crate::constraints::validate_model;
use crate::error::Result;
use crate::model::{Model, Shape};
use crate::settings::{RustSymbolProviderConfig, ServerRustSettings};
use crate::symbol::{
    ConstrainedShapeSymbolProvider, ConstraintViolationSymbolProvider, SymbolProvider,
    UnconstrainedShapeSymbolProvider,
};

/// Builds the provider every other one decorates.
pub type BaseSymbolProviderFactory =
    fn(&ServerRustSettings, Arc<Model>, &Shape, &RustSymbolProviderConfig) -> Arc<dyn SymbolProvider>;

/// The cooperating providers for one model and service.
#[derive(Clone)]
pub struct ServerSymbolProviders {
    /// The public surface: constrained types when they are public, plain ones otherwise.
    pub symbol_provider: Arc<dyn SymbolProvider>,
    pub unconstrained_shape_symbol_provider: Arc<UnconstrainedShapeSymbolProvider>,
    pub constrained_shape_symbol_provider: Arc<ConstrainedShapeSymbolProvider>,
    pub constraint_violation_symbol_provider: Arc<ConstraintViolationSymbolProvider>,
    pub pub_crate_constrained_shape_symbol_provider: Arc<ConstrainedShapeSymbolProvider>,
}

impl ServerSymbolProviders {
    /// Validate the model's constraints, then compose the bundle.
    ///
    /// Fails with a model error instead of producing providers for a shape whose
    /// constraints cannot be represented.
    pub fn from(
        settings: &ServerRustSettings,
        model: Arc<Model>,
        service: &Shape,
        config: &RustSymbolProviderConfig,
        public_constrained_types: bool,
        base: BaseSymbolProviderFactory,
    ) -> Result<Self> {
        validate_model(&model, service, settings.codegen_config.ignore_unsupported_constraints)?;

        let base = base(settings, model, service, config);
        let layout = config.module_layout.clone();
        let nullability = config.nullability_check_mode;

        let constrained = Arc::new(ConstrainedShapeSymbolProvider::public(base.clone(), layout.clone(), nullability));
        let pub_crate_constrained =
            Arc::new(ConstrainedShapeSymbolProvider::pub_crate(base.clone(), layout.clone(), nullability));
        let unconstrained = Arc::new(UnconstrainedShapeSymbolProvider::new(base.clone(), layout));
        let violations = Arc::new(ConstraintViolationSymbolProvider::new(base.clone(), public_constrained_types));

        let symbol_provider: Arc<dyn SymbolProvider> = if public_constrained_types {
            constrained.clone()
        } else {
            base
        };

        tracing::debug!(
            service = %service.id,
            public_constrained_types,
            "composed server symbol providers"
        );

        Ok(Self {
            symbol_provider,
            unconstrained_shape_symbol_provider: unconstrained,
            constrained_shape_symbol_provider: constrained,
            constraint_violation_symbol_provider: violations,
            pub_crate_constrained_shape_symbol_provider: pub_crate_constrained,
        })
    }
}
