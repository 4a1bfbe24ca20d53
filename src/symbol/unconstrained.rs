use std::sync::Arc;

use heck::{ToSnakeCase, ToUpperCamelCase};

use crate::constraints::can_reach_constrained;
use crate::model::{Model, Shape, ShapeKind};
use crate::settings::ModuleLayout;
use crate::symbol::{RustType, Symbol, SymbolProvider, Visibility};

/// What a builder holds before validation has run.
///
/// - constrained simple shapes → their plain primitive;
/// - structures that can reach a constraint → their builder;
/// - collections and unions that can reach a constraint → a `pub(crate)`
///   `*Unconstrained` mirror in the `unconstrained` module;
/// - members → the unconstrained type of their target (boxed on cycles, never
///   optional: builder fields add their own `Option`);
/// - anything else → the base symbol.
pub struct UnconstrainedShapeSymbolProvider {
    base: Arc<dyn SymbolProvider>,
    layout: ModuleLayout,
}

impl UnconstrainedShapeSymbolProvider {
    pub fn new(base: Arc<dyn SymbolProvider>, layout: ModuleLayout) -> Self {
        Self { base, layout }
    }

    fn mirror(&self, shape: &Shape) -> Symbol {
        let snake = shape.id.name().to_snake_case();
        let name = format!("{}Unconstrained", shape.id.name().to_upper_camel_case());
        let namespace = format!("{}::{snake}_unconstrained", self.layout.unconstrained);
        Symbol::new(RustType::opaque(namespace, name)).with_visibility(Visibility::PubCrate)
    }

    fn builder(&self, shape: &Shape) -> Symbol {
        let structure = self.base.to_symbol(shape);
        let namespace = structure.rust_type.namespace().unwrap_or(self.layout.model);
        let module = format!("{namespace}::{}", shape.id.name().to_snake_case());
        Symbol::new(RustType::opaque(module, "Builder"))
    }
}

impl SymbolProvider for UnconstrainedShapeSymbolProvider {
    fn model(&self) -> &Model {
        self.base.model()
    }

    fn to_symbol(&self, shape: &Shape) -> Symbol {
        let model = self.model();
        match &shape.kind {
            ShapeKind::Member { target } => {
                let inner = self.to_symbol(model.shape(target));
                let rust_type = if model.is_boxed(&shape.id) {
                    inner.rust_type.boxed()
                } else {
                    inner.rust_type
                };
                Symbol::new(rust_type).with_visibility(inner.visibility)
            }
            ShapeKind::Structure { .. } if can_reach_constrained(model, shape) => self.builder(shape),
            ShapeKind::List { .. } | ShapeKind::Map { .. } | ShapeKind::Union { .. }
                if can_reach_constrained(model, shape) =>
            {
                // a collection whose elements are all plain stays plain even
                // when it carries a length constraint itself
                let members_constrained = model
                    .members_of(shape)
                    .any(|member| can_reach_constrained(model, member));
                if members_constrained || matches!(shape.kind, ShapeKind::Union { .. }) {
                    self.mirror(shape)
                } else {
                    self.base.to_symbol(shape)
                }
            }
            _ => self.base.to_symbol(shape),
        }
    }

    fn to_member_name(&self, member: &Shape) -> String {
        self.base.to_member_name(member)
    }
}
