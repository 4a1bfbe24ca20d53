use std::sync::Arc;

use heck::{ToSnakeCase, ToUpperCamelCase};

use crate::constraints::{can_reach_constrained, is_directly_constrained};
use crate::model::{Model, Shape, ShapeKind};
use crate::settings::{ModuleLayout, NullabilityCheckMode};
use crate::symbol::base::{member_default, wrap_member};
use crate::symbol::{RustType, Symbol, SymbolProvider, Visibility};

/// Maps constrained simple shapes and constrained collections to wrapper types
/// that can only be built through a validating `TryFrom`. Everything else
/// falls through to the base provider.
///
/// The `pub(crate)` flavour places the wrappers in the `constrained` module so
/// they never show up in the public API.
pub struct ConstrainedShapeSymbolProvider {
    base: Arc<dyn SymbolProvider>,
    visibility: Visibility,
    layout: ModuleLayout,
    nullability: NullabilityCheckMode,
}

impl ConstrainedShapeSymbolProvider {
    pub fn public(base: Arc<dyn SymbolProvider>, layout: ModuleLayout, nullability: NullabilityCheckMode) -> Self {
        Self { base, visibility: Visibility::Public, layout, nullability }
    }

    pub fn pub_crate(base: Arc<dyn SymbolProvider>, layout: ModuleLayout, nullability: NullabilityCheckMode) -> Self {
        Self { base, visibility: Visibility::PubCrate, layout, nullability }
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    fn wrapper(&self, shape: &Shape) -> Symbol {
        let name = shape.id.name().to_upper_camel_case();
        let rust_type = match self.visibility {
            Visibility::Public => RustType::opaque(self.layout.model, name),
            Visibility::PubCrate => RustType::opaque(
                format!("{}::{}_constrained", self.layout.constrained, shape.id.name().to_snake_case()),
                format!("{name}Constrained"),
            ),
        };
        Symbol::new(rust_type).with_visibility(self.visibility)
    }

    fn member_symbol(&self, member: &Shape) -> Symbol {
        let model = self.model();
        let target = model.target_of(member);
        let target_symbol = self.to_symbol(target);
        Symbol::new(wrap_member(model, self.nullability, member, target_symbol.rust_type))
            .with_visibility(target_symbol.visibility)
            .with_default(member_default(member))
    }
}

impl SymbolProvider for ConstrainedShapeSymbolProvider {
    fn model(&self) -> &Model {
        self.base.model()
    }

    fn to_symbol(&self, shape: &Shape) -> Symbol {
        let model = self.model();
        match &shape.kind {
            ShapeKind::Member { .. } => self.member_symbol(shape),
            // structures validate through their builder, not through a wrapper
            ShapeKind::Structure { .. } | ShapeKind::Union { .. } => self.base.to_symbol(shape),
            _ if is_directly_constrained(model, shape) => self.wrapper(shape),
            ShapeKind::List { member } if can_reach_constrained(model, shape) => {
                let item = self.to_symbol(model.shape(member)).rust_type;
                Symbol::new(RustType::Vec(Box::new(item))).with_visibility(self.visibility)
            }
            ShapeKind::Map { key, value } if can_reach_constrained(model, shape) => {
                let key = self.to_symbol(model.shape(key)).rust_type;
                let value = self.to_symbol(model.shape(value)).rust_type;
                Symbol::new(RustType::HashMap(Box::new(key), Box::new(value))).with_visibility(self.visibility)
            }
            _ => self.base.to_symbol(shape),
        }
    }

    fn to_member_name(&self, member: &Shape) -> String {
        self.base.to_member_name(member)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ShapeId;
    use crate::testutil::server_test_symbol_providers;
    use serde_json::json;

    fn id(raw: &str) -> ShapeId { ShapeId::parse(raw).unwrap() }

    fn model() -> Model {
        Model::from_json_ast(&json!({
            "smithy": "2.0",
            "shapes": {
                "ex#Id": { "type": "string", "traits": { "smithy.api#length": { "min": 1, "max": 36 } } },
                "ex#Ids": { "type": "list", "member": { "target": "ex#Id" } },
                "ex#Widget": {
                    "type": "structure",
                    "members": {
                        "id": { "target": "ex#Id", "traits": { "smithy.api#required": {} } },
                        "aliases": { "target": "ex#Ids" },
                        "note": { "target": "smithy.api#String" }
                    }
                }
            }
        }).to_string()).unwrap()
    }

    #[test]
    fn public_wrappers_live_in_model_module() {
        let providers = server_test_symbol_providers(model(), None, None).unwrap();
        let p = &providers.constrained_shape_symbol_provider;
        let m = p.model();
        let sym = |raw: &str| p.to_symbol(m.shape(&id(raw)));

        assert_eq!(sym("ex#Id").full_name(), "crate::model::Id");
        assert_eq!(sym("ex#Id").visibility, Visibility::Public);
        assert_eq!(sym("ex#Ids").full_name(), "::std::vec::Vec<crate::model::Id>");
        assert_eq!(sym("ex#Widget$id").full_name(), "crate::model::Id");
        assert_eq!(
            sym("ex#Widget$aliases").full_name(),
            "::std::option::Option<::std::vec::Vec<crate::model::Id>>"
        );
        assert_eq!(sym("ex#Widget").full_name(), "crate::model::Widget");
        assert_eq!(sym("ex#Widget$note").visibility, Visibility::Public);
    }

    #[test]
    fn pub_crate_wrappers_are_hidden() {
        let providers = server_test_symbol_providers(model(), None, None).unwrap();
        let p = &providers.pub_crate_constrained_shape_symbol_provider;
        let m = p.model();
        let id_sym = p.to_symbol(m.shape(&id("ex#Id")));
        assert_eq!(id_sym.full_name(), "crate::constrained::id_constrained::IdConstrained");
        assert_eq!(id_sym.visibility, Visibility::PubCrate);
        assert_eq!(p.to_symbol(m.shape(&id("ex#Widget$id"))).visibility, Visibility::PubCrate);
    }
}
