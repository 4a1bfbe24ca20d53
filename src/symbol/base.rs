use std::collections::BTreeMap;
use std::sync::Arc;

use heck::ToUpperCamelCase;

use crate::model::{Model, Shape, ShapeId, ShapeKind, Walker};
use crate::settings::{NullabilityCheckMode, RustSymbolProviderConfig, ServerRustSettings};
use crate::symbol::{RustType, Symbol, SymbolDefault, SymbolProvider};

/// The plain, unconstrained-by-construction representation every other
/// provider decorates.
pub struct BaseSymbolProvider {
    model: Arc<Model>,
    config: RustSymbolProviderConfig,
    /// Operation inputs and outputs get their own modules.
    io_modules: BTreeMap<ShapeId, &'static str>,
}

/// Default [`crate::symbol::BaseSymbolProviderFactory`].
pub fn base_symbol_provider(
    _settings: &ServerRustSettings,
    model: Arc<Model>,
    service: &Shape,
    config: &RustSymbolProviderConfig,
) -> Arc<dyn SymbolProvider> {
    Arc::new(BaseSymbolProvider::new(model, service, config.clone()))
}

impl BaseSymbolProvider {
    pub fn new(model: Arc<Model>, service: &Shape, config: RustSymbolProviderConfig) -> Self {
        let mut io_modules = BTreeMap::new();
        for shape in Walker::new(&model).walk_shapes(service) {
            if let ShapeKind::Operation { input, output, .. } = &shape.kind {
                if let Some(input) = input {
                    io_modules.insert(input.clone(), config.module_layout.input);
                }
                if let Some(output) = output {
                    io_modules.insert(output.clone(), config.module_layout.output);
                }
            }
        }
        Self { model, config, io_modules }
    }

    fn module_for(&self, shape: &Shape) -> &'static str {
        let layout = &self.config.module_layout;
        match &shape.kind {
            ShapeKind::Operation { .. } => layout.operation,
            ShapeKind::Service { .. } => "crate",
            _ if shape.traits.error().is_some() => layout.error,
            _ => self.io_modules.get(&shape.id).copied().unwrap_or(layout.model),
        }
    }

    fn type_name(&self, shape: &Shape) -> String {
        let name = shape.id.name().to_upper_camel_case();
        if self.config.rename_exceptions && shape.traits.error().is_some() && !name.ends_with("Error") {
            format!("{name}Error")
        } else {
            name
        }
    }
}

impl SymbolProvider for BaseSymbolProvider {
    fn model(&self) -> &Model {
        &self.model
    }

    fn to_symbol(&self, shape: &Shape) -> Symbol {
        let target_type = |id: &ShapeId| self.to_symbol(self.model.shape(id)).rust_type.stripped().clone();
        let rust_type = match &shape.kind {
            ShapeKind::Blob => RustType::Blob,
            ShapeKind::Boolean => RustType::Bool,
            ShapeKind::String => RustType::String,
            ShapeKind::Byte => RustType::I8,
            ShapeKind::Short => RustType::I16,
            ShapeKind::Integer => RustType::I32,
            ShapeKind::Long => RustType::I64,
            ShapeKind::Float => RustType::F32,
            ShapeKind::Double => RustType::F64,
            ShapeKind::Timestamp => RustType::DateTime,
            ShapeKind::Document => RustType::Document,
            ShapeKind::List { member } => RustType::Vec(Box::new(member_type(self, member))),
            ShapeKind::Map { key, value } => RustType::HashMap(
                Box::new(member_type(self, key)),
                Box::new(member_type(self, value)),
            ),
            ShapeKind::Structure { .. }
            | ShapeKind::Union { .. }
            | ShapeKind::Operation { .. }
            | ShapeKind::Service { .. } => RustType::opaque(self.module_for(shape), self.type_name(shape)),
            ShapeKind::Member { target } => {
                let rust_type = wrap_member(&self.model, self.config.nullability_check_mode, shape, target_type(target));
                return Symbol::new(rust_type).with_default(member_default(shape));
            }
        };
        Symbol::new(rust_type)
    }
}

/// Collection element types go through the member so boxing applies.
fn member_type(provider: &dyn SymbolProvider, member: &ShapeId) -> RustType {
    provider.to_symbol(provider.model().shape(member)).rust_type
}

pub(crate) fn member_default(member: &Shape) -> SymbolDefault {
    match member.traits.default_value() {
        Some(value) => SymbolDefault::Literal(value.to_string()),
        None => SymbolDefault::None,
    }
}

/// Structure members are optional unless the nullability mode says otherwise;
/// list, map and union members never are.
pub fn is_nullable(model: &Model, mode: NullabilityCheckMode, member: &Shape) -> bool {
    let in_structure = model
        .get_shape(&member.id.without_member())
        .is_some_and(Shape::is_structure);
    if !in_structure {
        return false;
    }
    match mode {
        NullabilityCheckMode::Client => true,
        NullabilityCheckMode::Server => {
            !member.traits.is_required() && member.traits.default_value().is_none()
        }
    }
}

/// Apply recursion boxing and nullability to a member's target type.
pub(crate) fn wrap_member(model: &Model, mode: NullabilityCheckMode, member: &Shape, inner: RustType) -> RustType {
    let inner = if model.is_boxed(&member.id) { inner.boxed() } else { inner };
    if is_nullable(model, mode, member) { inner.option() } else { inner }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{server_test_rust_settings, test_service_shape_for};
    use serde_json::json;

    fn provider(shapes: serde_json::Value) -> (Arc<Model>, Arc<dyn SymbolProvider>) {
        let model = Arc::new(
            Model::from_json_ast(&json!({ "smithy": "2.0", "shapes": shapes }).to_string()).unwrap(),
        );
        let service = test_service_shape_for(&model);
        let p = base_symbol_provider(&server_test_rust_settings(), model.clone(), &service, &RustSymbolProviderConfig::server());
        (model, p)
    }

    fn id(raw: &str) -> ShapeId { ShapeId::parse(raw).unwrap() }

    #[test]
    fn server_nullability_and_boxing() {
        let (model, p) = provider(json!({
            "ex#Node": {
                "type": "structure",
                "members": {
                    "name": { "target": "smithy.api#String", "traits": { "smithy.api#required": {} } },
                    "size": { "target": "smithy.api#Integer", "traits": { "smithy.api#default": 0 } },
                    "next": { "target": "ex#Node" },
                    "tags": { "target": "ex#Tags" }
                }
            },
            "ex#Tags": { "type": "map", "key": { "target": "smithy.api#String" }, "value": { "target": "smithy.api#Long" } }
        }));
        let sym = |raw: &str| p.to_symbol(model.shape(&id(raw)));

        assert_eq!(sym("ex#Node").full_name(), "crate::model::Node");
        assert_eq!(sym("ex#Node$name").full_name(), "::std::string::String");
        let size = sym("ex#Node$size");
        assert_eq!(size.full_name(), "i32");
        assert_eq!(size.default, SymbolDefault::Literal("0".into()));
        assert_eq!(
            sym("ex#Node$next").full_name(),
            "::std::option::Option<::std::boxed::Box<crate::model::Node>>"
        );
        assert_eq!(
            sym("ex#Node$tags").full_name(),
            "::std::option::Option<::std::collections::HashMap<::std::string::String, i64>>"
        );
        assert_eq!(p.to_member_name(model.shape(&id("ex#Node$next"))), "next");
    }

    #[test]
    fn operation_io_and_errors_get_their_modules() {
        let (model, p) = provider(json!({
            "ex#Svc": { "type": "service", "version": "1", "operations": [{ "target": "ex#Get" }] },
            "ex#Get": {
                "type": "operation",
                "input": { "target": "ex#GetInput" },
                "output": { "target": "ex#GetOutput" },
                "errors": [{ "target": "ex#Oops" }]
            },
            "ex#GetInput": { "type": "structure" },
            "ex#GetOutput": { "type": "structure" },
            "ex#Oops": { "type": "structure", "traits": { "smithy.api#error": "server" } }
        }));
        let sym = |raw: &str| p.to_symbol(model.shape(&id(raw))).full_name();
        assert_eq!(sym("ex#GetInput"), "crate::input::GetInput");
        assert_eq!(sym("ex#GetOutput"), "crate::output::GetOutput");
        assert_eq!(sym("ex#Oops"), "crate::error::Oops");
        assert_eq!(sym("ex#Get"), "crate::operation::Get");
        assert_eq!(sym("ex#Svc"), "crate::Svc");
    }
}
