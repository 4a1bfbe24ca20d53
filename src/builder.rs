//! Per-structure builder synthesis.
//!
//! [`ServerBuilderGenerator`] describes the structure type, a builder that
//! stores unconstrained values until `build`, the violation enum `build`
//! fails with, and the `builder()` convenience constructor. The description
//! is a [`BuilderArtifact`]; [`BuilderArtifact::build`] evaluates it against
//! candidate values so the described behaviour can be exercised directly.
pub mod artifact;
pub mod eval;
pub mod violation;

use heck::ToSnakeCase;

use crate::constraints::{can_reach_constrained, checks_for};
use crate::context::ServerCodegenContext;
use crate::error::{CodegenError, Result};
use crate::model::{Shape, VALIDATION_EXCEPTION};
use crate::protocol::{ServerProtocol, ValidationExceptionConversion};
use crate::symbol::{SymbolProvider, Visibility};

pub use artifact::{
    BuildFn, BuilderArtifact, BuilderDecl, BuilderField, ConvenienceMethod, Requirement, Setter, StructureDecl,
    StructureField, ViolationEnumDecl, WireMapping,
};
pub use eval::Validator;
pub use violation::{BuildError, ConstraintViolation, ConstraintViolations, ViolationCategory, ViolationKind};

const DERIVES: &[&str] = &["Debug", "Clone", "PartialEq"];

/// Generates the builder artifact of one structure.
///
/// There is a single builder flavour. Whether constrained wrappers are public
/// only changes which wrapper a member is validated into and whether `build`
/// unwraps it into the plain public field type afterwards.
pub struct ServerBuilderGenerator<'a> {
    ctx: &'a ServerCodegenContext,
    shape: &'a Shape,
    conversion: &'a dyn ValidationExceptionConversion,
    protocol: &'a ServerProtocol,
}

impl<'a> ServerBuilderGenerator<'a> {
    pub fn new(
        ctx: &'a ServerCodegenContext,
        shape: &'a Shape,
        conversion: &'a dyn ValidationExceptionConversion,
        protocol: &'a ServerProtocol,
    ) -> Result<Self> {
        if !shape.is_structure() {
            return Err(CodegenError::NotAStructure(shape.id.clone()));
        }
        Ok(Self { ctx, shape, conversion, protocol })
    }

    pub fn generate(&self) -> BuilderArtifact {
        let symbol = self.ctx.symbol_provider().to_symbol(self.shape);
        let name = symbol.name();
        let namespace = symbol.rust_type.namespace().unwrap_or("crate::model");
        let module = format!("{namespace}::{}", self.shape.id.name().to_snake_case());
        let builder_path = format!("{module}::Builder");

        let structure = StructureDecl {
            name: name.clone(),
            symbol: symbol.full_name(),
            visibility: Visibility::Public,
            documentation: self.shape.traits.documentation().map(str::to_string),
            derives: DERIVES.to_vec(),
            fields: self.structure_fields(),
        };
        let violation = self.violation_enum();
        let build = BuildFn {
            returns: symbol.full_name(),
            error: violation.as_ref().map(|v| v.symbol.clone()),
            exhaustive: true,
        };
        let builder = BuilderDecl {
            module,
            name: "Builder".to_string(),
            fields: self.builder_fields(),
            build,
        };
        let convenience = ConvenienceMethod { on: name, name: "builder".to_string(), returns: builder_path };

        tracing::trace!(shape = %self.shape.id, fields = builder.fields.len(), "generated builder");
        BuilderArtifact { shape: self.shape.id.clone(), structure, builder, violation, convenience }
    }

    fn structure_fields(&self) -> Vec<StructureField> {
        let provider = self.ctx.symbol_provider();
        self.ctx
            .model()
            .members_of(self.shape)
            .map(|member| StructureField {
                name: provider.to_member_name(member),
                member: member.id.clone(),
                symbol: provider.to_symbol(member).full_name(),
                documentation: member.traits.documentation().map(str::to_string),
            })
            .collect()
    }

    fn builder_fields(&self) -> Vec<BuilderField> {
        let model = self.ctx.model();
        let public = self.ctx.symbol_provider();
        let unconstrained = self.ctx.unconstrained_shape_symbol_provider();
        let validated_into: &dyn SymbolProvider = if self.ctx.public_constrained_types() {
            self.ctx.constrained_shape_symbol_provider()
        } else {
            self.ctx.pub_crate_constrained_shape_symbol_provider()
        };

        model
            .members_of(self.shape)
            .map(|member| {
                let name = public.to_member_name(member);
                let target = model.target_of(member);
                let public_symbol = public.to_symbol(member);
                let stored = unconstrained.to_symbol(member).rust_type;
                let takes_plain = stored.stripped() == public_symbol.rust_type.stripped();

                let internal_setter = (!takes_plain).then(|| Setter {
                    name: format!("set_{}", name.trim_start_matches("r#")),
                    visibility: Visibility::PubCrate,
                    accepts: stored.clone().option().to_string(),
                });

                let (validated_as, unwrap_into_public) = if can_reach_constrained(model, target) {
                    let validated = validated_into.to_symbol(target);
                    let unwrap = validated.visibility == Visibility::PubCrate
                        && validated.rust_type != *public.to_symbol(target).rust_type.stripped();
                    (Some(validated.full_name()), unwrap)
                } else {
                    (None, false)
                };

                BuilderField {
                    setter: Setter {
                        name: name.clone(),
                        visibility: Visibility::Public,
                        accepts: public_symbol.full_name(),
                    },
                    name,
                    member: member.id.clone(),
                    member_name: member.member_name().to_string(),
                    target: target.id.clone(),
                    stored: stored.option().to_string(),
                    internal_setter,
                    requirement: Requirement::of(member),
                    checks: checks_for(target),
                    validated_as,
                    unwrap_into_public,
                }
            })
            .collect()
    }

    fn violation_enum(&self) -> Option<ViolationEnumDecl> {
        let model = self.ctx.model();
        if !can_reach_constrained(model, self.shape) {
            return None;
        }
        let provider = self.ctx.constraint_violation_symbol_provider();
        let symbol = provider.to_symbol(self.shape);
        let exception_symbol = model
            .get_shape(&self.protocol.validation_exception)
            .map(|shape| self.ctx.symbol_provider().to_symbol(shape).full_name())
            .unwrap_or_else(|| VALIDATION_EXCEPTION.to_string());
        Some(ViolationEnumDecl {
            symbol: symbol.full_name(),
            visibility: symbol.visibility,
            variants: provider.violation_variants(self.shape),
            wire: WireMapping {
                protocol: self.protocol.id.clone(),
                exception: self.protocol.validation_exception.clone(),
                exception_symbol,
                status: self.conversion.status(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Model, ShapeId};
    use crate::settings::ServerCodegenConfig;
    use crate::testutil::{server_render_with_model_builder, server_test_codegen_context, server_test_rust_settings_with};
    use serde_json::{json, Map, Value};

    fn widget_model() -> Model {
        Model::from_json_ast(&json!({
            "smithy": "2.0",
            "shapes": {
                "ex#Id": { "type": "string", "traits": { "smithy.api#length": { "min": 1, "max": 36 } } },
                "ex#Count": { "type": "integer", "traits": { "smithy.api#range": { "min": 0, "max": 100 } } },
                "ex#Code": { "type": "string", "traits": { "smithy.api#pattern": "^[A-Z]{3}$" } },
                "ex#Widget": {
                    "type": "structure",
                    "members": {
                        "id": { "target": "ex#Id", "traits": { "smithy.api#required": {} } },
                        "count": { "target": "ex#Count" }
                    }
                },
                "ex#Order": {
                    "type": "structure",
                    "members": {
                        "owner": { "target": "smithy.api#String", "traits": { "smithy.api#required": {} } },
                        "quantity": { "target": "ex#Count" },
                        "code": { "target": "ex#Code" },
                        "priority": { "target": "smithy.api#Integer", "traits": { "smithy.api#default": 1 } }
                    }
                },
                "ex#Point": {
                    "type": "structure",
                    "members": {
                        "x": {
                            "target": "smithy.api#Double",
                            "traits": { "smithy.api#required": {}, "smithy.api#default": 0 }
                        },
                        "label": { "target": "smithy.api#String" }
                    }
                }
            }
        }).to_string()).unwrap()
    }

    fn render(public: bool, shape: &str) -> (BuilderArtifact, Validator) {
        let settings = server_test_rust_settings_with(ServerCodegenConfig {
            public_constrained_types: public,
            ..ServerCodegenConfig::default()
        });
        let ctx = server_test_codegen_context(widget_model(), None, Some(settings), None).unwrap();
        let shape = ctx.model().shape(&ShapeId::parse(shape).unwrap()).clone();
        let artifact = server_render_with_model_builder(&ctx, &shape).unwrap();
        let validator = Validator::new(ctx.model_arc()).unwrap();
        (artifact, validator)
    }

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("fields must be an object"),
        }
    }

    #[test]
    fn widget_reports_length_and_range_together() {
        let (widget, validator) = render(true, "ex#Widget");
        let err = widget.build(&validator, &fields(json!({ "id": "", "count": 150 }))).unwrap_err();
        let BuildError::Violations(violations) = err else {
            panic!("expected violations");
        };
        assert_eq!(violations.categories(), [ViolationCategory::Length, ViolationCategory::Range]);
        let paths: Vec<&str> = violations.iter().map(|v| v.path.as_str()).collect();
        assert_eq!(paths, ["/id", "/count"]);

        let built = widget.build(&validator, &fields(json!({ "id": "abc", "count": 5 }))).unwrap();
        assert_eq!(built, json!({ "id": "abc", "count": 5 }));
    }

    #[test]
    fn every_independent_violation_is_reported() {
        let (order, validator) = render(true, "ex#Order");
        let err = order
            .build(&validator, &fields(json!({ "quantity": -1, "code": "abc" })))
            .unwrap_err();
        let BuildError::Violations(violations) = err else {
            panic!("expected violations");
        };
        assert_eq!(
            violations.categories(),
            [ViolationCategory::MissingRequired, ViolationCategory::Range, ViolationCategory::Pattern]
        );
        assert_eq!(
            violations.to_string(),
            "3 validation errors detected. \
             Value at '/owner' failed to satisfy constraint: Member must not be null; \
             Value at '/quantity' failed to satisfy constraint: Member must be between 0 and 100, inclusive; \
             Value at '/code' failed to satisfy constraint: Member must satisfy regular expression pattern: ^[A-Z]{3}$"
        );
    }

    #[test]
    fn defaults_are_applied_when_unset() {
        let (order, validator) = render(true, "ex#Order");
        let built = order.build(&validator, &fields(json!({ "owner": "me" }))).unwrap();
        assert_eq!(built, json!({ "owner": "me", "priority": 1 }));
    }

    #[test]
    fn unconstrained_structure_round_trips() {
        let (point, validator) = render(true, "ex#Point");
        assert!(point.violation.is_none());
        assert_eq!(point.builder.build.error, None);
        let input = json!({ "x": 1.5, "label": "origin" });
        let built = point.build(&validator, &fields(input.clone())).unwrap();
        assert_eq!(built, input);
    }

    #[test]
    fn builder_stores_unconstrained_values() {
        let (widget, _) = render(true, "ex#Widget");
        let id = widget.field("id").unwrap();
        assert_eq!(id.stored, "::std::option::Option<::std::string::String>");
        assert_eq!(id.setter.accepts, "crate::model::Id");
        let internal = id.internal_setter.as_ref().unwrap();
        assert_eq!(internal.name, "set_id");
        assert_eq!(internal.visibility, Visibility::PubCrate);
        assert_eq!(id.validated_as.as_deref(), Some("crate::model::Id"));
        assert!(!id.unwrap_into_public);
        assert_eq!(id.requirement, Requirement::Required);

        assert_eq!(widget.convenience.returns, "crate::model::widget::Builder");
        let violation = widget.violation.as_ref().unwrap();
        assert_eq!(violation.symbol, "crate::model::widget::ConstraintViolation");
        assert_eq!(violation.wire.protocol.to_string(), "test#Protocol");
        assert_eq!(violation.wire.status, 400);
    }

    #[test]
    fn hidden_constrained_types_are_unwrapped_after_validation() {
        let (widget, validator) = render(false, "ex#Widget");
        let id = widget.field("id").unwrap();
        assert_eq!(id.setter.accepts, "::std::string::String");
        assert!(id.internal_setter.is_none());
        assert_eq!(id.validated_as.as_deref(), Some("crate::constrained::id_constrained::IdConstrained"));
        assert!(id.unwrap_into_public);
        assert!(widget.structure.fields.iter().all(|f| !f.symbol.contains("crate::constrained")));

        // same build behaviour in both modes
        let err = widget.build(&validator, &fields(json!({ "id": "" }))).unwrap_err();
        assert!(matches!(err, BuildError::Violations(v) if v.len() == 1));
    }

    #[test]
    fn non_structures_are_rejected() {
        let ctx = server_test_codegen_context(widget_model(), None, None, None).unwrap();
        let id = ctx.model().shape(&ShapeId::parse("ex#Id").unwrap());
        let protocol = crate::testutil::load_server_protocol(ctx.model().clone()).unwrap();
        let conversion = crate::protocol::SmithyValidationExceptionConversion;
        let err = ServerBuilderGenerator::new(&ctx, id, &conversion, protocol.protocol()).err();
        assert!(matches!(err, Some(CodegenError::NotAStructure(_))));
    }
}
