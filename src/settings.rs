//! Settings for one compilation run, as found in the `rust-server-codegen`
//! plugin block of `smithy-build.json`.
//!
//! Apart from the service id and the codegen flags, everything here is
//! metadata the core carries around without interpreting.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CodegenError, Result};
use crate::model::ShapeId;

pub const PLUGIN_NAME: &str = "rust-server-codegen";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerCodegenConfig {
    /// Constrained wrapper types are part of the public API.
    #[serde(default = "default_true")]
    pub public_constrained_types: bool,
    /// Downgrade unsupported constraint usage from an error to a warning.
    #[serde(default)]
    pub ignore_unsupported_constraints: bool,
    /// Pick one protocol when the service declares several.
    #[serde(default)]
    pub protocol: Option<ShapeId>,
}

fn default_true() -> bool { true }

impl Default for ServerCodegenConfig {
    fn default() -> Self {
        Self {
            public_constrained_types: true,
            ignore_unsupported_constraints: false,
            protocol: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerRustSettings {
    pub service: ShapeId,
    #[serde(rename = "module")]
    pub module_name: String,
    pub module_version: String,
    #[serde(default)]
    pub module_authors: Vec<String>,
    #[serde(default)]
    pub module_description: Option<String>,
    #[serde(default)]
    pub module_repository: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub examples_uri: Option<String>,
    #[serde(default, rename = "codegen")]
    pub codegen_config: ServerCodegenConfig,
    #[serde(default)]
    pub customization_config: Option<Value>,
}

impl ServerRustSettings {
    /// Accepts either the bare plugin block or a whole `smithy-build.json`.
    pub fn from_json(source: &str) -> Result<Self> {
        let value: Value = crate::path_de::from_str_with_path(source).map_err(settings_error)?;
        let block = match value.pointer(&format!("/plugins/{PLUGIN_NAME}")) {
            Some(block) => block.clone(),
            None => value,
        };
        crate::path_de::from_value_with_path(block).map_err(settings_error)
    }
}

fn settings_error(error: crate::path_de::PathError) -> CodegenError {
    CodegenError::SettingsParse { path: error.path, message: error.message }
}

// ————————————————————————————————————————————————————————————————————————————
// SYMBOL PROVIDER CONFIG
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NullabilityCheckMode {
    /// Every structure member is optional.
    Client,
    /// Members are non-optional when `@required` or when they carry a default.
    Server,
}

/// Where generated types live in the emitted crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleLayout {
    pub model: &'static str,
    pub input: &'static str,
    pub output: &'static str,
    pub error: &'static str,
    pub operation: &'static str,
    pub constrained: &'static str,
    pub unconstrained: &'static str,
}

pub const SERVER_MODULE_LAYOUT: ModuleLayout = ModuleLayout {
    model: "crate::model",
    input: "crate::input",
    output: "crate::output",
    error: "crate::error",
    operation: "crate::operation",
    constrained: "crate::constrained",
    unconstrained: "crate::unconstrained",
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RustSymbolProviderConfig {
    pub rename_exceptions: bool,
    pub nullability_check_mode: NullabilityCheckMode,
    pub module_layout: ModuleLayout,
}

impl RustSymbolProviderConfig {
    pub fn server() -> Self {
        Self {
            rename_exceptions: false,
            nullability_check_mode: NullabilityCheckMode::Server,
            module_layout: SERVER_MODULE_LAYOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_plugin_block_out_of_smithy_build() {
        let src = json!({
            "version": "1.0",
            "plugins": {
                "rust-server-codegen": {
                    "service": "ex#Svc",
                    "module": "widgets",
                    "moduleVersion": "0.1.0",
                    "moduleAuthors": ["someone"],
                    "codegen": { "publicConstrainedTypes": false }
                }
            }
        })
        .to_string();
        let settings = ServerRustSettings::from_json(&src).unwrap();
        assert_eq!(settings.service.to_string(), "ex#Svc");
        assert_eq!(settings.module_name, "widgets");
        assert!(!settings.codegen_config.public_constrained_types);
        assert!(!settings.codegen_config.ignore_unsupported_constraints);
    }

    #[test]
    fn bare_block_defaults_public_constrained_types() {
        let src = r#"{ "service": "ex#Svc", "module": "w", "moduleVersion": "1" }"#;
        let settings = ServerRustSettings::from_json(src).unwrap();
        assert!(settings.codegen_config.public_constrained_types);
        assert_eq!(settings.codegen_config.protocol, None);
    }

    #[test]
    fn bad_settings_report_their_path() {
        let src = r#"{ "service": "ex#Svc", "module": "w", "moduleVersion": "1", "codegen": { "protocol": "nope" } }"#;
        match ServerRustSettings::from_json(src).unwrap_err() {
            CodegenError::SettingsParse { path, .. } => assert_eq!(path, "codegen.protocol"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
