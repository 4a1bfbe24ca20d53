//! CLI: model + settings → (artifacts | symbols | protocol | validate)
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};

use crate::builder::{BuildError, Validator};
use crate::codegen::{compile_with, symbol_table, Compilation};
use crate::model::{Model, ShapeId};
use crate::protocol::ServerProtocolLoader;
use crate::settings::ServerRustSettings;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// compile Smithy JSON AST models into server builder descriptions
#[derive(Parser, Debug)]
#[command(name = "shapegen")]
pub struct CommandLineInterface {
    /// log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// emit the builder artifact of every structure reachable from the service
    Artifacts(ArtifactsOut),
    /// emit the symbol every provider assigns to every reachable shape
    Symbols(SymbolsOut),
    /// emit the resolved protocol
    Protocol(ProtocolOut),
    /// run a structure's builder against candidate member values
    Validate(ValidateOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// One or more Smithy JSON AST files. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    model: Vec<String>,

    /// smithy-build.json, or a bare rust-server-codegen plugin block
    #[arg(long, short)]
    settings: Option<PathBuf>,

    /// service shape id; overrides the settings file
    #[arg(long)]
    service: Option<String>,

    /// overrides `codegen.publicConstrainedTypes`
    #[arg(long)]
    public_constrained_types: Option<bool>,

    /// overrides `codegen.protocol`
    #[arg(long)]
    protocol: Option<String>,
}

#[derive(clap::Parser, Debug)]
struct ArtifactsOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct SymbolsOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct ProtocolOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct ValidateOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// structure to build
    #[arg(long)]
    shape: String,

    /// JSON object of member values
    #[arg(long)]
    input: PathBuf,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load_model(&self) -> anyhow::Result<Model> {
        let source_paths = resolve_model_paths(&self.model).context("failed to resolve model file paths")?;
        let mut sources = Vec::with_capacity(source_paths.len());
        for source_path in &source_paths {
            let source = std::fs::read_to_string(source_path)
                .with_context(|| format!("failed to read model file {}", source_path.display()))?;
            sources.push(source);
        }
        Ok(Model::assemble(&sources)?)
    }

    fn load_settings(&self, model: &Model) -> anyhow::Result<ServerRustSettings> {
        let mut settings = match self.settings.as_ref() {
            Some(path) => {
                let source = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read settings file {}", path.display()))?;
                ServerRustSettings::from_json(&source)?
            }
            None => {
                let service = match self.service.as_deref() {
                    Some(raw) => ShapeId::parse(raw)?,
                    None => sole_service(model)?,
                };
                ServerRustSettings::from_json(&json!({
                    "service": service.to_string(),
                    "module": service.name().to_lowercase(),
                    "moduleVersion": "0.0.0",
                }).to_string())?
            }
        };
        if let Some(raw) = self.service.as_deref() {
            settings.service = ShapeId::parse(raw)?;
        }
        if let Some(public) = self.public_constrained_types {
            settings.codegen_config.public_constrained_types = public;
        }
        if let Some(raw) = self.protocol.as_deref() {
            settings.codegen_config.protocol = Some(ShapeId::parse(raw)?);
        }
        Ok(settings)
    }

    fn compile(&self) -> anyhow::Result<Compilation> {
        let model = self.load_model()?;
        let settings = self.load_settings(&model)?;
        let compilation = compile_with(model.into(), &settings, &ServerProtocolLoader::default())
            .with_context(|| format!("failed to compile service {}", settings.service))?;
        Ok(compilation)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> anyhow::Result<()> {
        match &self.cmd {
            Command::Artifacts(target) => {
                let compilation = target.input_settings.compile()?;
                write_output(target.out.as_deref(), &serde_json::to_string_pretty(&compilation)?)
            }
            Command::Symbols(target) => {
                let compilation = target.input_settings.compile()?;
                let table = symbol_table(compilation.context());
                write_output(target.out.as_deref(), &serde_json::to_string_pretty(&table)?)
            }
            Command::Protocol(target) => {
                let compilation = target.input_settings.compile()?;
                write_output(target.out.as_deref(), &serde_json::to_string_pretty(&compilation.protocol)?)
            }
            Command::Validate(target) => {
                let compilation = target.input_settings.compile()?;
                let report = validate(&compilation, &target.shape, &target.input)?;
                write_output(target.out.as_deref(), &serde_json::to_string_pretty(&report)?)
            }
        }
    }
}

fn validate(compilation: &Compilation, shape: &str, input: &Path) -> anyhow::Result<Value> {
    let shape = ShapeId::parse(shape)?;
    let Some(artifact) = compilation.artifact(&shape) else {
        bail!("{shape} is not a structure reachable from service {}", compilation.service);
    };
    let source = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read input file {}", input.display()))?;
    let fields = crate::path_de::from_str_with_path::<serde_json::Map<String, Value>>(&source)
        .map_err(|error| anyhow::anyhow!("invalid input file {}: {error}", input.display()))?;

    let validator = Validator::new(compilation.context().model_arc())?;
    match artifact.build(&validator, &fields) {
        Ok(value) => Ok(json!({ "value": value })),
        Err(BuildError::Violations(violations)) => {
            let wire = compilation.protocol_generator().protocol().validation_failure(&violations);
            tracing::info!(shape = %shape, violations = violations.len(), "build failed validation");
            Ok(json!({
                "message": violations.to_string(),
                "violations": violations,
                "wireError": wire,
            }))
        }
        Err(other) => Err(other.into()),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn sole_service(model: &Model) -> anyhow::Result<ShapeId> {
    let services: Vec<&ShapeId> = model.service_shapes().map(|s| &s.id).collect();
    match services.as_slice() {
        [only] => Ok((*only).clone()),
        [] => bail!("the model has no service; pass --service or --settings"),
        _ => bail!("the model has several services; pass --service or --settings"),
    }
}

fn write_output(out: Option<&Path>, text: &str) -> anyhow::Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(out, text).with_context(|| format!("failed to write {}", out.display()))
        }
        None => {
            println!("{text}");
            Ok(())
        }
    }
}

/// Expand model arguments into files. Arguments with glob metacharacters must
/// match at least one file; anything else is taken as a literal path.
fn resolve_model_paths<I>(arguments: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut paths = Vec::new();
    for argument in arguments {
        let argument = argument.as_ref();
        if !argument.contains(['*', '?', '[', '{']) {
            paths.push(PathBuf::from(argument));
            continue;
        }
        let before = paths.len();
        for entry in glob::glob(argument).with_context(|| format!("invalid glob `{argument}`"))? {
            paths.push(entry.with_context(|| format!("unreadable match for `{argument}`"))?);
        }
        if paths.len() == before {
            bail!("glob `{argument}` matched no model files");
        }
    }
    paths.sort();
    paths.dedup();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_paths_pass_through_and_dedup() {
        let paths = resolve_model_paths(["b.json", "a.json", "b.json"]).unwrap();
        assert_eq!(paths, [PathBuf::from("a.json"), PathBuf::from("b.json")]);
    }

    #[test]
    fn empty_glob_is_an_error() {
        let err = resolve_model_paths(["/definitely/not/here/*.json"]).unwrap_err();
        assert!(err.to_string().contains("matched no model files"), "{err}");
    }

    #[test]
    fn parses_validate_subcommand() {
        let cli = CommandLineInterface::try_parse_from([
            "shapegen", "validate", "-m", "model.json", "--shape", "ex#Widget", "--input", "in.json",
        ])
        .unwrap();
        match cli.cmd {
            Command::Validate(v) => {
                assert_eq!(v.shape, "ex#Widget");
                assert_eq!(v.input_settings.model, ["model.json"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
