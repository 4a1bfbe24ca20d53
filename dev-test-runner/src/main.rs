//! Runs JSON fixture cases through `shapegen` and reports pass/fail.
//!
//! usage: dev-test-runner [fixture glob...]   (default: dev-test-runner/fixtures/*.json)
use std::path::{Path, PathBuf};

use colored::Colorize;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};

use shapegen::builder::{BuildError, ViolationCategory, Validator};
use shapegen::model::{Model, ShapeId};
use shapegen::settings::ServerRustSettings;

// ————————————————————————————————————————————————————————————————————————————
// FIXTURE FORMAT
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Fixture {
    name: String,
    model: Value,
    settings: Value,
    #[serde(default)]
    cases: Vec<Case>,
    /// Compilation itself is expected to fail with a message matching this.
    #[serde(default)]
    compile_error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Case {
    name: String,
    shape: ShapeId,
    input: Map<String, Value>,
    expect: Expect,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
enum Expect {
    Value(Value),
    Violations {
        categories: Vec<ViolationCategory>,
        #[serde(default)]
        paths: Option<Vec<String>>,
        #[serde(default)]
        message_matches: Option<String>,
    },
}

// ————————————————————————————————————————————————————————————————————————————
// RUNNER
// ————————————————————————————————————————————————————————————————————————————

#[derive(Default)]
struct Tally {
    passed: usize,
    failed: usize,
}

impl Tally {
    fn record(&mut self, label: &str, outcome: Result<(), String>) {
        match outcome {
            Ok(()) => {
                self.passed += 1;
                eprintln!("{} {label}", "✅".green());
            }
            Err(reason) => {
                self.failed += 1;
                eprintln!("{} {label}: {}", "❌".red(), reason.red());
            }
        }
    }
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let patterns = if args.is_empty() {
        vec![concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/*.json").to_string()]
    } else {
        args
    };

    let mut tally = Tally::default();
    for path in fixture_paths(&patterns) {
        let label = path.display().to_string();
        let fixture = match load_fixture(&path) {
            Ok(fixture) => fixture,
            Err(reason) => {
                tally.record(&label, Err(reason));
                continue;
            }
        };
        run_fixture(&fixture, &mut tally);
    }

    let summary = format!("{} passed, {} failed", tally.passed, tally.failed);
    if tally.failed > 0 {
        eprintln!("{}", summary.red().bold());
        std::process::exit(1);
    }
    eprintln!("{}", summary.green().bold());
}

fn fixture_paths(patterns: &[String]) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for pattern in patterns {
        match glob::glob(pattern) {
            Ok(entries) => out.extend(entries.filter_map(Result::ok)),
            Err(error) => eprintln!("{} bad pattern {pattern}: {error}", "⚠️".yellow()),
        }
    }
    out.sort();
    out
}

fn load_fixture(path: &Path) -> Result<Fixture, String> {
    let source = std::fs::read_to_string(path).map_err(|e| format!("failed to read: {e}"))?;
    let de = &mut serde_json::Deserializer::from_str(&source);
    serde_path_to_error::deserialize(de).map_err(|e| format!("at JSON path {} → {}", e.path(), e.inner()))
}

fn run_fixture(fixture: &Fixture, tally: &mut Tally) {
    let compiled = Model::from_json_ast(&fixture.model.to_string()).and_then(|model| {
        let settings = ServerRustSettings::from_json(&fixture.settings.to_string())?;
        shapegen::compile(model, &settings)
    });

    match (&fixture.compile_error, compiled) {
        (Some(expected), Ok(_)) => {
            tally.record(&fixture.name, Err(format!("expected compile error matching /{expected}/")));
        }
        (Some(expected), Err(error)) => {
            tally.record(&fixture.name, matches(expected, &error.to_string()));
        }
        (None, Err(error)) => {
            tally.record(&fixture.name, Err(format!("compile failed: {error}")));
        }
        (None, Ok(compilation)) => {
            let validator = match Validator::new(compilation.context().model_arc()) {
                Ok(v) => v,
                Err(error) => {
                    tally.record(&fixture.name, Err(error.to_string()));
                    return;
                }
            };
            for case in &fixture.cases {
                let label = format!("{} / {}", fixture.name, case.name);
                let outcome = match compilation.artifact(&case.shape) {
                    Some(artifact) => check_case(case, artifact.build(&validator, &case.input)),
                    None => Err(format!("no artifact for {}", case.shape)),
                };
                tally.record(&label, outcome);
            }
        }
    }
}

fn check_case(case: &Case, built: Result<Value, BuildError>) -> Result<(), String> {
    match (&case.expect, built) {
        (Expect::Value(expected), Ok(value)) => {
            if *expected == value {
                Ok(())
            } else {
                Err(format!("expected {expected}, built {value}"))
            }
        }
        (Expect::Violations { categories, paths, message_matches }, Err(BuildError::Violations(found))) => {
            if found.categories() != *categories {
                return Err(format!("expected {categories:?}, found {:?}", found.categories()));
            }
            if let Some(paths) = paths {
                let found_paths: Vec<&str> = found.iter().map(|v| v.path.as_str()).collect();
                if found_paths != *paths {
                    return Err(format!("expected paths {paths:?}, found {found_paths:?}"));
                }
            }
            match message_matches {
                Some(pattern) => matches(pattern, &found.to_string()),
                None => Ok(()),
            }
        }
        (Expect::Value(_), Err(error)) => Err(format!("expected a value, build failed: {error}")),
        (Expect::Violations { .. }, Ok(value)) => Err(format!("expected violations, built {value}")),
        (Expect::Violations { .. }, Err(error)) => Err(format!("expected violations, got {error}")),
    }
}

fn matches(pattern: &str, text: &str) -> Result<(), String> {
    let rx = Regex::new(pattern).map_err(|e| format!("bad expectation pattern: {e}"))?;
    if rx.is_match(text) {
        Ok(())
    } else {
        Err(format!("`{text}` does not match /{pattern}/"))
    }
}
