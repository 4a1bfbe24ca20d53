//! Server-side shape-to-type compilation for Smithy models.
//!
//! A [`model::Model`] plus [`settings::ServerRustSettings`] go in; per-structure
//! [`builder::BuilderArtifact`]s, the resolved [`protocol::ServerProtocol`] and
//! the symbol providers behind them come out of [`codegen::compile`].
pub mod builder;
pub mod cli;
pub mod codegen;
pub mod constraints;
pub mod context;
pub mod error;
pub mod model;
pub mod path_de;
pub mod protocol;
pub mod settings;
pub mod symbol;
pub mod testutil;

pub use codegen::{compile, Compilation};
pub use error::{CodegenError, Result};
