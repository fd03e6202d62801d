//! Core library for crxpack.
//!
//! Hosts the collaborators the container codec needs (key handling,
//! directory packaging, manifest parsing, update-document rendering,
//! unpacking) and the resolution engine that fills in whatever a build
//! request leaves unspecified.

pub mod archive;
pub mod config;
pub mod error;
pub mod keys;
pub mod manifest;
pub mod reporter;
pub mod resolver;
pub mod unpack;
pub mod update;

pub use config::PackConfig;
pub use error::{ConfigError, PackError};
pub use manifest::Manifest;
pub use reporter::{NullReporter, Reporter};
pub use resolver::{BuildRequest, ContentsSource, Field, FieldState, Output, Resolution, resolve};
