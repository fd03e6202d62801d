//! Domain-specific errors for build resolution

use std::path::PathBuf;

use crxpack_schema::{EncodeError, FormatError, SignError};
use thiserror::Error;

use crate::archive::ArchiveError;
use crate::keys::KeyError;
use crate::resolver::Output;

/// A requested output whose prerequisites can never be satisfied.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An update document was requested without a hosting URL.
    #[error("An update document was requested but no codebase URL was given")]
    UrlRequired,

    /// Something needs the archive but no contents were supplied.
    #[error("Contents are required to produce the {required_by}")]
    ContentsRequired {
        /// The output that needed the contents.
        required_by: Output,
    },

    /// Something needs the manifest but there is nothing to read it from.
    #[error("A manifest is required to produce the {required_by}")]
    ManifestRequired {
        /// The output that needed the manifest.
        required_by: Output,
    },

    /// The manifest has no usable `version` field.
    #[error("Manifest has no version field")]
    MissingVersion,

    /// The container version is neither 2 nor 3.
    #[error("Unsupported CRX version {0} (expected 2 or 3)")]
    UnsupportedCrxVersion(u32),

    /// The requested RSA modulus size is unusable.
    #[error("Invalid key size {0}: must be at least 1024 bits and a multiple of 8")]
    InvalidKeySize(usize),

    /// A public key was supplied but the private key would be generated,
    /// so the two can never match.
    #[error("A public key was given without its private key")]
    PublicKeyWithoutPrivateKey,

    /// The given public key is not the public half of the given private key.
    #[error("The given public key does not belong to the private key")]
    KeyMismatch,

    /// A prerequisite was still missing when an output was computed.
    #[error("Cannot produce the {output}: the {prerequisite} is not available")]
    MissingPrerequisite {
        /// The output being computed.
        output: Output,
        /// The prerequisite that was absent.
        prerequisite: Output,
    },

    /// The configuration file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Read {
        /// Path of the config file.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`crate::PackConfig`].
    #[error("Failed to parse config {path}: {source}")]
    Parse {
        /// Path of the config file.
        path: PathBuf,
        /// Underlying parse failure.
        source: toml::de::Error,
    },
}

/// Any failure surfaced by a build.
#[derive(Error, Debug)]
pub enum PackError {
    /// A requested output cannot be satisfied.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A container buffer is malformed.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Producing a container failed.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// The private key could not be used for signing.
    #[error(transparent)]
    Sign(#[from] SignError),

    /// Key generation, conversion, or loading failed.
    #[error(transparent)]
    Key(#[from] KeyError),

    /// Packaging or extracting an archive failed.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Filesystem failure outside the collaborators above.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking task panicked or was cancelled.
    #[error("Background task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for PackError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}
