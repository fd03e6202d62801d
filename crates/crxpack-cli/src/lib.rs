//! crxpack - build, sign, and inspect CRX extension packages
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! # Overview
//!
//! `crxpack pack` turns an extension directory into a signed container,
//! generating whatever the invocation leaves out (signing key, identifier,
//! update manifest). The other commands inspect or unpack existing
//! containers and manage keys.

pub mod cmd;
pub mod ui;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "crxpack")]
#[command(author, version, about = "crxpack - build, sign, and inspect CRX extension packages")]
pub struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Package and sign an extension directory
    Pack(PackArgs),
    /// Extract the archive from a container
    Unpack {
        /// Container file
        file: PathBuf,
        /// Destination directory (defaults to the file name without extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Generate a signing key
    Keygen {
        /// Where to write the PEM private key
        #[arg(short, long, default_value = "key.pem")]
        output: PathBuf,
        /// RSA modulus size in bits
        #[arg(long, default_value_t = crxpack_core::keys::DEFAULT_RSA_BITS)]
        size: usize,
        /// Generate an ECDSA P-256 key instead of RSA
        #[arg(long, conflicts_with = "size")]
        ecdsa: bool,
        /// Overwrite an existing key file
        #[arg(short, long)]
        force: bool,
    },
    /// Print the package identifier for a key or container
    Id {
        /// PEM/DER key file or container
        path: PathBuf,
    },
    /// Show the header of a container
    Inspect {
        /// Container file
        file: PathBuf,
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Debug, clap::Args)]
pub struct PackArgs {
    /// Extension directory containing manifest.json
    pub dir: PathBuf,

    /// Output container path (defaults to <dir>.crx)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Private key file; generated and written here if it does not exist
    #[arg(short, long, env = "CRXPACK_KEY")]
    pub key: Option<PathBuf>,

    /// Container format version (2 or 3)
    #[arg(long)]
    pub crx_version: Option<u32>,

    /// URL the container will be hosted at
    #[arg(long, env = "CRXPACK_CODEBASE")]
    pub codebase: Option<String>,

    /// Also write an update manifest here (requires --codebase)
    #[arg(long)]
    pub update_xml: Option<PathBuf>,

    /// RSA modulus size for a generated key
    #[arg(long, env = "CRXPACK_KEY_SIZE")]
    pub key_size: Option<usize>,

    /// Config file (defaults to ./crxpack.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
