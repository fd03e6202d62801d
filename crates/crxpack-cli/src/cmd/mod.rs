//! Subcommand implementations

pub mod completions;
pub mod id;
pub mod inspect;
pub mod keygen;
pub mod pack;
pub mod unpack;
