//! Build resolution.
//!
//! A build is a fixed graph of named outputs (see [`Output`]). The caller
//! marks what it wants with [`Field::Requested`] and supplies whatever it
//! already has as [`Field::Given`]; [`Resolution`] promotes every missing
//! prerequisite, checks that the whole plan is satisfiable, then computes
//! the outputs roots first.
//!
//! ```no_run
//! # async fn demo() -> Result<(), crxpack_core::PackError> {
//! use crxpack_core::{BuildRequest, ContentsSource, Output, resolve};
//!
//! let request = BuildRequest::default()
//!     .with_contents(ContentsSource::Directory("ext".into()))
//!     .requesting(Output::Container);
//! let built = resolve(request).await?;
//! let container = built.container.into_value();
//! # let _ = container;
//! # Ok(())
//! # }
//! ```

mod engine;
mod field;
mod graph;
mod request;

pub use engine::{Resolution, resolve};
pub use field::{Field, FieldState};
pub use graph::{Edge, Output};
pub use request::{BuildRequest, ContentsSource};
