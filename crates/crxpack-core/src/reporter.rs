//! Reporter trait for dependency injection
//!
//! Lets the resolution engine report progress without being coupled to a
//! terminal implementation.

use crate::resolver::Output;

/// Progress sink for builds.
pub trait Reporter: Send + Sync {
    /// Indicates a new phase has started (e.g. "Resolving", "Packing").
    fn section(&self, title: &str);

    /// An output is about to be computed.
    fn resolving(&self, output: Output);

    /// An output has been computed. `detail` is a short human summary.
    fn resolved(&self, output: Output, detail: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a success message.
    fn success(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title);
    }
    fn resolving(&self, output: Output) {
        (**self).resolving(output);
    }
    fn resolved(&self, output: Output, detail: &str) {
        (**self).resolved(output, detail);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn success(&self, msg: &str) {
        (**self).success(msg);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
}

/// A no-op reporter for silent operations (e.g., library use, testing).
#[derive(Clone, Copy, Debug, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn resolving(&self, _: Output) {}
    fn resolved(&self, _: Output, _: &str) {}
    fn info(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warning(&self, _: &str) {}
}
