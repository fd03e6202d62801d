//! Terminal output.

use crossterm::style::Stylize;
use crxpack_core::{Output as BuildOutput, Reporter};

const ICON_SUCCESS: &str = "✓";
const ICON_WARNING: &str = "!";
const ICON_STEP: &str = "·";

/// Console printer. Warnings go to stderr and are never suppressed.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    quiet: bool,
}

impl Output {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// Print a `label  value` line; shown even in quiet mode.
    pub fn field(&self, label: &str, value: &str) {
        println!("  {:<12}{}", label.dark_grey(), value);
    }
}

impl Reporter for Output {
    fn section(&self, title: &str) {
        if !self.quiet {
            println!("{}", title.white().bold());
        }
    }

    fn resolving(&self, output: BuildOutput) {
        tracing::debug!(%output, "resolving");
    }

    fn resolved(&self, output: BuildOutput, detail: &str) {
        if !self.quiet {
            println!(
                "  {} {:<26}{}",
                ICON_STEP.dark_grey(),
                output.to_string(),
                detail.dark_grey()
            );
        }
    }

    fn info(&self, msg: &str) {
        if !self.quiet {
            println!("{msg}");
        }
    }

    fn success(&self, msg: &str) {
        if !self.quiet {
            println!("{} {}", ICON_SUCCESS.green(), msg.green());
        }
    }

    fn warning(&self, msg: &str) {
        eprintln!("{} {}", ICON_WARNING.yellow(), msg.yellow());
    }
}
