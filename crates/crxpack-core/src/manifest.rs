//! Extension manifest (`manifest.json`) parsing.
//!
//! The manifest schema is open-ended; only `version` and
//! `minimum_chrome_version` matter to a build. Every other key is kept
//! verbatim in [`Manifest::extra`] so a parsed manifest can be written back
//! without loss.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while parsing a manifest.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// The body is not valid JSON or not a JSON object.
    #[error("Invalid manifest.json: {0}")]
    Json(#[from] serde_json::Error),
}

/// A parsed `manifest.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Package version string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Minimum platform version the package declares.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_chrome_version: Option<String>,

    /// All remaining keys, untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Manifest {
    /// A manifest declaring only `version`.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: Some(version.into()),
            ..Self::default()
        }
    }

    /// Set the declared minimum platform version.
    #[must_use]
    pub fn with_minimum_chrome_version(mut self, version: impl Into<String>) -> Self {
        self.minimum_chrome_version = Some(version.into());
        self
    }

    /// Parse manifest bytes, tolerating a leading UTF-8 BOM.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Json`] if the body is not a JSON object of
    /// the expected shape.
    pub fn parse(bytes: &[u8]) -> Result<Self, ManifestError> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        Ok(serde_json::from_slice(bytes)?)
    }

    /// The declared version, if present and non-blank.
    pub fn package_version(&self) -> Option<&str> {
        self.version.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    /// The declared minimum platform version, if present and non-blank.
    pub fn minimum_platform_version(&self) -> Option<&str> {
        self.minimum_chrome_version
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_fields_and_keeps_the_rest() {
        let manifest = Manifest::parse(
            br#"{"name":"Demo","version":"1.2.3","minimum_chrome_version":"90.0","manifest_version":3}"#,
        )
        .unwrap();

        assert_eq!(manifest.package_version(), Some("1.2.3"));
        assert_eq!(manifest.minimum_platform_version(), Some("90.0"));
        assert_eq!(manifest.extra["name"], "Demo");
        assert_eq!(manifest.extra["manifest_version"], 3);
    }

    #[test]
    fn strips_bom() {
        let manifest = Manifest::parse(b"\xEF\xBB\xBF{\"version\":\"2.0\"}").unwrap();
        assert_eq!(manifest.package_version(), Some("2.0"));
    }

    #[test]
    fn blank_version_counts_as_missing() {
        let manifest = Manifest::parse(br#"{"version":"  "}"#).unwrap();
        assert_eq!(manifest.package_version(), None);
        assert_eq!(manifest.minimum_platform_version(), None);
    }

    #[test]
    fn rejects_non_objects() {
        assert!(Manifest::parse(b"[1,2]").is_err());
        assert!(Manifest::parse(b"{not json").is_err());
    }

    #[test]
    fn builder_helpers() {
        let manifest = Manifest::new("1.0").with_minimum_chrome_version("90.0");
        assert_eq!(manifest.package_version(), Some("1.0"));
        assert_eq!(manifest.minimum_platform_version(), Some("90.0"));
    }
}
