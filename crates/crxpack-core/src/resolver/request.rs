//! The build request record threaded through resolution.

use std::path::PathBuf;

use crxpack_schema::{CrxVersion, PackageId};

use super::field::{Field, FieldState};
use super::graph::Output;
use crate::config::PackConfig;
use crate::error::ConfigError;
use crate::keys::DEFAULT_RSA_BITS;
use crate::manifest::Manifest;

/// Where the package contents come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentsSource {
    /// A directory to package.
    Directory(PathBuf),
    /// An already-built ZIP archive.
    Archive(Vec<u8>),
}

/// Inputs and outputs of one build.
///
/// Callers fill in what they have, mark what they want as
/// [`Field::Requested`], and hand the record to [`super::Resolution`].
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Package contents; needed for the archive.
    pub contents: Option<ContentsSource>,
    /// URL the container will be served from; needed for the update document.
    pub codebase: Option<String>,
    /// Container format version; 3 when absent.
    pub crx_version: Option<u32>,
    /// RSA modulus size used when a private key is generated.
    pub key_size: usize,

    /// DER private key.
    pub private_key: Field<Vec<u8>>,
    /// DER public key.
    pub public_key: Field<Vec<u8>>,
    /// ZIP archive bytes.
    pub archive: Field<Vec<u8>>,
    /// Parsed manifest.
    pub manifest: Field<Manifest>,
    /// Package identifier.
    pub identifier: Field<PackageId>,
    /// Version from the manifest.
    pub package_version: Field<String>,
    /// Minimum platform version.
    pub minimum_platform_version: Field<String>,
    /// Signed container bytes.
    pub container: Field<Vec<u8>>,
    /// Update-status XML.
    pub update_document: Field<String>,
}

impl Default for BuildRequest {
    fn default() -> Self {
        Self {
            contents: None,
            codebase: None,
            crx_version: None,
            key_size: DEFAULT_RSA_BITS,
            private_key: Field::Unset,
            public_key: Field::Unset,
            archive: Field::Unset,
            manifest: Field::Unset,
            identifier: Field::Unset,
            package_version: Field::Unset,
            minimum_platform_version: Field::Unset,
            container: Field::Unset,
            update_document: Field::Unset,
        }
    }
}

impl BuildRequest {
    /// An empty request carrying the settings from `config`.
    pub fn from_config(config: &PackConfig) -> Self {
        Self {
            codebase: config.codebase.clone(),
            crx_version: config.crx_version,
            key_size: config.key_size,
            ..Self::default()
        }
    }

    /// Set the contents source.
    #[must_use]
    pub fn with_contents(mut self, contents: ContentsSource) -> Self {
        self.contents = Some(contents);
        self
    }

    /// Mark `output` as requested.
    #[must_use]
    pub fn requesting(mut self, output: Output) -> Self {
        self.request(output);
        self
    }

    /// Promote `output` from unset to requested. Returns whether it changed.
    pub fn request(&mut self, output: Output) -> bool {
        match output {
            Output::PrivateKey => self.private_key.request(),
            Output::PublicKey => self.public_key.request(),
            Output::Archive => self.archive.request(),
            Output::Manifest => self.manifest.request(),
            Output::Identifier => self.identifier.request(),
            Output::PackageVersion => self.package_version.request(),
            Output::MinimumPlatformVersion => self.minimum_platform_version.request(),
            Output::Container => self.container.request(),
            Output::UpdateDocument => self.update_document.request(),
        }
    }

    /// State of the slot for `output`.
    pub fn state(&self, output: Output) -> FieldState {
        match output {
            Output::PrivateKey => self.private_key.state(),
            Output::PublicKey => self.public_key.state(),
            Output::Archive => self.archive.state(),
            Output::Manifest => self.manifest.state(),
            Output::Identifier => self.identifier.state(),
            Output::PackageVersion => self.package_version.state(),
            Output::MinimumPlatformVersion => self.minimum_platform_version.state(),
            Output::Container => self.container.state(),
            Output::UpdateDocument => self.update_document.state(),
        }
    }

    /// The container version to produce.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedCrxVersion`] for values other than
    /// 2 or 3.
    pub fn crx_version(&self) -> Result<CrxVersion, ConfigError> {
        match self.crx_version {
            None => Ok(CrxVersion::default()),
            Some(n) => CrxVersion::from_number(n).ok_or(ConfigError::UnsupportedCrxVersion(n)),
        }
    }

    /// Whether an archive is given or can be built.
    pub fn has_archive_source(&self) -> bool {
        self.archive.is_given() || self.contents.is_some()
    }

    /// Whether a manifest is given or can be read from an archive.
    pub fn has_manifest_source(&self) -> bool {
        self.manifest.is_given() || self.has_archive_source()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_and_state_cover_every_output() {
        let mut request = BuildRequest::default();
        for output in Output::ALL {
            assert_eq!(request.state(output), FieldState::Unset);
            assert!(request.request(output));
            assert_eq!(request.state(output), FieldState::Requested);
        }
    }

    #[test]
    fn sources() {
        let request = BuildRequest::default();
        assert!(!request.has_archive_source());
        assert!(!request.has_manifest_source());

        let request = BuildRequest {
            manifest: Field::given(Manifest::new("1.0")),
            ..BuildRequest::default()
        };
        assert!(!request.has_archive_source());
        assert!(request.has_manifest_source());

        let request =
            BuildRequest::default().with_contents(ContentsSource::Directory(PathBuf::from(".")));
        assert!(request.has_archive_source());
        assert!(request.has_manifest_source());
    }

    #[test]
    fn from_config_copies_settings() {
        let config = PackConfig {
            key_size: 4096,
            crx_version: Some(2),
            codebase: Some("https://x/e.crx".into()),
        };
        let request = BuildRequest::from_config(&config);
        assert_eq!(request.key_size, 4096);
        assert_eq!(request.crx_version().unwrap(), CrxVersion::V2);
        assert_eq!(request.codebase.as_deref(), Some("https://x/e.crx"));
    }

    #[test]
    fn debug_hides_key_material() {
        let request = BuildRequest {
            private_key: Field::given(vec![0xde, 0xad]),
            ..BuildRequest::default()
        };
        let rendered = format!("{request:?}");
        assert!(rendered.contains("private_key: Given"));
        assert!(!rendered.contains("222"));
    }
}
