//! Build configuration (`crxpack.toml`).

use std::path::Path;

use crxpack_schema::CrxVersion;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::keys::{DEFAULT_RSA_BITS, valid_rsa_bits};

/// Config file looked up in the working directory when none is named.
pub const DEFAULT_CONFIG_FILE: &str = "crxpack.toml";

/// Settings shared by every build. CLI flags override these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackConfig {
    /// RSA modulus size for generated keys.
    pub key_size: usize,
    /// Container format version; 3 when absent.
    pub crx_version: Option<u32>,
    /// URL the container will be hosted at, for the update document.
    pub codebase: Option<String>,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            key_size: DEFAULT_RSA_BITS,
            crx_version: None,
            codebase: None,
        }
    }
}

impl PackConfig {
    /// Load and validate a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read,
    /// [`ConfigError::Parse`] if it is not valid TOML, or a validation error.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Self::parse(path, &content)
    }

    /// Like [`PackConfig::load`], but a missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed, or
    /// validated. Failures other than not-found are never treated as absence.
    pub async fn load_optional(path: &Path) -> Result<Self, ConfigError> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Self::parse(path, &content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn parse(path: &Path, content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), ?config, "loaded config");
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidKeySize`] or
    /// [`ConfigError::UnsupportedCrxVersion`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !valid_rsa_bits(self.key_size) {
            return Err(ConfigError::InvalidKeySize(self.key_size));
        }
        self.crx_version()?;
        Ok(())
    }

    /// The configured container version.
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
}
