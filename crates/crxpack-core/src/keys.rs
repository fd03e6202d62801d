//! Key generation, conversion, and key-file I/O.
//!
//! Private keys travel as PKCS#8 DER and public keys as SPKI DER. Files on
//! disk are PEM; DER files are accepted when reading.

use std::io;
use std::path::Path;

use base64::Engine as _;
use pkcs8::der::Document;
use pkcs8::{EncodePrivateKey as _, LineEnding, SecretDocument};
use rand_core::OsRng;
use thiserror::Error;

/// Default RSA modulus size.
pub const DEFAULT_RSA_BITS: usize = 2048;

/// Smallest RSA modulus size accepted for generation.
pub const MIN_RSA_BITS: usize = 1024;

const PRIVATE_KEY_LABEL: &str = "PRIVATE KEY";
const PUBLIC_KEY_LABEL: &str = "PUBLIC KEY";

/// Errors from key handling.
#[derive(Error, Debug)]
pub enum KeyError {
    /// Reading or writing a key file failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// PEM text could not be parsed or produced.
    #[error("Invalid PEM: {0}")]
    Pem(String),

    /// DER bytes are not a supported key.
    #[error("Invalid key: {0}")]
    Der(String),

    /// The requested modulus size is unusable.
    #[error("Invalid RSA key size: {0}")]
    InvalidSize(usize),

    /// The key generator failed.
    #[error("Key generation failed: {0}")]
    Generate(String),
}

/// A DER-encoded key pair.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    /// PKCS#8 DER private key.
    pub private_key: Vec<u8>,
    /// SPKI DER public key.
    pub public_key: Vec<u8>,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key_len", &self.public_key.len())
            .finish_non_exhaustive()
    }
}

/// Check that `bits` is a usable RSA modulus size.
pub fn valid_rsa_bits(bits: usize) -> bool {
    bits >= MIN_RSA_BITS && bits % 8 == 0
}

/// Generate a fresh RSA key pair. CPU-heavy; call off the async executor.
///
/// # Errors
///
/// Returns [`KeyError::InvalidSize`] for sizes rejected by
/// [`valid_rsa_bits`], or [`KeyError::Generate`] if generation fails.
pub fn generate_rsa(bits: usize) -> Result<KeyPair, KeyError> {
    if !valid_rsa_bits(bits) {
        return Err(KeyError::InvalidSize(bits));
    }
    tracing::debug!(bits, "generating RSA key pair");
    let key = rsa::RsaPrivateKey::new(&mut OsRng, bits)
        .map_err(|e| KeyError::Generate(e.to_string()))?;
    let private_key = key
        .to_pkcs8_der()
        .map_err(|e| KeyError::Der(e.to_string()))?
        .as_bytes()
        .to_vec();
    let public_key = public_from_private(&private_key)?;
    Ok(KeyPair {
        private_key,
        public_key,
    })
}

/// Generate a fresh ECDSA P-256 key pair.
///
/// # Errors
///
/// Returns [`KeyError::Der`] if the key cannot be encoded.
pub fn generate_ecdsa() -> Result<KeyPair, KeyError> {
    tracing::debug!("generating P-256 key pair");
    let key = p256::ecdsa::SigningKey::random(&mut OsRng);
    let private_key = key
        .to_pkcs8_der()
        .map_err(|e| KeyError::Der(e.to_string()))?
        .as_bytes()
        .to_vec();
    let public_key = public_from_private(&private_key)?;
    Ok(KeyPair {
        private_key,
        public_key,
    })
}

/// Derive the SPKI DER public key from a DER private key.
///
/// # Errors
///
/// Returns [`KeyError::Der`] if `private_key` is not an RSA or P-256 key.
pub fn public_from_private(private_key: &[u8]) -> Result<Vec<u8>, KeyError> {
    let signer = crxpack_schema::signer_from_der(private_key)
        .map_err(|e| KeyError::Der(e.to_string()))?;
    Ok(signer.public_key().to_vec())
}

/// Encode a DER private key as PKCS#8 PEM.
///
/// # Errors
///
/// Returns [`KeyError::Pem`] if `der` is not a well-formed DER document.
pub fn private_key_to_pem(der: &[u8]) -> Result<String, KeyError> {
    let doc = SecretDocument::try_from(der).map_err(|e| KeyError::Pem(e.to_string()))?;
    let pem = doc
        .to_pem(PRIVATE_KEY_LABEL, LineEnding::LF)
        .map_err(|e| KeyError::Pem(e.to_string()))?;
    Ok(pem.as_str().to_owned())
}

/// Encode a DER public key as SPKI PEM.
///
/// # Errors
///
/// Returns [`KeyError::Pem`] if `der` is not a well-formed DER document.
pub fn public_key_to_pem(der: &[u8]) -> Result<String, KeyError> {
    let doc = Document::try_from(der).map_err(|e| KeyError::Pem(e.to_string()))?;
    doc.to_pem(PUBLIC_KEY_LABEL, LineEnding::LF)
        .map_err(|e| KeyError::Pem(e.to_string()))
}

/// Decode PEM text into its label and DER body.
///
/// # Errors
///
/// Returns [`KeyError::Pem`] if `pem` is not a single PEM block.
pub fn pem_to_der(pem: &str) -> Result<(String, Vec<u8>), KeyError> {
    let (label, doc) = Document::from_pem(pem).map_err(|e| KeyError::Pem(e.to_string()))?;
    Ok((label.to_string(), doc.into_vec()))
}

/// Base64 rendering of a public key, as used by the manifest `key` field.
pub fn manifest_key(public_key: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(public_key)
}

/// Interpret key-file bytes as PEM when they look like PEM, DER otherwise.
///
/// # Errors
///
/// Returns [`KeyError::Pem`] for malformed PEM.
pub fn decode_key_file(bytes: &[u8]) -> Result<Vec<u8>, KeyError> {
    let trimmed = bytes.trim_ascii_start();
    if trimmed.starts_with(b"-----BEGIN") {
        let text = std::str::from_utf8(trimmed).map_err(|e| KeyError::Pem(e.to_string()))?;
        let (_, der) = pem_to_der(text)?;
        Ok(der)
    } else {
        Ok(bytes.to_vec())
    }
}

/// Load a private key file. A missing file is reported as `Ok(None)`.
///
/// # Errors
///
/// Returns [`KeyError::Io`] for any I/O failure other than not-found, or
/// [`KeyError::Pem`] if the file holds malformed PEM.
pub async fn load_private_key(path: &Path) -> Result<Option<Vec<u8>>, KeyError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => decode_key_file(&bytes).map(Some),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no key file, treating key as absent");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Write a private key to `path` as PEM, owner-readable only on Unix.
///
/// # Errors
///
/// Returns [`KeyError::Io`] if the file or its parent directory cannot be
/// written, or [`KeyError::Pem`] if `der` is malformed.
pub async fn save_private_key(path: &Path, der: &[u8]) -> Result<(), KeyError> {
    let pem = private_key_to_pem(der)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, pem).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
    }

    Ok(())
}
