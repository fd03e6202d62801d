//! Signing seam between the codec and the cryptographic primitives.
//!
//! The codec only assembles signature *inputs*; producing the signature
//! bytes is delegated to a [`ContainerSigner`].

use p256::pkcs8::{DecodePrivateKey as _, EncodePublicKey as _};
use rsa::pkcs1::DecodeRsaPrivateKey as _;
use rsa::signature::{SignatureEncoding as _, Signer as _};
use rsa::RsaPrivateKey;
use sha1::Sha1;
use sha2::Sha256;
use thiserror::Error;

/// Proof slot a signer's output is stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProofAlgorithm {
    /// PKCS#1 v1.5 with SHA-256 over an RSA key.
    Sha256WithRsa,
    /// ECDSA with SHA-256 over a P-256 key.
    Sha256WithEcdsa,
}

impl std::fmt::Display for ProofAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sha256WithRsa => write!(f, "sha256-rsa"),
            Self::Sha256WithEcdsa => write!(f, "sha256-ecdsa"),
        }
    }
}

/// Errors raised while loading a key or producing a signature.
#[derive(Error, Debug)]
pub enum SignError {
    /// The private key bytes could not be parsed as a supported key.
    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    /// The signing primitive failed.
    #[error("Signing failed: {0}")]
    Signature(String),

    /// The key algorithm cannot produce the requested container format.
    #[error("{algorithm} keys cannot sign {format} containers")]
    UnsupportedAlgorithm {
        /// Algorithm of the offending key.
        algorithm: ProofAlgorithm,
        /// Container format that was requested.
        format: &'static str,
    },
}

/// A key able to sign container payloads.
pub trait ContainerSigner {
    /// The proof slot this signer's signatures belong in.
    fn algorithm(&self) -> ProofAlgorithm;

    /// DER-encoded `SubjectPublicKeyInfo` of the signing key.
    fn public_key(&self) -> &[u8];

    /// Sign `payload` with SHA-256 as the message digest.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::Signature`] if the primitive fails.
    fn sign_sha256(&self, payload: &[u8]) -> Result<Vec<u8>, SignError>;

    /// Sign `payload` with PKCS#1 v1.5 / SHA-1, as the legacy v2 format requires.
    ///
    /// # Errors
    ///
    /// The default implementation returns [`SignError::UnsupportedAlgorithm`].
    fn sign_sha1(&self, payload: &[u8]) -> Result<Vec<u8>, SignError> {
        let _ = payload;
        Err(SignError::UnsupportedAlgorithm {
            algorithm: self.algorithm(),
            format: "v2",
        })
    }
}

/// RSA signer using PKCS#1 v1.5 padding.
pub struct RsaSigner {
    sha256: rsa::pkcs1v15::SigningKey<Sha256>,
    sha1: rsa::pkcs1v15::SigningKey<Sha1>,
    public_key: Vec<u8>,
}

impl std::fmt::Debug for RsaSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaSigner")
            .field("public_key_len", &self.public_key.len())
            .finish_non_exhaustive()
    }
}

impl RsaSigner {
    /// Wrap an already-parsed RSA private key.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::InvalidKey`] if the public half cannot be encoded.
    pub fn new(key: RsaPrivateKey) -> Result<Self, SignError> {
        let public_key = rsa::pkcs8::EncodePublicKey::to_public_key_der(&key.to_public_key())
            .map_err(|e| SignError::InvalidKey(e.to_string()))?
            .into_vec();
        Ok(Self {
            sha256: rsa::pkcs1v15::SigningKey::<Sha256>::new(key.clone()),
            sha1: rsa::pkcs1v15::SigningKey::<Sha1>::new(key),
            public_key,
        })
    }

    /// Parse a DER private key, PKCS#8 first and PKCS#1 as a fallback.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::InvalidKey`] if neither encoding parses.
    pub fn from_der(der: &[u8]) -> Result<Self, SignError> {
        let key = <RsaPrivateKey as rsa::pkcs8::DecodePrivateKey>::from_pkcs8_der(der)
            .or_else(|_| RsaPrivateKey::from_pkcs1_der(der))
            .map_err(|e| SignError::InvalidKey(e.to_string()))?;
        Self::new(key)
    }
}

impl ContainerSigner for RsaSigner {
    fn algorithm(&self) -> ProofAlgorithm {
        ProofAlgorithm::Sha256WithRsa
    }

    fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    fn sign_sha256(&self, payload: &[u8]) -> Result<Vec<u8>, SignError> {
        let signature = self
            .sha256
            .try_sign(payload)
            .map_err(|e| SignError::Signature(e.to_string()))?;
        Ok(signature.to_vec())
    }

    fn sign_sha1(&self, payload: &[u8]) -> Result<Vec<u8>, SignError> {
        let signature = self
            .sha1
            .try_sign(payload)
            .map_err(|e| SignError::Signature(e.to_string()))?;
        Ok(signature.to_vec())
    }
}

/// ECDSA P-256 signer. Signatures are DER-encoded.
pub struct EcdsaSigner {
    key: p256::ecdsa::SigningKey,
    public_key: Vec<u8>,
}

impl std::fmt::Debug for EcdsaSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EcdsaSigner")
            .field("public_key_len", &self.public_key.len())
            .finish_non_exhaustive()
    }
}

impl EcdsaSigner {
    /// Wrap an already-parsed P-256 signing key.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::InvalidKey`] if the public half cannot be encoded.
    pub fn new(key: p256::ecdsa::SigningKey) -> Result<Self, SignError> {
        let public_key = key
            .verifying_key()
            .to_public_key_der()
            .map_err(|e| SignError::InvalidKey(e.to_string()))?
            .into_vec();
        Ok(Self { key, public_key })
    }

    /// Parse a PKCS#8 DER private key.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::InvalidKey`] if `der` is not a P-256 PKCS#8 key.
    pub fn from_der(der: &[u8]) -> Result<Self, SignError> {
        let key = p256::ecdsa::SigningKey::from_pkcs8_der(der)
            .map_err(|e| SignError::InvalidKey(e.to_string()))?;
        Self::new(key)
    }
}

impl ContainerSigner for EcdsaSigner {
    fn algorithm(&self) -> ProofAlgorithm {
        ProofAlgorithm::Sha256WithEcdsa
    }

    fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    fn sign_sha256(&self, payload: &[u8]) -> Result<Vec<u8>, SignError> {
        let signature: p256::ecdsa::Signature = p256::ecdsa::signature::Signer::try_sign(
            &self.key, payload,
        )
        .map_err(|e| SignError::Signature(e.to_string()))?;
        Ok(signature.to_der().as_bytes().to_vec())
    }
}

/// Build a signer for a DER private key, detecting the algorithm.
///
/// RSA is tried first, then P-256.
///
/// # Errors
///
/// Returns [`SignError::InvalidKey`] if the key is neither.
pub fn signer_from_der(der: &[u8]) -> Result<Box<dyn ContainerSigner + Send + Sync>, SignError> {
    if let Ok(signer) = RsaSigner::from_der(der) {
        return Ok(Box::new(signer));
    }
    match EcdsaSigner::from_der(der) {
        Ok(signer) => Ok(Box::new(signer)),
        Err(_) => Err(SignError::InvalidKey(
            "expected an RSA (PKCS#8 or PKCS#1) or P-256 (PKCS#8) private key".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs8::EncodePrivateKey as _;

    fn rsa_der() -> Vec<u8> {
        let key = RsaPrivateKey::new(&mut rand_core::OsRng, 1024).unwrap();
        key.to_pkcs8_der().unwrap().as_bytes().to_vec()
    }

    fn ecdsa_der() -> Vec<u8> {
        let key = p256::ecdsa::SigningKey::random(&mut rand_core::OsRng);
        p256::pkcs8::EncodePrivateKey::to_pkcs8_der(&key)
            .unwrap()
            .as_bytes()
            .to_vec()
    }

    #[test]
    fn rsa_signer_detected_and_signs() {
        let signer = signer_from_der(&rsa_der()).unwrap();
        assert_eq!(signer.algorithm(), ProofAlgorithm::Sha256WithRsa);
        // 1024-bit modulus -> 128-byte signatures
        assert_eq!(signer.sign_sha256(b"payload").unwrap().len(), 128);
        assert_eq!(signer.sign_sha1(b"payload").unwrap().len(), 128);
    }

    #[test]
    fn rsa_signature_is_deterministic() {
        let signer = RsaSigner::from_der(&rsa_der()).unwrap();
        assert_eq!(
            signer.sign_sha256(b"same").unwrap(),
            signer.sign_sha256(b"same").unwrap()
        );
    }

    #[test]
    fn ecdsa_signer_detected_and_refuses_sha1() {
        let signer = signer_from_der(&ecdsa_der()).unwrap();
        assert_eq!(signer.algorithm(), ProofAlgorithm::Sha256WithEcdsa);
        assert!(!signer.sign_sha256(b"payload").unwrap().is_empty());
        assert!(matches!(
            signer.sign_sha1(b"payload"),
            Err(SignError::UnsupportedAlgorithm { .. })
        ));
    }

    #[test]
    fn garbage_key_is_rejected() {
        assert!(matches!(
            signer_from_der(b"not a key"),
            Err(SignError::InvalidKey(_))
        ));
    }
}
