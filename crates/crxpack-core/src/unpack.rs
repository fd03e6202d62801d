//! Container inspection and extraction.

use std::path::{Path, PathBuf};

use crxpack_schema::{Container, ContainerHeader, PackageId, ProofAlgorithm, decode};
use serde::Serialize;

use crate::error::PackError;

/// Summary of one signature proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProofInfo {
    /// Proof slot, e.g. `sha256-rsa`.
    pub algorithm: String,
    /// Identifier derived from the proof's public key.
    pub identifier: Option<PackageId>,
    /// Public key length in bytes.
    pub public_key_len: usize,
    /// Signature length in bytes.
    pub signature_len: usize,
}

/// Header summary of a decoded container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerInfo {
    /// Format version (2 or 3).
    pub version: u32,
    /// Identifier of the first public key.
    pub identifier: Option<PackageId>,
    /// Hex of the raw identifier embedded in a v3 signed header.
    pub crx_id: Option<String>,
    /// Every proof the header carries.
    pub proofs: Vec<ProofInfo>,
    /// Archive length in bytes.
    pub archive_len: usize,
}

impl ContainerInfo {
    /// Summarise an already-decoded container.
    pub fn from_container(container: &Container) -> Self {
        let proofs = match &container.header {
            ContainerHeader::V2 {
                public_key,
                signature,
            } => vec![ProofInfo {
                algorithm: "sha1-rsa".to_string(),
                identifier: Some(PackageId::from_public_key(public_key)),
                public_key_len: public_key.len(),
                signature_len: signature.len(),
            }],
            ContainerHeader::V3(header) => {
                let rsa = header
                    .sha256_with_rsa
                    .iter()
                    .map(|p| (ProofAlgorithm::Sha256WithRsa, p));
                let ecdsa = header
                    .sha256_with_ecdsa
                    .iter()
                    .map(|p| (ProofAlgorithm::Sha256WithEcdsa, p));
                rsa.chain(ecdsa)
                    .map(|(algorithm, proof)| ProofInfo {
                        algorithm: algorithm.to_string(),
                        identifier: proof.public_key.as_deref().map(PackageId::from_public_key),
                        public_key_len: proof.public_key.as_ref().map_or(0, Vec::len),
                        signature_len: proof.signature.as_ref().map_or(0, Vec::len),
                    })
                    .collect()
            }
        };

        Self {
            version: container.version().number(),
            identifier: container
                .public_keys()
                .first()
                .map(|key| PackageId::from_public_key(key)),
            crx_id: container.crx_id().map(hex::encode),
            proofs,
            archive_len: container.archive.len(),
        }
    }
}

/// Decode a container and summarise its header.
///
/// # Errors
///
/// Returns [`PackError::Format`] if `bytes` is not a valid container.
pub fn inspect(bytes: &[u8]) -> Result<ContainerInfo, PackError> {
    let container = decode(bytes)?;
    Ok(ContainerInfo::from_container(&container))
}

/// Result of [`unpack`].
#[derive(Debug, Clone)]
pub struct Unpacked {
    /// Header summary.
    pub info: ContainerInfo,
    /// Extracted files, relative to the destination.
    pub files: Vec<PathBuf>,
}

/// Decode a container and extract its archive into `dest_dir`.
///
/// Signatures are not verified.
///
/// # Errors
///
/// Returns [`PackError::Format`] for a malformed container, or
/// [`PackError::Archive`] if extraction fails or an entry would escape
/// `dest_dir`.
pub fn unpack(bytes: &[u8], dest_dir: &Path) -> Result<Unpacked, PackError> {
    let container = decode(bytes)?;
    let info = ContainerInfo::from_container(&container);
    tracing::debug!(
        version = info.version,
        dest = %dest_dir.display(),
        "extracting container"
    );
    let files = crate::archive::extract(&container.archive, dest_dir)?;
    Ok(Unpacked { info, files })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::pack_directory;
    use crate::keys::{MIN_RSA_BITS, generate_ecdsa, generate_rsa};
    use crxpack_schema::{CrxVersion, encode, signer_from_der};
    use tempfile::tempdir;

    async fn sample_archive() -> Vec<u8> {
        let src = tempdir().unwrap();
        std::fs::write(src.path().join("manifest.json"), r#"{"version":"1.0"}"#).unwrap();
        std::fs::write(src.path().join("bg.js"), "x").unwrap();
        pack_directory(src.path()).await.unwrap().archive
    }

    #[tokio::test]
    async fn unpack_v3_round_trip() {
        let archive = sample_archive().await;
        let pair = generate_ecdsa().unwrap();
        let signer = signer_from_der(&pair.private_key).unwrap();
        let crx = encode(CrxVersion::V3, signer.as_ref(), &archive).unwrap();

        let dest = tempdir().unwrap();
        let unpacked = unpack(&crx, dest.path()).unwrap();
        assert_eq!(unpacked.info.version, 3);
        assert_eq!(unpacked.info.archive_len, archive.len());
        assert_eq!(unpacked.info.proofs.len(), 1);
        assert_eq!(unpacked.info.proofs[0].algorithm, "sha256-ecdsa");
        assert_eq!(
            unpacked.info.identifier,
            Some(PackageId::from_public_key(&pair.public_key))
        );
        assert_eq!(unpacked.info.crx_id.as_deref().map(str::len), Some(32));
        assert_eq!(unpacked.files.len(), 2);
        assert!(dest.path().join("manifest.json").is_file());
    }

    #[tokio::test]
    async fn inspect_v2() {
        let archive = sample_archive().await;
        let pair = generate_rsa(MIN_RSA_BITS).unwrap();
        let signer = signer_from_der(&pair.private_key).unwrap();
        let crx = encode(CrxVersion::V2, signer.as_ref(), &archive).unwrap();

        let info = inspect(&crx).unwrap();
        assert_eq!(info.version, 2);
        assert_eq!(info.crx_id, None);
        assert_eq!(info.proofs[0].signature_len, 128);
    }

    #[test]
    fn rejects_non_containers() {
        let dest = tempdir().unwrap();
        assert!(matches!(
            unpack(b"PK\x03\x04", dest.path()),
            Err(PackError::Format(_))
        ));
    }
}
