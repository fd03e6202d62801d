//! Id command

use std::path::Path;

use anyhow::{Context, Result};
use crxpack_core::keys::{decode_key_file, pem_to_der, public_from_private};
use crxpack_schema::{CRX_MAGIC, PackageId};

/// Print the identifier for a key file or a container.
pub async fn id(path: &Path) -> Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    println!("{}", identify(&bytes)?);
    Ok(())
}

/// Identify a container, a public key PEM, or a private key (PEM or DER).
pub fn identify(bytes: &[u8]) -> Result<PackageId> {
    if bytes.starts_with(&CRX_MAGIC) {
        let info = crxpack_core::unpack::inspect(bytes)?;
        return info.identifier.context("Container carries no public key");
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        if text.contains("-----BEGIN PUBLIC KEY-----") {
            let (_, der) = pem_to_der(text.trim())?;
            return Ok(PackageId::from_public_key(&der));
        }
    }

    let der = decode_key_file(bytes)?;
    let public_key = public_from_private(&der)?;
    Ok(PackageId::from_public_key(&public_key))
}
