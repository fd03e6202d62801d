//! Keygen command

use std::path::Path;

use anyhow::{Result, bail};
use crxpack_core::Reporter;
use crxpack_core::keys::{KeyPair, generate_ecdsa, generate_rsa, manifest_key, save_private_key};
use crxpack_schema::PackageId;

use crate::ui::Output;

/// Generate a signing key and write it as PEM.
pub async fn keygen(
    path: &Path,
    size: usize,
    ecdsa: bool,
    force: bool,
    output: &Output,
) -> Result<()> {
    if !force && tokio::fs::try_exists(path).await? {
        bail!(
            "Key file already exists: {} (use --force to overwrite)",
            path.display()
        );
    }

    let pair: KeyPair = if ecdsa {
        generate_ecdsa()?
    } else {
        tokio::task::spawn_blocking(move || generate_rsa(size)).await??
    };
    save_private_key(path, &pair.private_key).await?;

    let kind = if ecdsa {
        "ECDSA P-256".to_string()
    } else {
        format!("{size}-bit RSA")
    };
    output.success(&format!("Wrote {kind} key to {}", path.display()));
    output.field("id", PackageId::from_public_key(&pair.public_key).as_str());
    // value for the manifest's "key" field, pinning the id during development
    output.field("key", &manifest_key(&pair.public_key));
    Ok(())
}
