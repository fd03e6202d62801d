//! Inspect command

use std::path::Path;

use anyhow::{Context, Result};
use crossterm::style::Stylize;
use crxpack_core::unpack::ContainerInfo;

/// Print a summary of a container's header.
pub async fn inspect(file: &Path, json: bool) -> Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let info = crxpack_core::unpack::inspect(&bytes)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        print_info(&info);
    }
    Ok(())
}

fn print_info(info: &ContainerInfo) {
    let lw = 12;
    println!();
    println!(
        "  {} {}",
        info.identifier
            .as_ref()
            .map_or("(no key)", |id| id.as_str())
            .white()
            .bold(),
        format!("v{}", info.version).dark_grey()
    );
    println!();
    if let Some(crx_id) = &info.crx_id {
        println!("  {:<lw$}{}", "crx_id", crx_id);
    }
    println!("  {:<lw$}{} bytes", "archive", info.archive_len);
    for proof in &info.proofs {
        println!(
            "  {:<lw$}{} key {} bytes, signature {} bytes",
            "proof",
            proof.algorithm,
            proof.public_key_len,
            proof.signature_len
        );
    }
    println!();
}
