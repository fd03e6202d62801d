//! Unpack command

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use crxpack_core::Reporter;

use crate::ui::Output;

/// Extract the archive inside `file` into `dest` (or a sibling directory).
pub async fn unpack(file: &Path, dest: Option<&Path>, output: &Output) -> Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let dest = dest.map_or_else(|| default_dest(file), Path::to_path_buf);

    let unpacked = {
        let dest = dest.clone();
        tokio::task::spawn_blocking(move || crxpack_core::unpack::unpack(&bytes, &dest)).await??
    };

    output.success(&format!(
        "Extracted {} files to {}",
        unpacked.files.len(),
        dest.display()
    ));
    if let Some(id) = &unpacked.info.identifier {
        output.field("id", id.as_str());
    }
    output.field("format", &format!("v{}", unpacked.info.version));
    Ok(())
}

fn default_dest(file: &Path) -> PathBuf {
    file.file_stem()
        .map_or_else(|| PathBuf::from("unpacked"), PathBuf::from)
}
