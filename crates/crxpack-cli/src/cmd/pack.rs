//! Pack command

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use crxpack_core::config::DEFAULT_CONFIG_FILE;
use crxpack_core::keys::{load_private_key, save_private_key};
use crxpack_core::{
    BuildRequest, ContentsSource, Field, Output as BuildOutput, PackConfig, Reporter, Resolution,
};

use crate::PackArgs;
use crate::ui::Output;

/// Package `args.dir` into a signed container.
pub async fn pack(args: PackArgs, output: &Output) -> Result<()> {
    if !args.dir.is_dir() {
        bail!("Not a directory: {}", args.dir.display());
    }

    let mut config = match &args.config {
        Some(path) => PackConfig::load(path).await?,
        None => PackConfig::load_optional(Path::new(DEFAULT_CONFIG_FILE)).await?,
    };
    if let Some(size) = args.key_size {
        config.key_size = size;
    }
    if args.crx_version.is_some() {
        config.crx_version = args.crx_version;
    }
    if args.codebase.is_some() {
        config.codebase.clone_from(&args.codebase);
    }
    config.validate()?;

    let stem = package_stem(&args.dir);
    let crx_path = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{stem}.crx")));
    let key_path = args
        .key
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{stem}.pem")));

    let mut request = BuildRequest::from_config(&config)
        .with_contents(ContentsSource::Directory(args.dir.clone()))
        .requesting(BuildOutput::Container)
        .requesting(BuildOutput::Identifier);

    let existing_key = load_private_key(&key_path)
        .await
        .with_context(|| format!("Failed to read key {}", key_path.display()))?;
    let generate_key = existing_key.is_none();
    request.private_key = match existing_key {
        Some(der) => Field::given(der),
        None => Field::Requested,
    };
    if args.update_xml.is_some() {
        request.request(BuildOutput::UpdateDocument);
    }

    output.section(&format!("Packing {}", args.dir.display()));
    let reporter: Arc<dyn Reporter> = Arc::new(*output);
    let built = Resolution::plan(request)?
        .with_reporter(reporter)
        .run()
        .await?;

    if generate_key {
        let der = built
            .private_key
            .value()
            .context("Resolution did not produce a private key")?;
        save_private_key(&key_path, der)
            .await
            .with_context(|| format!("Failed to write key {}", key_path.display()))?;
        output.info(&format!("Wrote new key to {}", key_path.display()));
    }

    let container = built
        .container
        .value()
        .context("Resolution did not produce a container")?;
    tokio::fs::write(&crx_path, container)
        .await
        .with_context(|| format!("Failed to write {}", crx_path.display()))?;

    if let Some(xml_path) = &args.update_xml {
        let xml = built
            .update_document
            .value()
            .context("Resolution did not produce an update document")?;
        tokio::fs::write(xml_path, xml)
            .await
            .with_context(|| format!("Failed to write {}", xml_path.display()))?;
        output.info(&format!("Wrote update manifest to {}", xml_path.display()));
    }

    output.success(&format!("Packed {}", crx_path.display()));
    if let Some(id) = built.identifier.value() {
        output.field("id", id.as_str());
    }
    if let Some(version) = built.manifest.value().and_then(|m| m.package_version()) {
        output.field("version", version);
    }
    Ok(())
}

/// File stem for default output names: the directory's own name.
fn package_stem(dir: &Path) -> String {
    std::fs::canonicalize(dir)
        .ok()
        .as_deref()
        .and_then(Path::file_name)
        .map_or_else(
            || "extension".to_string(),
            |name| name.to_string_lossy().into_owned(),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stem_uses_directory_name() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("my-ext");
        std::fs::create_dir(&dir).unwrap();
        assert_eq!(package_stem(&dir), "my-ext");
    }
}
