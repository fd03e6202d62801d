//! Directory packaging and archive extraction.
//!
//! Packed archives are deterministic: entries are ordered by their
//! `/`-joined relative path and carry a fixed timestamp, so the same tree
//! always yields the same bytes (and therefore the same signature).

use std::fs;
use std::io::{self, Cursor, Read, Write};
use std::path::{Path, PathBuf};

use futures::future::try_join_all;
use thiserror::Error;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use crate::manifest::{Manifest, ManifestError};

/// Well-known manifest entry at the archive root.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Errors from packing or extracting archives.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Walking the source directory failed.
    #[error("Failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),

    /// The ZIP layer rejected the data.
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A file path cannot be stored as a UTF-8 archive entry name.
    #[error("Path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),

    /// No `manifest.json` at the archive root.
    #[error("No {MANIFEST_FILE} at the archive root")]
    MissingManifest,

    /// `manifest.json` is present but unparsable.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// An archive entry would land outside the destination directory.
    #[error("Refusing to extract entry outside destination: {0}")]
    UnsafePath(String),
}

/// Result of packing a directory.
#[derive(Debug, Clone)]
pub struct PackedDirectory {
    /// ZIP archive bytes.
    pub archive: Vec<u8>,
    /// Parsed `manifest.json` from the archive root.
    pub manifest: Manifest,
    /// Entry names in archive order.
    pub files: Vec<String>,
}

/// Pack every regular file under `root` into a ZIP archive.
///
/// Symlinks are followed and stored under the link's own path; a dangling
/// link or a link cycle is an error rather than a skipped entry. File
/// contents are read concurrently, but entries are always written in
/// sorted relative-path order.
///
/// # Errors
///
/// Returns [`ArchiveError::MissingManifest`] if `root/manifest.json` does
/// not exist, [`ArchiveError::Manifest`] if it does not parse, or an I/O,
/// walk, or ZIP error from the packing itself.
pub async fn pack_directory(root: &Path) -> Result<PackedDirectory, ArchiveError> {
    tracing::debug!(root = %root.display(), "packing directory");

    let mut entries = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let name = entry_name(relative)?;
        entries.push((name, entry.into_path()));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    if !entries.iter().any(|(name, _)| name == MANIFEST_FILE) {
        return Err(ArchiveError::MissingManifest);
    }

    let contents = try_join_all(entries.iter().map(|(_, path)| tokio::fs::read(path))).await?;

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let mut manifest = None;
    let mut files = Vec::with_capacity(entries.len());

    for ((name, _), data) in entries.into_iter().zip(contents) {
        tracing::trace!(entry = %name, bytes = data.len(), "adding archive entry");
        if name == MANIFEST_FILE {
            manifest = Some(Manifest::parse(&data)?);
        }
        writer.start_file(name.as_str(), options)?;
        writer.write_all(&data)?;
        files.push(name);
    }

    let archive = writer.finish()?.into_inner();
    let manifest = manifest.ok_or(ArchiveError::MissingManifest)?;
    tracing::debug!(files = files.len(), bytes = archive.len(), "packed directory");

    Ok(PackedDirectory {
        archive,
        manifest,
        files,
    })
}

fn entry_name(relative: &Path) -> Result<String, ArchiveError> {
    let mut parts = Vec::new();
    for component in relative.components() {
        let part = component
            .as_os_str()
            .to_str()
            .ok_or_else(|| ArchiveError::NonUtf8Path(relative.to_path_buf()))?;
        parts.push(part);
    }
    Ok(parts.join("/"))
}

/// Read and parse `manifest.json` out of a ZIP archive buffer.
///
/// # Errors
///
/// Returns [`ArchiveError::MissingManifest`] if the entry is absent, or a
/// ZIP or manifest error if the buffer or entry is malformed.
pub fn read_manifest(archive: &[u8]) -> Result<Manifest, ArchiveError> {
    let mut zip = ZipArchive::new(Cursor::new(archive))?;
    let mut entry = match zip.by_name(MANIFEST_FILE) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Err(ArchiveError::MissingManifest),
        Err(e) => return Err(e.into()),
    };
    let mut body = Vec::new();
    entry.read_to_end(&mut body)?;
    Ok(Manifest::parse(&body)?)
}

/// Extract a ZIP archive buffer into `dest_dir`.
///
/// Returns the relative paths of the extracted files. Entries whose names
/// would escape `dest_dir` abort the extraction.
///
/// # Errors
///
/// Returns [`ArchiveError::UnsafePath`] for escaping entries, or an I/O or
/// ZIP error.
pub fn extract(archive: &[u8], dest_dir: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
    let mut zip = ZipArchive::new(Cursor::new(archive))?;
    fs::create_dir_all(dest_dir)?;
    let mut extracted = Vec::with_capacity(zip.len());

    for i in 0..zip.len() {
        let mut file = zip.by_index(i)?;
        let Some(relative_path) = file.enclosed_name() else {
            return Err(ArchiveError::UnsafePath(file.name().to_string()));
        };

        let absolute_path = dest_dir.join(&relative_path);
        if file.is_dir() {
            fs::create_dir_all(&absolute_path)?;
            continue;
        }
        if let Some(parent) = absolute_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut outfile = fs::File::create(&absolute_path)?;
        io::copy(&mut file, &mut outfile)?;

        #[cfg(unix)]
        if let Some(mode) = file.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&absolute_path, fs::Permissions::from_mode(mode & 0o777))?;
        }

        extracted.push(relative_path);
    }

    Ok(extracted)
}
