//! Backup and restore of the data directory
//!
//! Archives are zip files with every regular file of the data directory
//! stored under `data/`.

use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{Error, Result};
use crate::store::DATA_DIR;

/// Upper bound on the total decompressed size of a restored archive
pub const MAX_RESTORED_BYTES: u64 = 100 * 1024 * 1024;

/// Suggested download name, e.g. `minister-backup-2024-03-06T12-00-00Z.zip`
pub fn backup_filename() -> String {
    format!(
        "minister-backup-{}.zip",
        Utc::now().format("%Y-%m-%dT%H-%M-%SZ")
    )
}

fn zip_error(context: &str, err: zip::result::ZipError) -> Error {
    Error::Backup(format!("{}: {}", context, err))
}

/// Build a zip of the regular files in `data_dir`
pub fn create_archive(data_dir: &Path) -> Result<Vec<u8>> {
    if !data_dir.is_dir() {
        return Err(Error::NotFound("Data directory not found".to_string()));
    }

    let mut files: Vec<PathBuf> = fs::read_dir(data_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    files.sort();

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for path in &files {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        writer
            .start_file(format!("{}/{}", DATA_DIR, name), options)
            .map_err(|e| zip_error("Failed to write archive", e))?;
        writer.write_all(&fs::read(path)?)?;
    }

    let bytes = writer
        .finish()
        .map_err(|e| zip_error("Failed to write archive", e))?
        .into_inner();

    info!("Created backup of {} files ({} bytes)", files.len(), bytes.len());
    Ok(bytes)
}

/// Relative path of an archive entry inside the data dir
///
/// Strips a leading `data/`. Rejects absolute paths and `..` components.
fn entry_target(entry_path: &Path) -> Result<Option<PathBuf>> {
    let stripped = entry_path.strip_prefix(DATA_DIR).unwrap_or(entry_path);

    let mut target = PathBuf::new();
    for component in stripped.components() {
        match component {
            Component::Normal(part) => target.push(part),
            Component::CurDir => {}
            _ => {
                return Err(Error::Backup(format!(
                    "Unsafe path in archive: {}",
                    entry_path.display()
                )))
            }
        }
    }

    Ok(if target.as_os_str().is_empty() {
        None
    } else {
        Some(target)
    })
}

fn read_entries(archive_bytes: &[u8], limit: u64) -> Result<Vec<(PathBuf, Vec<u8>)>> {
    let mut archive =
        ZipArchive::new(Cursor::new(archive_bytes)).map_err(|e| zip_error("Invalid archive", e))?;
    let mut files = Vec::new();
    let mut remaining = limit;

    for index in 0..archive.len() {
        let mut file = archive
            .by_index(index)
            .map_err(|e| zip_error("Invalid archive", e))?;
        if file.is_dir() {
            continue;
        }
        let Some(target) = entry_target(Path::new(file.name()))? else {
            continue;
        };

        let mut contents = Vec::new();
        (&mut file)
            .take(remaining.saturating_add(1))
            .read_to_end(&mut contents)
            .map_err(|e| Error::Backup(format!("Invalid archive: {}", e)))?;
        let size = contents.len() as u64;
        if size > remaining {
            return Err(Error::Backup(format!(
                "Archive expands beyond {} MB",
                limit / 1024 / 1024
            )));
        }
        remaining -= size;
        files.push((target, contents));
    }

    Ok(files)
}

/// Replace `<root>/data` with the contents of an archive
///
/// The archive is fully read and validated before anything on disk changes.
/// An existing data dir is moved aside to `data-backup-<millis>`. Returns the
/// number of files restored.
pub fn restore_archive(root: &Path, archive_bytes: &[u8]) -> Result<usize> {
    if archive_bytes.is_empty() {
        return Err(Error::Backup("No file uploaded".to_string()));
    }
    let files = read_entries(archive_bytes, MAX_RESTORED_BYTES)?;

    let data_dir = root.join(DATA_DIR);
    if data_dir.exists() {
        let aside = root.join(format!("data-backup-{}", Utc::now().timestamp_millis()));
        fs::rename(&data_dir, &aside)?;
        info!("Moved existing data to {}", aside.display());
    }
    fs::create_dir_all(&data_dir)?;

    for (relative, contents) in &files {
        let out = data_dir.join(relative);
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&out, contents)?;
        debug!("Restored {}", relative.display());
    }

    info!("Restored {} files", files.len());
    Ok(files.len())
}
