//! Backup and restore commands

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use minister_core::backup::{backup_filename, create_archive, restore_archive};

use super::open_store;

/// Write a zip of the data directory; returns the output path
pub fn cmd_backup(root: &Path, output: Option<&Path>) -> Result<PathBuf> {
    let store = open_store(root)?;
    let archive = {
        let _guard = store.lock();
        create_archive(store.data_dir()).context("Failed to create backup")?
    };

    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(backup_filename()));
    fs::write(&output, &archive)
        .with_context(|| format!("Failed to write backup to {}", output.display()))?;

    println!("✅ Backup created: {}", output.display());
    println!("   Size: {} bytes", archive.len());
    Ok(output)
}

/// Replace the data directory from an archive
pub fn cmd_restore(root: &Path, file: &Path) -> Result<()> {
    let bytes =
        fs::read(file).with_context(|| format!("Failed to read backup {}", file.display()))?;

    let store = open_store(root)?;
    let restored = {
        let _guard = store.lock();
        restore_archive(root, &bytes).context("Failed to restore backup")?
    };

    println!("✅ Restored {} files from {}", restored, file.display());
    println!("   Previous data was moved to {}/data-backup-*", root.display());
    Ok(())
}
