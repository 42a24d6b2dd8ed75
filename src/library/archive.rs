//! Archive and unarchive by moving whole files under `archive/`.

use super::{ARCHIVE_DIR, LibraryStore};
use crate::error::{Error, Result};
use std::fs;
use tracing::info;

/// Move an active item into `archive/`, returning its new logical path
pub fn archive(store: &LibraryStore, logical: &str) -> Result<String> {
    let entry = store.entry(logical)?;
    if entry.archived {
        return Err(Error::InvalidPath(format!("{} is already archived", entry.path)));
    }
    let target = format!("{ARCHIVE_DIR}/{}", entry.path);
    move_file(store, &entry.path, &target)?;
    Ok(target)
}

/// Move an archived item back to its active location
pub fn unarchive(store: &LibraryStore, logical: &str) -> Result<String> {
    let entry = store.entry(logical)?;
    let target = match entry.path.strip_prefix(&format!("{ARCHIVE_DIR}/")) {
        Some(rest) if entry.archived => rest.to_string(),
        _ => return Err(Error::InvalidPath(format!("{} is not archived", entry.path))),
    };
    move_file(store, &entry.path, &target)?;
    Ok(target)
}

fn move_file(store: &LibraryStore, from: &str, to: &str) -> Result<()> {
    let source = store.resolve(from)?;
    let target = store.resolve(to)?;

    if target.exists() {
        return Err(Error::AlreadyExists(target));
    }
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    fs::rename(&source, &target).map_err(|e| Error::io(&source, e))?;

    info!(from, to, "moved library file");
    Ok(())
}
