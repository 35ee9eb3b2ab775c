//! Flat-directory photo storage: enumerate, add, and remove image files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::Error;

/// Handle to the storage directory plus the allowed extension set.
#[derive(Debug, Clone)]
pub struct PhotoStore {
    root: PathBuf,
    allowed: Vec<String>,
}

impl PhotoStore {
    pub fn new(root: impl Into<PathBuf>, extensions: &[String]) -> Self {
        Self {
            root: root.into(),
            allowed: extensions.iter().map(|e| e.to_ascii_lowercase()).collect(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Enumerate the allowed image files currently in storage, sorted by name.
    ///
    /// Subdirectories and unreadable entries are skipped; a missing root
    /// yields an empty list.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = WalkDir::new(&self.root)
            .max_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .filter(|name| self.allowed_extension(name))
            .collect();
        names.sort();
        names
    }

    /// Case-insensitive check of the substring after the final `.`.
    /// Names without a dot never match.
    pub fn allowed_extension(&self, name: &str) -> bool {
        match name.rsplit_once('.') {
            Some((_, ext)) => {
                let ext = ext.to_ascii_lowercase();
                self.allowed.iter().any(|a| *a == ext)
            }
            None => false,
        }
    }

    /// Persist uploaded bytes under `name` (already sanitized by the caller).
    pub fn save(&self, name: &str, bytes: &[u8]) -> Result<(), Error> {
        fs::write(self.root.join(name), bytes)?;
        Ok(())
    }

    /// Remove the named photo. Missing files report [`Error::NotFound`],
    /// including ones that vanish between the existence check and the unlink.
    pub fn remove(&self, name: &str) -> Result<(), Error> {
        let path = self.root.join(name);
        if !path.exists() {
            return Err(Error::NotFound(name.to_string()));
        }
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(Error::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Reduce an untrusted filename to a safe flat name.
///
/// Keeps only the final path component, drops leading dots, and replaces
/// anything outside `[A-Za-z0-9._-]` with `_`. Returns `None` when nothing
/// usable remains.
pub fn sanitize_file_name(raw: &str) -> Option<String> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '_') {
        None
    } else {
        Some(cleaned.to_string())
    }
}
