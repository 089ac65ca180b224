//! Listing and reading files in the fixed log directory.

use std::ffi::OsStr;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{ManagementError, ManagementResult};

/// One regular file in the log directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFileInfo {
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification, seconds since the unix epoch.
    pub modified: u64,
}

/// A directory whose files are exposed by name.
///
/// Only plain file names are resolved. Anything containing a path separator,
/// or naming `.`/`..`, never leaves the directory and is reported as not found.
#[derive(Debug, Clone)]
pub struct LogDirectory {
    root: PathBuf,
}

impl LogDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Regular files in the directory, sorted by name. A directory that does
    /// not exist yet has no files.
    pub async fn list(&self) -> ManagementResult<Vec<LogFileInfo>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(root = %self.root.display(), "Log directory does not exist yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(ManagementError::io(&self.root, e)),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ManagementError::io(&self.root, e))?
        {
            let metadata = entry
                .metadata()
                .await
                .map_err(|e| ManagementError::io(entry.path(), e))?;
            if !metadata.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                trace!(path = %entry.path().display(), "Skipping non UTF-8 file name");
                continue;
            };
            let modified = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs())
                .unwrap_or_default();

            files.push(LogFileInfo {
                name,
                size: metadata.len(),
                modified,
            });
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    /// Full contents of the file called `name`.
    pub async fn open(&self, name: &str) -> ManagementResult<Vec<u8>> {
        let path = self.resolve(name)?;

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| not_found_or_io(name, &path, e))?;
        if !metadata.is_file() {
            return Err(ManagementError::NotFound(name.to_string()));
        }

        tokio::fs::read(&path)
            .await
            .map_err(|e| not_found_or_io(name, &path, e))
    }

    fn resolve(&self, name: &str) -> ManagementResult<PathBuf> {
        let plain = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\'])
            && Path::new(name).file_name().is_some_and(|f| f == OsStr::new(name));
        if plain {
            Ok(self.root.join(name))
        } else {
            Err(ManagementError::NotFound(name.to_string()))
        }
    }
}

fn not_found_or_io(name: &str, path: &Path, e: std::io::Error) -> ManagementError {
    if e.kind() == ErrorKind::NotFound {
        ManagementError::NotFound(name.to_string())
    } else {
        ManagementError::io(path, e)
    }
}
