//! Directory walks shared by the index builders.
//!
//! Walks are sorted by file name so repeated builds register keys in the
//! same order, poll the cancellation token at every entry, and treat
//! unreadable entries as absent.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::warn;
use walkdir::WalkDir;

/// A file found below a scan root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WalkedFile {
    pub path: PathBuf,
    /// Path relative to the scan root with `/` separators
    pub relative: String,
}

impl WalkedFile {
    /// Lowercased extension including the dot, or empty.
    pub fn extension(&self) -> String {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext.to_lowercase()))
            .unwrap_or_default()
    }
}

/// Every regular file below `dir`. Returns `None` when cancelled; a missing
/// directory yields an empty list.
pub(crate) fn walk_files(dir: &Path, cancel: &CancellationToken) -> Option<Vec<WalkedFile>> {
    if !dir.is_dir() {
        return Some(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
        if cancel.is_cancelled() {
            return None;
        }
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Skipping unreadable entry under {}: {err}", dir.display());
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(dir) else {
            continue;
        };
        let relative = relative
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .collect::<Vec<_>>()
            .join("/");

        files.push(WalkedFile {
            path: entry.into_path(),
            relative,
        });
    }

    Some(files)
}

/// Finds `<override_root>/<Ns...>/<folder>` directories at any depth.
///
/// The plugin name is the `/`-joined chain of directories between the
/// override root and the folder. Descent continues below a match because
/// nested plugin namespaces carry their own folders.
pub(crate) fn find_override_dirs(
    override_root: &Path,
    folder: &str,
    cancel: &CancellationToken,
) -> Option<Vec<(String, PathBuf)>> {
    if !override_root.is_dir() {
        return Some(Vec::new());
    }

    let mut found = Vec::new();
    for entry in WalkDir::new(override_root).min_depth(1).sort_by_file_name() {
        if cancel.is_cancelled() {
            return None;
        }
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(
                    "Skipping unreadable entry under {}: {err}",
                    override_root.display()
                );
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }

        let candidate = entry.path().join(folder);
        if !candidate.is_dir() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(override_root) else {
            continue;
        };
        let plugin = relative
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .collect::<Vec<_>>()
            .join("/");

        found.push((plugin, candidate));
    }

    Some(found)
}
