//! Candidate directories for each resource kind under CakePHP's layout
//! conventions: the plugin package, app-level plugin overrides, every local
//! plugin acting as a theme, and finally the application itself.

use std::path::{Path, PathBuf};

use itertools::Itertools;
use tracing::{debug, warn};

/// Resource kinds with their own directory conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchKind {
    /// Controller action and `render()` templates
    Template,
    Element,
    /// Cell view templates
    Cell,
    /// Cell classes under `src/View/Cell`
    CellClass,
    Email,
    Script,
    Style,
}

impl SearchKind {
    fn is_asset(self) -> bool {
        matches!(self, SearchKind::Script | SearchKind::Style)
    }
}

/// Ordered (lexicographically sorted, deduplicated) candidate directories.
///
/// `plugin_root` is the package root of `plugin` when the namespace map
/// knows it; otherwise a Composer-style vendor directory is guessed from the
/// plugin name.
pub fn search_paths(
    root_dir: &Path,
    kind: SearchKind,
    plugin: Option<&str>,
    plugin_root: Option<&Path>,
) -> Vec<PathBuf> {
    let mut base_paths: Vec<PathBuf> = Vec::new();

    if let Some(plugin_root) = plugin_root {
        base_paths.push(plugin_root.to_path_buf());
    } else if let Some(plugin) = plugin {
        let vendor_name = plugin.to_lowercase().replacen('/', "-", 1);
        base_paths.push(root_dir.join("vendor").join(vendor_name));
    }

    if let Some(plugin) = plugin {
        base_paths.push(join_segments(root_dir.join("templates").join("plugin"), plugin));
    }

    for local_plugin in local_plugin_dirs(root_dir) {
        if kind.is_asset() {
            base_paths.push(local_plugin);
            continue;
        }
        if let Some(plugin) = plugin {
            base_paths.push(join_segments(
                local_plugin.join("templates").join("plugin"),
                plugin,
            ));
        }
        base_paths.push(local_plugin.join("templates"));
    }

    base_paths.push(root_dir.to_path_buf());

    let search_paths = base_paths
        .iter()
        .flat_map(|base| expand(root_dir, base, kind, plugin_root))
        .unique()
        .sorted_by(|a, b| a.to_string_lossy().cmp(&b.to_string_lossy()))
        .collect_vec();

    debug!(
        "Search paths for {kind:?} (plugin {plugin:?}): {} candidates",
        search_paths.len()
    );
    search_paths
}

fn expand(root_dir: &Path, base: &Path, kind: SearchKind, plugin_root: Option<&Path>) -> Vec<PathBuf> {
    let in_plugin = is_inside_plugins(root_dir, base);

    match kind {
        SearchKind::Element => vec![
            base.join("templates").join("element"),
            base.join("element"),
            base.to_path_buf(),
        ],
        SearchKind::CellClass => vec![base.join("src").join("View").join("Cell")],
        SearchKind::Cell => {
            let mut paths = vec![
                base.join("templates").join("cell"),
                base.join("cell"),
                base.join("src").join("View").join("Cell"),
            ];
            if !in_plugin {
                paths.push(base.to_path_buf());
            }
            paths
        }
        SearchKind::Template => {
            let templates = if base.file_name().is_some_and(|name| name == "templates") {
                base.to_path_buf()
            } else {
                base.join("templates")
            };
            if in_plugin {
                vec![templates, base.to_path_buf()]
            } else {
                vec![templates]
            }
        }
        SearchKind::Email => {
            let email = base.join("templates").join("email");
            if in_plugin {
                vec![email, base.to_path_buf()]
            } else {
                vec![email]
            }
        }
        SearchKind::Script | SearchKind::Style => {
            let scope = if kind == SearchKind::Script { "js" } else { "css" };
            let mut paths = vec![base.join("webroot"), base.join("webroot").join(scope)];
            if let Some(plugin_root) = plugin_root {
                paths.push(plugin_root.join("webroot").join(scope));
            }
            paths
        }
    }
}

/// Directories directly under `<root>/plugins`, sorted by name.
pub fn local_plugin_dirs(root_dir: &Path) -> Vec<PathBuf> {
    let plugins_path = root_dir.join("plugins");
    if !plugins_path.is_dir() {
        debug!("Plugins directory not found: {}", plugins_path.display());
        return Vec::new();
    }

    match std::fs::read_dir(&plugins_path) {
        Ok(entries) => entries
            .flatten()
            .filter(|entry| entry.file_type().is_ok_and(|ft| ft.is_dir()))
            .map(|entry| entry.path())
            .sorted()
            .collect(),
        Err(err) => {
            warn!("Failed to read {}: {err}", plugins_path.display());
            Vec::new()
        }
    }
}

/// Whether `path` lies inside a `plugins` directory below the project root.
fn is_inside_plugins(root_dir: &Path, path: &Path) -> bool {
    path.strip_prefix(root_dir)
        .map(|relative| {
            let components = relative.components().collect_vec();
            components.len() > 1
                && components[..components.len() - 1]
                    .iter()
                    .any(|component| component.as_os_str() == "plugins")
        })
        .unwrap_or(false)
}

/// Appends a `/`-separated plugin name as path segments.
fn join_segments(base: PathBuf, plugin: &str) -> PathBuf {
    plugin
        .split('/')
        .filter(|segment| !segment.is_empty())
        .fold(base, |path, segment| path.join(segment))
}
