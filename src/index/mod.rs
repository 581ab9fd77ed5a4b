//! Symbolic-key indices over the project's elements, cells and assets.
//!
//! Every build starts from nothing and walks the whole convention tree;
//! there are no incremental updates. Files are registered under several key
//! spellings so lookups work with any naming style CakePHP accepts.

mod assets;
mod cells;
mod elements;
mod walk;

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use rayon::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::project::{local_plugin_dirs, NamespaceMap};

/// Key to file paths, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Index {
    entries: IndexMap<String, Vec<PathBuf>>,
}

impl Index {
    /// Paths registered under exactly `key`.
    pub fn get(&self, key: &str) -> &[PathBuf] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[PathBuf])> {
        self.entries
            .iter()
            .map(|(key, paths)| (key.as_str(), paths.as_slice()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Keys starting with `prefix`, ignoring case.
    pub fn names_with_prefix(&self, prefix: &str) -> Vec<&str> {
        let prefix = prefix.to_lowercase();
        self.keys()
            .filter(|key| key.to_lowercase().starts_with(&prefix))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Local accumulator for one scan; merged by the caller.
#[derive(Debug, Default)]
pub(crate) struct IndexBuilder {
    entries: IndexMap<String, Vec<PathBuf>>,
}

impl IndexBuilder {
    pub fn push(&mut self, key: String, path: &Path) {
        self.entries.entry(key).or_default().push(path.to_path_buf());
    }

    /// Like `push`, but a path is recorded at most once per key.
    pub fn push_unique(&mut self, key: String, path: &Path) {
        let paths = self.entries.entry(key).or_default();
        if !paths.iter().any(|existing| existing == path) {
            paths.push(path.to_path_buf());
        }
    }

    pub fn merge(&mut self, other: IndexBuilder) {
        for (key, paths) in other.entries {
            self.entries.entry(key).or_default().extend(paths);
        }
    }

    pub fn merge_unique(&mut self, other: IndexBuilder) {
        for (key, paths) in other.entries {
            for path in paths {
                self.push_unique(key.clone(), &path);
            }
        }
    }

    pub fn finish(self) -> Index {
        Index {
            entries: self.entries,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    Elements,
    Cells,
    Scripts,
    Styles,
}

impl IndexKind {
    pub const ALL: [IndexKind; 4] = [
        IndexKind::Elements,
        IndexKind::Cells,
        IndexKind::Scripts,
        IndexKind::Styles,
    ];

    pub fn name(self) -> &'static str {
        match self {
            IndexKind::Elements => "elements",
            IndexKind::Cells => "cells",
            IndexKind::Scripts => "scripts",
            IndexKind::Styles => "styles",
        }
    }
}

impl std::str::FromStr for IndexKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IndexKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("unknown index '{s}', expected one of elements, cells, scripts, styles"))
    }
}

/// All indices of one build generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Indices {
    pub elements: Index,
    pub cells: Index,
    pub scripts: Index,
    pub styles: Index,
}

impl Indices {
    /// Full rebuild. `None` when cancelled part way.
    pub fn build(
        root_dir: &Path,
        namespaces: &NamespaceMap,
        cancel: &CancellationToken,
    ) -> Option<Indices> {
        let plugins = plugin_sources(root_dir, namespaces);

        let elements = elements::build(root_dir, &plugins, cancel)?;
        info!("Element index built with {} keys", elements.len());

        let cells = cells::build(root_dir, &plugins, cancel)?;
        info!("Cell index built with {} keys", cells.len());

        let (scripts, styles) = assets::build(root_dir, &plugins, cancel)?;
        info!(
            "Asset indices built with {} script and {} style keys",
            scripts.len(),
            styles.len()
        );

        Some(Indices {
            elements,
            cells,
            scripts,
            styles,
        })
    }

    pub fn get(&self, kind: IndexKind) -> &Index {
        match kind {
            IndexKind::Elements => &self.elements,
            IndexKind::Cells => &self.cells,
            IndexKind::Scripts => &self.scripts,
            IndexKind::Styles => &self.styles,
        }
    }
}

/// A plugin package whose own trees are indexed under its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PluginSource {
    pub name: String,
    pub root: PathBuf,
}

/// Namespace-map plugins in declaration order, then any directory under
/// `<root>/plugins` that no namespace entry already covers.
pub(crate) fn plugin_sources(root_dir: &Path, namespaces: &NamespaceMap) -> Vec<PluginSource> {
    let mut sources: Vec<PluginSource> = namespaces
        .plugins()
        .map(|(name, root)| PluginSource {
            name,
            root: root.to_path_buf(),
        })
        .collect();

    for dir in local_plugin_dirs(root_dir) {
        let covered = namespaces.iter().any(|(_, root)| root == dir);
        let Some(name) = dir.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if !covered {
            sources.push(PluginSource {
                name: name.to_string(),
                root: dir.clone(),
            });
        }
    }

    sources
}

/// One directory to scan and the plugin its keys are qualified with.
#[derive(Debug, Clone)]
pub(crate) struct ScanRoot {
    pub dir: PathBuf,
    pub plugin: Option<String>,
}

impl ScanRoot {
    pub fn app(dir: PathBuf) -> ScanRoot {
        ScanRoot { dir, plugin: None }
    }

    pub fn plugin(dir: PathBuf, plugin: impl Into<String>) -> ScanRoot {
        ScanRoot {
            dir,
            plugin: Some(plugin.into()),
        }
    }

    /// `Plugin.rest` or `rest` for app-level roots.
    pub fn key(&self, rest: &str) -> String {
        match &self.plugin {
            Some(plugin) => format!("{plugin}.{rest}"),
            None => rest.to_string(),
        }
    }
}

/// Template roots for `folder` (`element` or `cell`): the app folder, app
/// overrides, then each plugin's folder and overrides.
pub(crate) fn template_scan_roots(
    root_dir: &Path,
    plugins: &[PluginSource],
    folder: &str,
    cancel: &CancellationToken,
) -> Option<Vec<ScanRoot>> {
    let mut roots = vec![ScanRoot::app(root_dir.join("templates").join(folder))];
    roots.extend(override_roots(&root_dir.join("templates").join("plugin"), folder, cancel)?);

    for plugin in plugins {
        let templates = plugin.root.join("templates");
        roots.push(ScanRoot::plugin(templates.join(folder), plugin.name.clone()));
        roots.extend(override_roots(&templates.join("plugin"), folder, cancel)?);
    }

    Some(roots)
}

fn override_roots(
    override_root: &Path,
    folder: &str,
    cancel: &CancellationToken,
) -> Option<Vec<ScanRoot>> {
    Some(
        walk::find_override_dirs(override_root, folder, cancel)?
            .into_iter()
            .map(|(plugin, dir)| ScanRoot::plugin(dir, plugin))
            .collect(),
    )
}

/// Scans independent roots in parallel, keeping the results in root order.
pub(crate) fn scan_roots<T, F>(roots: &[ScanRoot], cancel: &CancellationToken, scan: F) -> Option<Vec<T>>
where
    T: Send,
    F: Fn(&ScanRoot, Vec<walk::WalkedFile>) -> T + Sync,
{
    roots
        .par_iter()
        .map(|root| walk::walk_files(&root.dir, cancel).map(|files| scan(root, files)))
        .collect()
}
