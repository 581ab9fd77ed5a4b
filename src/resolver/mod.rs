//! Turns a raw reference plus the calling file's context into files.
//!
//! Candidate keys go most specific first: the reference's own plugin, the
//! calling file's plugin, then unqualified. When an index has nothing the
//! resolver falls back to checking the conventional directories directly.
//! Results are deduplicated by absolute path and sorted by display path.

mod lookup;
mod templates;

pub use lookup::{segment_suffix_match, suffix_match, KeyMatcher, LookupPolicy};

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use itertools::Itertools;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower_lsp::lsp_types::Position;
use tracing::debug;

use crate::index::{IndexKind, Indices};
use crate::patterns::{find_references, RawReference};
use crate::project::{plugin_for_file, search_paths, NamespaceMap, SearchKind};
use crate::reference::{split_component_reference, split_qualifier, underscore};

/// What a captured reference names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReferenceKind {
    Element,
    Cell,
    Script,
    Style,
    /// `$this->render()` target
    Render,
    /// Template of a controller action
    ControllerAction,
    /// View template of a cell method
    CellAction,
    /// Mailer `setTemplate()` target
    Email,
    /// `files[]` entry of `asset_compress.ini`
    ManifestAsset,
}

impl ReferenceKind {
    /// The index consulted before any directory search, with its policy.
    pub fn index_lookup(self) -> Option<(IndexKind, LookupPolicy)> {
        match self {
            ReferenceKind::Element => Some((IndexKind::Elements, LookupPolicy::SUFFIX)),
            ReferenceKind::Cell => Some((IndexKind::Cells, LookupPolicy::Aggregate)),
            ReferenceKind::Script => Some((IndexKind::Scripts, LookupPolicy::FirstMatch)),
            ReferenceKind::Style => Some((IndexKind::Styles, LookupPolicy::FirstMatch)),
            _ => None,
        }
    }
}

/// A resolved file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    /// Base file name
    pub name: String,
    pub path: PathBuf,
    /// Project-relative path with `/` separators
    pub display_path: String,
    /// Method declaration inside a cell class
    pub method_location: Option<Position>,
}

impl FileInfo {
    pub fn new(root_dir: &Path, path: &Path) -> FileInfo {
        let path = normalize_separators(path);
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let display_path = pathdiff::diff_paths(&path, root_dir)
            .filter(|relative| !relative.starts_with(".."))
            .map(|relative| {
                relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .join("/")
            })
            .unwrap_or_else(|| path.to_string_lossy().into_owned());

        FileInfo {
            name,
            path,
            display_path,
            method_location: None,
        }
    }
}

/// Rebuilds the path from its components, collapsing repeated separators
/// and `.` segments. On Windows this also unifies `/` and `\`; elsewhere a
/// `\` is an ordinary file name character and is kept.
fn normalize_separators(path: &Path) -> PathBuf {
    path.components().collect()
}

/// One entry per absolute path, ascending by display path. A duplicate
/// carrying a method location replaces one without.
pub fn dedupe_and_sort(files: impl IntoIterator<Item = FileInfo>) -> Vec<FileInfo> {
    let mut unique: IndexMap<PathBuf, FileInfo> = IndexMap::new();
    for file in files {
        match unique.get_mut(&file.path) {
            Some(existing) if existing.method_location.is_none() => *existing = file,
            Some(_) => {}
            None => {
                unique.insert(file.path.clone(), file);
            }
        }
    }

    unique
        .into_values()
        .sorted_by(|a, b| a.display_path.cmp(&b.display_path))
        .collect()
}

/// The file a reference was found in.
#[derive(Debug, Clone, Copy)]
pub struct DocumentContext<'a> {
    pub path: &'a Path,
    /// Current contents, used for controller and cell declarations
    pub text: &'a str,
}

impl<'a> DocumentContext<'a> {
    pub fn new(path: &'a Path, text: &'a str) -> DocumentContext<'a> {
        DocumentContext { path, text }
    }

    fn path_contains(&self, needle: &str) -> bool {
        self.path.to_string_lossy().contains(needle)
    }

    fn is_view_file(&self) -> bool {
        self.path_contains("templates") || self.path_contains("Template")
    }
}

/// Resolution against one snapshot of namespaces and indices.
pub struct Resolver<'a> {
    root_dir: &'a Path,
    namespaces: &'a NamespaceMap,
    indices: &'a Indices,
    cancel: CancellationToken,
}

impl<'a> Resolver<'a> {
    pub fn new(root_dir: &'a Path, namespaces: &'a NamespaceMap, indices: &'a Indices) -> Resolver<'a> {
        Resolver {
            root_dir,
            namespaces,
            indices,
            cancel: CancellationToken::new(),
        }
    }

    /// Stops directory checks once `cancel` fires; partial results are
    /// dropped.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Resolver<'a> {
        self.cancel = cancel;
        self
    }

    pub fn resolve(&self, raw: &str, kind: ReferenceKind, ctx: &DocumentContext) -> Vec<FileInfo> {
        let file_plugin = plugin_for_file(self.root_dir, self.namespaces, ctx.path);
        debug!("Resolving {kind:?} '{raw}' from plugin {file_plugin:?}");

        let files = match kind {
            ReferenceKind::Element => self.resolve_element(raw, file_plugin.as_deref()),
            ReferenceKind::Cell => self.resolve_cell(raw, file_plugin.as_deref()),
            ReferenceKind::Script | ReferenceKind::Style => {
                self.resolve_asset(raw, kind, file_plugin.as_deref())
            }
            ReferenceKind::Render if ctx.is_view_file() => self.resolve_view_template(raw),
            ReferenceKind::Render | ReferenceKind::ControllerAction => {
                self.resolve_controller_template(raw, ctx)
            }
            ReferenceKind::CellAction => self.resolve_cell_action(raw, ctx, file_plugin.as_deref()),
            ReferenceKind::Email if ctx.path_contains("Mailer") => {
                self.resolve_email(raw, file_plugin.as_deref())
            }
            ReferenceKind::Email => Vec::new(),
            ReferenceKind::ManifestAsset => self.resolve_manifest_entry(raw),
        };

        if self.cancel.is_cancelled() {
            return Vec::new();
        }
        dedupe_and_sort(files)
    }

    /// Every reference in `references`, merged into one list.
    pub fn resolve_all(&self, references: &[RawReference], ctx: &DocumentContext) -> Vec<FileInfo> {
        dedupe_and_sort(references.iter().flat_map(|reference| {
            self.resolve(&reference.text, reference.pattern.reference_kind(ctx.path), ctx)
        }))
    }

    /// Finds and resolves every reference in `text`.
    pub fn resolve_text(&self, text: &str, ctx: &DocumentContext) -> Vec<FileInfo> {
        let references = find_references(ctx.path, text, usize::MAX);
        self.resolve_all(&references, ctx)
    }

    fn resolve_element(&self, raw: &str, file_plugin: Option<&str>) -> Vec<FileInfo> {
        let descriptor = split_qualifier(raw);

        let mut candidates = Vec::new();
        if let Some(plugin) = &descriptor.plugin {
            candidates.push(descriptor.qualified(plugin));
        } else if let Some(plugin) = file_plugin {
            candidates.push(descriptor.qualified(plugin));
        }
        candidates.push(descriptor.path.clone());

        let paths = self.lookup(ReferenceKind::Element, &candidates);
        if !paths.is_empty() {
            return self.file_infos(paths);
        }

        let plugin = descriptor.plugin.as_deref().or(file_plugin);
        let file_name = format!("{}.php", descriptor.path);
        let found = self.existing(
            self.search_paths(SearchKind::Element, plugin)
                .into_iter()
                .map(|dir| dir.join(&file_name)),
        );
        self.file_infos(found)
    }

    fn resolve_cell(&self, raw: &str, file_plugin: Option<&str>) -> Vec<FileInfo> {
        let descriptor = split_qualifier(raw);
        let explicit_method = raw.contains("::");
        let component = if explicit_method {
            split_component_reference(raw)
        } else {
            split_component_reference(&format!("{raw}::{DEFAULT_CELL_METHOD}"))
        };
        let method = component.method.as_str();

        let normalized = if descriptor.path.contains("::") {
            descriptor.path.clone()
        } else {
            format!("{}::{DEFAULT_CELL_METHOD}", descriptor.path)
        };
        let candidates = [descriptor.plugin.as_deref(), file_plugin]
            .into_iter()
            .flatten()
            .map(|plugin| format!("{plugin}.{normalized}"))
            .chain(std::iter::once(normalized.clone()))
            .unique()
            .collect_vec();

        let plugin = component.plugin.as_deref().or(file_plugin);
        let mut views = self.lookup(ReferenceKind::Cell, &candidates);
        if views.is_empty() {
            let template = format!("{}/{}.php", component.class_name, underscore(method));
            views = self.existing(
                self.search_paths(SearchKind::Cell, plugin)
                    .into_iter()
                    .map(|dir| dir.join(&template)),
            );
        }

        let class_file = format!("{}Cell.php", component.class_name);
        let classes = self.existing(
            self.search_paths(SearchKind::CellClass, plugin)
                .into_iter()
                .map(|dir| dir.join(&class_file)),
        );

        let mut files = self.file_infos(views);
        files.extend(classes.into_iter().map(|path| {
            let mut info = FileInfo::new(self.root_dir, &path);
            if explicit_method {
                info.method_location = templates::find_method(&path, &component.method);
            }
            info
        }));
        files
    }

    fn resolve_asset(&self, raw: &str, kind: ReferenceKind, file_plugin: Option<&str>) -> Vec<FileInfo> {
        let descriptor = split_qualifier(raw);

        let contextual = file_plugin.map(|plugin| format!("{plugin}.{raw}"));
        let candidates = if descriptor.plugin.is_some() {
            std::iter::once(raw.to_string()).chain(contextual).collect_vec()
        } else {
            contextual.into_iter().chain(std::iter::once(raw.to_string())).collect_vec()
        };

        let paths = self.lookup(kind, &candidates);
        if !paths.is_empty() {
            return self.file_infos(paths);
        }

        let (search_kind, extension) = match kind {
            ReferenceKind::Style => (SearchKind::Style, "css"),
            _ => (SearchKind::Script, "js"),
        };
        let relative = descriptor.path.trim_start_matches('/');
        let plugin = descriptor.plugin.as_deref().or(file_plugin);
        let found = self.existing(
            self.search_paths(search_kind, plugin)
                .into_iter()
                .flat_map(|dir| {
                    [
                        dir.join(relative),
                        dir.join(format!("{relative}.{extension}")),
                    ]
                }),
        );
        self.file_infos(found.into_iter().filter(|path| path.is_file()).collect())
    }

    fn lookup(&self, kind: ReferenceKind, candidates: &[String]) -> Vec<PathBuf> {
        let Some((index_kind, policy)) = kind.index_lookup() else {
            return Vec::new();
        };
        let paths = policy.lookup(self.indices.get(index_kind), candidates);
        debug!("{} index: {candidates:?} -> {} paths", index_kind.name(), paths.len());
        paths
    }

    /// Candidate directories for `kind`, with the plugin's package root when
    /// the namespace map or the local `plugins/` folder knows it.
    fn search_paths(&self, kind: SearchKind, plugin: Option<&str>) -> Vec<PathBuf> {
        let plugin_root = plugin.and_then(|plugin| self.plugin_root(plugin));
        search_paths(self.root_dir, kind, plugin, plugin_root.as_deref())
    }

    fn plugin_root(&self, plugin: &str) -> Option<PathBuf> {
        if let Some(root) = self.namespaces.resolve(plugin) {
            return Some(root.to_path_buf());
        }
        let local = self.root_dir.join("plugins").join(plugin);
        local.is_dir().then_some(local)
    }

    /// The candidates that exist, in order. Empty once cancelled.
    fn existing(&self, candidates: impl IntoIterator<Item = PathBuf>) -> Vec<PathBuf> {
        let mut found = Vec::new();
        for candidate in candidates {
            if self.cancel.is_cancelled() {
                return Vec::new();
            }
            if candidate.exists() {
                found.push(candidate);
            }
        }
        found
    }

    fn file_infos(&self, paths: Vec<PathBuf>) -> Vec<FileInfo> {
        paths
            .iter()
            .map(|path| FileInfo::new(self.root_dir, path))
            .collect()
    }
}

/// Method assumed when a cell reference names only the class.
const DEFAULT_CELL_METHOD: &str = "view";
