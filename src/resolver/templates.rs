//! Direct lookups that need no index: action and `render()` templates, cell
//! method views, mailer templates and `asset_compress.ini` entries.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tower_lsp::lsp_types::Position;
use tracing::{debug, warn};

use super::{DocumentContext, FileInfo, Resolver};
use crate::patterns::utf16_column;
use crate::project::SearchKind;
use crate::reference::{split_qualifier, underscore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassRole {
    Controller,
    Cell,
}

impl ClassRole {
    fn class_regex(self) -> &'static Regex {
        static CONTROLLER: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"class\s+(\w+)Controller").expect("controller class regex"));
        static CELL: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"class\s+(\w+)Cell").expect("cell class regex"));
        match self {
            ClassRole::Controller => &CONTROLLER,
            ClassRole::Cell => &CELL,
        }
    }

    fn namespace_segment(self) -> &'static str {
        match self {
            ClassRole::Controller => "Controller",
            ClassRole::Cell => "Cell",
        }
    }
}

/// A controller or cell class declared in a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DeclaredClass {
    /// Class name without its role suffix
    name: String,
    /// Namespace segments after `Controller` / `Cell`, e.g. `["Admin"]`
    prefix: Vec<String>,
}

impl DeclaredClass {
    fn parse(text: &str, role: ClassRole) -> Option<DeclaredClass> {
        static NAMESPACE_RE: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"namespace\s+([\w\\]+)").expect("namespace regex"));

        let namespace = NAMESPACE_RE.captures(text)?.get(1)?.as_str();
        let name = role.class_regex().captures(text)?.get(1)?.as_str().to_string();

        let segments: Vec<&str> = namespace.split('\\').collect();
        let prefix = segments
            .iter()
            .position(|segment| *segment == role.namespace_segment())
            .map(|at| segments[at + 1..].iter().map(|s| s.to_string()).collect())
            .unwrap_or_default();

        Some(DeclaredClass { name, prefix })
    }

    /// `Admin/Users/{file}`
    fn template_path(&self, file: &str) -> String {
        self.prefix
            .iter()
            .map(String::as_str)
            .chain([self.name.as_str(), file])
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl Resolver<'_> {
    /// `render('name')` inside a view: the name is a template path.
    pub(super) fn resolve_view_template(&self, raw: &str) -> Vec<FileInfo> {
        let descriptor = split_qualifier(raw);
        let file_name = format!("{}.php", descriptor.path);
        let found = self.existing(
            self.search_paths(SearchKind::Template, descriptor.plugin.as_deref())
                .into_iter()
                .map(|dir| dir.join(&file_name)),
        );
        self.file_infos(found)
    }

    /// An action or `render()` target of the controller declared in `ctx`.
    pub(super) fn resolve_controller_template(&self, raw: &str, ctx: &DocumentContext) -> Vec<FileInfo> {
        let descriptor = split_qualifier(raw);
        let relative = match DeclaredClass::parse(ctx.text, ClassRole::Controller) {
            Some(controller) => controller.template_path(&underscore(&descriptor.path)),
            None => descriptor.path.clone(),
        };
        debug!("Controller template candidate: {relative}");

        let file_name = format!("{relative}.php");
        let found = self.existing(
            self.search_paths(SearchKind::Template, descriptor.plugin.as_deref())
                .into_iter()
                .map(|dir| dir.join(&file_name)),
        );
        self.file_infos(found)
    }

    /// View templates of a method declared in a cell class.
    pub(super) fn resolve_cell_action(
        &self,
        method: &str,
        ctx: &DocumentContext,
        file_plugin: Option<&str>,
    ) -> Vec<FileInfo> {
        let Some(cell) = DeclaredClass::parse(ctx.text, ClassRole::Cell) else {
            debug!("{} declares no cell class", ctx.path.display());
            return Vec::new();
        };

        let file_name = format!("{}/{}.php", cell.name, underscore(method));
        let found = self.existing(
            self.search_paths(SearchKind::Cell, file_plugin)
                .into_iter()
                .map(|dir| dir.join(&file_name)),
        );
        self.file_infos(found)
    }

    /// Text variants first, then HTML variants.
    pub(super) fn resolve_email(&self, name: &str, file_plugin: Option<&str>) -> Vec<FileInfo> {
        let dirs = self.search_paths(SearchKind::Email, file_plugin);
        let file_name = format!("{name}.php");
        let file_name = file_name.as_str();
        let found = self.existing(
            ["text", "html"]
                .into_iter()
                .flat_map(|variant| dirs.iter().map(move |dir| dir.join(variant).join(file_name)))
                .collect::<Vec<_>>(),
        );
        self.file_infos(found)
    }

    /// `p:Name:path`, `plugin:Name:path` or an app webroot path.
    pub(super) fn resolve_manifest_entry(&self, entry: &str) -> Vec<FileInfo> {
        static PLUGIN_ENTRY_RE: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"^(?:p|plugin):([^:]+):(.+)$").expect("manifest plugin regex"));

        let entry = entry.trim();
        let asset_type = match Path::new(entry).extension() {
            Some(ext) if ext.eq_ignore_ascii_case("css") => "css",
            _ => "js",
        };

        let candidate = if let Some(captures) = PLUGIN_ENTRY_RE.captures(entry) {
            let Some(plugin_root) = self.plugin_root(&captures[1]) else {
                debug!("Unknown plugin in manifest entry: {entry}");
                return Vec::new();
            };
            let path = &captures[2];
            let webroot = plugin_root.join("webroot");
            if path.starts_with('/') || path.starts_with(asset_type) {
                join_relative(&webroot, path)
            } else {
                join_relative(&webroot.join(asset_type), path)
            }
        } else if entry.starts_with('/') {
            join_relative(&self.root_dir.join("webroot"), entry)
        } else {
            join_relative(&self.root_dir.join("webroot").join(asset_type), entry)
        };

        self.file_infos(self.existing([candidate]))
    }
}

fn join_relative(base: &Path, relative: &str) -> PathBuf {
    relative
        .split('/')
        .filter(|segment| !segment.is_empty())
        .fold(base.to_path_buf(), |path, segment| path.join(segment))
}

/// First line declaring `function {method}`, positioned at `function`.
pub(super) fn find_method(path: &Path, method: &str) -> Option<Position> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            warn!("Failed to read {}: {err}", path.display());
            return None;
        }
    };
    let method_re = Regex::new(&format!(r"\bfunction\s+{}\b", regex::escape(method))).ok()?;

    content.lines().enumerate().find_map(|(number, line)| {
        method_re.find(line).map(|found| {
            Position::new(number as u32, utf16_column(line, found.start()))
        })
    })
}
