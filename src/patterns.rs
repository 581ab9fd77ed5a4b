//! The fixed table of call-site patterns that produce references.
//!
//! Each pattern has exactly one capture group holding the raw reference.
//! Patterns are tried independently, so a line that matches both a helper
//! call and a raw tag yields two references.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::resolver::ReferenceKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PatternKind {
    Render,
    Method,
    ElementCall,
    ElementArray,
    Cell,
    ScriptHelper,
    ScriptTag,
    CssHelper,
    CssTag,
    SetTemplate,
    /// `files[] = ...` in `asset_compress.ini`
    ManifestEntry,
}

impl PatternKind {
    /// Patterns scanned in template and class sources.
    pub const SOURCE: [PatternKind; 10] = [
        PatternKind::Render,
        PatternKind::Method,
        PatternKind::ElementCall,
        PatternKind::ElementArray,
        PatternKind::Cell,
        PatternKind::ScriptHelper,
        PatternKind::ScriptTag,
        PatternKind::CssHelper,
        PatternKind::CssTag,
        PatternKind::SetTemplate,
    ];

    pub fn regex(self) -> &'static Regex {
        static RENDER: Lazy<Regex> =
            Lazy::new(|| Regex::new(r#"\$this->render\(['"](.+?)['"]\)"#).expect("render regex"));
        static METHOD: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"\bfunction\s+(\w+)\s*\(").expect("method regex"));
        static ELEMENT_CALL: Lazy<Regex> =
            Lazy::new(|| Regex::new(r#"\$this->element\(['"](.+?)['"]"#).expect("element regex"));
        static ELEMENT_ARRAY: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r#"['"]element['"]\s*=>\s*['"](.+?)['"]"#).expect("element option regex")
        });
        static CELL: Lazy<Regex> =
            Lazy::new(|| Regex::new(r#"\$this->cell\(['"](.+?)['"]"#).expect("cell regex"));
        static SCRIPT_HELPER: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r#"\$this->Html->script\(['"](.+?)['"](?:,|\))"#).expect("script regex")
        });
        static SCRIPT_TAG: Lazy<Regex> =
            Lazy::new(|| Regex::new(r#"<script[^>]*src=['"](.+?)['"]"#).expect("script tag regex"));
        static CSS_HELPER: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r#"\$this->Html->css\(['"](.+?)['"](?:,|\))"#).expect("css regex")
        });
        static CSS_TAG: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r#"<link[^>]*?href=['"](.+?)['"][^>]*"#).expect("css tag regex")
        });
        static SET_TEMPLATE: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r#"->setTemplate\(['"](.+?)['"]\)"#).expect("setTemplate regex")
        });
        static MANIFEST_ENTRY: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"files\[\]\s*=\s*(.+)$").expect("manifest regex"));

        match self {
            PatternKind::Render => &RENDER,
            PatternKind::Method => &METHOD,
            PatternKind::ElementCall => &ELEMENT_CALL,
            PatternKind::ElementArray => &ELEMENT_ARRAY,
            PatternKind::Cell => &CELL,
            PatternKind::ScriptHelper => &SCRIPT_HELPER,
            PatternKind::ScriptTag => &SCRIPT_TAG,
            PatternKind::CssHelper => &CSS_HELPER,
            PatternKind::CssTag => &CSS_TAG,
            PatternKind::SetTemplate => &SET_TEMPLATE,
            PatternKind::ManifestEntry => &MANIFEST_ENTRY,
        }
    }

    /// The kind of resource a capture of this pattern names. A method
    /// declaration means an action template or a cell view depending on
    /// the file it sits in.
    pub fn reference_kind(self, file_path: &Path) -> ReferenceKind {
        match self {
            PatternKind::Render => ReferenceKind::Render,
            PatternKind::Method if is_cell_class(file_path) => ReferenceKind::CellAction,
            PatternKind::Method => ReferenceKind::ControllerAction,
            PatternKind::ElementCall | PatternKind::ElementArray => ReferenceKind::Element,
            PatternKind::Cell => ReferenceKind::Cell,
            PatternKind::ScriptHelper | PatternKind::ScriptTag => ReferenceKind::Script,
            PatternKind::CssHelper | PatternKind::CssTag => ReferenceKind::Style,
            PatternKind::SetTemplate => ReferenceKind::Email,
            PatternKind::ManifestEntry => ReferenceKind::ManifestAsset,
        }
    }
}

/// One pattern capture. Columns are UTF-16 code units within the line,
/// the default LSP position encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawReference {
    pub pattern: PatternKind,
    pub text: String,
    pub line: u32,
    pub start: u32,
    pub end: u32,
}

pub fn is_asset_manifest(file_path: &Path) -> bool {
    file_path
        .file_name()
        .is_some_and(|name| name == "asset_compress.ini")
}

fn is_cell_class(file_path: &Path) -> bool {
    file_path.to_string_lossy().contains("Cell.php")
}

/// The patterns that apply to a file: only manifest entries in
/// `asset_compress.ini`, the source table everywhere else.
pub fn patterns_for(file_path: &Path) -> &'static [PatternKind] {
    static MANIFEST: [PatternKind; 1] = [PatternKind::ManifestEntry];
    if is_asset_manifest(file_path) {
        &MANIFEST
    } else {
        &PatternKind::SOURCE
    }
}

/// All references on one line, grouped by pattern in table order.
pub fn find_in_line(file_path: &Path, line_number: u32, line: &str) -> Vec<RawReference> {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut found = Vec::new();

    for &pattern in patterns_for(file_path) {
        for captures in pattern.regex().captures_iter(line) {
            let Some(capture) = captures.get(1) else {
                continue;
            };
            let text = match pattern {
                PatternKind::ManifestEntry => capture.as_str().trim_end(),
                _ => capture.as_str(),
            };
            let start = utf16_column(line, capture.start());
            found.push(RawReference {
                pattern,
                text: text.to_string(),
                line: line_number,
                start,
                end: start + text.encode_utf16().count() as u32,
            });
        }
    }

    found
}

/// Scans at most `max_lines` lines of `text`.
pub fn find_references(file_path: &Path, text: &str, max_lines: usize) -> Vec<RawReference> {
    text.lines()
        .take(max_lines)
        .enumerate()
        .flat_map(|(number, line)| find_in_line(file_path, number as u32, line))
        .collect()
}

/// UTF-16 column of a byte offset in `line`.
pub fn utf16_column(line: &str, byte_offset: usize) -> u32 {
    line[..byte_offset].encode_utf16().count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(references: &[RawReference]) -> Vec<(PatternKind, &str)> {
        references
            .iter()
            .map(|reference| (reference.pattern, reference.text.as_str()))
            .collect()
    }

    #[test]
    fn test_element_call_and_array_option() {
        let path = Path::new("/p/templates/Pages/home.php");
        let line = r#"<?= $this->element('widgets/card', ['element' => 'Blog.sidebar']) ?>"#;

        let found = find_in_line(path, 3, line);

        assert_eq!(
            texts(&found),
            vec![
                (PatternKind::ElementCall, "widgets/card"),
                (PatternKind::ElementArray, "Blog.sidebar"),
            ]
        );
        assert_eq!(found[0].line, 3);
        assert_eq!(found[0].start, 20);
        assert_eq!(found[0].end, 32);
    }

    #[test]
    fn test_helper_and_tag_fire_independently() {
        let path = Path::new("/p/templates/layout/default.php");
        let line = r#"<?= $this->Html->css('Blog.app') ?><link rel="stylesheet" href="/css/site.css">"#;

        assert_eq!(
            texts(&find_in_line(path, 0, line)),
            vec![
                (PatternKind::CssHelper, "Blog.app"),
                (PatternKind::CssTag, "/css/site.css"),
            ]
        );
    }

    #[test]
    fn test_script_helper_requires_closing() {
        let path = Path::new("/p/templates/x.php");

        assert_eq!(
            texts(&find_in_line(path, 0, "$this->Html->script('app', ['block' => true]);")),
            vec![(PatternKind::ScriptHelper, "app")]
        );
        assert!(find_in_line(path, 0, "$this->Html->script('app'").is_empty());
    }

    #[test]
    fn test_method_kind_depends_on_file() {
        let controller = Path::new("/p/src/Controller/PostsController.php");
        let cell = Path::new("/p/src/View/Cell/InboxCell.php");

        assert_eq!(
            PatternKind::Method.reference_kind(controller),
            ReferenceKind::ControllerAction
        );
        assert_eq!(PatternKind::Method.reference_kind(cell), ReferenceKind::CellAction);
    }

    #[test]
    fn test_manifest_only_scans_entries() {
        let path = Path::new("/p/config/asset_compress.ini");
        let text = "[app.js]\nfiles[] = p:Blog:js/app.js  \n; $this->element('x')\n";

        let found = find_references(path, text, 1000);

        assert_eq!(texts(&found), vec![(PatternKind::ManifestEntry, "p:Blog:js/app.js")]);
        assert_eq!(found[0].line, 1);
        assert_eq!(found[0].start, 10);
    }

    #[test]
    fn test_max_lines_bounds_scan() {
        let path = Path::new("/p/templates/x.php");
        let text = "$this->element('a')\n$this->element('b')\n";

        assert_eq!(find_references(path, text, 1).len(), 1);
        assert_eq!(find_references(path, text, 0).len(), 0);
    }

    #[test]
    fn test_columns_count_utf16_units() {
        let path = Path::new("/p/templates/x.php");
        let found = find_in_line(path, 0, "é $this->cell('Inbox::display')");

        assert_eq!(found[0].start, 15);
        assert_eq!(found[0].text, "Inbox::display");

        // Astral characters take two code units.
        let found = find_in_line(path, 0, "🎂 $this->element('card') 🎂");
        assert_eq!(found[0].start, 19);
        assert_eq!(found[0].end, 23);
    }
}
