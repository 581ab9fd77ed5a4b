//! Hover provider for CakePHP sources.
//!
//! Hovering a line lists every file its references resolve to, each
//! labelled by what it is:
//!
//! | File | Label |
//! |------|-------|
//! | `*Cell.php` | Cell Class (with the method line when known) |
//! | `*.js` / `*.css` | JS File / CSS File |
//! | `*.php` under a `Controller` path | Controller |
//! | `*.php` under a `Table` path | Table |
//! | templates under `cell` / `element` / elsewhere | Cell View / Element / View |
//! | anything else | File |
//!
//! Hover can be disabled via [`Settings::hover`](crate::config::Settings).

use std::path::Path;

use tower_lsp::lsp_types::{Hover, HoverContents, MarkupContent, MarkupKind, Position, Url};

use crate::patterns::find_in_line;
use crate::resolver::{DocumentContext, FileInfo};
use crate::workspace::Workspace;

/// Hover for the line under `position` of the document at `path`.
///
/// Returns `None` when hover is disabled, the line has no references, or
/// none of them resolve.
pub fn hover(workspace: &Workspace, path: &Path, text: &str, position: Position) -> Option<Hover> {
    if !workspace.settings().hover {
        return None;
    }

    let line = text.lines().nth(position.line as usize)?;
    let references = find_in_line(path, position.line, line);
    if references.is_empty() {
        return None;
    }

    let snapshot = workspace.snapshot();
    let resolver = snapshot.resolver(workspace.root_dir());
    let files = resolver.resolve_all(&references, &DocumentContext::new(path, text));
    if files.is_empty() {
        return None;
    }

    Some(Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: render_files(&files),
        }),
        range: None,
    })
}

pub fn render_files(files: &[FileInfo]) -> String {
    let mut value = String::from("Related files found:\n\n");
    for file in files {
        value.push_str(&format!(
            "- {}: [{}]({})",
            file_label(file),
            file.display_path,
            file_link(file)
        ));
        if let Some(location) = file.method_location {
            value.push_str(&format!(" (method at line {})", location.line + 1));
        }
        value.push('\n');
    }
    value
}

pub fn file_label(file: &FileInfo) -> &'static str {
    let name = file.name.as_str();
    let shown = file.display_path.as_str();

    if name.ends_with("Cell.php") {
        "Cell Class"
    } else if name.ends_with(".js") {
        "JS File"
    } else if name.ends_with(".css") {
        "CSS File"
    } else if name.ends_with(".php") && shown.contains("Controller") {
        "Controller"
    } else if name.ends_with(".php") && shown.contains("Table") {
        "Table"
    } else if shown.contains("templates") {
        if shown.contains("cell") {
            "Cell View"
        } else if shown.contains("element") {
            "Element"
        } else {
            "View"
        }
    } else {
        "File"
    }
}

/// `file://` URI, with `#line,column` (1-based) for a method location.
pub fn file_link(file: &FileInfo) -> String {
    let uri = Url::from_file_path(&file.path)
        .map(|url| url.to_string())
        .unwrap_or_else(|_| file.path.to_string_lossy().into_owned());
    match file.method_location {
        Some(location) => format!("{uri}#{},{}", location.line + 1, location.character + 1),
        None => uri,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::test_utils::{create_test_project_dir, touch};

    fn file(display_path: &str) -> FileInfo {
        FileInfo::new(Path::new("/project"), &Path::new("/project").join(display_path))
    }

    #[test]
    fn test_labels() {
        let cases = [
            ("src/View/Cell/InboxCell.php", "Cell Class"),
            ("webroot/js/app.js", "JS File"),
            ("webroot/css/app.css", "CSS File"),
            ("src/Controller/PagesController.php", "Controller"),
            ("src/Model/Table/UsersTable.php", "Table"),
            ("templates/cell/Inbox/display.php", "Cell View"),
            ("templates/element/card.php", "Element"),
            ("templates/Pages/home.php", "View"),
            ("config/app.php", "File"),
        ];

        for (path, label) in cases {
            assert_eq!(file_label(&file(path)), label, "{path}");
        }
    }

    #[test]
    fn test_method_location_in_link_and_text() {
        let mut cell = file("src/View/Cell/InboxCell.php");
        cell.method_location = Some(Position::new(9, 4));

        assert_eq!(file_link(&cell), "file:///project/src/View/Cell/InboxCell.php#10,5");
        assert!(render_files(&[cell]).contains("(method at line 10)"));
    }

    #[test]
    fn test_hover_lists_resolved_files() {
        let (_temp_dir, root) = create_test_project_dir();
        touch(&root, "templates/element/widgets/card.php");
        let workspace = Workspace::open(&root, Settings::default());
        let view = root.join("templates/Pages/home.php");
        let text = "<h1>Home</h1>\n<?= $this->element('widgets/card') ?>\n";

        let hover = hover(&workspace, &view, text, Position::new(1, 5)).unwrap();

        let HoverContents::Markup(markup) = hover.contents else {
            panic!("expected markup");
        };
        assert!(markup.value.starts_with("Related files found:"));
        assert!(markup.value.contains("- Element: [templates/element/widgets/card.php]"));
        assert!(super::hover(&workspace, &view, text, Position::new(0, 1)).is_none());
    }

    #[test]
    fn test_hover_disabled() {
        let (_temp_dir, root) = create_test_project_dir();
        touch(&root, "templates/element/widgets/card.php");
        let settings = Settings {
            hover: false,
            ..Settings::default()
        };
        let workspace = Workspace::open(&root, settings);
        let view = root.join("templates/Pages/home.php");

        assert!(hover(&workspace, &view, "$this->element('widgets/card')", Position::new(0, 3)).is_none());
    }
}
