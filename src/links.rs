//! Clickable document links over resolved references.

use std::path::Path;

use tower_lsp::lsp_types::{DocumentLink, Position, Range, Url};
use tracing::debug;

use crate::patterns::find_references;
use crate::resolver::DocumentContext;
use crate::workspace::Workspace;

/// One link per reference that resolves, spanning the captured text and
/// targeting the first result. Only the first `max_lines_count` lines are
/// scanned. `None` when quick jump is disabled.
pub fn document_links(workspace: &Workspace, path: &Path, text: &str) -> Option<Vec<DocumentLink>> {
    let settings = workspace.settings();
    if !settings.quick_jump {
        return None;
    }

    let snapshot = workspace.snapshot();
    let resolver = snapshot.resolver(workspace.root_dir());
    let ctx = DocumentContext::new(path, text);

    let links: Vec<DocumentLink> = find_references(path, text, settings.max_lines_count)
        .into_iter()
        .filter_map(|reference| {
            let kind = reference.pattern.reference_kind(path);
            let target = resolver.resolve(&reference.text, kind, &ctx).into_iter().next()?;
            Some(DocumentLink {
                range: Range::new(
                    Position::new(reference.line, reference.start),
                    Position::new(reference.line, reference.end),
                ),
                target: Url::from_file_path(&target.path).ok(),
                tooltip: Some(target.display_path),
                data: None,
            })
        })
        .collect();

    debug!("{} document links in {}", links.len(), path.display());
    Some(links)
}
