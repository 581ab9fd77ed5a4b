use std::path::Path;

use tokio_util::sync::CancellationToken;

use super::walk::WalkedFile;
use super::{scan_roots, template_scan_roots, Index, IndexBuilder, PluginSource, ScanRoot};
use crate::reference::variable_camelize;

pub(super) fn build(
    root_dir: &Path,
    plugins: &[PluginSource],
    cancel: &CancellationToken,
) -> Option<Index> {
    let roots = template_scan_roots(root_dir, plugins, "cell", cancel)?;
    let scanned = scan_roots(&roots, cancel, scan)?;

    let mut builder = IndexBuilder::default();
    for partial in scanned {
        builder.merge(partial);
    }
    Some(builder.finish())
}

/// Registers `Cell::view` from the last two path segments, plus the
/// camel-cased view name when it is written with underscores.
fn scan(root: &ScanRoot, files: Vec<WalkedFile>) -> IndexBuilder {
    let mut builder = IndexBuilder::default();
    for file in files {
        if file.extension() != ".php" {
            continue;
        }
        let stem = &file.relative[..file.relative.len() - ".php".len()];
        let segments: Vec<&str> = stem.split('/').collect();
        let [.., cell, view] = segments.as_slice() else {
            continue;
        };

        builder.push(root.key(&format!("{cell}::{view}")), &file.path);
        if view.contains('_') {
            let camel = variable_camelize(view);
            builder.push(root.key(&format!("{cell}::{camel}")), &file.path);
        }
    }
    builder
}
