use std::path::Path;

use tokio_util::sync::CancellationToken;

use super::{scan_roots, template_scan_roots, Index, IndexBuilder, PluginSource, ScanRoot};
use super::walk::WalkedFile;

pub(super) fn build(
    root_dir: &Path,
    plugins: &[PluginSource],
    cancel: &CancellationToken,
) -> Option<Index> {
    let roots = template_scan_roots(root_dir, plugins, "element", cancel)?;
    let scanned = scan_roots(&roots, cancel, scan)?;

    let mut builder = IndexBuilder::default();
    for partial in scanned {
        builder.merge(partial);
    }
    Some(builder.finish())
}

/// `widgets/card.php` under the app becomes `widgets/card`; under plugin
/// Blog it becomes `Blog.widgets/card`.
fn scan(root: &ScanRoot, files: Vec<WalkedFile>) -> IndexBuilder {
    let mut builder = IndexBuilder::default();
    for file in files {
        if file.extension() != ".php" {
            continue;
        }
        let stem = &file.relative[..file.relative.len() - ".php".len()];
        builder.push(root.key(stem), &file.path);
    }
    builder
}
