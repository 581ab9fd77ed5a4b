use std::path::Path;

use itertools::Itertools;
use tokio_util::sync::CancellationToken;

use super::walk::WalkedFile;
use super::{scan_roots, Index, IndexBuilder, PluginSource, ScanRoot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssetType {
    Script,
    Style,
}

impl AssetType {
    fn from_extension(extension: &str) -> Option<AssetType> {
        match extension {
            ".js" => Some(AssetType::Script),
            ".css" => Some(AssetType::Style),
            _ => None,
        }
    }

    fn folder(self) -> &'static str {
        match self {
            AssetType::Script => "js",
            AssetType::Style => "css",
        }
    }
}

#[derive(Debug, Default)]
struct AssetBuilders {
    scripts: IndexBuilder,
    styles: IndexBuilder,
}

/// Script and style indices from the app webroot and every plugin webroot.
pub(super) fn build(
    root_dir: &Path,
    plugins: &[PluginSource],
    cancel: &CancellationToken,
) -> Option<(Index, Index)> {
    let roots = std::iter::once(ScanRoot::app(root_dir.join("webroot")))
        .chain(
            plugins
                .iter()
                .map(|plugin| ScanRoot::plugin(plugin.root.join("webroot"), plugin.name.clone())),
        )
        .collect_vec();
    let scanned = scan_roots(&roots, cancel, scan)?;

    let mut scripts = IndexBuilder::default();
    let mut styles = IndexBuilder::default();
    for partial in scanned {
        scripts.merge_unique(partial.scripts);
        styles.merge_unique(partial.styles);
    }
    Some((scripts.finish(), styles.finish()))
}

fn scan(root: &ScanRoot, files: Vec<WalkedFile>) -> AssetBuilders {
    let mut builders = AssetBuilders::default();
    for file in files {
        let extension = file.extension();
        let Some(asset_type) = AssetType::from_extension(&extension) else {
            continue;
        };
        let builder = match asset_type {
            AssetType::Script => &mut builders.scripts,
            AssetType::Style => &mut builders.styles,
        };
        for key in asset_keys(&file.relative, &extension, asset_type) {
            builder.push_unique(root.key(&key), &file.path);
        }
    }
    builders
}

/// Every spelling a helper call may use for `relative` (webroot-relative):
/// with and without the extension, the type folder, and a leading slash.
fn asset_keys(relative: &str, extension: &str, asset_type: AssetType) -> Vec<String> {
    let folder = asset_type.folder();
    let trimmed = strip_folder(relative, folder);
    let rooted = format!("/{folder}/{trimmed}");

    [relative.to_string(), trimmed.to_string(), rooted]
        .into_iter()
        .flat_map(|key| {
            let stem = key[..key.len() - extension.len()].to_string();
            [key, stem]
        })
        .unique()
        .collect()
}

/// Drops a leading `css/` or `js/`, ignoring case.
fn strip_folder<'a>(relative: &'a str, folder: &str) -> &'a str {
    let prefix_len = folder.len() + 1;
    match relative.get(..prefix_len) {
        Some(prefix) if prefix.eq_ignore_ascii_case(&format!("{folder}/")) => &relative[prefix_len..],
        _ => relative,
    }
}
