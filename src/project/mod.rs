//! Project layout knowledge: which namespaces map to which packages, and
//! where each kind of resource may live.

mod conventions;
mod namespaces;

pub use conventions::{local_plugin_dirs, search_paths, SearchKind};
pub use namespaces::{plugin_name, NamespaceMap, AUTOLOAD_FILE};

use std::path::Path;

/// Plugin owning `file_path`: the directory after a `plugins` segment below
/// the root, or else the namespace whose package root is the longest prefix.
pub fn plugin_for_file(root_dir: &Path, namespaces: &NamespaceMap, file_path: &Path) -> Option<String> {
    let relative = file_path.strip_prefix(root_dir).unwrap_or(file_path);
    let mut components = relative.components().map(|c| c.as_os_str());
    while let Some(component) = components.next() {
        if component == "plugins" {
            if let Some(name) = components.next().and_then(|name| name.to_str()) {
                return Some(name.to_string());
            }
        }
    }

    namespaces.reverse_lookup(file_path).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_plugin_from_plugins_segment() {
        let root = Path::new("/project");
        let namespaces = NamespaceMap::default();

        assert_eq!(
            plugin_for_file(
                root,
                &namespaces,
                Path::new("/project/plugins/Blog/templates/Posts/view.php")
            ),
            Some("Blog".to_string())
        );
        assert_eq!(
            plugin_for_file(root, &namespaces, Path::new("/project/templates/Pages/home.php")),
            None
        );
    }

    #[test]
    fn test_plugin_from_namespace_map() {
        let root = Path::new("/project");
        let namespaces = NamespaceMap::parse(
            root,
            "return array(\n'Acme\\\\Shop\\\\' => array($vendorDir . '/acme/shop/src'),\n);",
        );

        assert_eq!(
            plugin_for_file(
                root,
                &namespaces,
                Path::new("/project/vendor/acme/shop/templates/element/cart.php")
            ),
            Some("Acme".to_string())
        );
    }
}
