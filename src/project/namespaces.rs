//! Namespace to package-root mapping read from Composer's generated
//! `vendor/composer/autoload_psr4.php`.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

/// Location of the declaration file relative to the project root.
pub const AUTOLOAD_FILE: [&str; 3] = ["vendor", "composer", "autoload_psr4.php"];

/// Namespace (`Vendor\Plugin`, no trailing separator) to package root.
///
/// Entries keep first-seen order; a namespace declared twice keeps its
/// original position and takes the later directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceMap {
    entries: IndexMap<String, PathBuf>,
}

impl NamespaceMap {
    /// Reads and parses the declaration file under `root_dir`. A missing or
    /// unreadable file yields an empty map.
    pub fn load(root_dir: &Path) -> NamespaceMap {
        let autoload_path = AUTOLOAD_FILE
            .iter()
            .fold(root_dir.to_path_buf(), |path, segment| path.join(segment));

        if !autoload_path.exists() {
            debug!("autoload_psr4.php not found at {}", autoload_path.display());
            return NamespaceMap::default();
        }

        match std::fs::read_to_string(&autoload_path) {
            Ok(content) => NamespaceMap::parse(root_dir, &content),
            Err(err) => {
                warn!("Failed to read {}: {err}", autoload_path.display());
                NamespaceMap::default()
            }
        }
    }

    /// Parses the `return array(...)` literal of an autoload file.
    pub fn parse(root_dir: &Path, content: &str) -> NamespaceMap {
        static RETURN_RE: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"return\s+array\s*\(([\s\S]*?)\);").expect("return array regex")
        });
        static BASE_DIR_RE: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"\$baseDir\s*\.\s*'([^']*)'").expect("baseDir regex"));
        static VENDOR_DIR_RE: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"\$vendorDir\s*\.\s*'([^']*)'").expect("vendorDir regex"));

        let Some(body) = RETURN_RE.captures(content).and_then(|c| c.get(1)) else {
            debug!("autoload file has no return array");
            return NamespaceMap::default();
        };

        let mut entries = IndexMap::new();
        for entry in body.as_str().split(",\n") {
            let mut parts = entry.split("=>").map(str::trim);
            let (Some(namespace), Some(paths)) = (parts.next(), parts.next()) else {
                continue;
            };
            if namespace.is_empty() || paths.is_empty() {
                continue;
            }

            let namespace = clean_namespace(namespace);

            let (base, relative) = if let Some(captures) = BASE_DIR_RE.captures(paths) {
                (root_dir.to_path_buf(), captures[1].to_string())
            } else if let Some(captures) = VENDOR_DIR_RE.captures(paths) {
                (root_dir.join("vendor"), captures[1].to_string())
            } else {
                continue;
            };

            let relative = relative.trim_start_matches('/').trim_end_matches('/');
            if relative.ends_with("tests") {
                continue;
            }
            let relative = relative.strip_suffix("/src").unwrap_or(relative);

            let directory = relative
                .split('/')
                .filter(|segment| !segment.is_empty())
                .fold(base, |path, segment| path.join(segment));

            entries.insert(namespace, directory);
        }

        debug!("Parsed {} namespace entries", entries.len());
        NamespaceMap { entries }
    }

    /// Package root for a namespace; `/` separators are accepted.
    pub fn resolve(&self, namespace: &str) -> Option<&Path> {
        let normalized = namespace.replace('/', "\\");
        self.entries.get(&normalized).map(PathBuf::as_path)
    }

    /// First namespace segment of the entry whose directory is the longest
    /// prefix of `file_path`. Equal lengths keep the first-seen entry.
    pub fn reverse_lookup(&self, file_path: &Path) -> Option<&str> {
        let mut best: Option<(&str, usize)> = None;
        for (namespace, directory) in &self.entries {
            if !file_path.starts_with(directory) {
                continue;
            }
            let len = directory.as_os_str().len();
            match best {
                Some((_, best_len)) if best_len >= len => {}
                _ => best = Some((namespace.as_str(), len)),
            }
        }

        best.and_then(|(namespace, _)| namespace.split('\\').next())
    }

    /// `(plugin name, package root)` pairs in declaration order, where the
    /// plugin name is the first two namespace segments joined with `/`.
    pub fn plugins(&self) -> impl Iterator<Item = (String, &Path)> {
        self.entries
            .iter()
            .map(|(namespace, directory)| (plugin_name(namespace), directory.as_path()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries
            .iter()
            .map(|(namespace, directory)| (namespace.as_str(), directory.as_path()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn clean_namespace(raw: &str) -> String {
    let unquoted = raw
        .strip_prefix(['\'', '"'])
        .unwrap_or(raw);
    let unquoted = unquoted.strip_suffix(['\'', '"']).unwrap_or(unquoted);
    let unescaped = unquoted.replace("\\\\", "\\");
    unescaped
        .strip_suffix('\\')
        .map(str::to_string)
        .unwrap_or(unescaped)
}

pub fn plugin_name(namespace: &str) -> String {
    namespace.split('\\').take(2).collect::<Vec<_>>().join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUTOLOAD: &str = r#"<?php

// autoload_psr4.php @generated by Composer

$vendorDir = dirname(__DIR__);
$baseDir = dirname($vendorDir);

return array(
    'Cake\\TwigView\\' => array($vendorDir . '/cakephp/twig-view/src'),
    'Blog\\Test\\' => array($baseDir . '/plugins/Blog/tests'),
    'Blog\\' => array($baseDir . '/plugins/Blog/src'),
    'App\\' => array($baseDir . '/src'),
);
"#;

    #[test]
    fn test_parse_base_and_vendor_entries() {
        let root = Path::new("/project");
        let map = NamespaceMap::parse(root, AUTOLOAD);

        assert_eq!(map.len(), 3);
        assert_eq!(
            map.resolve("Cake/TwigView"),
            Some(Path::new("/project/vendor/cakephp/twig-view"))
        );
        assert_eq!(map.resolve("Blog"), Some(Path::new("/project/plugins/Blog")));
        assert_eq!(map.resolve("App"), Some(Path::new("/project/src")));
        assert_eq!(map.resolve("Blog\\Test"), None);
    }

    #[test]
    fn test_parse_without_return_array_is_empty() {
        let map = NamespaceMap::parse(Path::new("/project"), "<?php echo 'nope';");
        assert!(map.is_empty());
    }

    #[test]
    fn test_duplicate_namespace_last_writer_wins() {
        let content = "return array(\n'Blog\\\\' => array($baseDir . '/old/src'),\n'Other\\\\' => array($baseDir . '/other'),\n'Blog\\\\' => array($baseDir . '/new/src'),\n);";
        let map = NamespaceMap::parse(Path::new("/p"), content);

        assert_eq!(map.len(), 2);
        assert_eq!(map.resolve("Blog"), Some(Path::new("/p/new")));
        assert_eq!(map.iter().next().map(|(ns, _)| ns), Some("Blog"));
    }

    #[test]
    fn test_reverse_lookup_prefers_longest_directory() {
        let map = NamespaceMap::parse(Path::new("/project"), AUTOLOAD);

        assert_eq!(
            map.reverse_lookup(Path::new("/project/plugins/Blog/templates/Posts/index.php")),
            Some("Blog")
        );
        assert_eq!(
            map.reverse_lookup(Path::new("/project/src/Controller/PagesController.php")),
            Some("App")
        );
        assert_eq!(
            map.reverse_lookup(Path::new("/project/templates/Pages/home.php")),
            None
        );
        assert_eq!(
            map.reverse_lookup(Path::new("/project/vendor/cakephp/twig-view/src/View.php")),
            Some("Cake")
        );
        assert_eq!(map.reverse_lookup(Path::new("/elsewhere/file.php")), None);
    }

    #[test]
    fn test_plugins_use_two_namespace_segments() {
        let map = NamespaceMap::parse(Path::new("/project"), AUTOLOAD);
        let names: Vec<String> = map.plugins().map(|(name, _)| name).collect();

        assert_eq!(names, vec!["Cake/TwigView", "Blog", "App"]);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let map = NamespaceMap::load(Path::new("/definitely/not/a/project"));
        assert!(map.is_empty());
    }
}
