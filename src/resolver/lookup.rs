//! How candidate keys are matched against an index.
//!
//! The policy differs per resource kind and callers depend on each
//! behaviour, so it is spelled out here rather than left to loop shape.

use std::path::PathBuf;

use tracing::debug;

use crate::index::Index;

/// Decides whether an index key answers a candidate key.
pub type KeyMatcher = fn(index_key: &str, candidate: &str) -> bool;

#[derive(Debug, Clone, Copy)]
pub enum LookupPolicy {
    /// Candidates are tried in order; the first with an exact entry wins.
    FirstMatch,
    /// Every candidate with an exact entry contributes, in candidate order.
    Aggregate,
    /// Candidates are tried in order; for each one the index is scanned in
    /// registration order and the first key accepted by the matcher
    /// supplies the paths.
    ScanFirstMatch(KeyMatcher),
}

impl LookupPolicy {
    /// Element lookup: index keys ending with the candidate.
    pub const SUFFIX: LookupPolicy = LookupPolicy::ScanFirstMatch(suffix_match);

    pub fn lookup(self, index: &Index, candidates: &[String]) -> Vec<PathBuf> {
        match self {
            LookupPolicy::FirstMatch => candidates
                .iter()
                .map(|candidate| index.get(candidate))
                .find(|paths| !paths.is_empty())
                .map(<[PathBuf]>::to_vec)
                .unwrap_or_default(),
            LookupPolicy::Aggregate => candidates
                .iter()
                .flat_map(|candidate| index.get(candidate).iter().cloned())
                .collect(),
            LookupPolicy::ScanFirstMatch(matcher) => {
                for candidate in candidates {
                    let hit = index
                        .iter()
                        .find(|(key, paths)| matcher(key, candidate) && !paths.is_empty());
                    if let Some((key, paths)) = hit {
                        debug!("Candidate '{candidate}' matched index key '{key}'");
                        return paths.to_vec();
                    }
                }
                Vec::new()
            }
        }
    }
}

/// `bar` also answers `xbar`: any trailing substring matches, not only
/// whole path segments.
pub fn suffix_match(index_key: &str, candidate: &str) -> bool {
    index_key.ends_with(candidate)
}

/// Suffix match restricted to segment boundaries (`/` or the plugin `.`).
pub fn segment_suffix_match(index_key: &str, candidate: &str) -> bool {
    match index_key.strip_suffix(candidate) {
        Some("") => true,
        Some(head) => head.ends_with(['/', '.']),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexBuilder;
    use std::path::Path;

    fn index(entries: &[(&str, &str)]) -> Index {
        let mut builder = IndexBuilder::default();
        for (key, path) in entries {
            builder.push(key.to_string(), Path::new(path));
        }
        builder.finish()
    }

    fn keys(candidates: &[&str]) -> Vec<String> {
        candidates.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_first_match_stops_at_first_hit() {
        let index = index(&[("app", "/webroot/js/app.js"), ("Blog.app", "/Blog/webroot/js/app.js")]);

        let paths = LookupPolicy::FirstMatch.lookup(&index, &keys(&["Blog.app", "app"]));

        assert_eq!(paths, vec![PathBuf::from("/Blog/webroot/js/app.js")]);
    }

    #[test]
    fn test_aggregate_concatenates_every_hit() {
        let index = index(&[
            ("Recent::display", "/templates/cell/Recent/display.php"),
            ("Blog.Recent::display", "/Blog/templates/cell/Recent/display.php"),
        ]);

        let paths = LookupPolicy::Aggregate.lookup(
            &index,
            &keys(&["Blog.Recent::display", "Missing::display", "Recent::display"]),
        );

        assert_eq!(
            paths,
            vec![
                PathBuf::from("/Blog/templates/cell/Recent/display.php"),
                PathBuf::from("/templates/cell/Recent/display.php"),
            ]
        );
    }

    #[test]
    fn test_suffix_scan_takes_first_registered_key() {
        let index = index(&[
            ("xbar", "/templates/element/xbar.php"),
            ("nav/bar", "/templates/element/nav/bar.php"),
        ]);

        let paths = LookupPolicy::SUFFIX.lookup(&index, &keys(&["bar"]));

        assert_eq!(paths, vec![PathBuf::from("/templates/element/xbar.php")]);
    }

    #[test]
    fn test_suffix_scan_tries_candidates_in_order() {
        let index = index(&[
            ("sidebar", "/templates/element/sidebar.php"),
            ("Blog.sidebar", "/Blog/templates/element/sidebar.php"),
        ]);

        let paths = LookupPolicy::SUFFIX.lookup(&index, &keys(&["Blog.sidebar", "sidebar"]));

        assert_eq!(paths, vec![PathBuf::from("/Blog/templates/element/sidebar.php")]);
    }

    #[test]
    fn test_segment_matcher_rejects_partial_names() {
        assert!(segment_suffix_match("nav/bar", "bar"));
        assert!(segment_suffix_match("Blog.bar", "bar"));
        assert!(segment_suffix_match("bar", "bar"));
        assert!(!segment_suffix_match("xbar", "bar"));

        let index = index(&[("xbar", "/xbar.php"), ("nav/bar", "/nav/bar.php")]);
        let paths = LookupPolicy::ScanFirstMatch(segment_suffix_match).lookup(&index, &keys(&["bar"]));
        assert_eq!(paths, vec![PathBuf::from("/nav/bar.php")]);
    }
}
