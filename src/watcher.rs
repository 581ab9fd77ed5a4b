//! Filesystem invalidation: any structural change under the convention
//! trees, or a change to the Composer manifests, triggers a full rebuild.
//!
//! Each qualifying event runs one rebuild synchronously on the watcher's
//! event thread. Events are not debounced or coalesced.

use std::path::{Component, Path};
use std::sync::Arc;

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{CakeError, CakeResult};
use crate::project::AUTOLOAD_FILE;
use crate::workspace::Workspace;

/// Directory segments whose subtrees feed the indices.
const WATCHED_TREES: [&str; 3] = ["templates", "webroot", "plugins"];

/// Root-level files whose changes alter the namespace map.
const MANIFESTS: [&str; 2] = ["composer.json", "composer.lock"];

/// Keeps the watch alive; dropping it stops invalidation.
pub struct InvalidationController {
    _watcher: RecommendedWatcher,
}

impl InvalidationController {
    pub fn start(workspace: Arc<Workspace>) -> CakeResult<InvalidationController> {
        let root_dir = workspace.root_dir().to_path_buf();
        let handler_root = root_dir.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) if should_rebuild(&handler_root, &event) => {
                info!("Rebuilding after {:?} on {:?}", event.kind, event.paths);
                workspace.rebuild(&CancellationToken::new());
            }
            Ok(_) => {}
            Err(err) => warn!("Watch error: {err}"),
        })
        .map_err(|err| CakeError::Watch {
            path: root_dir.clone(),
            reason: err.to_string(),
        })?;

        watcher
            .watch(&root_dir, RecursiveMode::Recursive)
            .map_err(|err| CakeError::Watch {
                path: root_dir.clone(),
                reason: err.to_string(),
            })?;

        info!("Watching {} for changes", root_dir.display());
        Ok(InvalidationController { _watcher: watcher })
    }
}

/// Creates, removes and renames under a watched tree, and creates or
/// modifications of a manifest or the autoload declarations.
pub fn should_rebuild(root_dir: &Path, event: &Event) -> bool {
    let structural = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_))
    );
    let content = matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_));

    event.paths.iter().any(|path| {
        (structural && in_watched_tree(root_dir, path)) || (content && is_declaration_file(root_dir, path))
    })
}

fn in_watched_tree(root_dir: &Path, path: &Path) -> bool {
    path.strip_prefix(root_dir).is_ok_and(|relative| {
        relative.components().any(|component| match component {
            Component::Normal(name) => WATCHED_TREES.iter().any(|tree| name == *tree),
            _ => false,
        })
    })
}

fn is_declaration_file(root_dir: &Path, path: &Path) -> bool {
    let autoload = AUTOLOAD_FILE
        .iter()
        .fold(root_dir.to_path_buf(), |path, segment| path.join(segment));
    path == autoload || MANIFESTS.iter().any(|manifest| path == root_dir.join(manifest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RemoveKind, RenameMode};
    use std::path::PathBuf;

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn test_structural_changes_under_trees() {
        let root = Path::new("/project");

        assert!(should_rebuild(
            root,
            &event(EventKind::Create(CreateKind::File), "/project/templates/element/new.php")
        ));
        assert!(should_rebuild(
            root,
            &event(EventKind::Remove(RemoveKind::Folder), "/project/plugins/Blog")
        ));
        assert!(should_rebuild(
            root,
            &event(
                EventKind::Modify(ModifyKind::Name(RenameMode::Any)),
                "/project/webroot/js/app.js"
            )
        ));
    }

    #[test]
    fn test_edits_inside_trees_are_ignored() {
        let root = Path::new("/project");

        assert!(!should_rebuild(
            root,
            &event(
                EventKind::Modify(ModifyKind::Data(DataChange::Content)),
                "/project/templates/element/card.php"
            )
        ));
        assert!(!should_rebuild(
            root,
            &event(EventKind::Create(CreateKind::File), "/project/src/Controller/X.php")
        ));
        assert!(!should_rebuild(
            root,
            &event(EventKind::Create(CreateKind::File), "/elsewhere/templates/x.php")
        ));
    }

    #[test]
    fn test_manifest_changes() {
        let root = Path::new("/project");

        assert!(should_rebuild(
            root,
            &event(
                EventKind::Modify(ModifyKind::Data(DataChange::Any)),
                "/project/composer.json"
            )
        ));
        assert!(should_rebuild(
            root,
            &event(EventKind::Create(CreateKind::File), "/project/composer.lock")
        ));
        assert!(should_rebuild(
            root,
            &event(
                EventKind::Modify(ModifyKind::Any),
                "/project/vendor/composer/autoload_psr4.php"
            )
        ));
        assert!(!should_rebuild(
            root,
            &event(EventKind::Remove(RemoveKind::File), "/project/composer.json")
        ));
        assert!(!should_rebuild(
            root,
            &event(
                EventKind::Modify(ModifyKind::Any),
                "/project/vendor/acme/composer.json"
            )
        ));
    }
}
