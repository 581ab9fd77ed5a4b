//! The session-owned context: project root, settings and the current
//! snapshot of namespaces and indices.
//!
//! Snapshots are immutable. A rebuild constructs a complete new snapshot
//! without holding the lock and swaps it in with a single write, so readers
//! always see one fully built generation. Every rebuild takes a generation
//! ticket when it starts and only installs its result if nothing newer has
//! been installed in the meantime.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::Settings;
use crate::error::{CakeError, CakeResult};
use crate::index::Indices;
use crate::project::NamespaceMap;
use crate::resolver::Resolver;

#[derive(Debug, Default)]
pub struct Snapshot {
    pub generation: u64,
    pub namespaces: Arc<NamespaceMap>,
    pub indices: Arc<Indices>,
}

impl Snapshot {
    pub fn resolver<'a>(&'a self, root_dir: &'a Path) -> Resolver<'a> {
        Resolver::new(root_dir, &self.namespaces, &self.indices)
    }
}

#[derive(Debug)]
pub struct Workspace {
    root_dir: PathBuf,
    settings: Settings,
    snapshot: RwLock<Arc<Snapshot>>,
    next_generation: AtomicU64,
}

impl Workspace {
    /// A workspace with an empty snapshot; call [`Workspace::rebuild`] to
    /// populate it.
    pub fn new(root_dir: impl Into<PathBuf>, settings: Settings) -> Workspace {
        Workspace {
            root_dir: root_dir.into(),
            settings,
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Creates the workspace and runs the initial build.
    pub fn open(root_dir: impl Into<PathBuf>, settings: Settings) -> Workspace {
        let workspace = Workspace::new(root_dir, settings);
        workspace.rebuild(&CancellationToken::new());
        workspace
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The current generation. Holding the `Arc` keeps it alive across
    /// later rebuilds.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.read().clone()
    }

    /// Re-parses the namespace declarations and rebuilds every index.
    /// Returns whether the new snapshot was installed; a cancelled or
    /// superseded rebuild leaves the current one in place.
    pub fn rebuild(&self, cancel: &CancellationToken) -> bool {
        let ticket = self.take_ticket();
        let namespaces = NamespaceMap::load(&self.root_dir);

        let Some(indices) = Indices::build(&self.root_dir, &namespaces, cancel) else {
            info!("Rebuild {ticket} cancelled, keeping the current snapshot");
            return false;
        };

        self.install(Snapshot {
            generation: ticket,
            namespaces: Arc::new(namespaces),
            indices: Arc::new(indices),
        })
    }

    /// The namespace map. With `refresh` the declarations are parsed again
    /// and installed in a new snapshot that keeps the current indices.
    pub fn namespaces(&self, refresh: bool) -> Arc<NamespaceMap> {
        if !refresh {
            return self.snapshot().namespaces.clone();
        }

        let ticket = self.take_ticket();
        let namespaces = Arc::new(NamespaceMap::load(&self.root_dir));

        let mut current = self.snapshot.write();
        if current.generation < ticket {
            *current = Arc::new(Snapshot {
                generation: ticket,
                namespaces: namespaces.clone(),
                indices: current.indices.clone(),
            });
        }
        namespaces
    }

    /// Reads a file the caller asked about, such as a controller whose
    /// declarations drive template lookup.
    pub fn read_source(&self, path: &Path) -> CakeResult<String> {
        std::fs::read_to_string(path).map_err(|source| CakeError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn take_ticket(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn install(&self, snapshot: Snapshot) -> bool {
        let mut current = self.snapshot.write();
        if current.generation >= snapshot.generation {
            debug!(
                "Discarding generation {}, generation {} is newer",
                snapshot.generation, current.generation
            );
            return false;
        }

        info!(
            "Installed generation {} ({} namespaces, {} element keys, {} cell keys)",
            snapshot.generation,
            snapshot.namespaces.len(),
            snapshot.indices.elements.len(),
            snapshot.indices.cells.len()
        );
        *current = Arc::new(snapshot);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_project_dir, touch, write_autoload};

    #[test]
    fn test_rebuild_installs_new_generation() {
        let (_temp_dir, root) = create_test_project_dir();
        touch(&root, "templates/element/widgets/card.php");
        let workspace = Workspace::new(&root, Settings::default());
        assert!(workspace.snapshot().indices.elements.is_empty());

        assert!(workspace.rebuild(&CancellationToken::new()));

        let snapshot = workspace.snapshot();
        assert_eq!(snapshot.generation, 1);
        assert!(!snapshot.indices.elements.get("widgets/card").is_empty());
    }

    #[test]
    fn test_cancelled_rebuild_keeps_snapshot() {
        let (_temp_dir, root) = create_test_project_dir();
        touch(&root, "templates/element/widgets/card.php");
        let workspace = Workspace::open(&root, Settings::default());
        let before = workspace.snapshot();
        touch(&root, "templates/element/other.php");
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(!workspace.rebuild(&cancel));

        assert!(Arc::ptr_eq(&before, &workspace.snapshot()));
    }

    #[test]
    fn test_superseded_build_is_discarded() {
        let (_temp_dir, root) = create_test_project_dir();
        let workspace = Workspace::new(&root, Settings::default());
        let stale_ticket = workspace.take_ticket();
        assert!(workspace.rebuild(&CancellationToken::new()));

        let installed = workspace.install(Snapshot {
            generation: stale_ticket,
            ..Snapshot::default()
        });

        assert!(!installed);
        assert_eq!(workspace.snapshot().generation, 2);
    }

    #[test]
    fn test_namespace_refresh_keeps_indices() {
        let (_temp_dir, root) = create_test_project_dir();
        touch(&root, "templates/element/widgets/card.php");
        let workspace = Workspace::open(&root, Settings::default());
        let indices_before = workspace.snapshot().indices.clone();
        assert!(workspace.namespaces(false).is_empty());

        write_autoload(&root, &[("Blog", "$baseDir . '/plugins/Blog/src'")]);
        assert!(workspace.namespaces(false).is_empty());
        let refreshed = workspace.namespaces(true);

        assert_eq!(refreshed.resolve("Blog"), Some(root.join("plugins/Blog").as_path()));
        assert!(Arc::ptr_eq(&indices_before, &workspace.snapshot().indices));
        assert_eq!(workspace.namespaces(false).len(), 1);
    }

    #[test]
    fn test_read_source_reports_path() {
        let (_temp_dir, root) = create_test_project_dir();
        let workspace = Workspace::new(&root, Settings::default());

        let err = workspace.read_source(&root.join("missing.php")).unwrap_err();

        assert!(err.to_string().contains("missing.php"));
    }
}
