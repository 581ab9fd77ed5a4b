//! Shared test utilities for cakeview.
//!
//! This module provides filesystem fixtures used across test modules.
//! It is only compiled when running tests.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Creates a temporary project root for testing.
///
/// Returns a tuple of (TempDir, PathBuf) where:
/// - TempDir: The temp directory handle (must be kept alive for the test duration)
/// - PathBuf: The path to the project subdirectory
///
/// Temp directories can live under hidden paths such as `/tmp/.tmpXXXXX`;
/// the non-hidden `project` subdirectory keeps fixture paths free of a
/// leading dot segment.
pub fn create_test_project_dir() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let project_dir = temp_dir.path().join("project");
    fs::create_dir(&project_dir).expect("Failed to create project subdirectory");
    (temp_dir, project_dir)
}

/// Creates an empty file at `relative` below `root`, with its parents.
pub fn touch(root: &Path, relative: &str) -> PathBuf {
    write_file(root, relative, "")
}

pub fn write_file(root: &Path, relative: &str, content: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create fixture directories");
    }
    fs::write(&path, content).expect("Failed to write fixture file");
    path
}

/// Writes `vendor/composer/autoload_psr4.php` declaring `namespace =>
/// directory expression` pairs, e.g. `("Blog", "$baseDir . '/plugins/Blog/src'")`.
pub fn write_autoload(root: &Path, entries: &[(&str, &str)]) -> PathBuf {
    let body: String = entries
        .iter()
        .map(|(namespace, directory)| {
            format!(
                "    '{}\\\\' => array({directory}),\n",
                namespace.replace('\\', "\\\\")
            )
        })
        .collect();
    let content = format!(
        "<?php\n\n// autoload_psr4.php @generated by Composer\n\n$vendorDir = dirname(__DIR__);\n$baseDir = dirname($vendorDir);\n\nreturn array(\n{body});\n"
    );
    write_file(root, "vendor/composer/autoload_psr4.php", &content)
}
