//! cakeview: convention-aware navigation for CakePHP projects
//!
//! This crate backs the `cakeview` language server. Given a file in a
//! CakePHP application and a string reference inside it (an element name,
//! a cell, an asset, a `render()` target or a controller action), it
//! finds the files that reference points to.
//!
//! # Overview
//!
//! - **Project model**: Composer PSR-4 namespaces mapped to plugin roots
//! - **Indices**: element, cell, script and style names built from the tree
//! - **Resolution**: raw reference text to a sorted, de-duplicated file list
//! - **Editor features**: hover, document links and name completion
//! - **Invalidation**: filesystem events rebuild the indices
//!
//! # Architecture
//!
//! - [`project`]: namespace map and the fixed directory conventions
//! - [`index`]: parallel tree walks producing [`index::Indices`]
//! - [`patterns`]: the regular expressions that find references in source
//! - [`resolver`]: per-kind resolution over a namespace map and indices
//! - [`workspace`]: the shared, swappable snapshot the server reads
//! - [`config`]: settings files and editor overrides
//!
//! # Usage
//!
//! ```ignore
//! use cakeview::config::Settings;
//! use cakeview::resolver::{DocumentContext, ReferenceKind};
//! use cakeview::workspace::Workspace;
//!
//! let workspace = Workspace::open(&root, Settings::default());
//! let snapshot = workspace.snapshot();
//! let resolver = snapshot.resolver(workspace.root_dir());
//! let files = resolver.resolve("widgets/card", ReferenceKind::Element, &DocumentContext::new(&view, &text));
//! ```

// Project model and indexing
pub mod index;
pub mod project;
pub mod reference;

// Resolution
pub mod patterns;
pub mod resolver;
pub mod workspace;

// LSP feature modules
pub mod completion;
pub mod hover;
pub mod links;
pub mod watcher;

// Configuration and errors
pub mod config;
pub mod error;

// Test utilities (only available in test builds)
#[cfg(test)]
pub mod test_utils;
