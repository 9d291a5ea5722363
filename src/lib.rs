//! # content-loader
//!
//! A streaming importer that materializes hierarchical content into a tree-structured content
//! store, resolving cross references between imported nodes as they appear.
//!
//! ## Overview
//!
//! Import sources (JSON files, XML descriptors, hand-built event lists) describe a tree of typed,
//! named nodes with typed properties as a stream of start/property/end events. The loader writes
//! that tree into a [`store::ContentStore`] in a single pass:
//!
//! - nodes are created below an anchor node, or merged into nodes that already exist
//! - properties that existed before the import are left alone
//! - reference properties are written as soon as their target can be identified; references to
//!   nodes that are not imported yet wait until the target node is finished
//! - versionable nodes and every node the import created are reported back, so the caller can
//!   check them in or remove them again on uninstall
//!
//! ### Key Features
//!
//! - **Deferred references**: Forward references resolve when their target appears, multi-valued
//!   references fill in slot by slot and keep their order
//! - **Non-destructive by default**: Re-running an import with `overwrite = false` changes
//!   nothing that is already present
//! - **Pluggable formats**: [`loader::ImportProvider`]s keyed by file extension, with a builtin
//!   JSON provider
//! - **Binary resources**: File payloads stored as a file container plus content node, with
//!   media type inference
//!
//! ## Architecture
//!
//! - **[`loader`]**: The node stack (`TreeBuilder`), reference ledger, providers and sessions
//! - **[`store`]**: The `ContentStore` contract and the in-memory `MemoryStore`
//! - **[`event`]**: Structural events an import source emits
//! - **[`properties`]**: Identifiers, capabilities, property types and values
//! - **[`paths`]**: Slash separated store path arithmetic
//! - **[`config`]**: Per-import options from TOML or manifest headers
//!
//! ## Quick Start
//!
//! ```rust
//! use content_loader::{config::ImportOptions, loader::ImportSession, store::MemoryStore};
//!
//! let mut store = MemoryStore::new();
//! let mut session = ImportSession::with_defaults(&mut store, ImportOptions::new("site"));
//! session
//!     .import_source(
//!         "/",
//!         "site.json",
//!         br#"{
//!             "title": "Site",
//!             "jcr:reference:home": "pages/home",
//!             "pages": { "home": { "jcr:mixinTypes": ["mix:referenceable"] } }
//!         }"#,
//!     )
//!     .unwrap();
//! let report = session.finish().unwrap();
//! assert_eq!(report.root_path.as_deref(), Some("/site"));
//! assert!(report.unresolved.is_empty());
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod loader;
pub mod paths;
pub mod properties;
pub mod store;
#[cfg(test)]
mod tests;

pub use error::*;
