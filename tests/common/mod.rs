//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use content_loader::{
    config::ImportOptions,
    event::ContentEvent,
    loader::{ImportReport, ImportSession},
    properties::{PropertyValue, Value},
    store::{ContentStore, MemoryStore},
};
use std::path::PathBuf;

/// Read a fixture from `tests/content/`.
#[allow(dead_code)]
pub fn fixture(name: &str) -> Vec<u8> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/content")
        .join(name);
    std::fs::read(&path).unwrap_or_else(|e| panic!("Cannot read fixture {path:?}: {e}"))
}

/// Run `events` in a fresh session anchored at `anchor`.
#[allow(dead_code)]
pub fn import_events(
    store: &mut MemoryStore,
    options: ImportOptions,
    anchor: &str,
    default_root_name: Option<&str>,
    events: Vec<ContentEvent>,
) -> ImportReport {
    let mut session = ImportSession::with_defaults(store, options);
    session.begin(anchor, default_root_name).unwrap();
    session.apply_all(events).unwrap();
    session.finish().unwrap()
}

/// The property at absolute `path`, if both node and property exist.
#[allow(dead_code)]
pub fn property_at(store: &MemoryStore, path: &str) -> Option<PropertyValue> {
    let (parent, name) = path.rsplit_once('/')?;
    let parent = if parent.is_empty() { "/" } else { parent };
    let node = store.node_at(parent)?;
    store.property(node, name).unwrap()
}

/// The single value at absolute `path`.
#[allow(dead_code)]
pub fn value_at(store: &MemoryStore, path: &str) -> Option<Value> {
    property_at(store, path).and_then(|p| p.single().cloned())
}

/// The stable identifier of the node at absolute `path`.
#[allow(dead_code)]
pub fn id_at(store: &MemoryStore, path: &str) -> content_loader::properties::NodeId {
    let node = store
        .node_at(path)
        .unwrap_or_else(|| panic!("No node at {path}"));
    store
        .stable_id(node)
        .unwrap()
        .unwrap_or_else(|| panic!("{path} has no identifier"))
}
