//! Shared test utilities for loader tests

use crate::{
    properties::{Capability, REFERENCEABLE_TAG},
    store::{ContentStore, MemoryStore, NodeHandle},
};

/// Initialize logging for tests
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// Create every missing node along `path` and return the last one.
pub fn ensure_path(store: &mut MemoryStore, path: &str) -> NodeHandle {
    let mut node = store.root();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        node = match store.child(node, segment).unwrap() {
            Some(child) => child,
            None => store.add_child(node, segment, None).unwrap(),
        };
    }
    node
}

/// Like [ensure_path], and makes the last node referenceable.
pub fn referenceable_at(store: &mut MemoryStore, path: &str) -> NodeHandle {
    let node = ensure_path(store, path);
    store
        .add_capability(node, &Capability::from(REFERENCEABLE_TAG))
        .unwrap();
    node
}
