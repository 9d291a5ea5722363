//! The store contract the loader writes through.
//!
//! The loader never owns nodes. It keeps [NodeHandle]s (arena indices handed out by the store)
//! and asks the store for everything else. Handles of removed nodes are never handed out again,
//! so a stale handle yields [StoreError::NotFound] rather than aliasing a newer node.

use crate::{
    error::StoreError,
    paths,
    properties::{Capability, CapabilityKind, NodeId, PropertyValue},
};

pub mod memory;

pub use memory::MemoryStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(pub(crate) usize);

impl NodeHandle {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A tree-structured repository of typed nodes and properties.
pub trait ContentStore {
    fn root(&self) -> NodeHandle;

    /// Look a node up by absolute path.
    fn node_at(&self, path: &str) -> Option<NodeHandle>;

    fn path(&self, node: NodeHandle) -> Result<String, StoreError>;

    fn parent(&self, node: NodeHandle) -> Result<Option<NodeHandle>, StoreError>;

    fn child(&self, parent: NodeHandle, name: &str) -> Result<Option<NodeHandle>, StoreError>;

    fn has_child(&self, parent: NodeHandle, name: &str) -> Result<bool, StoreError> {
        Ok(self.child(parent, name)?.is_some())
    }

    /// Add a child node. Without a primary type the store picks its default type.
    fn add_child(
        &mut self,
        parent: NodeHandle,
        name: &str,
        primary_type: Option<&str>,
    ) -> Result<NodeHandle, StoreError>;

    /// Remove a node together with its whole subtree.
    fn remove_node(&mut self, node: NodeHandle) -> Result<(), StoreError>;

    fn primary_type(&self, node: NodeHandle) -> Result<String, StoreError>;

    fn add_capability(
        &mut self,
        node: NodeHandle,
        capability: &Capability,
    ) -> Result<(), StoreError>;

    fn has_capability(
        &self,
        node: NodeHandle,
        capability: &Capability,
    ) -> Result<bool, StoreError>;

    fn property(
        &self,
        node: NodeHandle,
        name: &str,
    ) -> Result<Option<PropertyValue>, StoreError>;

    fn has_property(&self, node: NodeHandle, name: &str) -> Result<bool, StoreError> {
        Ok(self.property(node, name)?.is_some())
    }

    fn set_property(
        &mut self,
        node: NodeHandle,
        name: &str,
        value: PropertyValue,
    ) -> Result<(), StoreError>;

    /// Returns whether a property was removed.
    fn remove_property(&mut self, node: NodeHandle, name: &str) -> Result<bool, StoreError>;

    /// The stable identifier of a node, defined only for referenceable nodes.
    fn stable_id(&self, node: NodeHandle) -> Result<Option<NodeId>, StoreError>;

    /// Whether a node or a property lives at the absolute `path`.
    fn item_exists(&self, path: &str) -> bool {
        if self.node_at(path).is_some() {
            return true;
        }
        match (paths::parent_of(path), paths::name_of(path)) {
            (Some(parent), name) => self
                .node_at(&parent)
                .and_then(|node| self.has_property(node, name).ok())
                .unwrap_or(false),
            (None, _) => false,
        }
    }

    /// The stable identifier of the node at `path`, if it exists and is referenceable.
    fn resolve_identifier(&self, path: &str) -> Result<Option<NodeId>, StoreError> {
        match self.node_at(path) {
            Some(node) => self.stable_id(node),
            None => Ok(None),
        }
    }

    fn is_referenceable(&self, node: NodeHandle) -> Result<bool, StoreError> {
        self.has_capability(node, &CapabilityKind::Referenceable.into())
    }
}
