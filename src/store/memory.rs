use std::collections::BTreeMap;

use crate::{
    error::StoreError,
    paths,
    properties::{Capability, CapabilitySet, NodeId, PropertyValue},
    store::{ContentStore, NodeHandle},
};

pub const DEFAULT_PRIMARY_TYPE: &str = "nt:unstructured";
pub const ROOT_PRIMARY_TYPE: &str = "rep:root";

#[derive(Debug, Clone)]
struct NodeEntry {
    name: String,
    parent: Option<NodeHandle>,
    /// Insertion ordered
    children: Vec<(String, NodeHandle)>,
    primary_type: String,
    capabilities: CapabilitySet,
    properties: BTreeMap<String, PropertyValue>,
    stable_id: Option<NodeId>,
}

impl NodeEntry {
    fn new(name: &str, parent: Option<NodeHandle>, primary_type: &str) -> Self {
        NodeEntry {
            name: name.to_string(),
            parent,
            children: Vec::default(),
            primary_type: primary_type.to_string(),
            capabilities: CapabilitySet::default(),
            properties: BTreeMap::default(),
            stable_id: None,
        }
    }
}

/// An in-memory [ContentStore].
///
/// Nodes live in an append-only arena; removing a node clears its slot so the handle (and its
/// stable identifier) is never reused.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    nodes: Vec<Option<NodeEntry>>,
    by_id: BTreeMap<NodeId, NodeHandle>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            nodes: vec![Some(NodeEntry::new("", None, ROOT_PRIMARY_TYPE))],
            by_id: BTreeMap::default(),
        }
    }

    fn entry(&self, node: NodeHandle) -> Result<&NodeEntry, StoreError> {
        self.nodes
            .get(node.0)
            .and_then(|slot| slot.as_ref())
            .ok_or_else(|| StoreError::NotFound(format!("node handle {}", node.0)))
    }

    fn entry_mut(&mut self, node: NodeHandle) -> Result<&mut NodeEntry, StoreError> {
        self.nodes
            .get_mut(node.0)
            .and_then(|slot| slot.as_mut())
            .ok_or_else(|| StoreError::NotFound(format!("node handle {}", node.0)))
    }

    /// Look a node up by its stable identifier.
    pub fn node_by_id(&self, id: &NodeId) -> Option<NodeHandle> {
        self.by_id.get(id).copied()
    }

    /// Child names in insertion order.
    pub fn child_names(&self, node: NodeHandle) -> Result<Vec<String>, StoreError> {
        Ok(self
            .entry(node)?
            .children
            .iter()
            .map(|(name, _)| name.clone())
            .collect())
    }

    pub fn property_names(&self, node: NodeHandle) -> Result<Vec<String>, StoreError> {
        Ok(self.entry(node)?.properties.keys().cloned().collect())
    }

    pub fn capabilities(&self, node: NodeHandle) -> Result<CapabilitySet, StoreError> {
        Ok(self.entry(node)?.capabilities.clone())
    }

    /// Number of live nodes, the root included.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 1
    }

    fn collect_subtree(&self, node: NodeHandle, accum: &mut Vec<NodeHandle>) {
        accum.push(node);
        if let Ok(entry) = self.entry(node) {
            for (_, child) in entry.children.iter() {
                self.collect_subtree(*child, accum);
            }
        }
    }
}

impl ContentStore for MemoryStore {
    fn root(&self) -> NodeHandle {
        NodeHandle(0)
    }

    fn node_at(&self, path: &str) -> Option<NodeHandle> {
        if !path.starts_with(paths::SEPARATOR) {
            return None;
        }
        let mut current = self.root();
        for segment in path.split(paths::SEPARATOR).filter(|s| !s.is_empty()) {
            current = self.child(current, segment).ok()??;
        }
        Some(current)
    }

    fn path(&self, node: NodeHandle) -> Result<String, StoreError> {
        let mut segments = Vec::new();
        let mut current = self.entry(node)?;
        while let Some(parent) = current.parent {
            segments.push(current.name.as_str());
            current = self.entry(parent)?;
        }
        segments.reverse();
        Ok(format!("{}{}", paths::ROOT, segments.join("/")))
    }

    fn parent(&self, node: NodeHandle) -> Result<Option<NodeHandle>, StoreError> {
        Ok(self.entry(node)?.parent)
    }

    fn child(&self, parent: NodeHandle, name: &str) -> Result<Option<NodeHandle>, StoreError> {
        Ok(self
            .entry(parent)?
            .children
            .iter()
            .find(|(child_name, _)| child_name == name)
            .map(|(_, handle)| *handle))
    }

    fn add_child(
        &mut self,
        parent: NodeHandle,
        name: &str,
        primary_type: Option<&str>,
    ) -> Result<NodeHandle, StoreError> {
        if name.is_empty() || name.contains(paths::SEPARATOR) {
            return Err(StoreError::Constraint(format!("invalid node name '{name}'")));
        }
        if self.has_child(parent, name)? {
            let parent_path = self.path(parent)?;
            return Err(StoreError::ItemExists(paths::join(&parent_path, name)));
        }
        let handle = NodeHandle(self.nodes.len());
        self.nodes.push(Some(NodeEntry::new(
            name,
            Some(parent),
            primary_type.unwrap_or(DEFAULT_PRIMARY_TYPE),
        )));
        self.entry_mut(parent)?
            .children
            .push((name.to_string(), handle));
        Ok(handle)
    }

    fn remove_node(&mut self, node: NodeHandle) -> Result<(), StoreError> {
        let Some(parent) = self.entry(node)?.parent else {
            return Err(StoreError::Constraint("cannot remove the root node".to_string()));
        };
        let mut subtree = Vec::new();
        self.collect_subtree(node, &mut subtree);
        self.entry_mut(parent)?
            .children
            .retain(|(_, child)| *child != node);
        for handle in subtree {
            if let Some(entry) = self.nodes[handle.0].take() {
                if let Some(id) = entry.stable_id {
                    self.by_id.remove(&id);
                }
            }
        }
        Ok(())
    }

    fn primary_type(&self, node: NodeHandle) -> Result<String, StoreError> {
        Ok(self.entry(node)?.primary_type.clone())
    }

    fn add_capability(
        &mut self,
        node: NodeHandle,
        capability: &Capability,
    ) -> Result<(), StoreError> {
        if let Capability::Other(tag) = capability {
            if tag.is_empty() {
                return Err(StoreError::NoSuchCapability("empty capability tag".to_string()));
            }
        }
        let entry = self.entry_mut(node)?;
        entry.capabilities.insert(capability);
        if entry.capabilities.is_referenceable() && entry.stable_id.is_none() {
            let id = NodeId::new();
            entry.stable_id = Some(id);
            self.by_id.insert(id, node);
        }
        Ok(())
    }

    fn has_capability(
        &self,
        node: NodeHandle,
        capability: &Capability,
    ) -> Result<bool, StoreError> {
        Ok(self.entry(node)?.capabilities.contains(capability))
    }

    fn property(
        &self,
        node: NodeHandle,
        name: &str,
    ) -> Result<Option<PropertyValue>, StoreError> {
        Ok(self.entry(node)?.properties.get(name).cloned())
    }

    fn set_property(
        &mut self,
        node: NodeHandle,
        name: &str,
        value: PropertyValue,
    ) -> Result<(), StoreError> {
        if let PropertyValue::Multi(ty, values) = &value {
            if let Some(bad) = values.iter().find(|v| v.property_type() != *ty) {
                return Err(StoreError::TypeMismatch(format!(
                    "property '{name}' declared {ty} but holds a {} value",
                    bad.property_type()
                )));
            }
        }
        self.entry_mut(node)?
            .properties
            .insert(name.to_string(), value);
        Ok(())
    }

    fn remove_property(&mut self, node: NodeHandle, name: &str) -> Result<bool, StoreError> {
        Ok(self.entry_mut(node)?.properties.remove(name).is_some())
    }

    fn stable_id(&self, node: NodeHandle) -> Result<Option<NodeId>, StoreError> {
        Ok(self.entry(node)?.stable_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::{CapabilityKind, PropertyType, Value, REFERENCEABLE_TAG};

    #[test]
    fn test_paths_and_lookup() {
        let mut store = MemoryStore::new();
        let root = store.root();
        assert_eq!(store.path(root).unwrap(), "/");
        let a = store.add_child(root, "a", None).unwrap();
        let b = store.add_child(a, "b", Some("nt:folder")).unwrap();
        assert_eq!(store.path(b).unwrap(), "/a/b");
        assert_eq!(store.node_at("/a/b"), Some(b));
        assert_eq!(store.node_at("/a/c"), None);
        assert_eq!(store.primary_type(a).unwrap(), DEFAULT_PRIMARY_TYPE);
        assert_eq!(store.primary_type(b).unwrap(), "nt:folder");
        assert!(matches!(
            store.add_child(root, "a", None),
            Err(StoreError::ItemExists(_))
        ));
    }

    #[test]
    fn test_stable_id_only_when_referenceable() {
        let mut store = MemoryStore::new();
        let root = store.root();
        let a = store.add_child(root, "a", None).unwrap();
        assert_eq!(store.stable_id(a).unwrap(), None);
        store
            .add_capability(a, &Capability::from(REFERENCEABLE_TAG))
            .unwrap();
        let id = store.stable_id(a).unwrap().unwrap();
        // Re-applying keeps the identifier
        store
            .add_capability(a, &CapabilityKind::Referenceable.into())
            .unwrap();
        assert_eq!(store.stable_id(a).unwrap(), Some(id));
        assert_eq!(store.resolve_identifier("/a").unwrap(), Some(id));
        assert_eq!(store.node_by_id(&id), Some(a));
    }

    #[test]
    fn test_remove_subtree_never_reuses_handles() {
        let mut store = MemoryStore::new();
        let root = store.root();
        let a = store.add_child(root, "a", None).unwrap();
        let b = store.add_child(a, "b", None).unwrap();
        store
            .add_capability(b, &CapabilityKind::Referenceable.into())
            .unwrap();
        let old_id = store.stable_id(b).unwrap().unwrap();
        store.remove_node(a).unwrap();
        assert!(store.path(b).is_err());
        assert_eq!(store.node_by_id(&old_id), None);

        let a2 = store.add_child(root, "a", None).unwrap();
        assert_ne!(a, a2);
        assert!(store.remove_node(root).is_err());
    }

    #[test]
    fn test_item_exists_covers_properties() {
        let mut store = MemoryStore::new();
        let root = store.root();
        let a = store.add_child(root, "a", None).unwrap();
        store
            .set_property(a, "title", Value::String("A".to_string()).into())
            .unwrap();
        assert!(store.item_exists("/a"));
        assert!(store.item_exists("/a/title"));
        assert!(!store.item_exists("/a/missing"));
    }

    #[test]
    fn test_multi_value_type_check() {
        let mut store = MemoryStore::new();
        let root = store.root();
        let res = store.set_property(
            root,
            "mixed",
            PropertyValue::Multi(
                PropertyType::Long,
                vec![Value::Long(1), Value::String("2".to_string())],
            ),
        );
        assert!(matches!(res, Err(StoreError::TypeMismatch(_))));
    }
}
