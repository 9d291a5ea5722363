use std::{collections::BTreeSet, fmt::Debug, sync::Arc};

use crate::{
    config::ImportOptions,
    error::{ImportError, LoaderError},
    loader::{
        ledger::{ReferenceLedger, Slot},
        mime::MimeLookup,
        ContentCreator, UnresolvedReference, CHECKED_OUT_PROPERTY,
    },
    paths,
    properties::{Capability, CapabilityKind, NodeId, PropertyType, PropertyValue, Value},
    store::{ContentStore, NodeHandle},
};

/// How the top-level node of an import relates to the anchor node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImportMode {
    /// The top-level node is created as a child of the anchor, named by the source or by the
    /// default root name.
    NamedChild,
    /// The anchor itself plays the top-level node. The top-level `create_node` call does nothing
    /// and its properties and children land directly on the anchor.
    RootReplace,
}

/// [TreeBuilder] writes nodes and properties into a [ContentStore] while an import source walks
/// its content tree.
///
/// The builder keeps a stack of open nodes whose bottom entry is the anchor the import was
/// prepared with. Every node or property call addresses the top of the stack. Closing a node
/// gives the [ReferenceLedger] a chance to write reference properties that were waiting for that
/// node.
pub struct TreeBuilder<'s, S: ContentStore + ?Sized> {
    store: &'s mut S,
    options: ImportOptions,
    pub(crate) mime: Arc<dyn MimeLookup>,
    stack: Vec<NodeHandle>,
    ledger: ReferenceLedger,
    versionables: Vec<String>,
    created_nodes: Vec<String>,
    /// Property paths written by this builder. Anything else that already exists is left alone.
    written: BTreeSet<String>,
    default_root_name: Option<String>,
    mode: ImportMode,
    /// Set while a suppressed top-level node is open in [ImportMode::RootReplace]
    anchor_open: bool,
    root: Option<NodeHandle>,
    ignore_overwrite: bool,
}

impl<S: ContentStore + ?Sized> Debug for TreeBuilder<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeBuilder")
            .field("options", &self.options)
            .field("stack", &self.stack)
            .field("ledger", &self.ledger)
            .field("mode", &self.mode)
            .field("root", &self.root)
            .finish()
    }
}

impl<'s, S: ContentStore + ?Sized> TreeBuilder<'s, S> {
    pub fn new(store: &'s mut S, options: ImportOptions, mime: Arc<dyn MimeLookup>) -> Self {
        let anchor = store.root();
        let ignore_overwrite = options.ignore_overwrite;
        TreeBuilder {
            store,
            options,
            mime,
            stack: vec![anchor],
            ledger: ReferenceLedger::new(),
            versionables: Vec::default(),
            created_nodes: Vec::default(),
            written: BTreeSet::default(),
            default_root_name: None,
            mode: ImportMode::RootReplace,
            anchor_open: false,
            root: None,
            ignore_overwrite,
        }
    }

    /// Reset the node stack onto `anchor`.
    ///
    /// Without a `default_root_name` the import runs in [ImportMode::RootReplace].
    pub fn prepare(&mut self, anchor: NodeHandle, default_root_name: Option<&str>) {
        self.stack.clear();
        self.stack.push(anchor);
        self.default_root_name = default_root_name.map(str::to_string);
        self.mode = match self.default_root_name {
            Some(_) => ImportMode::NamedChild,
            None => ImportMode::RootReplace,
        };
        self.anchor_open = false;
        self.root = None;
        tracing::debug!(
            "Prepared import on {:?} in {:?} mode (default root name: {:?})",
            anchor,
            self.mode,
            self.default_root_name
        );
    }

    pub fn store(&self) -> &S {
        self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        self.store
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    pub fn mode(&self) -> ImportMode {
        self.mode
    }

    /// The first node created or opened since the last [TreeBuilder::prepare].
    pub fn root_node(&self) -> Option<NodeHandle> {
        self.root
    }

    /// Paths of nodes to check in once the import completes.
    pub fn versionables(&self) -> &[String] {
        &self.versionables
    }

    /// Paths of nodes this import created. Only recorded when uninstall is enabled.
    pub fn created_nodes(&self) -> &[String] {
        &self.created_nodes
    }

    pub fn ledger(&self) -> &ReferenceLedger {
        &self.ledger
    }

    pub fn set_ignore_overwrite(&mut self, flag: bool) {
        self.ignore_overwrite = flag;
    }

    pub fn clear(&mut self) {
        self.versionables.clear();
    }

    /// Number of open nodes, the anchor included.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn current(&self) -> NodeHandle {
        // prepare() and new() always leave the anchor at the bottom, finish_node() never pops it
        self.stack[self.stack.len() - 1]
    }

    pub fn current_path(&self) -> Result<String, LoaderError> {
        Ok(self.store.path(self.current())?)
    }

    pub(crate) fn overwrites(&self) -> bool {
        self.options.overwrite && !self.ignore_overwrite
    }

    pub(crate) fn push(&mut self, node: NodeHandle) {
        self.stack.push(node);
    }

    pub(crate) fn record_created(&mut self, node: NodeHandle) -> Result<(), LoaderError> {
        if self.options.uninstall {
            self.created_nodes.push(self.store.path(node)?);
        }
        Ok(())
    }

    fn add_versionable(&mut self, path: String) {
        if !self.versionables.contains(&path) {
            tracing::debug!("Tracking {} for check-in", path);
            self.versionables.push(path);
        }
    }

    pub fn create_node(
        &mut self,
        name: Option<&str>,
        primary_type: Option<&str>,
        capabilities: &[&str],
    ) -> Result<(), LoaderError> {
        let name = match name {
            Some(name) => name.to_string(),
            None if self.stack.len() > 1 || self.anchor_open => {
                return Err(ImportError::MissingName.into())
            }
            None => match (&self.default_root_name, self.mode) {
                (Some(default), _) => default.clone(),
                (None, ImportMode::RootReplace) => String::default(),
                (None, ImportMode::NamedChild) => return Err(ImportError::MissingName.into()),
            },
        };

        if self.mode == ImportMode::RootReplace && self.stack.len() == 1 && !self.anchor_open {
            tracing::debug!("Root replace import: anchor stands in for the top-level node");
            self.anchor_open = true;
            return Ok(());
        }

        self.open_child(&name, primary_type, capabilities)
    }

    /// Create or reuse the child `name` of the current node and push it. Unlike
    /// [TreeBuilder::create_node] this never stands the anchor in for the node.
    pub(crate) fn open_child(
        &mut self,
        name: &str,
        primary_type: Option<&str>,
        capabilities: &[&str],
    ) -> Result<(), LoaderError> {
        let parent = self.current();
        if self.overwrites() {
            if let Some(existing) = self.store.child(parent, name)? {
                tracing::debug!("Overwriting {}", self.store.path(existing)?);
                self.store.remove_node(existing)?;
            }
        }

        let node = match self.store.child(parent, name)? {
            Some(existing) => existing,
            None => {
                let node = self.store.add_child(parent, name, primary_type)?;
                self.record_created(node)?;
                node
            }
        };

        for tag in capabilities {
            let capability = Capability::from(*tag);
            if !self.store.has_capability(node, &capability)? {
                self.store.add_capability(node, &capability)?;
            }
        }

        if self.options.checkin
            && self
                .store
                .has_capability(node, &CapabilityKind::Versionable.into())?
        {
            let path = self.store.path(node)?;
            self.add_versionable(path);
        }

        self.stack.push(node);
        if self.root.is_none() {
            self.root = Some(node);
        }
        Ok(())
    }

    pub fn finish_node(&mut self) -> Result<(), LoaderError> {
        if self.stack.len() <= 1 {
            if self.anchor_open {
                self.anchor_open = false;
                let anchor = self.current();
                return self.ledger.resolve(self.store, anchor);
            }
            return Err(ImportError::StackUnderflow.into());
        }
        let Some(node) = self.stack.pop() else {
            return Err(ImportError::StackUnderflow.into());
        };
        self.ledger.resolve(self.store, node)
    }

    /// Whether `name` on the current node existed before this import touched it.
    fn is_protected(&self, node: NodeHandle, property_path: &str) -> Result<bool, LoaderError> {
        let name = paths::name_of(property_path);
        Ok(self.store.has_property(node, name)? && !self.written.contains(property_path))
    }

    fn write(
        &mut self,
        node: NodeHandle,
        property_path: String,
        value: PropertyValue,
    ) -> Result<(), LoaderError> {
        self.store
            .set_property(node, paths::name_of(&property_path), value)?;
        self.written.insert(property_path);
        Ok(())
    }

    fn remove(&mut self, node: NodeHandle, name: &str) -> Result<(), LoaderError> {
        if self.store.remove_property(node, name)? {
            tracing::debug!("Removed property {} from {:?}", name, node);
        }
        Ok(())
    }

    /// Look up the identifier of the node `target_path` names.
    ///
    /// Returns the slot to store for the reference, and whether the target is missing from the
    /// store. Existing items that carry no identifier are never waited on.
    fn reference_slot(&self, target_path: String) -> Result<(Slot, bool), LoaderError> {
        if self.store.item_exists(&target_path) {
            let id: Option<NodeId> = match self.store.node_at(&target_path) {
                Some(target) if self.store.is_referenceable(target)? => {
                    self.store.stable_id(target)?
                }
                _ => None,
            };
            Ok(match id {
                Some(id) => (Slot::Resolved(id), false),
                None => {
                    tracing::debug!("Reference target {} carries no identifier", target_path);
                    (Slot::Unresolved(target_path), false)
                }
            })
        } else {
            Ok((Slot::Unresolved(target_path), true))
        }
    }

    pub fn set_property(
        &mut self,
        name: &str,
        property_type: PropertyType,
        value: &str,
    ) -> Result<(), LoaderError> {
        let node = self.current();
        let node_path = self.store.path(node)?;
        let property_path = paths::join(&node_path, name);
        if self.is_protected(node, &property_path)? {
            tracing::debug!("Keeping existing property {}", property_path);
            return Ok(());
        }

        if property_type == PropertyType::Reference {
            let target_path = paths::absolute(&node_path, value)?;
            match self.reference_slot(target_path)? {
                (Slot::Resolved(id), _) => {
                    self.write(node, property_path, Value::Reference(id).into())?;
                }
                (Slot::Unresolved(target_path), true) => {
                    self.ledger.register_single(&target_path, &property_path);
                    self.written.insert(property_path);
                }
                (Slot::Unresolved(_), false) => {}
            }
            Ok(())
        } else if name == CHECKED_OUT_PROPERTY {
            self.checked_out(node_path, Some(&Value::String(value.to_string())))
        } else {
            let value = Value::parse(property_type, value)?;
            self.write(node, property_path, value.into())
        }
    }

    /// Handle a write of [CHECKED_OUT_PROPERTY], whatever form its value takes. The property is
    /// never written; a checked-in node is activated after the import instead.
    fn checked_out(&mut self, node_path: String, value: Option<&Value>) -> Result<(), LoaderError> {
        let checked_out = match value {
            None => return Ok(()),
            Some(Value::Boolean(flag)) => *flag,
            Some(value) => match value.as_str() {
                Some(text) => Value::parse(PropertyType::Boolean, text)? == Value::Boolean(true),
                None => {
                    return Err(LoaderError::Value(format!(
                        "{CHECKED_OUT_PROPERTY} needs a boolean, found {value}"
                    )))
                }
            },
        };
        if !checked_out {
            self.add_versionable(node_path);
        }
        Ok(())
    }

    pub fn set_properties(
        &mut self,
        name: &str,
        property_type: PropertyType,
        values: &[&str],
    ) -> Result<(), LoaderError> {
        let node = self.current();
        let node_path = self.store.path(node)?;
        let property_path = paths::join(&node_path, name);
        if self.is_protected(node, &property_path)? {
            tracing::debug!("Keeping existing property {}", property_path);
            return Ok(());
        }
        if values.is_empty() {
            return self.remove(node, name);
        }
        if name == CHECKED_OUT_PROPERTY && property_type != PropertyType::Reference {
            let first = values.first().map(|value| Value::String(value.to_string()));
            return self.checked_out(node_path, first.as_ref());
        }

        if property_type == PropertyType::Reference {
            let mut slots = Vec::with_capacity(values.len());
            let mut missing = Vec::new();
            for value in values {
                let (slot, is_missing) =
                    self.reference_slot(paths::absolute(&node_path, value)?)?;
                if let (Slot::Unresolved(target_path), true) = (&slot, is_missing) {
                    missing.push(target_path.clone());
                }
                slots.push(slot);
            }
            let resolved = slots
                .iter()
                .filter_map(Slot::id)
                .map(Value::Reference)
                .collect();
            let complete = slots.iter().all(Slot::is_resolved);
            self.write(
                node,
                property_path.clone(),
                PropertyValue::Multi(PropertyType::Reference, resolved),
            )?;
            if !complete {
                self.ledger.register_multi(
                    &property_path,
                    slots,
                    missing.iter().map(String::as_str),
                );
            }
            Ok(())
        } else {
            let values = values
                .iter()
                .map(|value| Value::parse(property_type, value))
                .collect::<Result<Vec<_>, _>>()?;
            self.write(node, property_path, PropertyValue::Multi(property_type, values))
        }
    }

    pub fn set_value(&mut self, name: &str, value: Option<Value>) -> Result<(), LoaderError> {
        let node = self.current();
        let node_path = self.store.path(node)?;
        let property_path = paths::join(&node_path, name);
        if self.is_protected(node, &property_path)? {
            tracing::debug!("Keeping existing property {}", property_path);
            return Ok(());
        }
        match value {
            None => self.remove(node, name),
            Some(value) if name == CHECKED_OUT_PROPERTY => {
                self.checked_out(node_path, Some(&value))
            }
            Some(value) => self.write(node, property_path, value.into()),
        }
    }

    pub fn set_values(
        &mut self,
        name: &str,
        values: Option<Vec<Value>>,
    ) -> Result<(), LoaderError> {
        let node = self.current();
        let node_path = self.store.path(node)?;
        let property_path = paths::join(&node_path, name);
        if self.is_protected(node, &property_path)? {
            tracing::debug!("Keeping existing property {}", property_path);
            return Ok(());
        }
        match values {
            Some(values) if !values.is_empty() && name == CHECKED_OUT_PROPERTY => {
                self.checked_out(node_path, values.first())
            }
            Some(values) if !values.is_empty() => {
                let property_type = values[0].property_type();
                self.write(node, property_path, PropertyValue::Multi(property_type, values))
            }
            _ => self.remove(node, name),
        }
    }

    /// Drain the references still waiting for a target.
    pub fn take_unresolved(&mut self) -> Vec<UnresolvedReference> {
        self.ledger.take_unresolved()
    }
}

impl<S: ContentStore + ?Sized> ContentCreator for TreeBuilder<'_, S> {
    fn create_node(
        &mut self,
        name: Option<&str>,
        primary_type: Option<&str>,
        capabilities: &[&str],
    ) -> Result<(), LoaderError> {
        TreeBuilder::create_node(self, name, primary_type, capabilities)
    }

    fn finish_node(&mut self) -> Result<(), LoaderError> {
        TreeBuilder::finish_node(self)
    }

    fn set_property(
        &mut self,
        name: &str,
        property_type: PropertyType,
        value: &str,
    ) -> Result<(), LoaderError> {
        TreeBuilder::set_property(self, name, property_type, value)
    }

    fn set_properties(
        &mut self,
        name: &str,
        property_type: PropertyType,
        values: &[&str],
    ) -> Result<(), LoaderError> {
        TreeBuilder::set_properties(self, name, property_type, values)
    }

    fn set_value(&mut self, name: &str, value: Option<Value>) -> Result<(), LoaderError> {
        TreeBuilder::set_value(self, name, value)
    }

    fn set_values(&mut self, name: &str, values: Option<Vec<Value>>) -> Result<(), LoaderError> {
        TreeBuilder::set_values(self, name, values)
    }

    fn import_binary_resource(
        &mut self,
        name: &str,
        data: Vec<u8>,
        media_type: Option<&str>,
        last_modified: i64,
    ) -> Result<(), LoaderError> {
        TreeBuilder::import_binary_resource(self, name, data, media_type, last_modified)
    }

    fn switch_current_node(
        &mut self,
        sub_path: &str,
        new_node_type: Option<&str>,
    ) -> Result<bool, LoaderError> {
        TreeBuilder::switch_current_node(self, sub_path, new_node_type)
    }
}
