//! Deferred reference bookkeeping.
//!
//! A reference property may name a node that the import has not created yet. The
//! [ReferenceLedger] remembers such properties keyed by the path of the missing target and
//! writes the target's identifier once [ReferenceLedger::resolve] is called for the finished
//! target node.

use std::collections::BTreeMap;

use crate::{
    error::LoaderError,
    loader::diagnostic::UnresolvedReference,
    paths,
    properties::{NodeId, PropertyType, PropertyValue, Value},
    store::{ContentStore, NodeHandle},
};

/// One position of a multi-valued reference property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    /// Still the absolute path of the target
    Unresolved(String),
    Resolved(NodeId),
}

impl Slot {
    pub fn id(&self) -> Option<NodeId> {
        match self {
            Slot::Resolved(id) => Some(*id),
            Slot::Unresolved(_) => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Slot::Resolved(_))
    }
}

/// A property write waiting on a target node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingReference {
    /// Written as a single reference once the target resolves
    Single { property_path: String },
    /// Slot array kept in [ReferenceLedger]; rewritten on every partial resolution
    Multi { property_path: String },
}

impl PendingReference {
    pub fn property_path(&self) -> &str {
        match self {
            PendingReference::Single { property_path } => property_path,
            PendingReference::Multi { property_path } => property_path,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReferenceLedger {
    by_target: BTreeMap<String, Vec<PendingReference>>,
    multi: BTreeMap<String, Vec<Slot>>,
}

impl ReferenceLedger {
    pub fn new() -> Self {
        ReferenceLedger::default()
    }

    pub fn is_empty(&self) -> bool {
        self.by_target.is_empty() && self.multi.is_empty()
    }

    /// Number of target paths with pending writes.
    pub fn len(&self) -> usize {
        self.by_target.len()
    }

    pub fn is_pending(&self, target_path: &str) -> bool {
        self.by_target.contains_key(target_path)
    }

    pub fn slots(&self, property_path: &str) -> Option<&[Slot]> {
        self.multi.get(property_path).map(Vec::as_slice)
    }

    fn push(&mut self, target_path: &str, reference: PendingReference) {
        let pending = self.by_target.entry(target_path.to_string()).or_default();
        if !pending.contains(&reference) {
            pending.push(reference);
        }
    }

    pub fn register_single(&mut self, target_path: &str, property_path: &str) {
        tracing::debug!(
            "Deferring reference {} until {} is created",
            property_path,
            target_path
        );
        self.push(
            target_path,
            PendingReference::Single {
                property_path: property_path.to_string(),
            },
        );
    }

    /// Keep the slot array of a multi-valued property, and wait on each of `missing_targets`.
    ///
    /// Unresolved slots whose target is not in `missing_targets` (targets that exist but carry
    /// no identifier) are kept in the array but never waited on.
    pub fn register_multi<'a, I>(
        &mut self,
        property_path: &str,
        slots: Vec<Slot>,
        missing_targets: I,
    ) where
        I: IntoIterator<Item = &'a str>,
    {
        for target_path in missing_targets {
            tracing::debug!(
                "Deferring multi-value reference {} until {} is created",
                property_path,
                target_path
            );
            self.push(
                target_path,
                PendingReference::Multi {
                    property_path: property_path.to_string(),
                },
            );
        }
        self.multi.insert(property_path.to_string(), slots);
    }

    /// Write pending references that target the just finished `node`.
    ///
    /// A node without the referenceable capability can not satisfy a reference; its pending
    /// entries are left in place.
    pub fn resolve<S: ContentStore + ?Sized>(
        &mut self,
        store: &mut S,
        node: NodeHandle,
    ) -> Result<(), LoaderError> {
        let node_path = store.path(node)?;
        if !self.by_target.contains_key(&node_path) {
            return Ok(());
        }
        if !store.is_referenceable(node)? {
            tracing::debug!(
                "{} is referenced by pending properties but is not referenceable",
                node_path
            );
            return Ok(());
        }
        let Some(id) = store.stable_id(node)? else {
            return Ok(());
        };

        let pending = self.by_target.remove(&node_path).unwrap_or_default();
        for reference in pending {
            match reference {
                PendingReference::Single { property_path } => {
                    write_reference(
                        store,
                        &property_path,
                        PropertyValue::Single(Value::Reference(id)),
                    )?;
                }
                PendingReference::Multi { property_path } => {
                    let Some(slots) = self.multi.get_mut(&property_path) else {
                        continue;
                    };
                    for slot in slots.iter_mut() {
                        if matches!(slot, Slot::Unresolved(target) if *target == node_path) {
                            *slot = Slot::Resolved(id);
                        }
                    }
                    let resolved = slots
                        .iter()
                        .filter_map(Slot::id)
                        .map(Value::Reference)
                        .collect();
                    let complete = slots.iter().all(Slot::is_resolved);
                    write_reference(
                        store,
                        &property_path,
                        PropertyValue::Multi(PropertyType::Reference, resolved),
                    )?;
                    if complete {
                        self.multi.remove(&property_path);
                    }
                }
            }
        }
        Ok(())
    }

    /// Drain everything still pending.
    pub fn take_unresolved(&mut self) -> Vec<UnresolvedReference> {
        let mut unresolved = Vec::new();
        for (property_path, slots) in std::mem::take(&mut self.multi) {
            for slot in slots {
                if let Slot::Unresolved(target_path) = slot {
                    unresolved.push(UnresolvedReference {
                        property_path: property_path.clone(),
                        target_path,
                    });
                }
            }
        }
        for (target_path, pending) in std::mem::take(&mut self.by_target) {
            for reference in pending {
                if let PendingReference::Single { property_path } = reference {
                    unresolved.push(UnresolvedReference {
                        property_path,
                        target_path: target_path.clone(),
                    });
                }
            }
        }
        unresolved.sort();
        unresolved
    }
}

fn write_reference<S: ContentStore + ?Sized>(
    store: &mut S,
    property_path: &str,
    value: PropertyValue,
) -> Result<(), LoaderError> {
    let owner = paths::parent_of(property_path).and_then(|parent| store.node_at(&parent));
    match owner {
        Some(owner) => {
            tracing::debug!("Resolved deferred reference {}", property_path);
            store.set_property(owner, paths::name_of(property_path), value)?;
        }
        None => {
            tracing::debug!(
                "Owner of deferred reference {} no longer exists, skipping",
                property_path
            );
        }
    }
    Ok(())
}
