//! Materializing structural event streams into a [ContentStore](crate::store::ContentStore).
//!
//! ## Key Components
//!
//! - [`TreeBuilder`] - stack based node and property writer; the [`ContentCreator`]
//!   implementation every import source talks to
//! - [`ReferenceLedger`](ledger::ReferenceLedger) - deferred reference properties waiting for
//!   their target node
//! - [`ImportSession`] - runs one import against an anchor node and reports the outcome
//! - [`ImportProvider`] trait and [`PROVIDERS`] - source format decoders keyed by extension
//! - [`MimeLookup`] - media type inference for binary resources
//!
//! ## Reference Resolution
//!
//! Reference properties are written in a single pass. A target that already exists is resolved
//! immediately. A target that does not exist yet is queued by path, and the queued property is
//! written when the builder finishes the target node. Whatever is still queued when the session
//! ends is reported as an [`UnresolvedReference`].
//!
//! ```rust
//! use content_loader::{
//!     config::ImportOptions,
//!     event::ContentEvent,
//!     loader::ImportSession,
//!     properties::PropertyType,
//!     store::{ContentStore, MemoryStore},
//! };
//!
//! let mut store = MemoryStore::new();
//! let mut session = ImportSession::with_defaults(&mut store, ImportOptions::default());
//! session.begin("/", Some("content")).unwrap();
//! session
//!     .apply_all([
//!         ContentEvent::StartNode { name: None, primary_type: None, capabilities: vec![] },
//!         ContentEvent::start("a"),
//!         ContentEvent::property("link", PropertyType::Reference, "../b"),
//!         ContentEvent::EndNode,
//!         ContentEvent::start_typed(Some("b"), "nt:unstructured", &["mix:referenceable"]),
//!         ContentEvent::EndNode,
//!         ContentEvent::EndNode,
//!     ])
//!     .unwrap();
//! let report = session.finish().unwrap();
//! assert!(report.unresolved.is_empty());
//!
//! let b = store.node_at("/content/b").unwrap();
//! let a = store.node_at("/content/a").unwrap();
//! let link = store.property(a, "link").unwrap().unwrap();
//! assert_eq!(link.single().and_then(|v| v.as_reference()), store.stable_id(b).unwrap());
//! ```

use crate::{
    error::LoaderError,
    properties::{PropertyType, Value},
};

pub mod builder;
pub mod composite;
pub mod diagnostic;
pub mod json;
pub mod ledger;
pub mod mime;
pub mod provider;
pub mod session;

pub use builder::{ImportMode, TreeBuilder};
pub use diagnostic::UnresolvedReference;
pub use json::JsonProvider;
pub use ledger::ReferenceLedger;
pub use mime::{ExtensionMimeTable, MimeLookup, DEFAULT_MEDIA_TYPE};
pub use provider::{ActiveProviders, ImportProvider, ProviderMap, PROVIDERS};
pub use session::{ImportReport, ImportSession};

/// Property that is never written; a `false` value flags the node for post-import check-in.
pub const CHECKED_OUT_PROPERTY: &str = "jcr:isCheckedOut";

pub const FILE_NODE_TYPE: &str = "nt:file";
pub const RESOURCE_NODE_TYPE: &str = "nt:resource";
pub const CONTENT_NODE: &str = "jcr:content";
pub const MIME_TYPE_PROPERTY: &str = "jcr:mimeType";
pub const LAST_MODIFIED_PROPERTY: &str = "jcr:lastModified";
pub const DATA_PROPERTY: &str = "jcr:data";

/// The calls an import source makes to describe a content tree.
///
/// Calls apply to the current node, which is the node opened most recently by
/// [ContentCreator::create_node] (or [ContentCreator::switch_current_node]) and not yet closed by
/// [ContentCreator::finish_node].
pub trait ContentCreator {
    fn create_node(
        &mut self,
        name: Option<&str>,
        primary_type: Option<&str>,
        capabilities: &[&str],
    ) -> Result<(), LoaderError>;

    fn finish_node(&mut self) -> Result<(), LoaderError>;

    /// Set a single valued property from its string encoding.
    fn set_property(
        &mut self,
        name: &str,
        property_type: PropertyType,
        value: &str,
    ) -> Result<(), LoaderError>;

    /// Set a multi valued property from string encodings. An empty slice removes the property.
    fn set_properties(
        &mut self,
        name: &str,
        property_type: PropertyType,
        values: &[&str],
    ) -> Result<(), LoaderError>;

    /// Set an already typed value. `None` removes the property.
    fn set_value(&mut self, name: &str, value: Option<Value>) -> Result<(), LoaderError>;

    /// Set already typed values. `None` or an empty vector removes the property.
    fn set_values(&mut self, name: &str, values: Option<Vec<Value>>) -> Result<(), LoaderError>;

    /// Store a file payload as a container node with a content child. Leaves both open.
    fn import_binary_resource(
        &mut self,
        name: &str,
        data: Vec<u8>,
        media_type: Option<&str>,
        last_modified: i64,
    ) -> Result<(), LoaderError>;

    /// Make the node at `sub_path` below the current node current. Returns `false` if a segment
    /// is missing and no `new_node_type` was given to create it.
    fn switch_current_node(
        &mut self,
        sub_path: &str,
        new_node_type: Option<&str>,
    ) -> Result<bool, LoaderError>;
}
