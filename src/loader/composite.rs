//! Multi-step builder operations composed from the [TreeBuilder] primitives.

use crate::{
    error::{LoaderError, StoreError},
    loader::{
        builder::TreeBuilder, mime::DEFAULT_MEDIA_TYPE, CONTENT_NODE, DATA_PROPERTY,
        FILE_NODE_TYPE, LAST_MODIFIED_PROPERTY, MIME_TYPE_PROPERTY, RESOURCE_NODE_TYPE,
    },
    paths,
    properties::Value,
    store::ContentStore,
};

impl<S: ContentStore + ?Sized> TreeBuilder<'_, S> {
    /// Store `data` as a file container named after the last segment of `name`, with a content
    /// child holding the payload, media type and modification time.
    ///
    /// When the file already exists and overwriting is off, the existing container and content
    /// nodes are opened and nothing is written. Either way both nodes are left open on the stack.
    pub fn import_binary_resource(
        &mut self,
        name: &str,
        data: Vec<u8>,
        media_type: Option<&str>,
        last_modified: i64,
    ) -> Result<(), LoaderError> {
        let name = paths::name_of(name);
        let parent = self.current();

        if let Some(existing) = self.store().child(parent, name)? {
            if self.overwrites() {
                self.store_mut().remove_node(existing)?;
            } else {
                let content = self
                    .store()
                    .child(existing, CONTENT_NODE)?
                    .ok_or_else(|| {
                        let container = self.store().path(existing).unwrap_or_default();
                        StoreError::NotFound(paths::join(&container, CONTENT_NODE))
                    })?;
                tracing::debug!("{} already imported, keeping existing content", name);
                self.push(existing);
                self.push(content);
                return Ok(());
            }
        }

        let media_type = match media_type {
            Some(media_type) => media_type.to_string(),
            None => self.mime.mime_type(name).unwrap_or_else(|| {
                tracing::info!(
                    "Cannot find content type for {}, using {}",
                    name,
                    DEFAULT_MEDIA_TYPE
                );
                DEFAULT_MEDIA_TYPE.to_string()
            }),
        };

        let last_modified = if last_modified <= 0 {
            chrono::Utc::now().timestamp_millis()
        } else {
            last_modified
        };

        // Also below a root replace anchor, the file always gets its own nodes
        self.open_child(name, Some(FILE_NODE_TYPE), &[])?;
        self.open_child(CONTENT_NODE, Some(RESOURCE_NODE_TYPE), &[])?;
        self.set_value(MIME_TYPE_PROPERTY, Some(Value::String(media_type)))?;
        self.set_value(LAST_MODIFIED_PROPERTY, Some(Value::Date(last_modified)))?;
        self.set_value(DATA_PROPERTY, Some(Value::Binary(data)))
    }

    /// Descend from the current node along `sub_path`, creating missing segments with
    /// `new_node_type`. The final node is pushed as a single stack entry, so one
    /// [TreeBuilder::finish_node] leaves the whole descent.
    pub fn switch_current_node(
        &mut self,
        sub_path: &str,
        new_node_type: Option<&str>,
    ) -> Result<bool, LoaderError> {
        let sub_path = sub_path.strip_prefix(paths::SEPARATOR).unwrap_or(sub_path);
        let mut node = self.current();
        for segment in sub_path.split(paths::SEPARATOR).filter(|s| !s.is_empty()) {
            node = match self.store().child(node, segment)? {
                Some(child) => child,
                None => {
                    let Some(node_type) = new_node_type else {
                        tracing::debug!("Cannot switch to {}: {} is missing", sub_path, segment);
                        return Ok(false);
                    };
                    let child = self.store_mut().add_child(node, segment, Some(node_type))?;
                    self.record_created(child)?;
                    child
                }
            };
        }
        self.push(node);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ImportOptions,
        loader::mime::ExtensionMimeTable,
        properties::{PropertyValue, Value},
        store::{MemoryStore, NodeHandle},
    };
    use std::sync::Arc;
    use test_log::test;

    fn prepared(store: &mut MemoryStore, options: ImportOptions) -> TreeBuilder<'_, MemoryStore> {
        let mut builder = TreeBuilder::new(store, options, Arc::new(ExtensionMimeTable::new()));
        let anchor = builder.store().root();
        builder.prepare(anchor, Some("content"));
        builder
    }

    fn property(store: &MemoryStore, node: NodeHandle, name: &str) -> Option<Value> {
        store
            .property(node, name)
            .unwrap()
            .and_then(|p| p.single().cloned())
    }

    #[test]
    fn test_binary_resource_defaults() {
        let mut store = MemoryStore::new();
        let before = chrono::Utc::now().timestamp_millis();
        {
            let mut builder = prepared(&mut store, ImportOptions::default());
            builder
                .import_binary_resource("a/b/file.bin", vec![1, 2, 3], None, 0)
                .unwrap();
            assert_eq!(builder.depth(), 3);
            builder.finish_node().unwrap();
            builder.finish_node().unwrap();
            assert_eq!(
                builder.created_nodes(),
                &["/file.bin".to_string(), "/file.bin/jcr:content".to_string()]
            );
        }

        let file = store.node_at("/file.bin").unwrap();
        let content = store.node_at("/file.bin/jcr:content").unwrap();
        assert_eq!(store.primary_type(file).unwrap(), FILE_NODE_TYPE);
        assert_eq!(store.primary_type(content).unwrap(), RESOURCE_NODE_TYPE);
        assert_eq!(
            property(&store, content, MIME_TYPE_PROPERTY),
            Some(Value::String(DEFAULT_MEDIA_TYPE.to_string()))
        );
        assert_eq!(
            property(&store, content, DATA_PROPERTY),
            Some(Value::Binary(vec![1, 2, 3]))
        );
        match property(&store, content, LAST_MODIFIED_PROPERTY) {
            Some(Value::Date(millis)) => assert!(millis >= before),
            other => panic!("unexpected last modified value {other:?}"),
        }
    }

    #[test]
    fn test_binary_resource_explicit_values() {
        let mut store = MemoryStore::new();
        {
            let mut builder = prepared(&mut store, ImportOptions::default());
            builder
                .import_binary_resource("logo.png", vec![0], None, 1234)
                .unwrap();
            builder.finish_node().unwrap();
            builder.finish_node().unwrap();
            builder
                .import_binary_resource("data", vec![0], Some("text/x-custom"), -5)
                .unwrap();
        }
        let logo = store.node_at("/logo.png/jcr:content").unwrap();
        assert_eq!(
            property(&store, logo, MIME_TYPE_PROPERTY),
            Some(Value::String("image/png".to_string()))
        );
        assert_eq!(
            property(&store, logo, LAST_MODIFIED_PROPERTY),
            Some(Value::Date(1234))
        );
        let data = store.node_at("/data/jcr:content").unwrap();
        assert_eq!(
            property(&store, data, MIME_TYPE_PROPERTY),
            Some(Value::String("text/x-custom".to_string()))
        );
    }

    #[test]
    fn test_binary_resource_already_imported() {
        let mut store = MemoryStore::new();
        {
            let mut builder = prepared(&mut store, ImportOptions::default());
            builder
                .import_binary_resource("file.txt", b"first".to_vec(), None, 1)
                .unwrap();
        }
        {
            let mut builder = prepared(&mut store, ImportOptions::default());
            builder
                .import_binary_resource("file.txt", b"second".to_vec(), None, 2)
                .unwrap();
            assert_eq!(builder.depth(), 3);
            assert!(builder.created_nodes().is_empty());
        }
        let content = store.node_at("/file.txt/jcr:content").unwrap();
        assert_eq!(
            store.property(content, DATA_PROPERTY).unwrap(),
            Some(PropertyValue::Single(Value::Binary(b"first".to_vec())))
        );

        let mut options = ImportOptions::default();
        options.overwrite = true;
        {
            let mut builder = prepared(&mut store, options);
            builder
                .import_binary_resource("file.txt", b"third".to_vec(), None, 3)
                .unwrap();
        }
        let content = store.node_at("/file.txt/jcr:content").unwrap();
        assert_eq!(
            property(&store, content, DATA_PROPERTY),
            Some(Value::Binary(b"third".to_vec()))
        );
    }

    #[test]
    fn test_binary_resource_missing_content_node() {
        let mut store = MemoryStore::new();
        let root = store.root();
        store.add_child(root, "broken.txt", Some(FILE_NODE_TYPE)).unwrap();
        let mut builder = prepared(&mut store, ImportOptions::default());
        assert!(matches!(
            builder.import_binary_resource("broken.txt", vec![], None, 1),
            Err(LoaderError::Store(StoreError::NotFound(_)))
        ));
    }

    #[test]
    fn test_binary_resource_below_root_replace_anchor() {
        let mut store = MemoryStore::new();
        let root = store.root();
        let apps = store.add_child(root, "apps", None).unwrap();
        {
            let mut builder = TreeBuilder::new(
                &mut store,
                ImportOptions::default(),
                Arc::new(ExtensionMimeTable::new()),
            );
            builder.prepare(apps, None);
            builder
                .import_binary_resource("f.txt", b"text".to_vec(), None, 1)
                .unwrap();
            assert_eq!(builder.depth(), 3);
            builder.finish_node().unwrap();
            builder.finish_node().unwrap();
            assert_eq!(builder.depth(), 1);
            assert!(builder.finish_node().is_err());
        }

        assert!(!store.has_property(apps, DATA_PROPERTY).unwrap());
        assert!(!store.has_property(apps, MIME_TYPE_PROPERTY).unwrap());
        let content = store.node_at("/apps/f.txt/jcr:content").unwrap();
        assert_eq!(
            property(&store, content, DATA_PROPERTY),
            Some(Value::Binary(b"text".to_vec()))
        );
        assert_eq!(
            property(&store, content, MIME_TYPE_PROPERTY),
            Some(Value::String("text/plain".to_string()))
        );
    }

    #[test]
    fn test_switch_current_node() {
        let mut store = MemoryStore::new();
        let root = store.root();
        let a = store.add_child(root, "a", None).unwrap();
        store.add_child(a, "b", None).unwrap();

        let mut builder = prepared(&mut store, ImportOptions::default());
        assert!(!builder.switch_current_node("a/missing/c", None).unwrap());
        assert_eq!(builder.depth(), 1);

        assert!(builder.switch_current_node("/a/b", None).unwrap());
        assert_eq!(builder.current_path().unwrap(), "/a/b");
        assert_eq!(builder.depth(), 2);
        builder.finish_node().unwrap();

        assert!(builder
            .switch_current_node("a/x/y", Some("sling:Folder"))
            .unwrap());
        assert_eq!(builder.current_path().unwrap(), "/a/x/y");
        assert_eq!(
            builder.created_nodes(),
            &["/a/x".to_string(), "/a/x/y".to_string()]
        );
        // A single finish leaves the whole descent
        builder.finish_node().unwrap();
        assert_eq!(builder.current_path().unwrap(), "/");
    }
}
