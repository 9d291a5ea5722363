use std::sync::Arc;

use crate::{
    config::ImportOptions,
    error::{LoaderError, StoreError},
    event::ContentEvent,
    loader::{
        builder::TreeBuilder,
        diagnostic::UnresolvedReference,
        mime::{ExtensionMimeTable, MimeLookup},
        provider::{ActiveProviders, ImportProvider, ProviderMap, PROVIDERS},
    },
    paths,
    store::{ContentStore, NodeHandle},
};

/// What one import did to the store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImportReport {
    /// The first node the last import created or opened below its anchor.
    pub root: Option<NodeHandle>,
    pub root_path: Option<String>,
    /// Paths of the root of every import run in the session, in import order.
    pub roots: Vec<String>,
    /// Nodes to check in now that the import is complete.
    pub versionables: Vec<String>,
    /// Nodes created by the import, for later uninstall.
    pub created_nodes: Vec<String>,
    /// Reference properties whose target never appeared.
    pub unresolved: Vec<UnresolvedReference>,
}

impl ImportReport {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Runs one import against a store: resolve the anchor, feed events or provider content to a
/// [TreeBuilder], and collect the outcome.
pub struct ImportSession<'s, S: ContentStore + ?Sized> {
    builder: TreeBuilder<'s, S>,
    providers: ActiveProviders,
    roots: Vec<String>,
}

impl<'s, S: ContentStore + ?Sized> ImportSession<'s, S> {
    pub fn new(
        store: &'s mut S,
        options: ImportOptions,
        providers: &ProviderMap,
        mime: Arc<dyn MimeLookup>,
    ) -> Self {
        let providers = providers.snapshot(&options);
        ImportSession {
            builder: TreeBuilder::new(store, options, mime),
            providers,
            roots: Vec::new(),
        }
    }

    /// A session using the global [PROVIDERS] registry and the builtin media type table.
    pub fn with_defaults(store: &'s mut S, options: ImportOptions) -> Self {
        ImportSession::new(store, options, &PROVIDERS, Arc::new(ExtensionMimeTable::new()))
    }

    pub fn builder(&self) -> &TreeBuilder<'s, S> {
        &self.builder
    }

    pub fn builder_mut(&mut self) -> &mut TreeBuilder<'s, S> {
        &mut self.builder
    }

    /// Anchor the import at `anchor_path`. The top-level node is created below the anchor, named
    /// `default_root_name` unless the source names it; without a default name the anchor itself
    /// receives the top-level node's content.
    pub fn begin(
        &mut self,
        anchor_path: &str,
        default_root_name: Option<&str>,
    ) -> Result<(), LoaderError> {
        let anchor = self
            .builder
            .store()
            .node_at(anchor_path)
            .ok_or_else(|| StoreError::NotFound(anchor_path.to_string()))?;
        tracing::info!(
            "Importing {} into {}",
            self.builder.options().path,
            anchor_path
        );
        self.collect_root()?;
        self.builder.prepare(anchor, default_root_name);
        Ok(())
    }

    /// Record the root of the import that ran since the last [ImportSession::begin].
    fn collect_root(&mut self) -> Result<Option<String>, LoaderError> {
        let Some(root) = self.builder.root_node() else {
            return Ok(None);
        };
        let path = self.builder.store().path(root)?;
        if !self.roots.contains(&path) {
            self.roots.push(path.clone());
        }
        Ok(Some(path))
    }

    pub fn apply(&mut self, event: ContentEvent) -> Result<(), LoaderError> {
        tracing::trace!("Applying {}", event);
        event.apply(&mut self.builder)
    }

    pub fn apply_all<I: IntoIterator<Item = ContentEvent>>(
        &mut self,
        events: I,
    ) -> Result<(), LoaderError> {
        for event in events {
            self.apply(event)?;
        }
        Ok(())
    }

    pub fn provider_for(&self, name: &str) -> Option<Arc<dyn ImportProvider>> {
        self.providers.provider_for(name)
    }

    pub fn provider_extension(&self, name: &str) -> Option<&str> {
        self.providers.extension_for(name)
    }

    /// Decode `content` with the provider registered for `name`'s extension and import it below
    /// `anchor_path`. The top-level node defaults to the file name without its extension.
    pub fn import_source(
        &mut self,
        anchor_path: &str,
        name: &str,
        content: &[u8],
    ) -> Result<(), LoaderError> {
        let (Some(provider), Some(extension)) =
            (self.provider_for(name), self.provider_extension(name))
        else {
            return Err(LoaderError::Provider(format!(
                "No import provider for {name}, available: {:?}",
                self.providers.extensions()
            )));
        };
        let file_name = paths::name_of(name);
        let root_name = file_name
            .strip_suffix(extension)
            .unwrap_or(file_name)
            .to_string();

        self.begin(anchor_path, Some(&root_name))?;
        tracing::debug!("Importing {} as {}", name, root_name);
        provider.import(content, &mut self.builder)
    }

    /// End the session. References still waiting for a target are reported, not failed.
    pub fn finish(mut self) -> Result<ImportReport, LoaderError> {
        let unresolved = self.builder.take_unresolved();
        for reference in unresolved.iter() {
            tracing::warn!("Unresolved reference {}", reference);
        }
        let root = self.builder.root_node();
        let root_path = self.collect_root()?;
        let report = ImportReport {
            root,
            root_path,
            roots: std::mem::take(&mut self.roots),
            versionables: self.builder.versionables().to_vec(),
            created_nodes: self.builder.created_nodes().to_vec(),
            unresolved,
        };
        tracing::info!(
            "Import of {} finished: {} nodes created, {} versionable, {} unresolved references",
            self.builder.options().path,
            report.created_nodes.len(),
            report.versionables.len(),
            report.unresolved.len()
        );
        Ok(report)
    }
}
