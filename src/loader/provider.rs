//! Registry of source format providers.
//!
//! Providers are registered globally by file extension in [PROVIDERS]. An import session never
//! reads the global registry while importing: it takes a filtered [ActiveProviders] snapshot at
//! construction, honoring [crate::config::ImportOptions::ignored_providers].

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::{config::ImportOptions, error::LoaderError, loader::ContentCreator};

use super::json::JsonProvider;

/// A source format decoder. Implementations read `content` and describe the tree it contains
/// through the [ContentCreator] calls, opening the top-level node without a name so the session's
/// default root name applies.
pub trait ImportProvider: Send + Sync {
    fn import(&self, content: &[u8], creator: &mut dyn ContentCreator) -> Result<(), LoaderError>;
}

/// Global singleton provider map with the builtin providers (json)
pub static PROVIDERS: Lazy<ProviderMap> = Lazy::new(ProviderMap::create);

type ProviderEntry = (String, Arc<dyn ImportProvider>);

#[derive(Clone)]
pub struct ProviderMap(Arc<RwLock<Vec<ProviderEntry>>>);

fn normalize_extension(extension: &str) -> String {
    format!(".{}", extension.trim().trim_start_matches('.'))
}

impl ProviderMap {
    pub fn create() -> Self {
        let json: Arc<dyn ImportProvider> = Arc::new(JsonProvider);
        ProviderMap(Arc::new(RwLock::new(vec![(".json".to_string(), json)])))
    }

    pub fn empty() -> Self {
        ProviderMap(Arc::new(RwLock::new(Vec::new())))
    }

    /// Register `provider` for `extension`, replacing any provider registered for it before.
    pub fn insert<P: ImportProvider + 'static>(&self, extension: &str, provider: P) {
        let extension = normalize_extension(extension);
        let mut writer = self.0.write();
        let provider: Arc<dyn ImportProvider> = Arc::new(provider);
        if let Some(entry) = writer.iter_mut().find(|(ext, _)| ext == &extension) {
            tracing::debug!("Replacing import provider for {}", extension);
            entry.1 = provider;
        } else {
            writer.push((extension, provider));
        }
    }

    pub fn remove(&self, extension: &str) -> bool {
        let extension = normalize_extension(extension);
        let mut writer = self.0.write();
        let before = writer.len();
        writer.retain(|(ext, _)| ext != &extension);
        writer.len() != before
    }

    pub fn extensions(&self) -> Vec<String> {
        self.0.read().iter().map(|(ext, _)| ext.clone()).collect()
    }

    /// Copy out the providers an import with `options` may use.
    pub fn snapshot(&self, options: &ImportOptions) -> ActiveProviders {
        let reader = self.0.read();
        ActiveProviders(
            reader
                .iter()
                .filter(|(ext, _)| {
                    let ignored = options.is_ignored_provider(ext);
                    if ignored {
                        tracing::debug!("Import provider {} is ignored for {}", ext, options.path);
                    }
                    !ignored
                })
                .cloned()
                .collect(),
        )
    }
}

/// Immutable view of the providers taking part in one import.
#[derive(Clone, Default)]
pub struct ActiveProviders(Vec<ProviderEntry>);

impl ActiveProviders {
    /// The provider whose extension `name` ends with.
    pub fn provider_for(&self, name: &str) -> Option<Arc<dyn ImportProvider>> {
        self.0
            .iter()
            .find(|(ext, _)| name.ends_with(ext.as_str()))
            .map(|(_, provider)| provider.clone())
    }

    /// The registered extension `name` ends with, leading dot included.
    pub fn extension_for(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(ext, _)| name.ends_with(ext.as_str()))
            .map(|(ext, _)| ext.as_str())
    }

    pub fn extensions(&self) -> Vec<&str> {
        self.0.iter().map(|(ext, _)| ext.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullProvider;

    impl ImportProvider for NullProvider {
        fn import(&self, _: &[u8], _: &mut dyn ContentCreator) -> Result<(), LoaderError> {
            Ok(())
        }
    }

    #[test]
    fn test_snapshot_filters_ignored() {
        let providers = ProviderMap::create();
        providers.insert("xml", NullProvider);
        assert_eq!(providers.extensions(), vec![".json", ".xml"]);

        let mut options = ImportOptions::new("content");
        options.ignored_providers.insert("xml".to_string());
        let active = providers.snapshot(&options);
        assert_eq!(active.extensions(), vec![".json"]);
        assert_eq!(active.extension_for("nodes.json"), Some(".json"));
        assert!(active.provider_for("nodes.xml").is_none());
    }

    #[test]
    fn test_snapshot_is_detached() {
        let providers = ProviderMap::empty();
        let active = providers.snapshot(&ImportOptions::default());
        providers.insert(".xml", NullProvider);
        assert!(active.is_empty());
        assert!(providers.remove("xml"));
        assert!(!providers.remove("xml"));
    }
}
