use once_cell::sync::Lazy;
use std::collections::BTreeMap;

/// Media type used for payloads whose extension is unknown.
pub const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";

/// Media type lookup by file name, injected into the loader so embedding applications can plug
/// their own registry in.
pub trait MimeLookup: Send + Sync {
    fn mime_type(&self, name: &str) -> Option<String>;
}

static BUILTIN_TYPES: Lazy<BTreeMap<&'static str, &'static str>> = Lazy::new(|| {
    BTreeMap::from([
        ("css", "text/css"),
        ("csv", "text/csv"),
        ("gif", "image/gif"),
        ("htm", "text/html"),
        ("html", "text/html"),
        ("jpeg", "image/jpeg"),
        ("jpg", "image/jpeg"),
        ("js", "application/javascript"),
        ("json", "application/json"),
        ("md", "text/markdown"),
        ("pdf", "application/pdf"),
        ("png", "image/png"),
        ("svg", "image/svg+xml"),
        ("toml", "application/toml"),
        ("txt", "text/plain"),
        ("xml", "application/xml"),
        ("zip", "application/zip"),
    ])
});

/// Extension based [MimeLookup] seeded with common web types.
#[derive(Debug, Clone, Default)]
pub struct ExtensionMimeTable {
    custom: BTreeMap<String, String>,
}

impl ExtensionMimeTable {
    pub fn new() -> Self {
        ExtensionMimeTable::default()
    }

    /// Add or override a mapping. Extensions are matched case-insensitively.
    pub fn with_mapping<E: AsRef<str>, T: Into<String>>(
        mut self,
        extension: E,
        media_type: T,
    ) -> Self {
        self.custom.insert(
            extension.as_ref().trim_start_matches('.').to_lowercase(),
            media_type.into(),
        );
        self
    }
}

impl MimeLookup for ExtensionMimeTable {
    fn mime_type(&self, name: &str) -> Option<String> {
        let (_, ext) = name.rsplit_once('.')?;
        let ext = ext.to_lowercase();
        self.custom
            .get(&ext)
            .cloned()
            .or_else(|| BUILTIN_TYPES.get(ext.as_str()).map(|t| t.to_string()))
    }
}
