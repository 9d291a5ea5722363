use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::LoaderError;

/// Per-import configuration.
///
/// Options can be read from TOML:
///
/// ```toml
/// path = "CONTENT-INF/content"
/// target = "/apps/demo"
/// overwrite = true
/// checkin = false
/// ignored_providers = ["xml"]
/// ```
///
/// or from the compact manifest header form, see [ImportOptions::from_header].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// Source location of the content, as named in the manifest.
    pub path: String,
    /// Absolute store path the content lands under. `None` means the store root.
    pub target: Option<String>,
    /// Replace pre-existing same-named nodes.
    pub overwrite: bool,
    /// Track versionable nodes (and nodes flagged checked-in) for post-import check-in.
    pub checkin: bool,
    /// Reuse existing nodes even when `overwrite` is set.
    pub ignore_overwrite: bool,
    /// Record created nodes so they can be removed again on uninstall.
    pub uninstall: bool,
    /// Provider extensions that must not take part in this import.
    pub ignored_providers: BTreeSet<String>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        ImportOptions {
            path: String::default(),
            target: None,
            overwrite: false,
            checkin: false,
            ignore_overwrite: false,
            uninstall: true,
            ignored_providers: BTreeSet::default(),
        }
    }
}

const HEADER_OVERWRITE: &str = "overwrite";
const HEADER_CHECKIN: &str = "checkin";
const HEADER_UNINSTALL: &str = "uninstall";
const HEADER_PATH: &str = "path";
const HEADER_IGNORE_PROVIDERS: &str = "ignoreImportProviders";

impl ImportOptions {
    pub fn new<P: Into<String>>(path: P) -> Self {
        ImportOptions {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, LoaderError> {
        Ok(toml::from_str(content)?)
    }

    /// Parse a manifest header entry of the form
    /// `CONTENT-INF/content;overwrite:=true;path:=/apps/demo;ignoreImportProviders:="json,xml"`.
    ///
    /// The first segment is the source path. Unknown directives are skipped with a warning.
    pub fn from_header(entry: &str) -> Result<Self, LoaderError> {
        let mut segments = entry.split(';');
        let path = segments
            .next()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| LoaderError::Config(format!("missing source path in '{entry}'")))?;
        let mut options = ImportOptions::new(path);

        for directive in segments.map(str::trim).filter(|d| !d.is_empty()) {
            let Some((key, value)) = directive.split_once(":=") else {
                return Err(LoaderError::Config(format!(
                    "malformed directive '{directive}', expected key:=value"
                )));
            };
            let value = value.trim().trim_matches('"');
            match key.trim() {
                HEADER_OVERWRITE => options.overwrite = parse_flag(key, value)?,
                HEADER_CHECKIN => options.checkin = parse_flag(key, value)?,
                HEADER_UNINSTALL => options.uninstall = parse_flag(key, value)?,
                HEADER_PATH => options.target = Some(value.to_string()),
                HEADER_IGNORE_PROVIDERS => {
                    options.ignored_providers = value
                        .split(',')
                        .map(|ext| ext.trim().trim_start_matches('.').to_string())
                        .filter(|ext| !ext.is_empty())
                        .collect();
                }
                other => {
                    tracing::warn!("Ignoring unknown import directive '{}' in '{}'", other, entry);
                }
            }
        }
        Ok(options)
    }

    pub fn is_ignored_provider(&self, extension: &str) -> bool {
        self.ignored_providers
            .contains(extension.trim_start_matches('.'))
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, LoaderError> {
    match value.to_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(LoaderError::Config(format!(
            "directive '{key}' expects true or false, got '{value}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_header() {
        let options = ImportOptions::from_header(
            "CONTENT-INF/content; overwrite:=true;checkin:=true;path:=/apps/demo;ignoreImportProviders:=\"json, .xml\"",
        )
        .unwrap();
        assert_eq!(options.path, "CONTENT-INF/content");
        assert!(options.overwrite);
        assert!(options.checkin);
        assert!(options.uninstall);
        assert_eq!(options.target.as_deref(), Some("/apps/demo"));
        assert!(options.is_ignored_provider("json"));
        assert!(options.is_ignored_provider(".xml"));
        assert!(!options.is_ignored_provider("jar"));
    }

    #[test]
    fn test_from_header_rejects_bad_flag() {
        assert!(matches!(
            ImportOptions::from_header("content;overwrite:=maybe"),
            Err(LoaderError::Config(_))
        ));
        assert!(matches!(
            ImportOptions::from_header("content;overwrite"),
            Err(LoaderError::Config(_))
        ));
        assert!(ImportOptions::from_header("").is_err());
    }

    #[test]
    fn test_from_toml_defaults() {
        let options = ImportOptions::from_toml(
            r#"
path = "content"
overwrite = true
ignored_providers = ["xml"]
"#,
        )
        .unwrap();
        assert!(options.overwrite);
        assert!(!options.checkin);
        assert!(options.uninstall);
        assert_eq!(options.target, None);
        assert!(options.is_ignored_provider("xml"));
    }
}
