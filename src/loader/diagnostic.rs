//! Diagnostics reported at the end of an import session.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// A reference-typed property whose target never became resolvable during the import.
///
/// This is not an error: the target may live outside the imported content or may be added by a
/// later import. The property keeps whatever identifiers could be resolved.
///
/// ```
/// # use content_loader::loader::UnresolvedReference;
/// let unresolved = UnresolvedReference {
///     property_path: "/content/a/related".to_string(),
///     target_path: "/content/b".to_string(),
/// };
/// assert_eq!(unresolved.to_string(), "/content/a/related -> /content/b");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnresolvedReference {
    /// Absolute path of the property awaiting the identifier
    pub property_path: String,
    /// Absolute path of the node whose identifier is required
    pub target_path: String,
}

impl Display for UnresolvedReference {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{} -> {}", self.property_path, self.target_path)
    }
}
