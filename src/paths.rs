//! Slash-separated store path helpers.
//!
//! Store paths are absolute (`/a/b/c`), the store root is `/`. Relative paths coming from import
//! sources may start with any number of `../` segments followed by any number of `./` segments;
//! [absolute] resolves exactly those leading markers and nothing else. An embedded `..` or `.`
//! further into the path is passed to the store untouched.

use crate::error::LoaderError;

pub const SEPARATOR: char = '/';
pub const ROOT: &str = "/";

const PARENT_PREFIX: &str = "../";
const CURRENT_PREFIX: &str = "./";

/// Resolve `relative` against the absolute `base` path.
///
/// ```
/// # use content_loader::paths::absolute;
/// assert_eq!(absolute("/a/b", "../x").unwrap(), "/a/x");
/// assert_eq!(absolute("/a/b", "./x").unwrap(), "/a/b/x");
/// assert_eq!(absolute("/a/b", "/x/y").unwrap(), "/x/y");
/// assert!(absolute("/a", "../../x").is_err());
/// ```
pub fn absolute(base: &str, relative: &str) -> Result<String, LoaderError> {
    if relative.starts_with(SEPARATOR) {
        return Ok(relative.to_string());
    }

    let mut base = base.to_string();
    let mut rest = relative;
    while let Some(stripped) = rest.strip_prefix(PARENT_PREFIX) {
        base = parent_of(&base).ok_or_else(|| {
            LoaderError::Path(format!(
                "cannot resolve '{relative}' against '{base}': no parent to ascend to"
            ))
        })?;
        rest = stripped;
    }
    while let Some(stripped) = rest.strip_prefix(CURRENT_PREFIX) {
        rest = stripped;
    }

    let res = join(&base, rest);
    tracing::trace!("absolute: resolved '{}' against '{}' to '{}'", relative, base, res);
    Ok(res)
}

/// Join a child name (or relative remainder) onto a parent path with a single separator.
pub fn join(parent: &str, name: &str) -> String {
    if parent.ends_with(SEPARATOR) {
        format!("{parent}{name}")
    } else {
        format!("{parent}{SEPARATOR}{name}")
    }
}

/// The last segment of a path, or the whole string if it holds no separator.
pub fn name_of(path: &str) -> &str {
    match path.rfind(SEPARATOR) {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// The path of the item containing `path`.
///
/// Returns `None` for the root and for bare names, which have no addressable parent.
pub fn parent_of(path: &str) -> Option<String> {
    match path.rfind(SEPARATOR) {
        None => None,
        Some(0) if path.len() == 1 => None,
        Some(0) => Some(ROOT.to_string()),
        Some(idx) => Some(path[..idx].to_string()),
    }
}
