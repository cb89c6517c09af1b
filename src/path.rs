//! Virtual path handling
//!
//! Paths in the namespace are absolute, `/`-separated strings with no trailing
//! separator (except the root itself). They never touch the host filesystem.

use crate::error::FsError;
use unicode_normalization::UnicodeNormalization;

pub const ROOT: &str = "/";
pub const SEPARATOR: char = '/';

/// Normalize an absolute path: collapse repeated separators, resolve `.` and `..`
///
/// `..` above the root stays at the root.
pub fn normalize(path: &str) -> Result<String, FsError> {
    if !path.starts_with(SEPARATOR) {
        return Err(FsError::InvalidPath(format!("'{}' is not absolute", path)));
    }
    let mut parts: Vec<String> = Vec::new();
    for component in path.split(SEPARATOR) {
        match component {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            name => parts.push(name.nfc().collect()),
        }
    }
    if parts.is_empty() {
        return Ok(ROOT.to_string());
    }
    Ok(format!("/{}", parts.join("/")))
}

/// Validate and NFC-normalize a leaf name
pub fn validate_name(name: &str) -> Result<String, FsError> {
    let name: String = name.nfc().collect();
    if name.is_empty() {
        return Err(FsError::InvalidPath("name must not be empty".to_string()));
    }
    if name.contains(SEPARATOR) {
        return Err(FsError::InvalidPath(format!(
            "name '{}' must not contain '{}'",
            name, SEPARATOR
        )));
    }
    if name == "." || name == ".." {
        return Err(FsError::InvalidPath(format!("'{}' is reserved", name)));
    }
    Ok(name)
}

/// Validate a username: a valid leaf name without control characters
///
/// Usernames become home directory names and trash index key prefixes.
pub fn validate_user(user: &str) -> Result<String, FsError> {
    let user = validate_name(user)?;
    if user.chars().any(char::is_control) {
        return Err(FsError::InvalidPath(format!(
            "user '{}' must not contain control characters",
            user.escape_default()
        )));
    }
    Ok(user)
}

/// Join a directory path and a leaf name
pub fn join(parent: &str, name: &str) -> String {
    if parent == ROOT {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Split a normalized path into (parent, name). The root has no parent.
pub fn split(path: &str) -> Option<(String, String)> {
    if path == ROOT {
        return None;
    }
    let idx = path.rfind(SEPARATOR)?;
    let parent = if idx == 0 { ROOT } else { &path[..idx] };
    Some((parent.to_string(), path[idx + 1..].to_string()))
}

/// True when `path` equals `ancestor` or lies beneath it
pub fn is_within(path: &str, ancestor: &str) -> bool {
    if ancestor == ROOT || path == ancestor {
        return true;
    }
    path.strip_prefix(ancestor)
        .map(|rest| rest.starts_with(SEPARATOR))
        .unwrap_or(false)
}

/// Replace the `old` prefix of `path` with `new`. Caller guarantees `is_within(path, old)`.
pub fn rebase(path: &str, old: &str, new: &str) -> String {
    if path == old {
        return new.to_string();
    }
    let rest = if old == ROOT { &path[1..] } else { &path[old.len() + 1..] };
    join(new, rest)
}

/// Disambiguated variant of a name: `"doc.txt (2)"`
pub fn numbered_name(name: &str, n: u32) -> String {
    format!("{} ({})", name, n)
}
