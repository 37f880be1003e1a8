use std::path::{Path, PathBuf};

use crate::error::{ExtractionError, Result};

/// Map an entry name to its destination below `root`.
///
/// Separators are normalized to `/`, `.` segments are dropped and `..`
/// segments are folded lexically. Absolute names and names that would climb
/// out of `root` are rejected with [`ExtractionError::PathTraversal`]. A name
/// that normalizes to nothing resolves to `root` itself.
///
/// Purely lexical: nothing on disk is consulted.
pub fn resolve(entry_name: &str, root: &Path) -> Result<PathBuf> {
    let traversal = || ExtractionError::PathTraversal {
        entry: entry_name.to_string(),
        root: root.to_path_buf(),
    };

    if entry_name.contains('\0') {
        return Err(ExtractionError::corrupt("entry name contains a NUL byte").with_entry(entry_name));
    }

    let normalized = entry_name.replace('\\', "/");
    if normalized.starts_with('/') || has_drive_prefix(&normalized) {
        return Err(traversal());
    }

    let mut parts: Vec<&str> = Vec::new();
    for segment in normalized.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(traversal());
                }
            }
            part => parts.push(part),
        }
    }

    let mut resolved = root.to_path_buf();
    resolved.extend(&parts);

    // On Windows a segment such as `C:` replaces the whole path when pushed
    if !resolved.starts_with(root) {
        return Err(traversal());
    }

    Ok(resolved)
}

/// `C:`, `c:foo` and friends.
fn has_drive_prefix(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
