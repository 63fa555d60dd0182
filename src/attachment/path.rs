//! Attachment path confinement.
//!
//! This is the single security boundary between attachment descriptors and
//! the filesystem: every path-based attachment goes through
//! [`validate_attachment_path`] before any file is opened.

use std::{
    fs, io,
    path::{Component, Path, PathBuf},
};

use super::AttachmentError;

/// Validates that `raw` names a file inside `allowed_root` and returns the
/// canonical path, safe to open.
///
/// Windows drive-letter and UNC shapes are rejected on every host so the
/// behavior does not depend on the platform the connector runs on.
/// Containment is decided on canonical paths (symlinks and `..` resolved)
/// using a component-wise prefix check, so `/attachments-evil` is never
/// treated as a child of `/attachments`.
pub(crate) fn validate_attachment_path(
    raw: &str,
    allowed_root: &Path,
) -> Result<PathBuf, AttachmentError> {
    if raw.is_empty() {
        return Err(AttachmentError::EmptyPath);
    }

    let root = fs::canonicalize(allowed_root)
        .unwrap_or_else(|_| normalize_lexically(allowed_root));

    if raw.chars().take(3).any(|c| c == ':') || raw.starts_with("\\\\") {
        return Err(AttachmentError::WindowsPath {
            path: raw.to_owned(),
            root: root.display().to_string(),
        });
    }

    let path = Path::new(raw);
    if !path.is_absolute() {
        return Err(AttachmentError::NotAbsolute {
            path: raw.to_owned(),
            root: root.display().to_string(),
        });
    }

    // Lexical check first, so escapes through nonexistent paths are still
    // reported as a containment violation rather than a missing file.
    if !normalize_lexically(path).starts_with(&root) {
        return Err(AttachmentError::OutsideRoot {
            path: raw.to_owned(),
            root: root.display().to_string(),
        });
    }

    let candidate = match fs::canonicalize(path) {
        Ok(candidate) => candidate,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(AttachmentError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(source) => {
            return Err(AttachmentError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    if candidate == root || candidate.starts_with(&root) {
        Ok(candidate)
    } else {
        Err(AttachmentError::OutsideRoot {
            path: raw.to_owned(),
            root: root.display().to_string(),
        })
    }
}

/// Resolves `.` and `..` segments without touching the filesystem.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::RootDir | Component::Prefix(_) => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}
