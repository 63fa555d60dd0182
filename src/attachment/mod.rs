//! Attachment descriptors and the loader turning them into bounded,
//! MIME-typed payloads.
//!
//! A descriptor carries its content either as a path (confined to the
//! allowed attachments root) or as inline base64. Size limits are enforced
//! twice per source: against the cheap estimate (file metadata, or decoded
//! length computed from the encoded text) before the bytes are materialized,
//! and against the actual byte count afterwards.

mod path;

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use mime::Mime;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    config::{Limits, HARD_ATTACHMENTS_LIMIT_MB},
    message::{ContentTransferEncoding, SinglePart},
};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// An attachment descriptor as supplied by the caller.
///
/// Exactly one of `path` and `content_base64` is expected; when both are
/// present `path` wins.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttachmentSpec {
    /// Filename shown to the recipient. Required, non-blank.
    pub filename: String,
    /// Explicit content type, e.g. `application/pdf`. Guessed from the
    /// filename extension when absent.
    #[serde(default)]
    pub content_type: Option<String>,
    /// Absolute path under the allowed attachments root.
    #[serde(default)]
    pub path: Option<String>,
    /// Inline content, strict standard base64.
    #[serde(default)]
    pub content_base64: Option<String>,
}

enum Source<'a> {
    Path(&'a str),
    Inline(&'a str),
}

impl AttachmentSpec {
    fn source(&self) -> Option<Source<'_>> {
        if let Some(path) = self.path.as_deref().filter(|p| !p.is_empty()) {
            Some(Source::Path(path))
        } else {
            self.content_base64
                .as_deref()
                .filter(|content| !content.is_empty())
                .map(Source::Inline)
        }
    }
}

/// An attachment with its payload materialized and bounded.
#[derive(Debug, Clone)]
pub struct ResolvedAttachment {
    /// Filename shown to the recipient.
    pub filename: String,
    /// Raw payload bytes, length ≤ the effective limit.
    pub payload: Vec<u8>,
    /// Resolved media type.
    pub content_type: Mime,
}

impl ResolvedAttachment {
    /// The type half of the media type, e.g. `application`.
    pub fn maintype(&self) -> &str {
        self.content_type.type_().as_str()
    }

    /// The subtype half of the media type, e.g. `pdf`.
    pub fn subtype(&self) -> &str {
        self.content_type.subtype().as_str()
    }

    /// Builds the MIME part for this attachment.
    pub fn into_part(self) -> SinglePart {
        let filename: String = self
            .filename
            .chars()
            .map(|c| if c.is_control() || c == '"' { '_' } else { c })
            .collect();

        SinglePart::builder()
            .header(
                "Content-Disposition",
                format!("attachment; filename=\"{filename}\""),
            )
            .content_type(&self.content_type)
            .body(self.payload, ContentTransferEncoding::Base64)
    }
}

/// Resolves one attachment descriptor into a bounded payload.
pub fn load(
    spec: &AttachmentSpec,
    index: usize,
    allowed_root: &Path,
    limits: &Limits,
) -> Result<ResolvedAttachment, AttachmentError> {
    let filename = spec.filename.trim();
    if filename.is_empty() {
        return Err(AttachmentError::MissingFilename { index });
    }

    let payload = match spec.source() {
        Some(Source::Path(raw)) => {
            let safe_path = path::validate_attachment_path(raw, allowed_root)?;
            let metadata = fs::metadata(&safe_path).map_err(|source| AttachmentError::Io {
                path: safe_path.clone(),
                source,
            })?;
            if !metadata.is_file() {
                return Err(AttachmentError::FileNotFound { path: safe_path });
            }

            // Size check before reading into memory
            enforce_limit(filename, metadata.len(), limits)?;

            let payload = fs::read(&safe_path).map_err(|source| AttachmentError::Io {
                path: safe_path.clone(),
                source,
            })?;

            // The file may have grown between stat and read
            enforce_limit(filename, payload.len() as u64, limits)?;
            payload
        }
        Some(Source::Inline(text)) => {
            // Estimate the decoded size first to avoid decoding a massive string
            enforce_limit(filename, estimated_base64_len(text), limits)?;

            let payload =
                BASE64
                    .decode(text)
                    .map_err(|source| AttachmentError::InvalidBase64 {
                        filename: filename.to_owned(),
                        source,
                    })?;

            enforce_limit(filename, payload.len() as u64, limits)?;
            payload
        }
        None => {
            return Err(AttachmentError::MissingSource {
                filename: filename.to_owned(),
            });
        }
    };

    Ok(ResolvedAttachment {
        filename: filename.to_owned(),
        payload,
        content_type: guess_content_type(filename, spec.content_type.as_deref()),
    })
}

fn enforce_limit(filename: &str, size: u64, limits: &Limits) -> Result<(), AttachmentError> {
    if size > limits.attachment_bytes {
        Err(AttachmentError::TooLarge {
            filename: filename.to_owned(),
            actual_mb: size as f64 / BYTES_PER_MB,
            limit_mb: limits.attachment_mb(),
        })
    } else {
        Ok(())
    }
}

/// Estimates the decoded size of base64 text without decoding it:
/// `len * 3 / 4 - padding`, computed over the whitespace-stripped text.
fn estimated_base64_len(text: &str) -> u64 {
    let cleaned: String = text.split_whitespace().collect();
    if cleaned.is_empty() {
        return 0;
    }
    let padding = if cleaned.ends_with("==") {
        2
    } else if cleaned.ends_with('=') {
        1
    } else {
        0
    };
    (cleaned.len() as u64 * 3 / 4).saturating_sub(padding)
}

fn guess_content_type(filename: &str, explicit: Option<&str>) -> Mime {
    if let Some(explicit) = explicit {
        if explicit.contains('/') {
            if let Ok(mime) = explicit.parse::<Mime>() {
                return mime;
            }
        }
    }

    mime_guess::from_path(filename)
        .first()
        .unwrap_or(mime::APPLICATION_OCTET_STREAM)
}

/// The errors that may occur while resolving an attachment descriptor.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AttachmentError {
    /// The descriptor has no usable filename.
    #[error("Attachment #{index} missing required field 'filename'.")]
    MissingFilename {
        /// Zero-based position of the descriptor in the request.
        index: usize,
    },

    /// Neither `path` nor `content_base64` was given.
    #[error("Attachment '{filename}' must provide either 'path' or 'content_base64'.")]
    MissingSource {
        /// Filename from the descriptor.
        filename: String,
    },

    /// The `path` field was present but empty.
    #[error("Attachment 'path' must be a non-empty string.")]
    EmptyPath,

    /// Windows drive-letter or UNC path, rejected on every host.
    #[error("Attachment path must be under '{root}'. Windows/UNC paths are not allowed: {path:?}")]
    WindowsPath {
        /// The path as supplied.
        path: String,
        /// The canonical allowed root.
        root: String,
    },

    /// The path is not absolute.
    #[error("Attachment path must be an absolute path under '{root}'. Got: {path:?}")]
    NotAbsolute {
        /// The path as supplied.
        path: String,
        /// The canonical allowed root.
        root: String,
    },

    /// The canonical path is not the allowed root or a descendant of it.
    #[error("Attachment path must be under '{root}'. Got: {path:?}")]
    OutsideRoot {
        /// The path as supplied.
        path: String,
        /// The canonical allowed root.
        root: String,
    },

    /// The path passed the guard but no regular file exists there.
    #[error("No such file in attachments folder: {}", .path.display())]
    FileNotFound {
        /// The resolved path.
        path: PathBuf,
    },

    /// Reading the file failed after the guard accepted it.
    #[error("Failed reading attachment file '{}': {source}", .path.display())]
    Io {
        /// The resolved path.
        path: PathBuf,
        /// The underlying I/O failure.
        source: io::Error,
    },

    /// The inline content is not valid strict base64.
    #[error("Attachment '{filename}' has invalid base64 content: {source}")]
    InvalidBase64 {
        /// Filename from the descriptor.
        filename: String,
        /// The underlying decode failure.
        source: base64::DecodeError,
    },

    /// The payload exceeds the effective size limit.
    #[error(
        "Attachment '{filename}' is too large: {actual_mb:.2} MB. Limit is {limit_mb:.2} MB (hard max {hard} MB).",
        hard = HARD_ATTACHMENTS_LIMIT_MB
    )]
    TooLarge {
        /// Filename from the descriptor.
        filename: String,
        /// Observed (or estimated) payload size in megabytes.
        actual_mb: f64,
        /// Effective limit in megabytes it was checked against.
        limit_mb: f64,
    },
}

impl AttachmentError {
    /// Machine-readable error code for the connector response.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingFilename { .. } | Self::MissingSource { .. } => "InvalidInput",
            Self::EmptyPath
            | Self::WindowsPath { .. }
            | Self::NotAbsolute { .. }
            | Self::OutsideRoot { .. } => "InvalidPath",
            Self::FileNotFound { .. } | Self::Io { .. } => "FileNotFound",
            Self::InvalidBase64 { .. } => "InvalidBase64",
            Self::TooLarge { .. } => "AttachmentTooLarge",
        }
    }
}
