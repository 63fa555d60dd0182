//! missive is the composition-and-delivery core of an SMTP workflow
//! connector: it validates and bounds attachment sources, assembles a
//! multipart MIME message, and performs a single best-effort delivery over an
//! SMTP session with optional STARTTLS and authentication.
//!
//! The crate is deliberately wrapper-agnostic. Argument parsing, HTTP
//! plumbing and process configuration belong to the caller; this crate takes
//! already-parsed fields ([`SendEmail`]) plus a [`ConnectorConfig`] resolved
//! once per invocation, and returns a structured [`ConnectorResponse`] with a
//! chronological log trail and at most one terminal error.
//!
//! ## Example
//!
//! ```rust,no_run
//! use missive::{ConnectorConfig, SendEmail};
//!
//! let command = SendEmail {
//!     smtp_host: "smtp.example.com".to_owned(),
//!     smtp_port: 587,
//!     smtp_starttls: true,
//!     smtp_user: Some("user".to_owned()),
//!     smtp_password: Some("secret".to_owned()),
//!     email_subject: "Monthly report".to_owned(),
//!     email_body: "See attached.".to_owned(),
//!     email_from: "robot@example.com".to_owned(),
//!     email_to: "ops@example.com".to_owned(),
//!     ..SendEmail::default()
//! };
//!
//! let response = command.execute(&ConnectorConfig::from_env());
//! assert!(response.error.is_none());
//! ```
//!
//! ## Security model
//!
//! Attachment descriptors are the only place where untrusted structured
//! input reaches the filesystem. Path-based attachments are confined to a
//! single allowed root directory (symlinks and `..` resolved before the
//! containment check), and both path and inline base64 sources are bounded
//! by a configurable size limit with a hard 100 MB ceiling, enforced before
//! *and* after the bytes are materialized.

#![doc(html_root_url = "https://docs.rs/missive/0.1.0")]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod address;
pub mod attachment;
pub mod command;
pub mod config;
pub mod message;
pub mod report;
pub mod transport;

pub use crate::{
    address::{Address, Envelope},
    attachment::AttachmentSpec,
    command::SendEmail,
    config::{ConnectorConfig, Limits},
    message::Message,
    report::ConnectorResponse,
};

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;
