//! Connector configuration.
//!
//! Everything here is resolved exactly once per invocation, from the process
//! environment, and then passed by reference through the pipeline. Resolution
//! is total: bad values fall back to defaults, and requested limits are
//! clamped to hard ceilings, so building a configuration can never fail.

use std::{env, path::PathBuf, time::Duration};

/// The only directory path-based attachments may be read from.
///
/// Deployments mount the host folder there; see [`ConnectorConfig`].
pub const ATTACHMENTS_DIR_ENV: &str = "MISSIVE_ATTACHMENTS_DIR";

/// Requested attachment size limit, in megabytes.
pub const ATTACHMENTS_LIMIT_ENV: &str = "MISSIVE_ATTACHMENTS_LIMIT_MB";

/// SMTP session timeout, in seconds.
pub const SMTP_TIMEOUT_ENV: &str = "MISSIVE_SMTP_TIMEOUT_SECONDS";

/// Ceiling no configured attachment limit may exceed.
pub const HARD_ATTACHMENTS_LIMIT_MB: u64 = 100;

/// Attachment limit used when the setting is absent or unusable.
pub const DEFAULT_ATTACHMENTS_LIMIT_MB: u64 = 100;

/// Session timeout used when the setting is absent or unusable.
pub const DEFAULT_SMTP_TIMEOUT_SECONDS: u64 = 30;

const DEFAULT_ATTACHMENTS_DIR: &str = "/attachments";

/// Effective per-invocation limits, clamped to hard ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum size of a single attachment, in bytes.
    pub attachment_bytes: u64,
    /// Socket timeout applied to the whole SMTP session.
    pub smtp_timeout: Duration,
}

impl Limits {
    /// Resolves limits through a settings lookup function.
    ///
    /// Absent, blank or non-numeric values use the defaults; values ≤ 0
    /// revert to the defaults; the attachment limit is clamped to
    /// [`HARD_ATTACHMENTS_LIMIT_MB`].
    pub fn resolve<F>(get: F) -> Limits
    where
        F: Fn(&str) -> Option<String>,
    {
        let requested_mb = match int_setting(&get, ATTACHMENTS_LIMIT_ENV) {
            Some(mb) if mb > 0 => mb as u64,
            _ => DEFAULT_ATTACHMENTS_LIMIT_MB,
        };
        let effective_mb = requested_mb.min(HARD_ATTACHMENTS_LIMIT_MB);

        let timeout_secs = match int_setting(&get, SMTP_TIMEOUT_ENV) {
            Some(secs) if secs > 0 => secs as u64,
            _ => DEFAULT_SMTP_TIMEOUT_SECONDS,
        };

        Limits {
            attachment_bytes: effective_mb * 1024 * 1024,
            smtp_timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Resolves limits from the process environment.
    pub fn from_env() -> Limits {
        Limits::resolve(|name| env::var(name).ok())
    }

    /// The effective attachment limit in megabytes, for limit messages.
    pub fn attachment_mb(&self) -> f64 {
        self.attachment_bytes as f64 / (1024.0 * 1024.0)
    }
}

impl Default for Limits {
    fn default() -> Self {
        Limits::resolve(|_| None)
    }
}

/// Full configuration surface read by a single invocation.
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    /// Root directory path-based attachments are confined to.
    pub attachments_root: PathBuf,
    /// Effective limits for this invocation.
    pub limits: Limits,
}

impl ConnectorConfig {
    /// Builds a configuration through a settings lookup function.
    pub fn resolve<F>(get: F) -> ConnectorConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let root = get(ATTACHMENTS_DIR_ENV)
            .filter(|dir| !dir.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ATTACHMENTS_DIR.to_owned());

        ConnectorConfig {
            attachments_root: PathBuf::from(root),
            limits: Limits::resolve(get),
        }
    }

    /// Builds a configuration from the process environment.
    pub fn from_env() -> ConnectorConfig {
        ConnectorConfig::resolve(|name| env::var(name).ok())
    }
}

fn int_setting<F>(get: &F, name: &str) -> Option<i64>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = get(name)?;
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse().ok()
}
