//! The command's result shape: a chronological log trail plus at most one
//! terminal error.

use serde::Serialize;

/// Collects the log trail and the first unrecoverable error of an
/// invocation.
///
/// Logs accumulate monotonically — a later failure never rolls back
/// already-logged progress markers — and only the first error sticks.
#[derive(Debug, Clone, Default)]
pub struct Report {
    logs: Vec<String>,
    error: Option<ErrorRecord>,
}

impl Report {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a progress line to the log trail.
    pub fn log<S: Into<String>>(&mut self, line: S) {
        let line = line.into();
        tracing::debug!("{line}");
        self.logs.push(line);
    }

    /// Records the terminal error. The first recorded error wins.
    pub fn fail<C: Into<String>, M: Into<String>>(&mut self, code: C, message: M) {
        if self.error.is_none() {
            let record = ErrorRecord {
                error_code: code.into(),
                message: message.into(),
            };
            tracing::debug!("command failed: [{}] {}", record.error_code, record.message);
            self.error = Some(record);
        }
    }

    /// The log lines collected so far.
    pub fn logs(&self) -> &[String] {
        &self.logs
    }

    /// The recorded terminal error, if any.
    pub fn error(&self) -> Option<&ErrorRecord> {
        self.error.as_ref()
    }

    /// Finishes the report into the connector response shape.
    pub fn into_response(self) -> ConnectorResponse {
        ConnectorResponse {
            command_response: CommandResponse {
                body: "{}".to_owned(),
                mimetype: "application/json".to_owned(),
            },
            error: self.error,
            command_response_version: 2,
            logs: self.logs,
        }
    }
}

/// A terminal error: a short machine-readable code plus a human-readable
/// message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRecord {
    /// Machine-readable classification, e.g. `InvalidPath`.
    pub error_code: String,
    /// Human-readable description of the failure.
    pub message: String,
}

/// The inner command response.
///
/// The body is always the literal empty JSON object: success or failure is
/// signaled solely through `error` and the logs.
#[derive(Debug, Clone, Serialize)]
pub struct CommandResponse {
    /// Response payload, always `"{}"`.
    pub body: String,
    /// Payload media type, always `application/json`.
    pub mimetype: String,
}

/// The full response returned to the wrapper.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectorResponse {
    /// The command response payload.
    pub command_response: CommandResponse,
    /// The terminal error, absent on success.
    pub error: Option<ErrorRecord>,
    /// Version of this response shape.
    pub command_response_version: u8,
    /// Chronological log trail of the invocation.
    pub logs: Vec<String>,
}

impl ConnectorResponse {
    /// Serializes the response to the JSON document the wrapper returns.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
