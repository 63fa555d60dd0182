//! The `send_email` command: one best-effort composition and delivery.

use std::fs;

use serde::Deserialize;

use crate::{
    address::{Address, Envelope},
    attachment::{self, AttachmentSpec},
    config::{ConnectorConfig, HARD_ATTACHMENTS_LIMIT_MB},
    message,
    report::{ConnectorResponse, Report},
    transport::smtp::{
        authentication::Credentials, SmtpTransport, Stage, Tls, TlsParameters,
    },
};

/// The parsed input fields of one send invocation.
///
/// The wrapper (CLI, HTTP, workflow engine) owns parsing; this struct is the
/// typed boundary it hands the fields across.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendEmail {
    /// SMTP relay host name or address.
    pub smtp_host: String,
    /// SMTP relay port.
    pub smtp_port: u16,
    /// Username for authentication.
    #[serde(default)]
    pub smtp_user: Option<String>,
    /// Password for authentication. Login is skipped unless both user and
    /// password are non-empty.
    #[serde(default)]
    pub smtp_password: Option<String>,
    /// Upgrade the session with STARTTLS before any credentials are sent.
    #[serde(default)]
    pub smtp_starttls: bool,
    /// Subject header value.
    pub email_subject: String,
    /// Plain-text body.
    pub email_body: String,
    /// Optional HTML rendition, added as an alternative to the plain body.
    #[serde(default)]
    pub email_body_html: Option<String>,
    /// To recipients, separated by `,` or `;`.
    pub email_to: String,
    /// Cc recipients, separated by `,` or `;`.
    #[serde(default)]
    pub email_cc: Option<String>,
    /// Bcc recipients — envelope-only, never written to a header.
    #[serde(default)]
    pub email_bcc: Option<String>,
    /// Sender address, used for both the From header and the envelope.
    pub email_from: String,
    /// Reply-To header value.
    #[serde(default)]
    pub email_reply_to: Option<String>,
    /// Attachment descriptors, attached in input order.
    #[serde(default)]
    pub attachments: Vec<AttachmentSpec>,
}

impl SendEmail {
    /// Runs the command: load attachments, assemble the message, resolve the
    /// envelope and deliver.
    ///
    /// Never panics and never returns early without a response: every
    /// failure is reported through the response's error record, and
    /// attachment or input errors short-circuit before any network activity.
    pub fn execute(&self, config: &ConnectorConfig) -> ConnectorResponse {
        let mut report = Report::new();
        let limits = &config.limits;

        let root_display = fs::canonicalize(&config.attachments_root)
            .unwrap_or_else(|_| config.attachments_root.clone());
        report.log(format!("attachments allowed dir: {}", root_display.display()));
        report.log(format!(
            "attachments size limit: {:.2} MB (hard max {} MB)",
            limits.attachment_mb(),
            HARD_ATTACHMENTS_LIMIT_MB
        ));

        let mut parts = Vec::with_capacity(self.attachments.len());
        for (index, spec) in self.attachments.iter().enumerate() {
            match attachment::load(spec, index, &config.attachments_root, limits) {
                Ok(resolved) => {
                    report.log(format!(
                        "attached: {} ({}/{}, {} bytes)",
                        resolved.filename,
                        resolved.maintype(),
                        resolved.subtype(),
                        resolved.payload.len()
                    ));
                    parts.push(resolved.into_part());
                }
                Err(err) => {
                    report.log(format!("attachment error: {err}"));
                    report.fail(err.code(), err.to_string());
                    return report.into_response();
                }
            }
        }

        let from: Address = match self.email_from.trim().parse() {
            Ok(from) => from,
            Err(err) => {
                report.fail(
                    "InvalidInput",
                    format!("Invalid sender address {:?}: {err}", self.email_from),
                );
                return report.into_response();
            }
        };

        let envelope = match Envelope::resolve(
            Some(from.clone()),
            &self.email_to,
            self.email_cc.as_deref(),
            self.email_bcc.as_deref(),
        ) {
            Ok(envelope) => envelope,
            Err(err) => {
                report.fail("InvalidInput", err.to_string());
                return report.into_response();
            }
        };

        let message = message::compose(
            &self.email_subject,
            &self.email_body,
            self.email_body_html.as_deref(),
            &from,
            &self.email_to,
            self.email_cc.as_deref().filter(|cc| !cc.is_empty()),
            self.email_reply_to.as_deref().filter(|rt| !rt.is_empty()),
            parts,
        );

        report.log(format!(
            "will send (smtp timeout: {}s)",
            limits.smtp_timeout.as_secs()
        ));

        let mut builder = SmtpTransport::builder(self.smtp_host.as_str())
            .port(self.smtp_port)
            .timeout(Some(limits.smtp_timeout));

        if self.smtp_starttls {
            match TlsParameters::new(self.smtp_host.clone()) {
                Ok(tls_parameters) => builder = builder.tls(Tls::Required(tls_parameters)),
                Err(err) => {
                    report.log(format!("did error: {err}"));
                    report.fail(Stage::StartTls.error_code(), err.to_string());
                    return report.into_response();
                }
            }
        }

        // A user without a password (or the reverse) skips login silently
        // rather than erroring.
        if let (Some(user), Some(password)) = (
            non_empty(self.smtp_user.as_deref()),
            non_empty(self.smtp_password.as_deref()),
        ) {
            builder = builder.credentials(Credentials::new(user.to_owned(), password.to_owned()));
        }

        if let Err(err) = builder
            .build()
            .send(&envelope, &message.formatted(), &mut report)
        {
            report.log(format!("did error: {err}"));
            report.fail(err.stage.error_code(), err.to_string());
        }

        report.into_response()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
