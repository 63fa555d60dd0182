//! The SMTP transport sends emails using the SMTP protocol.
//!
//! This client follows [RFC 5321](https://tools.ietf.org/html/rfc5321), and
//! is designed to send emails to a relay server, relying on the relay for
//! sanity and RFC compliance checks. It implements the following extensions:
//!
//! * 8BITMIME ([RFC 6152](https://tools.ietf.org/html/rfc6152))
//! * AUTH ([RFC 4954](http://tools.ietf.org/html/rfc4954)) with PLAIN and LOGIN mechanisms
//! * STARTTLS ([RFC 2487](http://tools.ietf.org/html/rfc2487))
//!
//! A transport performs exactly one delivery per [`SmtpTransport::send`]
//! call, over its own connection, walking the session through
//! `Connected → (TLSUpgraded) → (Authenticated) → Sent`. TLS upgrade happens
//! only when requested ([`Tls::Required`]); authentication only when
//! credentials are present. A failure at any stage aborts the remaining
//! stages, and the connection is torn down on every exit path — nothing is
//! reused across invocations.

pub mod authentication;
pub mod client;
pub mod commands;
pub mod error;
pub mod extension;
pub mod response;

use std::{
    error::Error as StdError,
    fmt::{self, Display, Formatter},
    time::Duration,
};

pub use self::error::Error;
use self::{
    authentication::{Credentials, Mechanism, DEFAULT_MECHANISMS},
    client::SmtpConnection,
    extension::ClientId,
};
pub use self::client::TlsParameters;
use crate::{address::Envelope, report::Report};

// Registered port numbers:
// https://www.iana.org/assignments/service-names-port-numbers/service-names-port-numbers.xhtml

/// Default smtp port
pub const SMTP_PORT: u16 = 25;
/// Default submission port
pub const SUBMISSION_PORT: u16 = 587;

/// Default timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How to apply TLS to the client connection
#[derive(Clone, Debug, Default)]
pub enum Tls {
    /// Plaintext connection only
    #[default]
    None,
    /// Start with a plaintext connection and require `STARTTLS`
    Required(TlsParameters),
}

/// Stages of a delivery session, used to classify failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Opening the connection and the EHLO exchange
    Connect,
    /// The STARTTLS upgrade
    StartTls,
    /// Authentication
    Auth,
    /// MAIL/RCPT/DATA and message transmission
    Send,
}

impl Stage {
    /// Machine-readable error code for failures in this stage.
    pub fn error_code(self) -> &'static str {
        match self {
            Stage::Connect => "ConnectionError",
            Stage::StartTls => "TLSError",
            Stage::Auth => "AuthError",
            Stage::Send => "SendError",
        }
    }
}

/// A transport failure, classified by the session stage it happened in.
#[derive(Debug)]
pub struct DeliveryError {
    /// The stage the session failed in.
    pub stage: Stage,
    /// The underlying transport failure.
    pub source: Error,
}

impl Display for DeliveryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.source.fmt(f)
    }
}

impl StdError for DeliveryError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.source)
    }
}

/// Sends emails using the SMTP protocol, one connection per send.
#[derive(Clone, Debug)]
pub struct SmtpTransport {
    info: SmtpInfo,
}

impl SmtpTransport {
    /// Creates a new SMTP client builder.
    ///
    /// Defaults are: no authentication, no TLS, port 587, a 30 seconds
    /// timeout for the whole session.
    pub fn builder<T: Into<String>>(server: T) -> SmtpTransportBuilder {
        SmtpTransportBuilder {
            info: SmtpInfo {
                server: server.into(),
                ..SmtpInfo::default()
            },
        }
    }

    /// Delivers a message to the envelope recipients.
    ///
    /// Progress markers for the optional stages are appended to `report` as
    /// they are reached. The connection is closed before returning,
    /// regardless of the outcome.
    pub fn send(
        &self,
        envelope: &Envelope,
        email: &[u8],
        report: &mut Report,
    ) -> Result<(), DeliveryError> {
        let mut conn = SmtpConnection::connect(
            (self.info.server.as_str(), self.info.port),
            self.info.timeout,
            &self.info.hello_name,
        )
        .map_err(|source| DeliveryError {
            stage: Stage::Connect,
            source,
        })?;

        let result = self.transact(&mut conn, envelope, email, report);
        if result.is_ok() {
            let _ = conn.quit();
        } else {
            conn.abort();
        }
        result
    }

    fn transact(
        &self,
        conn: &mut SmtpConnection,
        envelope: &Envelope,
        email: &[u8],
        report: &mut Report,
    ) -> Result<(), DeliveryError> {
        if let Tls::Required(ref tls_parameters) = self.info.tls {
            report.log("will starttls");
            conn.starttls(tls_parameters, &self.info.hello_name)
                .map_err(|source| DeliveryError {
                    stage: Stage::StartTls,
                    source,
                })?;
        }

        if let Some(ref credentials) = self.info.credentials {
            report.log("will login");
            conn.auth(&self.info.authentication, credentials)
                .map_err(|source| DeliveryError {
                    stage: Stage::Auth,
                    source,
                })?;
            report.log("did login");
        }

        conn.send(envelope, email).map_err(|source| DeliveryError {
            stage: Stage::Send,
            source,
        })?;
        report.log(format!("did send to {} recipient(s)", envelope.to().len()));

        Ok(())
    }
}

#[derive(Clone, Debug)]
struct SmtpInfo {
    /// Name sent during EHLO
    hello_name: ClientId,
    /// Server we are connecting to
    server: String,
    /// Port to connect to
    port: u16,
    /// TLS security configuration
    tls: Tls,
    /// Accepted authentication mechanisms
    authentication: Vec<Mechanism>,
    /// Credentials
    credentials: Option<Credentials>,
    /// Socket timeout for the whole session
    timeout: Option<Duration>,
}

impl Default for SmtpInfo {
    fn default() -> Self {
        Self {
            server: "localhost".to_owned(),
            port: SUBMISSION_PORT,
            hello_name: ClientId::default(),
            credentials: None,
            authentication: DEFAULT_MECHANISMS.into(),
            timeout: Some(DEFAULT_TIMEOUT),
            tls: Tls::None,
        }
    }
}

/// Builder for the SMTP [`SmtpTransport`]
#[derive(Clone, Debug)]
pub struct SmtpTransportBuilder {
    info: SmtpInfo,
}

impl SmtpTransportBuilder {
    /// Set the name used during EHLO
    pub fn hello_name(mut self, name: ClientId) -> Self {
        self.info.hello_name = name;
        self
    }

    /// Set the credentials used for authentication
    pub fn credentials<C: Into<Credentials>>(mut self, credentials: C) -> Self {
        self.info.credentials = Some(credentials.into());
        self
    }

    /// Set the authentication mechanisms to try
    pub fn authentication(mut self, mechanisms: Vec<Mechanism>) -> Self {
        self.info.authentication = mechanisms;
        self
    }

    /// Set the session timeout
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.info.timeout = timeout;
        self
    }

    /// Set the port to use
    pub fn port(mut self, port: u16) -> Self {
        self.info.port = port;
        self
    }

    /// Set the TLS settings to use
    pub fn tls(mut self, tls: Tls) -> Self {
        self.info.tls = tls;
        self
    }

    /// Build the transport
    pub fn build(self) -> SmtpTransport {
        SmtpTransport { info: self.info }
    }
}
