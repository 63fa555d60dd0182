//! Message assembly.
//!
//! [`compose`] builds the whole connector message in one call — plain body,
//! optional HTML alternative, attachments in input order — mirroring the
//! shapes a mail client would produce: a bare `text/plain` part, a
//! `multipart/alternative` when HTML is present, wrapped in a
//! `multipart/mixed` when attachments are present. Bcc recipients are
//! envelope-only and never appear in headers here.

mod encoder;
mod header;
mod mimebody;
mod utf8_b;

use std::time::SystemTime;

pub use self::{
    encoder::ContentTransferEncoding,
    header::Headers,
    mimebody::{MultiPart, MultiPartBuilder, MultiPartKind, Part, SinglePart, SinglePartBuilder},
};

use crate::address::Address;

pub(crate) trait EmailFormat {
    // Use a Vec<u8> instead of an io::Write because the message is assembled
    // in memory before the session transmits it in one piece.
    fn format(&self, out: &mut Vec<u8>);
}

/// A builder for messages.
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    headers: Headers,
}

impl MessageBuilder {
    /// Creates a new default message builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom header.
    pub fn header<V: Into<String>>(mut self, name: &str, value: V) -> Self {
        self.headers.set(name, value);
        self
    }

    /// Set the `Subject:` header.
    pub fn subject(self, subject: &str) -> Self {
        self.header("Subject", subject)
    }

    /// Set the `From:` header.
    pub fn from(self, from: &Address) -> Self {
        self.header("From", from.as_ref())
    }

    /// Set the `To:` header from the raw recipient field.
    pub fn to(self, to: &str) -> Self {
        self.header("To", to)
    }

    /// Set the `Cc:` header from the raw recipient field.
    pub fn cc(self, cc: &str) -> Self {
        self.header("Cc", cc)
    }

    /// Set the `Reply-To:` header.
    pub fn reply_to(self, reply_to: &str) -> Self {
        self.header("Reply-To", reply_to)
    }

    /// Set the `Date:` header to the current date/time.
    pub fn date_now(self) -> Self {
        self.header("Date", httpdate::fmt_http_date(SystemTime::now()))
    }

    /// Set a fresh random `Message-ID:` header under the given domain.
    pub fn message_id(self, domain: &str) -> Self {
        let id: String = std::iter::repeat_with(fastrand::alphanumeric)
            .take(24)
            .collect();
        self.header("Message-ID", format!("<{id}@{domain}>"))
    }

    /// Create a message with a single part body.
    pub fn singlepart(self, part: SinglePart) -> Message {
        self.build(Part::Single(part))
    }

    /// Create a message with a multipart body.
    pub fn multipart(self, part: MultiPart) -> Message {
        self.build(Part::Multi(part))
    }

    fn build(mut self, body: Part) -> Message {
        self.headers.set("MIME-Version", "1.0");
        Message {
            headers: self.headers,
            body,
        }
    }
}

/// An assembled email message, ready to be transmitted.
#[derive(Debug, Clone)]
pub struct Message {
    headers: Headers,
    body: Part,
}

impl Message {
    /// Create a new message builder without headers.
    pub fn builder() -> MessageBuilder {
        MessageBuilder::new()
    }

    /// Get the headers of the message.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Get the message formatted for transmission.
    pub fn formatted(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(self.headers.to_string().as_bytes());
        // The body part's own headers continue the header block; the blank
        // separator line comes from the part serializer.
        self.body.format(&mut out);
        out
    }
}

/// Assembles the connector message.
///
/// Assumes the inputs already passed validation: attachments come from the
/// loader, `from` is a parsed address. Header-level recipients are the raw
/// To/Cc fields as supplied by the caller.
#[allow(clippy::too_many_arguments)]
pub fn compose(
    subject: &str,
    text: &str,
    html: Option<&str>,
    from: &Address,
    to: &str,
    cc: Option<&str>,
    reply_to: Option<&str>,
    attachments: Vec<SinglePart>,
) -> Message {
    let text_part = SinglePart::builder()
        .content_type(&mime::TEXT_PLAIN_UTF_8)
        .body(text, ContentTransferEncoding::for_text(text));

    let body = match html {
        Some(html) => Part::Multi(
            MultiPart::alternative()
                .singlepart(text_part)
                .singlepart(
                    SinglePart::builder()
                        .content_type(&mime::TEXT_HTML_UTF_8)
                        .body(html, ContentTransferEncoding::for_text(html)),
                ),
        ),
        None => Part::Single(text_part),
    };

    let body = if attachments.is_empty() {
        body
    } else {
        let mut mixed = MultiPart::mixed().part(body);
        for part in attachments {
            mixed = mixed.singlepart(part);
        }
        Part::Multi(mixed)
    };

    let mut builder = Message::builder()
        .subject(subject)
        .from(from)
        .to(to)
        .date_now()
        .message_id(from.domain());
    if let Some(cc) = cc {
        builder = builder.cc(cc);
    }
    if let Some(reply_to) = reply_to {
        builder = builder.reply_to(reply_to);
    }

    match body {
        Part::Single(part) => builder.singlepart(part),
        Part::Multi(part) => builder.multipart(part),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sender() -> Address {
        "robot@example.com".parse().unwrap()
    }

    #[test]
    fn text_only_message_is_a_bare_single_part() {
        let message = compose(
            "Hi",
            "Hello!",
            None,
            &sender(),
            "ops@example.com",
            None,
            None,
            Vec::new(),
        );
        let formatted = String::from_utf8(message.formatted()).unwrap();

        assert!(formatted.starts_with("Subject: Hi\r\n"));
        assert!(formatted.contains("From: robot@example.com\r\n"));
        assert!(formatted.contains("To: ops@example.com\r\n"));
        assert!(formatted.contains("MIME-Version: 1.0\r\n"));
        assert!(formatted.contains("Content-Type: text/plain; charset=utf-8\r\n"));
        assert!(formatted.ends_with("\r\n\r\nHello!\r\n"));
        assert!(!formatted.contains("multipart/"));
    }

    #[test]
    fn html_becomes_an_alternative_not_a_replacement() {
        let message = compose(
            "Hi",
            "plain rendition",
            Some("<p>rich rendition</p>"),
            &sender(),
            "ops@example.com",
            None,
            None,
            Vec::new(),
        );
        let formatted = String::from_utf8(message.formatted()).unwrap();

        assert!(formatted.contains("Content-Type: multipart/alternative;"));
        let plain = formatted.find("plain rendition").unwrap();
        let rich = formatted.find("rich rendition").unwrap();
        assert!(plain < rich, "plain part must come first");
    }

    #[test]
    fn attachments_wrap_the_alternative_in_mixed() {
        let attachment = SinglePart::builder()
            .header("Content-Disposition", "attachment; filename=\"a.bin\"")
            .content_type(&mime::APPLICATION_OCTET_STREAM)
            .body(*b"data", ContentTransferEncoding::Base64);

        let message = compose(
            "Hi",
            "plain",
            Some("<p>rich</p>"),
            &sender(),
            "ops@example.com",
            Some("watchers@example.com"),
            Some("replies@example.com"),
            vec![attachment],
        );
        let formatted = String::from_utf8(message.formatted()).unwrap();

        assert!(formatted.contains("Content-Type: multipart/mixed;"));
        assert!(formatted.contains("Content-Type: multipart/alternative;"));
        assert!(formatted.contains("Cc: watchers@example.com\r\n"));
        assert!(formatted.contains("Reply-To: replies@example.com\r\n"));
        assert!(formatted.contains("Content-Disposition: attachment; filename=\"a.bin\"\r\n"));
        let mixed = formatted.find("multipart/mixed").unwrap();
        let alternative = formatted.find("multipart/alternative").unwrap();
        assert!(mixed < alternative, "mixed must be the outer wrapper");
    }

    #[test]
    fn bcc_never_reaches_headers() {
        // compose has no bcc parameter at all; make sure nothing sneaks one
        // in through another field either.
        let message = compose(
            "Hi",
            "body",
            None,
            &sender(),
            "ops@example.com",
            None,
            None,
            Vec::new(),
        );
        assert!(message.headers().get("Bcc").is_none());
    }

    #[test]
    fn stamps_date_and_message_id() {
        let message = compose(
            "Hi",
            "body",
            None,
            &sender(),
            "ops@example.com",
            None,
            None,
            Vec::new(),
        );
        assert!(message.headers().get("Date").unwrap().ends_with("GMT"));
        let message_id = message.headers().get("Message-ID").unwrap();
        assert!(message_id.starts_with('<') && message_id.ends_with("@example.com>"));
    }
}
