//! MIME body tree: single parts, multiparts and their builders.

use mime::Mime;

use super::{
    encoder::{self, ContentTransferEncoding},
    header::Headers,
    EmailFormat,
};

/// MIME part variants.
#[derive(Debug, Clone)]
pub enum Part {
    /// Single part with content
    Single(SinglePart),
    /// Multiple parts of content
    Multi(MultiPart),
}

impl EmailFormat for Part {
    fn format(&self, out: &mut Vec<u8>) {
        match self {
            Part::Single(part) => part.format(out),
            Part::Multi(part) => part.format(out),
        }
    }
}

impl Part {
    /// Get the part formatted for transmission.
    pub fn formatted(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.format(&mut out);
        out
    }
}

/// Builder for a single part.
#[derive(Debug, Clone, Default)]
pub struct SinglePartBuilder {
    headers: Headers,
}

impl SinglePartBuilder {
    /// Creates a default singlepart builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a header on the part.
    pub fn header<V: Into<String>>(mut self, name: &str, value: V) -> Self {
        self.headers.set(name, value);
        self
    }

    /// Sets the `Content-Type` header of the part.
    pub fn content_type(self, content_type: &Mime) -> Self {
        self.header("Content-Type", content_type.to_string())
    }

    /// Encodes the body and builds the part.
    pub fn body<T: AsRef<[u8]>>(mut self, content: T, encoding: ContentTransferEncoding) -> SinglePart {
        self.headers
            .set("Content-Transfer-Encoding", encoding.to_string());
        SinglePart {
            headers: self.headers,
            body: encoder::encode(content.as_ref(), encoding),
        }
    }
}

/// Single part with already-encoded content.
#[derive(Debug, Clone)]
pub struct SinglePart {
    headers: Headers,
    body: Vec<u8>,
}

impl SinglePart {
    /// Creates a builder for a singlepart.
    pub fn builder() -> SinglePartBuilder {
        SinglePartBuilder::new()
    }

    /// Get the headers of the part.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Get the encoded body.
    pub fn raw_body(&self) -> &[u8] {
        &self.body
    }

    /// Get the part formatted for transmission.
    pub fn formatted(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.format(&mut out);
        out
    }
}

impl EmailFormat for SinglePart {
    fn format(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.headers.to_string().as_bytes());
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.body);
        out.extend_from_slice(b"\r\n");
    }
}

/// The kind of multipart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiPartKind {
    /// Mixed kind, combining unrelated parts — the message body plus its
    /// attachments.
    Mixed,
    /// Alternative kind, joining several renditions of the same content —
    /// plain text and HTML.
    Alternative,
}

impl MultiPartKind {
    fn subtype(self) -> &'static str {
        match self {
            Self::Mixed => "mixed",
            Self::Alternative => "alternative",
        }
    }
}

/// Create a random MIME boundary.
fn make_boundary() -> String {
    std::iter::repeat_with(fastrand::alphanumeric).take(40).collect()
}

/// Multipart builder.
#[derive(Debug, Clone)]
pub struct MultiPartBuilder {
    kind: MultiPartKind,
    boundary: Option<String>,
}

impl MultiPartBuilder {
    /// Set a custom boundary instead of a random one.
    pub fn boundary<S: Into<String>>(mut self, boundary: S) -> Self {
        self.boundary = Some(boundary.into());
        self
    }

    /// Creates a multipart without parts.
    pub fn build(self) -> MultiPart {
        let boundary = self.boundary.unwrap_or_else(make_boundary);
        let mut headers = Headers::new();
        headers.set(
            "Content-Type",
            format!(
                "multipart/{}; boundary=\"{}\"",
                self.kind.subtype(),
                boundary
            ),
        );
        MultiPart {
            headers,
            boundary,
            parts: Vec::new(),
        }
    }

    /// Creates a multipart from a part.
    pub fn part(self, part: Part) -> MultiPart {
        self.build().part(part)
    }

    /// Creates a multipart from a singlepart.
    pub fn singlepart(self, part: SinglePart) -> MultiPart {
        self.build().singlepart(part)
    }

    /// Creates a multipart from a multipart.
    pub fn multipart(self, part: MultiPart) -> MultiPart {
        self.build().multipart(part)
    }
}

/// Multipart variant with parts.
#[derive(Debug, Clone)]
pub struct MultiPart {
    headers: Headers,
    boundary: String,
    parts: Vec<Part>,
}

impl MultiPart {
    /// Creates a mixed multipart builder.
    pub fn mixed() -> MultiPartBuilder {
        MultiPartBuilder {
            kind: MultiPartKind::Mixed,
            boundary: None,
        }
    }

    /// Creates an alternative multipart builder.
    pub fn alternative() -> MultiPartBuilder {
        MultiPartBuilder {
            kind: MultiPartKind::Alternative,
            boundary: None,
        }
    }

    /// Add a part to the multipart.
    pub fn part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// Add a single part to the multipart.
    pub fn singlepart(mut self, part: SinglePart) -> Self {
        self.parts.push(Part::Single(part));
        self
    }

    /// Add a nested multipart to the multipart.
    pub fn multipart(mut self, part: MultiPart) -> Self {
        self.parts.push(Part::Multi(part));
        self
    }

    /// The boundary separating this multipart's parts.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Get the headers of the multipart.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Get the parts of the multipart.
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Get the multipart formatted for transmission.
    pub fn formatted(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.format(&mut out);
        out
    }
}

impl EmailFormat for MultiPart {
    fn format(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.headers.to_string().as_bytes());
        out.extend_from_slice(b"\r\n");

        for part in &self.parts {
            out.extend_from_slice(b"--");
            out.extend_from_slice(self.boundary.as_bytes());
            out.extend_from_slice(b"\r\n");
            part.format(out);
        }

        out.extend_from_slice(b"--");
        out.extend_from_slice(self.boundary.as_bytes());
        out.extend_from_slice(b"--\r\n");
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    const BOUNDARY: &str = "F2mTKN843loAAAAA8porEdAjCKhArPxGeahYoZYSftse1GT";

    fn text_part(content: &str) -> SinglePart {
        SinglePart::builder()
            .content_type(&mime::TEXT_PLAIN_UTF_8)
            .body(content, ContentTransferEncoding::SevenBit)
    }

    #[test]
    fn single_part_seven_bit() {
        let part = text_part("Hello world!");
        assert_eq!(
            part.headers().get("Content-Transfer-Encoding"),
            Some("7bit")
        );
        assert_eq!(part.raw_body(), b"Hello world!");
        assert_eq!(
            String::from_utf8(part.formatted()).unwrap(),
            concat!(
                "Content-Type: text/plain; charset=utf-8\r\n",
                "Content-Transfer-Encoding: 7bit\r\n",
                "\r\n",
                "Hello world!\r\n"
            )
        );
    }

    #[test]
    fn single_part_quoted_printable() {
        let part = SinglePart::builder()
            .content_type(&mime::TEXT_PLAIN_UTF_8)
            .body(
                "Текст письма в уникоде",
                ContentTransferEncoding::QuotedPrintable,
            );
        assert_eq!(
            String::from_utf8(part.formatted()).unwrap(),
            concat!(
                "Content-Type: text/plain; charset=utf-8\r\n",
                "Content-Transfer-Encoding: quoted-printable\r\n",
                "\r\n",
                "=D0=A2=D0=B5=D0=BA=D1=81=D1=82 =D0=BF=D0=B8=D1=81=D1=8C=D0=BC=D0=B0 =D0=B2 =\r\n",
                "=D1=83=D0=BD=D0=B8=D0=BA=D0=BE=D0=B4=D0=B5\r\n"
            )
        );
    }

    #[test]
    fn multi_part_alternative() {
        let part = MultiPart::alternative()
            .boundary(BOUNDARY)
            .singlepart(text_part("Plain text"))
            .singlepart(
                SinglePart::builder()
                    .content_type(&mime::TEXT_HTML_UTF_8)
                    .body("<p>Rich text</p>", ContentTransferEncoding::SevenBit),
            );

        assert_eq!(part.parts().len(), 2);
        assert_eq!(part.boundary(), BOUNDARY);
        assert_eq!(
            String::from_utf8(part.formatted()).unwrap(),
            concat!(
                "Content-Type: multipart/alternative; boundary=\"F2mTKN843loAAAAA8porEdAjCKhArPxGeahYoZYSftse1GT\"\r\n",
                "\r\n",
                "--F2mTKN843loAAAAA8porEdAjCKhArPxGeahYoZYSftse1GT\r\n",
                "Content-Type: text/plain; charset=utf-8\r\n",
                "Content-Transfer-Encoding: 7bit\r\n",
                "\r\n",
                "Plain text\r\n",
                "--F2mTKN843loAAAAA8porEdAjCKhArPxGeahYoZYSftse1GT\r\n",
                "Content-Type: text/html; charset=utf-8\r\n",
                "Content-Transfer-Encoding: 7bit\r\n",
                "\r\n",
                "<p>Rich text</p>\r\n",
                "--F2mTKN843loAAAAA8porEdAjCKhArPxGeahYoZYSftse1GT--\r\n"
            )
        );
    }

    #[test]
    fn multi_part_mixed_with_nested_alternative() {
        let inner = "E912L4JH3loAAAAAFu33Gx7PEoTMmhGaxG3FlbVMQHct";
        let part = MultiPart::mixed()
            .boundary(BOUNDARY)
            .multipart(
                MultiPart::alternative()
                    .boundary(inner)
                    .singlepart(text_part("Plain")),
            )
            .singlepart(
                SinglePart::builder()
                    .header("Content-Disposition", "attachment; filename=\"a.bin\"")
                    .content_type(&mime::APPLICATION_OCTET_STREAM)
                    .body([0xDEu8, 0xAD, 0xBE, 0xEF], ContentTransferEncoding::Base64),
            );

        assert_eq!(
            String::from_utf8(part.formatted()).unwrap(),
            concat!(
                "Content-Type: multipart/mixed; boundary=\"F2mTKN843loAAAAA8porEdAjCKhArPxGeahYoZYSftse1GT\"\r\n",
                "\r\n",
                "--F2mTKN843loAAAAA8porEdAjCKhArPxGeahYoZYSftse1GT\r\n",
                "Content-Type: multipart/alternative; boundary=\"E912L4JH3loAAAAAFu33Gx7PEoTMmhGaxG3FlbVMQHct\"\r\n",
                "\r\n",
                "--E912L4JH3loAAAAAFu33Gx7PEoTMmhGaxG3FlbVMQHct\r\n",
                "Content-Type: text/plain; charset=utf-8\r\n",
                "Content-Transfer-Encoding: 7bit\r\n",
                "\r\n",
                "Plain\r\n",
                "--E912L4JH3loAAAAAFu33Gx7PEoTMmhGaxG3FlbVMQHct--\r\n",
                "--F2mTKN843loAAAAA8porEdAjCKhArPxGeahYoZYSftse1GT\r\n",
                "Content-Disposition: attachment; filename=\"a.bin\"\r\n",
                "Content-Type: application/octet-stream\r\n",
                "Content-Transfer-Encoding: base64\r\n",
                "\r\n",
                "3q2+7w==\r\n",
                "--F2mTKN843loAAAAA8porEdAjCKhArPxGeahYoZYSftse1GT--\r\n"
            )
        );
    }

    #[test]
    fn random_boundaries_are_unique_and_sized() {
        let mut boundaries = std::collections::HashSet::new();
        for _ in 0..100 {
            boundaries.insert(make_boundary());
        }
        assert_eq!(boundaries.len(), 100);
        for boundary in boundaries {
            assert_eq!(boundary.len(), 40);
        }
    }
}
