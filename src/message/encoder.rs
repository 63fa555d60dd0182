//! Content transfer encodings for message bodies.

use std::fmt::{Display, Formatter, Result as FmtResult};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

const BASE64_LINE_LEN: usize = 76;
// RFC 5322 line length limit, minus room for CRLF
const MAX_PLAIN_LINE_LEN: usize = 78;

/// Content transfer encoding of a MIME part body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentTransferEncoding {
    /// Plain ASCII with short lines, passed through untouched.
    SevenBit,
    /// Quoted-printable, for mostly-readable text.
    QuotedPrintable,
    /// Base64, for binary payloads.
    Base64,
}

impl Display for ContentTransferEncoding {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            ContentTransferEncoding::SevenBit => "7bit",
            ContentTransferEncoding::QuotedPrintable => "quoted-printable",
            ContentTransferEncoding::Base64 => "base64",
        })
    }
}

impl ContentTransferEncoding {
    /// Picks the encoding for a text body: 7bit when it is clean ASCII with
    /// lines a server will accept, quoted-printable otherwise.
    pub fn for_text(text: &str) -> Self {
        if text.is_ascii() && text.lines().all(|line| line.len() <= MAX_PLAIN_LINE_LEN) {
            ContentTransferEncoding::SevenBit
        } else {
            ContentTransferEncoding::QuotedPrintable
        }
    }
}

/// Encodes a part body with the given transfer encoding.
///
/// Text encodings normalize line endings to CRLF first; base64 output is
/// wrapped at 76 columns. The result carries no trailing line break — the
/// part serializer adds it.
pub(crate) fn encode(content: &[u8], encoding: ContentTransferEncoding) -> Vec<u8> {
    match encoding {
        ContentTransferEncoding::SevenBit => normalize_crlf(content),
        ContentTransferEncoding::QuotedPrintable => {
            quoted_printable::encode(normalize_crlf(content))
        }
        ContentTransferEncoding::Base64 => {
            let encoded = BASE64.encode(content);
            let mut out = Vec::with_capacity(encoded.len() + encoded.len() / BASE64_LINE_LEN * 2);
            let mut chunks = encoded.as_bytes().chunks(BASE64_LINE_LEN).peekable();
            while let Some(chunk) = chunks.next() {
                out.extend_from_slice(chunk);
                if chunks.peek().is_some() {
                    out.extend_from_slice(b"\r\n");
                }
            }
            out
        }
    }
}

fn normalize_crlf(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut iter = input.iter().copied().peekable();
    while let Some(byte) = iter.next() {
        match byte {
            b'\r' => {
                out.extend_from_slice(b"\r\n");
                if iter.peek() == Some(&b'\n') {
                    iter.next();
                }
            }
            b'\n' => out.extend_from_slice(b"\r\n"),
            other => out.push(other),
        }
    }
    out
}
