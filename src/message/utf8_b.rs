// https://tools.ietf.org/html/rfc2047

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

fn allowed_char(c: char) -> bool {
    c >= 1 as char && c <= 9 as char
        || c == 11 as char
        || c == 12 as char
        || c >= 14 as char && c <= 127 as char
}

/// Encodes a header value as an UTF-8 "B" encoded word when it contains
/// characters that may not appear in a header line as-is.
pub(crate) fn encode(s: &str) -> String {
    if s.chars().all(allowed_char) {
        s.into()
    } else {
        format!("=?utf-8?b?{}?=", BASE64.encode(s))
    }
}
