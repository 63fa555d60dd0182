//! A minimal ordered header map.
//!
//! Values are kept as supplied; CR and LF are stripped when a header is set
//! so no caller-controlled value can smuggle extra header lines into the
//! message, and non-ASCII values are written as RFC 2047 encoded words.

use std::fmt::{Display, Formatter, Result as FmtResult};

use super::utf8_b;

/// Ordered set of message headers.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    headers: Vec<(String, String)>,
}

impl Headers {
    /// Creates an empty header set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a header, replacing an existing one with the same name.
    pub fn set<V: Into<String>>(&mut self, name: &str, value: V) {
        let value = sanitize(value.into());
        match self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some(slot) => slot.1 = value,
            None => self.headers.push((name.to_owned(), value)),
        }
    }

    /// Returns the value of a header, if set.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

impl Display for Headers {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for (name, value) in &self.headers {
            write!(f, "{}: {}\r\n", name, utf8_b::encode(value))?;
        }
        Ok(())
    }
}

fn sanitize(value: String) -> String {
    if value.contains(['\r', '\n']) {
        value.replace(['\r', '\n'], " ")
    } else {
        value
    }
}
