use std::{
    error::Error,
    fmt::{Display, Formatter, Result as FmtResult},
};

use super::{Address, AddressError};

/// Simple email envelope representation.
///
/// The forward path is the actual protocol-level delivery target list,
/// distinct from the header-visible To/Cc of the message itself: Bcc
/// recipients appear here and nowhere else.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Envelope {
    /// The envelope recipients' addresses
    ///
    /// This can not be empty.
    forward_path: Vec<Address>,
    /// The envelope sender address
    reverse_path: Option<Address>,
}

impl Envelope {
    /// Creates a new envelope, which may fail if `to` is empty.
    pub fn new(from: Option<Address>, to: Vec<Address>) -> Result<Envelope, EnvelopeError> {
        if to.is_empty() {
            return Err(EnvelopeError::NoRecipients);
        }
        Ok(Envelope {
            forward_path: to,
            reverse_path: from,
        })
    }

    /// Resolves raw To/Cc/Bcc recipient fields into an envelope.
    ///
    /// Each field is split on `,` and `;`, tokens are trimmed and empty ones
    /// discarded. The lists are combined to → cc → bcc and deduplicated
    /// keeping the first occurrence, so the resulting order is stable.
    pub fn resolve(
        from: Option<Address>,
        to: &str,
        cc: Option<&str>,
        bcc: Option<&str>,
    ) -> Result<Envelope, EnvelopeError> {
        let mut seen: Vec<String> = Vec::new();
        for field in [Some(to), cc, bcc].into_iter().flatten() {
            for token in split_recipients(field) {
                if !seen.iter().any(|existing| existing.as_str() == token) {
                    seen.push(token.to_owned());
                }
            }
        }

        let recipients = seen
            .into_iter()
            .map(|token| {
                token
                    .parse::<Address>()
                    .map_err(|source| EnvelopeError::Address { token, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Envelope::new(from, recipients)
    }

    /// Gets the destination addresses of the envelope.
    pub fn to(&self) -> &[Address] {
        self.forward_path.as_slice()
    }

    /// Gets the sender of the envelope.
    pub fn from(&self) -> Option<&Address> {
        self.reverse_path.as_ref()
    }

    /// Whether any address in the envelope contains non-ASCII characters.
    pub(crate) fn has_non_ascii_addresses(&self) -> bool {
        self.reverse_path
            .iter()
            .chain(self.forward_path.iter())
            .any(|address| !address.is_ascii())
    }
}

fn split_recipients(field: &str) -> impl Iterator<Item = &str> {
    field
        .split([',', ';'])
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Errors building an envelope from recipient fields.
#[derive(Debug, PartialEq, Eq, Clone)]
#[non_exhaustive]
pub enum EnvelopeError {
    /// To, Cc and Bcc were all empty after splitting.
    NoRecipients,
    /// A recipient token failed address validation.
    Address {
        /// The offending token, as supplied.
        token: String,
        /// The underlying parse failure.
        source: AddressError,
    },
}

impl Error for EnvelopeError {}

impl Display for EnvelopeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            EnvelopeError::NoRecipients => {
                f.write_str("No recipients provided (To/Cc/Bcc all empty).")
            }
            EnvelopeError::Address { token, source } => {
                write!(f, "Invalid recipient address {token:?}: {source}")
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn addresses(envelope: &Envelope) -> Vec<&str> {
        envelope.to().iter().map(AsRef::as_ref).collect()
    }

    #[test]
    fn splits_on_both_separators() {
        let envelope =
            Envelope::resolve(None, "a@x.tld, b@x.tld; c@x.tld", None, None).unwrap();
        assert_eq!(addresses(&envelope), ["a@x.tld", "b@x.tld", "c@x.tld"]);
    }

    #[test]
    fn dedupes_keeping_first_occurrence_order() {
        let envelope = Envelope::resolve(
            None,
            "a@x.tld,a@x.tld",
            Some("b@x.tld, a@x.tld"),
            Some("a@x.tld"),
        )
        .unwrap();
        assert_eq!(addresses(&envelope), ["a@x.tld", "b@x.tld"]);
    }

    #[test]
    fn bcc_only_still_resolves() {
        let envelope = Envelope::resolve(None, "", Some(""), Some("hidden@x.tld")).unwrap();
        assert_eq!(addresses(&envelope), ["hidden@x.tld"]);
    }

    #[test]
    fn empty_fields_fail_with_no_recipients() {
        assert_eq!(
            Envelope::resolve(None, "", Some(""), Some("")),
            Err(EnvelopeError::NoRecipients)
        );
        assert_eq!(
            Envelope::resolve(None, " ;, ", None, None),
            Err(EnvelopeError::NoRecipients)
        );
    }

    #[test]
    fn invalid_token_is_reported() {
        let err = Envelope::resolve(None, "a@x.tld, not-an-address", None, None).unwrap_err();
        match err {
            EnvelopeError::Address { token, .. } => assert_eq!(token, "not-an-address"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
