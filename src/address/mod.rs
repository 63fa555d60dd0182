//! Representation of an email address.

mod envelope;

pub use self::envelope::{Envelope, EnvelopeError};

use std::{
    error::Error,
    fmt::{Display, Formatter, Result as FmtResult},
    net::IpAddr,
    str::FromStr,
};

use email_address::EmailAddress;
use idna::domain_to_ascii;

/// An email address in canonical _user@domain.tld_ form.
///
/// Parsing validates the local part and the domain (internationalized
/// domains are accepted through their ASCII form), which is what makes the
/// address safe to interpolate into `MAIL FROM`/`RCPT TO` lines.
#[derive(Debug, Clone, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct Address {
    /// Complete address
    serialized: String,
    /// Index into `serialized` before the '@'
    at_start: usize,
}

impl Address {
    /// Gets the user portion of the address.
    pub fn user(&self) -> &str {
        &self.serialized[..self.at_start]
    }

    /// Gets the domain portion of the address.
    pub fn domain(&self) -> &str {
        &self.serialized[self.at_start + 1..]
    }

    /// Whether the address contains non-ASCII characters.
    pub(crate) fn is_ascii(&self) -> bool {
        self.serialized.is_ascii()
    }

    fn check_user(user: &str) -> Result<(), AddressError> {
        if EmailAddress::is_valid_local_part(user) {
            Ok(())
        } else {
            Err(AddressError::InvalidUser)
        }
    }

    fn check_domain(domain: &str) -> Result<(), AddressError> {
        Address::check_domain_ascii(domain).or_else(|_| {
            domain_to_ascii(domain)
                .map_err(|_| AddressError::InvalidDomain)
                .and_then(|domain| Address::check_domain_ascii(&domain))
        })
    }

    fn check_domain_ascii(domain: &str) -> Result<(), AddressError> {
        if EmailAddress::is_valid_domain(domain) {
            return Ok(());
        }

        // Address literal
        let ip = domain
            .strip_prefix('[')
            .and_then(|ip| ip.strip_suffix(']'))
            .unwrap_or(domain);

        if ip.parse::<IpAddr>().is_ok() {
            return Ok(());
        }

        Err(AddressError::InvalidDomain)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.serialized)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(val: &str) -> Result<Self, AddressError> {
        let at_start = check_address(val)?;
        Ok(Address {
            serialized: val.into(),
            at_start,
        })
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.serialized
    }
}

fn check_address(val: &str) -> Result<usize, AddressError> {
    let mut parts = val.rsplitn(2, '@');
    let domain = parts.next().ok_or(AddressError::MissingParts)?;
    let user = parts.next().ok_or(AddressError::MissingParts)?;

    Address::check_user(user)?;
    Address::check_domain(domain)?;
    Ok(user.len())
}

/// Errors in email address parsing.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[non_exhaustive]
pub enum AddressError {
    /// Missing domain or user
    MissingParts,
    /// Invalid email user
    InvalidUser,
    /// Invalid email domain
    InvalidDomain,
}

impl Error for AddressError {}

impl Display for AddressError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            AddressError::MissingParts => f.write_str("missing domain or user"),
            AddressError::InvalidUser => f.write_str("invalid email user"),
            AddressError::InvalidDomain => f.write_str("invalid email domain"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_address() {
        let addr = Address::from_str("something@example.com").unwrap();
        assert_eq!(addr.user(), "something");
        assert_eq!(addr.domain(), "example.com");
    }

    #[test]
    fn address_with_ip_literal() {
        let addr = Address::from_str("something@[2606:4700:4700::1111]").unwrap();
        assert_eq!(addr.domain(), "[2606:4700:4700::1111]");
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(
            Address::from_str("no-at-sign"),
            Err(AddressError::MissingParts)
        );
        assert!(Address::from_str("user@").is_err());
        assert!(Address::from_str("@domain.tld").is_err());
        // CRLF anywhere would allow command injection into RCPT lines
        assert!(Address::from_str("user\r\n@example.com").is_err());
        assert!(Address::from_str("user@exa\r\nmple.com").is_err());
    }

    #[test]
    fn idn_domain_is_accepted() {
        assert!(Address::from_str("user@bücher.de").is_ok());
    }
}
