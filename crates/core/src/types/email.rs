//! Email addresses for users and stores.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Why a string is not an acceptable [`Email`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailError {
    #[error("email cannot be empty")]
    Empty,
    #[error("email must be at most {} characters", Email::MAX_LENGTH)]
    TooLong,
    #[error("email cannot contain whitespace")]
    Whitespace,
    /// Zero or several `@`, or nothing on one side of it.
    #[error("email must be a local part and a domain joined by a single @")]
    Shape,
    /// The domain lacks a dot, or has an empty label around one.
    #[error("email domain must contain a dot")]
    Domain,
}

/// A structurally valid email address.
///
/// Both users and stores are unique by email. Comparison is exact; the
/// address is stored as entered.
///
/// ```
/// use storerate_core::Email;
///
/// assert!(Email::parse("owner@storerating.com").is_ok());
/// assert!(Email::parse("a.b+tag@shop.co.uk").is_ok());
///
/// assert!(Email::parse("owner@localhost").is_err());
/// assert!(Email::parse("@storerating.com").is_err());
/// assert!(Email::parse("a@b@storerating.com").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type), sqlx(transparent))]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// RFC 5321 path limit.
    pub const MAX_LENGTH: usize = 254;

    /// Check the structure of an address.
    ///
    /// # Errors
    ///
    /// The first rule the input breaks, checked in the order of the
    /// [`EmailError`] variants.
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        if s.is_empty() {
            return Err(EmailError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong);
        }
        if s.chars().any(char::is_whitespace) {
            return Err(EmailError::Whitespace);
        }

        let mut parts = s.split('@');
        let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(EmailError::Shape);
        };
        if local.is_empty() || domain.is_empty() {
            return Err(EmailError::Shape);
        }
        if !domain.contains('.') || domain.split('.').any(str::is_empty) {
            return Err(EmailError::Domain);
        }

        Ok(Self(s.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Email {
    type Error = EmailError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_seed_addresses() {
        for email in [
            "admin@storerating.com",
            "info@amazingstore.com",
            "contact@fashionboutique.com",
            "a@b.c",
        ] {
            assert!(Email::parse(email).is_ok(), "{email}");
        }
    }

    #[test]
    fn test_rejections() {
        let cases = [
            ("", EmailError::Empty),
            ("user @example.com", EmailError::Whitespace),
            ("no-at-symbol", EmailError::Shape),
            ("@domain.com", EmailError::Shape),
            ("user@", EmailError::Shape),
            ("a@b@example.com", EmailError::Shape),
            ("user@localhost", EmailError::Domain),
            ("user@example.", EmailError::Domain),
        ];
        for (input, expected) in cases {
            assert_eq!(Email::parse(input).unwrap_err(), expected, "{input:?}");
        }

        let long = format!("{}@example.com", "a".repeat(250));
        assert_eq!(Email::parse(&long).unwrap_err(), EmailError::TooLong);
    }

    #[test]
    fn test_case_is_preserved() {
        let email = Email::parse("Owner@StoreRating.com").unwrap();
        assert_eq!(email.to_string(), "Owner@StoreRating.com");
        assert_ne!(email, Email::parse("owner@storerating.com").unwrap());
    }

    #[test]
    fn test_deserialize_validates() {
        let parsed: Email = serde_json::from_str("\"user@example.com\"").unwrap();
        assert_eq!(parsed.as_str(), "user@example.com");
        assert!(serde_json::from_str::<Email>("\"not-an-email\"").is_err());
    }
}
