//! Validated free-text fields.
//!
//! Lengths are measured in characters, not bytes, so multi-byte names are
//! not penalised.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors produced when parsing a [`DisplayName`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    /// The name is shorter than [`DisplayName::MIN_LENGTH`] or longer than
    /// [`DisplayName::MAX_LENGTH`].
    #[error("Name must be between {min} and {max} characters")]
    Length {
        /// Minimum allowed length.
        min: usize,
        /// Maximum allowed length.
        max: usize,
    },
}

/// A user or store name of 20-60 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DisplayName(String);

impl DisplayName {
    /// Minimum length in characters.
    pub const MIN_LENGTH: usize = 20;
    /// Maximum length in characters.
    pub const MAX_LENGTH: usize = 60;

    /// Parse a `DisplayName`.
    ///
    /// # Errors
    ///
    /// Returns [`NameError::Length`] when the character count is outside 20-60.
    pub fn parse(s: &str) -> Result<Self, NameError> {
        let len = s.chars().count();
        if !(Self::MIN_LENGTH..=Self::MAX_LENGTH).contains(&len) {
            return Err(NameError::Length {
                min: Self::MIN_LENGTH,
                max: Self::MAX_LENGTH,
            });
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Errors produced when parsing an [`Address`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// The address exceeds [`Address::MAX_LENGTH`].
    #[error("Address must not exceed {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
}

/// A postal address of at most 400 characters. May be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Maximum length in characters.
    pub const MAX_LENGTH: usize = 400;

    /// Parse an `Address`.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError::TooLong`] above 400 characters.
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        if s.chars().count() > Self::MAX_LENGTH {
            return Err(AddressError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Errors produced when a password does not meet the policy.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PasswordError {
    /// Length outside 8-16 characters.
    #[error("Password must be between {min} and {max} characters")]
    Length {
        /// Minimum allowed length.
        min: usize,
        /// Maximum allowed length.
        max: usize,
    },
    /// Missing an upper-case letter or one of the special characters.
    #[error("Password must contain at least one uppercase letter and one special character")]
    Composition,
}

/// A plaintext password that satisfies the account password policy.
///
/// Only ever held transiently between the request body and the hasher.
/// `Debug` is redacted and the type is deliberately not `Serialize`.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    /// Minimum length in characters.
    pub const MIN_LENGTH: usize = 8;
    /// Maximum length in characters.
    pub const MAX_LENGTH: usize = 16;
    /// At least one of these must appear.
    pub const SPECIAL_CHARACTERS: &'static str = "!@#$%^&*";

    /// Check a candidate password against the policy.
    ///
    /// # Errors
    ///
    /// Returns [`PasswordError::Length`] outside 8-16 characters and
    /// [`PasswordError::Composition`] without an upper-case letter and a
    /// special character.
    pub fn parse(s: &str) -> Result<Self, PasswordError> {
        let len = s.chars().count();
        if !(Self::MIN_LENGTH..=Self::MAX_LENGTH).contains(&len) {
            return Err(PasswordError::Length {
                min: Self::MIN_LENGTH,
                max: Self::MAX_LENGTH,
            });
        }

        let has_upper = s.chars().any(char::is_uppercase);
        let has_special = s.chars().any(|c| Self::SPECIAL_CHARACTERS.contains(c));
        if !(has_upper && has_special) {
            return Err(PasswordError::Composition);
        }

        Ok(Self(s.to_owned()))
    }

    /// Expose the plaintext for hashing.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password([REDACTED])")
    }
}

macro_rules! string_conversions {
    ($name:ident, $err:ident) => {
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = $err;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::parse(&s)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_conversions!(DisplayName, NameError);
string_conversions!(Address, AddressError);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_name_bounds() {
        assert!(DisplayName::parse(&"a".repeat(19)).is_err());
        assert!(DisplayName::parse(&"a".repeat(20)).is_ok());
        assert!(DisplayName::parse(&"a".repeat(60)).is_ok());
        assert!(DisplayName::parse(&"a".repeat(61)).is_err());
    }

    #[test]
    fn test_name_counts_characters_not_bytes() {
        // 20 two-byte characters
        assert!(DisplayName::parse(&"é".repeat(20)).is_ok());
    }

    #[test]
    fn test_name_error_message() {
        let err = DisplayName::parse("short").unwrap_err();
        assert_eq!(err.to_string(), "Name must be between 20 and 60 characters");
    }

    #[test]
    fn test_address_bounds() {
        assert!(Address::parse("").is_ok());
        assert!(Address::parse(&"x".repeat(400)).is_ok());
        let err = Address::parse(&"x".repeat(401)).unwrap_err();
        assert_eq!(err.to_string(), "Address must not exceed 400 characters");
    }

    #[test]
    fn test_password_policy() {
        assert!(Password::parse("Admin@1234").is_ok());
        assert_eq!(
            Password::parse("Ab@1").unwrap_err(),
            PasswordError::Length { min: 8, max: 16 }
        );
        assert_eq!(
            Password::parse("Abcdefgh@12345678").unwrap_err(),
            PasswordError::Length { min: 8, max: 16 }
        );
        assert_eq!(
            Password::parse("admin@1234").unwrap_err(),
            PasswordError::Composition
        );
        assert_eq!(
            Password::parse("Admin12345").unwrap_err(),
            PasswordError::Composition
        );
    }

    #[test]
    fn test_password_debug_is_redacted() {
        let password = Password::parse("Admin@1234").unwrap();
        assert!(!format!("{password:?}").contains("Admin"));
    }

    #[test]
    fn test_deserialize_validates() {
        assert!(serde_json::from_str::<DisplayName>("\"too short\"").is_err());
        let name: DisplayName = serde_json::from_str("\"Amazing Electronics Store\"").unwrap();
        assert_eq!(name.as_str(), "Amazing Electronics Store");
    }
}
