//! Rating value type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error returned for a rating outside 1-5.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Rating must be between 1 and 5")]
pub struct RatingValueError;

/// An integer star rating in `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct RatingValue(u8);

impl RatingValue {
    /// Lowest possible rating.
    pub const MIN: u8 = 1;
    /// Highest possible rating.
    pub const MAX: u8 = 5;

    /// Create a rating value.
    ///
    /// # Errors
    ///
    /// Returns [`RatingValueError`] outside `1..=5`.
    pub fn new(value: i64) -> Result<Self, RatingValueError> {
        u8::try_from(value)
            .ok()
            .filter(|v| (Self::MIN..=Self::MAX).contains(v))
            .map(Self)
            .ok_or(RatingValueError)
    }

    /// The underlying star count.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for RatingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for RatingValue {
    type Error = RatingValueError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<i16> for RatingValue {
    type Error = RatingValueError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        Self::new(i64::from(value))
    }
}

impl From<RatingValue> for u8 {
    fn from(value: RatingValue) -> Self {
        value.0
    }
}

impl From<RatingValue> for i16 {
    fn from(value: RatingValue) -> Self {
        Self::from(value.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_one_through_five() {
        for v in 1..=5 {
            assert_eq!(RatingValue::new(v).unwrap().get(), u8::try_from(v).unwrap());
        }
    }

    #[test]
    fn test_rejects_out_of_range() {
        for v in [-1, 0, 6, 256, i64::MAX] {
            assert_eq!(RatingValue::new(v), Err(RatingValueError));
        }
    }

    #[test]
    fn test_error_message() {
        assert_eq!(RatingValueError.to_string(), "Rating must be between 1 and 5");
    }

    #[test]
    fn test_deserialize_validates() {
        assert_eq!(serde_json::from_str::<RatingValue>("4").unwrap().get(), 4);
        assert!(serde_json::from_str::<RatingValue>("9").is_err());
        assert!(serde_json::from_str::<RatingValue>("4.5").is_err());
    }
}
