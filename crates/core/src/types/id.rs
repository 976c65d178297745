//! Row identifiers.
//!
//! Each table gets its own id type so a store id can never be passed where a
//! user id is expected. All three wrap the `SERIAL` (`i32`) primary keys and
//! serialize as bare numbers.

/// Declare an `i32`-backed id newtype.
///
/// ```rust
/// # use storerate_core::entity_id;
/// entity_id!(
///     /// Id of a review comment.
///     CommentId
/// );
/// assert_eq!(CommentId::new(3).to_string(), "3");
/// ```
#[macro_export]
macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[cfg_attr(feature = "postgres", derive(::sqlx::Type), sqlx(transparent))]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            #[must_use]
            pub const fn as_i32(self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

entity_id!(
    /// Primary key of `users`.
    UserId
);
entity_id!(
    /// Primary key of `stores`.
    StoreId
);
entity_id!(
    /// Primary key of `ratings`.
    RatingId
);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_is_transparent() {
        let json = serde_json::to_string(&StoreId::new(42)).unwrap();
        assert_eq!(json, "42");

        let id: RatingId = serde_json::from_str("7").unwrap();
        assert_eq!(id.as_i32(), 7);
    }

    #[test]
    fn test_non_numeric_id_is_rejected() {
        assert!(serde_json::from_str::<UserId>("\"abc\"").is_err());
    }

    #[test]
    fn test_ordering_follows_inner_value() {
        let mut ids = vec![UserId::new(3), UserId::new(1), UserId::new(2)];
        ids.sort();
        assert_eq!(ids, vec![UserId::new(1), UserId::new(2), UserId::new(3)]);
    }
}
