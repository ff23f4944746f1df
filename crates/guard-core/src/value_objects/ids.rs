//! Account identifiers used by the messaging gateway
//!
//! Group numbers and user numbers are both plain 64-bit integers on the wire.
//! They are wrapped in distinct newtypes so a group id can never be passed
//! where a user id is expected.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Error when parsing an identifier from a string
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IdParseError {
    #[error("invalid account id format")]
    InvalidFormat,
}

macro_rules! account_id {
    ($(#[$meta:meta])* $name:ident, $expecting:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(i64);

        impl $name {
            /// Create a new id from a raw i64 value
            #[inline]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the inner i64 value
            #[inline]
            pub const fn into_inner(self) -> i64 {
                self.0
            }

            /// Check if the id is zero (absent in the payload)
            #[inline]
            pub const fn is_zero(&self) -> bool {
                self.0 == 0
            }

            /// Parse from string representation
            pub fn parse(s: &str) -> Result<Self, IdParseError> {
                s.trim()
                    .parse::<i64>()
                    .map(Self)
                    .map_err(|_| IdParseError::InvalidFormat)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        // The gateway expects numbers on outbound calls
        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serializer.serialize_i64(self.0)
            }
        }

        // Some gateway builds report ids as strings, accept both
        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                use serde::de::{self, Visitor};

                struct IdVisitor;

                impl<'de> Visitor<'de> for IdVisitor {
                    type Value = $name;

                    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                        formatter.write_str($expecting)
                    }

                    fn visit_i64<E>(self, value: i64) -> Result<$name, E>
                    where
                        E: de::Error,
                    {
                        Ok($name(value))
                    }

                    fn visit_u64<E>(self, value: u64) -> Result<$name, E>
                    where
                        E: de::Error,
                    {
                        i64::try_from(value)
                            .map($name)
                            .map_err(|_| de::Error::custom("account id out of range"))
                    }

                    fn visit_str<E>(self, value: &str) -> Result<$name, E>
                    where
                        E: de::Error,
                    {
                        $name::parse(value).map_err(|_| de::Error::custom("invalid account id string"))
                    }
                }

                deserializer.deserialize_any(IdVisitor)
            }
        }
    };
}

account_id!(
    /// Group number of a chat group on the gateway
    GroupId,
    "a string or integer representing a group id"
);

account_id!(
    /// Account number of a user (or of a bot instance)
    UserId,
    "a string or integer representing a user id"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(UserId::parse("3079498044"), Ok(UserId::new(3_079_498_044)));
        assert_eq!(GroupId::parse(" 42 "), Ok(GroupId::new(42)));
        assert_eq!(UserId::parse("abc"), Err(IdParseError::InvalidFormat));
    }

    #[test]
    fn test_serde_number_and_string() {
        let from_number: GroupId = serde_json::from_str("1011978245").unwrap();
        let from_string: GroupId = serde_json::from_str("\"1011978245\"").unwrap();
        assert_eq!(from_number, from_string);
        assert_eq!(serde_json::to_string(&from_number).unwrap(), "1011978245");
    }

    #[test]
    fn test_is_zero() {
        assert!(UserId::default().is_zero());
        assert!(!UserId::new(1).is_zero());
    }
}
