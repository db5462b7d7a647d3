//! Strongly typed identifiers for engine entities.
//!
//! Each identifier wraps a UUID so that an event id can never be passed
//! where a user id is expected. Serialisation is the plain UUID string.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a new random identifier.
            #[must_use]
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            #[must_use]
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the underlying UUID.
            #[must_use]
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(value).map(Self)
            }
        }
    };
}

uuid_id!(
    /// Identifier of a scheduled community event.
    EventId
);
uuid_id!(
    /// Identifier of a platform user.
    UserId
);
uuid_id!(
    /// Identifier of a community (campus or ward).
    CommunityId
);
uuid_id!(
    /// Identifier of an appended action record.
    ActionId
);

/// Stable identifier of a badge definition.
///
/// Badges are identified by a short slug (`"cleanup-crew"`) rather than a
/// UUID so the built-in catalogue stays readable in storage and payloads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BadgeId(String);

impl BadgeId {
    /// Wrap a badge slug.
    pub fn new(slug: impl Into<String>) -> Self {
        Self(slug.into())
    }

    /// Borrow the slug.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BadgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_strings() {
        let id = EventId::random();
        let parsed: EventId = id.to_string().parse().expect("round trip");
        assert_eq!(parsed, id);
    }

    #[test]
    fn ids_serialise_as_plain_uuid_strings() {
        let id = UserId::random();
        let json = serde_json::to_value(id).expect("serialise");
        assert_eq!(json, serde_json::json!(id.as_uuid().to_string()));
    }
}
