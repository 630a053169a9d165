//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing a `ChargeId` where an `EntityId` is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new random ID using UUID v7 (time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Creates a deterministic ID from a 128-bit value.
            ///
            /// Handy for fixtures and configuration files where ids must be stable.
            #[must_use]
            pub const fn from_u128(value: u128) -> Self {
                Self(Uuid::from_u128(value))
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

typed_id!(OwnerId, "Unique identifier for the business that owns the books.");
typed_id!(ChargeId, "Unique identifier for a charge.");
typed_id!(
    EntityId,
    "Unique identifier for a ledger account: bank account, business or tax category."
);
typed_id!(PostingId, "Unique identifier for a persisted ledger posting.");
typed_id!(TransactionId, "Unique identifier for a bank or card transaction.");
typed_id!(DocumentId, "Unique identifier for an accounting document.");
typed_id!(MiscExpenseId, "Unique identifier for a misc-expense record.");
typed_id!(TripId, "Unique identifier for a business trip.");
typed_id!(TripExpenseId, "Unique identifier for a business trip expense.");
