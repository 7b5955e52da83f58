//! Type-safe identifier wrappers around `u64`.
//!
//! Colony identifiers are handed to the engine by the colony simulation.
//! Conflict, trade and alliance identifiers are allocated by the engine's
//! arenas, so diplomacies can refer to shared objects by value instead of
//! by reference.

use serde::{Deserialize, Serialize};

/// Generates a newtype wrapper around `u64` with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl $name {
            /// Return the inner `u64` value.
            pub const fn into_inner(self) -> u64 {
                self.0
            }

            /// Return the identifier that follows this one.
            #[must_use]
            pub const fn next(self) -> Self {
                Self(self.0.saturating_add(1))
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Identifier of a colony, assigned by the colony simulation.
    ColonyId
}

define_id! {
    /// Arena identifier of a conflict.
    ConflictId
}

define_id! {
    /// Arena identifier of a trade agreement.
    TradeId
}

define_id! {
    /// Arena identifier of an alliance.
    AllianceId
}
