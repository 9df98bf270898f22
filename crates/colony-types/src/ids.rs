//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Every object the world snapshot exposes carries a strongly-typed ID so a
//! node id can never be passed where a structure id is expected. The world
//! provider assigns the ids; the `new()` constructors exist for tests and
//! for bootstrapping a fresh colony.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a colony (the persistence key for its memory).
    ColonyId
}

define_id! {
    /// Unique identifier for a mobile agent.
    AgentId
}

define_id! {
    /// Unique identifier for a resource node.
    NodeId
}

define_id! {
    /// Unique identifier for a built structure (including the production facility).
    StructureId
}

define_id! {
    /// Unique identifier for a construction site.
    SiteId
}

define_id! {
    /// Unique identifier for a pile of dropped resource.
    DropId
}

define_id! {
    /// Unique identifier for the colony controller.
    ControllerId
}

define_id! {
    /// Unique identifier for a hostile unit.
    HostileId
}
