//! Domain primitives shared by the API, service and persistence layers.
//!
//! Identifiers follow the newtype pattern so that a geodata id can never be
//! passed where a comment id is expected.

pub mod geometry;
pub mod time;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use geometry::{Envelope, Geometry, GeometryKind, WktError};
pub use time::TimeRange;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(i32);

        impl $name {
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            #[must_use]
            pub const fn value(&self) -> i32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self::new(id)
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_i32(self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                i32::deserialize(deserializer).map(Self)
            }
        }
    };
}

entity_id!(
    /// Identifier of a persisted geodata set. `0` marks metadata that has been
    /// parsed but not stored yet.
    GeodataId
);

entity_id!(
    /// Identifier of a layer row. Layers are addressed by name in the API, the
    /// numeric id only groups comments.
    LayerId
);

entity_id!(CommentId);

entity_id!(UserId);

impl GeodataId {
    /// Marker for geodata that only exists in memory.
    pub const UNSAVED: Self = Self(0);

    #[must_use]
    pub const fn is_saved(&self) -> bool {
        self.0 > 0
    }
}
