use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u32);

        impl $name {
            pub(crate) const fn new(raw: u32) -> Self {
                Self(raw)
            }

            pub const fn raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

entity_id!(
    /// Opaque handle to a plane owned by a [`crate::VkmsConfig`].
    PlaneId,
    "plane"
);
entity_id!(
    /// Opaque handle to a CRTC owned by a [`crate::VkmsConfig`].
    CrtcId,
    "crtc"
);
entity_id!(
    /// Opaque handle to an encoder owned by a [`crate::VkmsConfig`].
    EncoderId,
    "encoder"
);
entity_id!(
    /// Opaque handle to a connector owned by a [`crate::VkmsConfig`].
    ConnectorId,
    "connector"
);
