//! Typed domain separators for [`super::hash::canonical_hash`].
//!
//! Adding a domain is a single change here: the enum, `as_bytes()`, `ALL`
//! and `Display` are all generated from one macro invocation.

macro_rules! define_hash_domains {
    (
        $(
            $(#[$meta:meta])*
            $variant:ident => $bytes:expr
        ),+ $(,)?
    ) => {
        /// Typed domain separator. Every variant maps to a unique,
        /// null-terminated prefix.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum HashDomain {
            $(
                $(#[$meta])*
                $variant,
            )+
        }

        impl HashDomain {
            /// The raw domain-separator bytes (null-terminated).
            #[must_use]
            pub const fn as_bytes(&self) -> &'static [u8] {
                match self {
                    $( Self::$variant => $bytes, )+
                }
            }

            /// All domain variants in declaration order.
            pub const ALL: &[HashDomain] = &[
                $( Self::$variant, )+
            ];
        }

        impl core::fmt::Display for HashDomain {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                match self {
                    $( Self::$variant => write!(f, stringify!($variant)), )+
                }
            }
        }
    };
}

define_hash_domains! {
    /// Canonical token string of a program.
    Program => b"GRIDSYNTH::PROGRAM::V1\0",

    /// Agent pose plus resource grid of a world state.
    EnvironmentState => b"GRIDSYNTH::ENV_STATE::V1\0",

    /// Serialized run-policy snapshot.
    PolicySnapshot => b"GRIDSYNTH::POLICY_SNAPSHOT::V1\0",

    /// Serialized run record.
    RunRecord => b"GRIDSYNTH::RUN_RECORD::V1\0",
}
