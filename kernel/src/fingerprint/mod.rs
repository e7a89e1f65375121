//! Domain-separated content hashing.
//!
//! Programs, world states and run records are identified by SHA-256 hashes
//! over a null-terminated domain prefix followed by the payload bytes.

pub mod domain;
pub mod hash;

pub use domain::HashDomain;
pub use hash::{canonical_hash, program_fingerprint, ContentHash, HASH_ALGORITHM};
