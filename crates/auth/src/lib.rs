//! `folio-auth`: the user entity and its credential subsystem.
//!
//! Secrets are hashed through the [`SecretHasher`] seam (Argon2id by default)
//! by the user model's pre-save hook, so every save path stores a hash.

pub mod password;
pub mod user;

pub use password::{Argon2Hasher, HashingConfig, SecretHasher, is_phc_hash};
pub use user::{User, Users};
