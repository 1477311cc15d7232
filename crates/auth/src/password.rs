//! Secret hashing and verification.
//!
//! The default primitive is Argon2id producing PHC strings (salt and parameters
//! travel inside the hash). Verification reads the parameters back from the
//! stored hash, so changing the configured cost only affects new hashes.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use folio_core::{ModelError, ModelResult};
use folio_infra::ConfigError;
use folio_infra::config::env_parse;

/// One-way salted hashing primitive.
///
/// Implementations are CPU-bound and blocking; async callers run them on the
/// blocking pool.
pub trait SecretHasher: Send + Sync {
    fn hash(&self, secret: &str) -> ModelResult<String>;

    /// Whether `secret` matches `hash`. A malformed `hash` is an error, not a
    /// mismatch.
    fn verify(&self, secret: &str, hash: &str) -> ModelResult<bool>;
}

/// Argon2 cost parameters.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HashingConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl HashingConfig {
    /// Reads `FOLIO_ARGON2_MEMORY_KIB`, `FOLIO_ARGON2_ITERATIONS` and
    /// `FOLIO_ARGON2_PARALLELISM`, defaulting each to the argon2 crate default.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            memory_kib: env_parse(&lookup, "FOLIO_ARGON2_MEMORY_KIB", defaults.memory_kib)?,
            iterations: env_parse(&lookup, "FOLIO_ARGON2_ITERATIONS", defaults.iterations)?,
            parallelism: env_parse(&lookup, "FOLIO_ARGON2_PARALLELISM", defaults.parallelism)?,
        };
        config.params()?;
        Ok(config)
    }

    fn params(&self) -> Result<Params, ConfigError> {
        Params::new(self.memory_kib, self.iterations, self.parallelism, None).map_err(|e| {
            ConfigError::Invalid {
                name: "FOLIO_ARGON2_*",
                value: format!(
                    "m={} t={} p={} ({e})",
                    self.memory_kib, self.iterations, self.parallelism
                ),
            }
        })
    }
}

/// Argon2id hasher. `Default` uses the argon2 crate's default cost.
#[derive(Debug, Clone, Default)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    pub fn new(config: HashingConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            params: config.params()?,
        })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl SecretHasher for Argon2Hasher {
    fn hash(&self, secret: &str) -> ModelResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ModelError::storage(format!("failed to hash secret: {e}")))
    }

    fn verify(&self, secret: &str, hash: &str) -> ModelResult<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| ModelError::storage(format!("stored hash is malformed: {e}")))?;
        Ok(self
            .argon2()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok())
    }
}

/// Whether `value` parses as a PHC hash string.
pub fn is_phc_hash(value: &str) -> bool {
    PasswordHash::new(value).is_ok()
}

#[cfg(test)]
pub(crate) fn test_hasher() -> Argon2Hasher {
    Argon2Hasher::new(HashingConfig {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    })
    .unwrap()
}
