//! Credential hasher - one-way password hashing with Argon2id.
//!
//! Hashes are PHC strings (`$argon2id$v=19$m=..,t=..,p=..$salt$digest`), so a
//! stored hash carries its own algorithm, cost and salt and stays verifiable
//! after the configured work factor changes.

use std::sync::OnceLock;

use argon2::{
    password_hash::{
        rand_core::OsRng, Error as PasswordHashError, PasswordHash, PasswordHasher,
        PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};

use crate::constants::{DEFAULT_HASH_ITERATIONS, DEFAULT_HASH_MEMORY_KIB, DEFAULT_HASH_PARALLELISM};
use crate::error::{DomainError, DomainResult};

/// Argon2 cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkFactor {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for WorkFactor {
    fn default() -> Self {
        Self {
            memory_kib: DEFAULT_HASH_MEMORY_KIB,
            iterations: DEFAULT_HASH_ITERATIONS,
            parallelism: DEFAULT_HASH_PARALLELISM,
        }
    }
}

impl WorkFactor {
    /// Smallest parameters argon2 accepts. Only meant for tests.
    pub fn minimal() -> Self {
        Self {
            memory_kib: Params::MIN_M_COST,
            iterations: Params::MIN_T_COST,
            parallelism: Params::MIN_P_COST,
        }
    }

    fn params(&self) -> DomainResult<Params> {
        Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| DomainError::WorkFactor(e.to_string()))
    }
}

/// Password hasher holding the configured work factor.
pub struct CredentialHasher {
    params: Params,
    decoy: OnceLock<Option<String>>,
}

impl std::fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialHasher")
            .field("m_cost", &self.params.m_cost())
            .field("t_cost", &self.params.t_cost())
            .field("p_cost", &self.params.p_cost())
            .finish()
    }
}

impl CredentialHasher {
    /// Create a hasher for the given work factor.
    ///
    /// # Errors
    /// Returns [`DomainError::WorkFactor`] if argon2 rejects the parameters.
    pub fn new(work_factor: WorkFactor) -> DomainResult<Self> {
        Ok(Self {
            params: work_factor.params()?,
            decoy: OnceLock::new(),
        })
    }

    /// Hash a plaintext password with a fresh random salt.
    pub fn hash(&self, plain_text: &str) -> DomainResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(plain_text.as_bytes(), &salt)
            .map_err(|e| DomainError::hashing(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// Verify a plaintext password against a stored PHC hash.
    ///
    /// Returns `Ok(false)` on mismatch and [`DomainError::MalformedHash`] when
    /// the stored value is not a hash this hasher understands.
    pub fn verify(&self, plain_text: &str, hash: &str) -> DomainResult<bool> {
        let parsed = PasswordHash::new(hash).map_err(|_| DomainError::MalformedHash)?;

        // Cost and salt come from the stored hash, not from `self.params`.
        match self.argon2().verify_password(plain_text.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(PasswordHashError::Password) => Ok(false),
            Err(_) => Err(DomainError::MalformedHash),
        }
    }

    /// Run a full verification that always fails.
    ///
    /// Login calls this for unknown emails so the miss costs as much as a
    /// wrong password against a real hash.
    pub fn verify_decoy(&self, plain_text: &str) -> bool {
        let decoy = self
            .decoy
            .get_or_init(|| self.hash("sso-decoy-credential").ok());

        match decoy {
            Some(hash) => {
                let _ = self.verify(plain_text, hash);
            }
            None => {
                let _ = self.hash(plain_text);
            }
        }
        false
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}
