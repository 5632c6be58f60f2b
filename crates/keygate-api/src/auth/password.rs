/// Password hashing and verification using Argon2id
///
/// Implements salted one-way hashing for stored credentials:
/// - Algorithm: Argon2id (memory-hard, resistant to GPU attacks)
/// - Memory: 64 MB
/// - Iterations: 3
/// - Parallelism: 4 threads
/// - Salt: 16 bytes random, embedded in the PHC string
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params,
};
use keygate_core::PasswordSettings;
use thiserror::Error;

/// Password hashing errors
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Invalid Argon2 parameters: {0}")]
    InvalidParams(String),

    #[error("Failed to hash password: {0}")]
    HashingFailed(String),
}

/// Password hashing configuration
///
/// Parameters are checked once on construction, so hashing a string with a
/// built config cannot fail on parameter grounds.
#[derive(Debug, Clone)]
pub struct PasswordConfig {
    params: Params,
}

impl PasswordConfig {
    /// Build a configuration from Argon2 cost parameters
    ///
    /// # Arguments
    ///
    /// * `memory_cost` - Memory cost in KiB
    /// * `time_cost` - Number of iterations
    /// * `parallelism` - Degree of parallelism
    pub fn new(memory_cost: u32, time_cost: u32, parallelism: u32) -> Result<Self, PasswordError> {
        let params = Params::new(memory_cost, time_cost, parallelism, Some(32))
            .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;
        Ok(Self { params })
    }

    pub fn from_settings(settings: &PasswordSettings) -> Result<Self, PasswordError> {
        Self::new(settings.memory_cost, settings.time_cost, settings.parallelism)
    }

    /// Cheapest parameters Argon2 accepts, for tests only
    #[cfg(any(test, feature = "test-utils"))]
    pub fn lightweight() -> Self {
        Self {
            params: Params::new(Params::MIN_M_COST, Params::MIN_T_COST, 1, Some(32))
                .unwrap_or_default(),
        }
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            self.params.clone(),
        )
    }
}

impl Default for PasswordConfig {
    fn default() -> Self {
        // 64 MB, 3 iterations, 4 lanes
        Self {
            params: Params::new(65536, 3, 4, Some(32)).unwrap_or_default(),
        }
    }
}

/// Hash a plaintext password using Argon2id
///
/// # Arguments
///
/// * `password` - The plaintext password to hash
/// * `config` - Argon2 parameters
///
/// # Returns
///
/// * `Ok(String)` - PHC string format hash (algorithm, parameters, salt and hash)
/// * `Err(PasswordError)` - If hashing fails
///
/// A fresh random salt is drawn for every call, so hashing the same password
/// twice yields two different digests.
pub fn hash_password(password: &str, config: &PasswordConfig) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = config
        .argon2()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

    Ok(password_hash.to_string())
}

/// Verify a plaintext password against a stored hash
///
/// The salt and cost parameters are read from the PHC string and the digest
/// comparison is constant-time.
///
/// # Returns
///
/// `true` only when the password matches. A mismatch or a malformed hash
/// both yield `false`.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(hash) else {
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}
