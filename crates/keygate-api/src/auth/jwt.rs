//! JWT session token encoding and validation
//!
//! Tokens are signed with an asymmetric private key and verified with the
//! matching public key. A single algorithm is fixed at startup; HMAC
//! algorithms are refused so that the verifying side never holds signing
//! material.
//!
//! Expiry is checked against the codec's [`Clock`], not by jsonwebtoken, so
//! the lifetime is the half-open interval `[iat, exp)`.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use keygate_core::{Clock, Identity, JwtSettings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// JWT Claims structure
///
/// Only the identity name and the two timestamps are embedded. Passwords
/// and hashes never enter a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - identity name
    pub sub: String,
    /// Issued at timestamp (Unix epoch seconds)
    pub iat: u64,
    /// Expiration timestamp (Unix epoch seconds)
    pub exp: u64,
}

/// JWT token generation and validation errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to read key file {path}: {source}")]
    KeyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid signing key: {0}")]
    InvalidKey(String),

    #[error("Unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Failed to encode JWT: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyFamily {
    Rsa,
    Ec,
    Ed,
}

/// Parse an algorithm name, accepting asymmetric families only
pub fn parse_algorithm(name: &str) -> Result<Algorithm, JwtError> {
    let algorithm = Algorithm::from_str(name)
        .map_err(|_| JwtError::UnsupportedAlgorithm(name.to_string()))?;
    key_family(algorithm)?;
    Ok(algorithm)
}

fn key_family(algorithm: Algorithm) -> Result<KeyFamily, JwtError> {
    match algorithm {
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => Ok(KeyFamily::Rsa),
        Algorithm::ES256 | Algorithm::ES384 => Ok(KeyFamily::Ec),
        Algorithm::EdDSA => Ok(KeyFamily::Ed),
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Err(
            JwtError::UnsupportedAlgorithm(format!("{algorithm:?} is symmetric")),
        ),
    }
}

/// Signs and verifies session tokens
#[derive(Clone)]
pub struct TokenCodec {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_secs: u64,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    /// Build a codec from PEM-encoded key material
    ///
    /// # Arguments
    ///
    /// * `private_pem` - Private key used for signing
    /// * `public_pem` - Matching public key used for verification
    /// * `algorithm` - Fixed signing algorithm
    /// * `ttl_secs` - Token lifetime in seconds
    /// * `clock` - Time source for `iat` and the expiry check
    pub fn from_pem(
        private_pem: &[u8],
        public_pem: &[u8],
        algorithm: Algorithm,
        ttl_secs: u64,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, JwtError> {
        let (encoding_key, decoding_key) = match key_family(algorithm)? {
            KeyFamily::Rsa => (
                EncodingKey::from_rsa_pem(private_pem),
                DecodingKey::from_rsa_pem(public_pem),
            ),
            KeyFamily::Ec => (
                EncodingKey::from_ec_pem(private_pem),
                DecodingKey::from_ec_pem(public_pem),
            ),
            KeyFamily::Ed => (
                EncodingKey::from_ed_pem(private_pem),
                DecodingKey::from_ed_pem(public_pem),
            ),
        };
        let encoding_key = encoding_key.map_err(|e| JwtError::InvalidKey(e.to_string()))?;
        let decoding_key = decoding_key.map_err(|e| JwtError::InvalidKey(e.to_string()))?;

        let mut validation = Validation::new(algorithm);
        // Expiry is compared against our own clock in `decode`
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            algorithm,
            encoding_key,
            decoding_key,
            validation,
            ttl_secs,
            clock,
        })
    }

    /// Load key files and algorithm from settings
    pub fn from_settings(settings: &JwtSettings, clock: Arc<dyn Clock>) -> Result<Self, JwtError> {
        let algorithm = parse_algorithm(&settings.algorithm)?;
        let private_pem = read_key(&settings.private_key_path)?;
        let public_pem = read_key(&settings.public_key_path)?;

        Self::from_pem(
            &private_pem,
            &public_pem,
            algorithm,
            settings.ttl_secs(),
            clock,
        )
    }

    /// Same keys and clock with a different lifetime
    pub fn with_ttl(&self, ttl_secs: u64) -> Self {
        Self {
            ttl_secs,
            ..self.clone()
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Mint a token for an identity
    ///
    /// Two calls within the same second produce identical tokens.
    pub fn encode(&self, identity: &Identity) -> Result<String, JwtError> {
        let now = self.clock.now();
        let claims = Claims {
            sub: identity.name.clone(),
            iat: now,
            exp: now.saturating_add(self.ttl_secs),
        };

        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Verify a token's signature and expiry and return its claims
    ///
    /// # Returns
    ///
    /// * `Err(JwtError::InvalidToken)` - bad signature, wrong algorithm or malformed token
    /// * `Err(JwtError::ExpiredToken)` - signature is valid but `now >= exp`
    pub fn decode(&self, token: &str) -> Result<Claims, JwtError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| JwtError::InvalidToken)?;

        let claims = token_data.claims;
        if self.clock.now() >= claims.exp {
            return Err(JwtError::ExpiredToken);
        }

        Ok(claims)
    }
}

fn read_key(path: &Path) -> Result<Vec<u8>, JwtError> {
    std::fs::read(path).map_err(|source| JwtError::KeyRead {
        path: path.to_path_buf(),
        source,
    })
}
