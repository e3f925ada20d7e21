use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("Password hashing failed: {0}")]
    Failed(String),
}

impl From<bcrypt::BcryptError> for HashError {
    fn from(err: bcrypt::BcryptError) -> Self {
        HashError::Failed(err.to_string())
    }
}

/// One-way hashing of record secrets and comparison against stored hashes.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, secret: &str) -> Result<String, HashError>;

    /// True when `candidate` matches `hashed`. Malformed hashes never match.
    fn verify(&self, hashed: &str, candidate: &str) -> bool;
}

const MIN_HASH_COST: u32 = 4;
const MAX_HASH_COST: u32 = 31;

/// bcrypt with a configurable work factor
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self {
            cost: cost.clamp(MIN_HASH_COST, MAX_HASH_COST),
        }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, secret: &str) -> Result<String, HashError> {
        Ok(bcrypt::hash(secret, self.cost)?)
    }

    fn verify(&self, hashed: &str, candidate: &str) -> bool {
        bcrypt::verify(candidate, hashed).unwrap_or(false)
    }
}

/// Compare a plaintext secret in constant time. Only the length can leak.
pub fn secrets_match(expected: &str, candidate: &str) -> bool {
    bool::from(expected.as_bytes().ct_eq(candidate.as_bytes()))
}

/// Session token claims: the authenticated identity and validity window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(identity: impl Into<String>, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: identity.into(),
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),

    #[error("Invalid JWT secret")]
    InvalidSecret,
}

pub fn generate_jwt(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key)
        .map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    decode::<Claims>(token, &decoding_key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| JwtError::InvalidToken(e.to_string()))
}
