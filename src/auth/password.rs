//! bcrypt password hashing with caller-supplied salts.

use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

const SALT_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum PasswordError {
    /// Salt must be the hex encoding of exactly 16 bytes
    #[error("invalid salt: {0}")]
    InvalidSalt(String),

    #[error(transparent)]
    Hash(#[from] bcrypt::BcryptError),
}

/// 16 random bytes, hex encoded.
#[must_use]
pub fn generate_salt() -> String {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    hex::encode(salt)
}

/// Hash `password` with a salt from [`generate_salt`] at the given bcrypt cost.
///
/// The result is a `$2b$` modular-crypt string, so [`matches`] needs no salt.
///
/// # Errors
///
/// [`PasswordError::InvalidSalt`] for a salt that is not 32 hex digits and
/// [`PasswordError::Hash`] for a cost outside bcrypt's range.
pub fn hash_password(password: &str, salt: &str, cost: u32) -> Result<String, PasswordError> {
    let bytes = hex::decode(salt).map_err(|e| PasswordError::InvalidSalt(e.to_string()))?;
    let salt: [u8; SALT_LEN] = bytes
        .try_into()
        .map_err(|b: Vec<u8>| PasswordError::InvalidSalt(format!("expected {SALT_LEN} bytes, got {}", b.len())))?;
    let parts = bcrypt::hash_with_salt(password, cost, salt)?;
    Ok(parts.format_for_version(bcrypt::Version::TwoB))
}

/// Whether `password` produces `hash`. Malformed hashes never match.
#[must_use]
pub fn matches(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}
