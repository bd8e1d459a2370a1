/// Hashing utility: salted password hashing and token fingerprints
///
/// Two distinct needs, two distinct functions. Passwords get Argon2id with a
/// random salt, so the same plaintext hashed twice yields different outputs
/// and verification is constant-time. Token fingerprints must be
/// deterministic so a later revocation lookup can match on digest equality,
/// so they use an unsalted SHA-256.
use crate::error::{ApiError, ApiResult};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use sha2::{Digest, Sha256};

/// Hash a secret for storage using Argon2id
pub fn hash_secret(plaintext: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))?;

    Ok(hash.to_string())
}

/// Verify a secret against a stored Argon2id hash
///
/// Returns false on a malformed hash instead of erroring, so a corrupt
/// stored hash reads as "wrong password" rather than a server fault.
pub fn verify_secret(plaintext: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };

    Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok()
}

/// Deterministic one-way digest of a token's raw value
///
/// Stored in place of the raw token for audit and revocation lookups.
pub fn fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
