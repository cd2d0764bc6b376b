//! One-way credential hashing.

use tracing::instrument;

use crate::{StoreError, StoreErrorKind};

/// bcrypt only reads this many bytes of input; anything past it is ignored.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Hashes a plaintext password with a per-call random salt.
///
/// # Errors
///
/// Returns a validation [`StoreError`] if the password is longer than
/// [`MAX_PASSWORD_BYTES`], and an internal one if bcrypt rejects the cost or
/// fails.
#[instrument(skip(plain))]
pub fn hash_password(plain: &str, cost: u32) -> Result<String, StoreError> {
    if plain.len() > MAX_PASSWORD_BYTES {
        return Err(StoreError::validation(format!(
            "Password must be at most {} bytes",
            MAX_PASSWORD_BYTES
        )));
    }
    bcrypt::hash(plain, cost).map_err(|e| {
        StoreError::new(
            StoreErrorKind::Internal,
            format!("Failed to hash password: {}", e),
        )
    })
}

/// Checks a plaintext password against a stored hash.
///
/// A password longer than [`MAX_PASSWORD_BYTES`] never matches, since no
/// stored hash was made from one.
///
/// # Errors
///
/// Returns an internal [`StoreError`] if the stored hash is malformed.
#[instrument(skip(plain, hash))]
pub fn verify_password(plain: &str, hash: &str) -> Result<bool, StoreError> {
    if plain.len() > MAX_PASSWORD_BYTES {
        return Ok(false);
    }
    bcrypt::verify(plain, hash).map_err(|e| {
        StoreError::new(
            StoreErrorKind::Internal,
            format!("Failed to verify password: {}", e),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4;

    #[test]
    fn hash_is_never_the_plaintext() {
        let hash = hash_password("hunter2", TEST_COST).expect("hash failed");
        assert_ne!(hash, "hunter2");
        assert!(verify_password("hunter2", &hash).expect("verify failed"));
        assert!(!verify_password("hunter3", &hash).expect("verify failed"));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let a = hash_password("secret", TEST_COST).expect("hash failed");
        let b = hash_password("secret", TEST_COST).expect("hash failed");
        assert_ne!(a, b);
    }

    #[test]
    fn over_long_password_is_rejected_not_truncated() {
        let prefix = "a".repeat(MAX_PASSWORD_BYTES);
        let err = hash_password(&format!("{prefix}X"), TEST_COST)
            .expect_err("long password hashed");
        assert_eq!(err.kind, StoreErrorKind::Validation);

        let hash = hash_password(&prefix, TEST_COST).expect("hash failed");
        assert!(verify_password(&prefix, &hash).expect("verify failed"));
        assert!(!verify_password(&format!("{prefix}Y"), &hash).expect("verify failed"));
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("secret", "not-a-bcrypt-hash").is_err());
    }
}
