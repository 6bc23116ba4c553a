use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand_core::OsRng;

use crate::error::{AuthError, AuthResult};

/// Hashes `plaintext` with Argon2id and a fresh random salt.
pub fn hash_password(plaintext: &str) -> AuthResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AuthError::Hashing(err.to_string()))
}

/// Returns false on mismatch and on a digest that cannot be parsed.
pub fn verify_password(plaintext: &str, digest: &str) -> bool {
    match PasswordHash::new(digest) {
        Ok(parsed) => Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let digest = hash_password("12345").expect("hash");
        assert!(digest.starts_with("$argon2"));
        assert!(verify_password("12345", &digest));
        assert!(!verify_password("54321", &digest));
    }

    #[test]
    fn salts_differ_between_hashes() {
        let first = hash_password("12345").expect("hash");
        let second = hash_password("12345").expect("hash");
        assert_ne!(first, second);
    }

    #[test]
    fn malformed_digest_is_a_mismatch() {
        assert!(!verify_password("12345", "not-a-phc-string"));
        assert!(!verify_password("12345", ""));
    }
}
