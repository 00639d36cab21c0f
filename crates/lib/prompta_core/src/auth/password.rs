//! Password hashing via bcrypt.

use std::collections::HashMap;
use std::sync::{LazyLock, Mutex};

use super::AuthError;

/// Throwaway hashes keyed by cost, built on first use.
static DUMMY_HASHES: LazyLock<Mutex<HashMap<u32, String>>> = LazyLock::new(Default::default);

/// Default bcrypt cost factor.
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// Hash a password with bcrypt at the given cost.
pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    bcrypt::hash(password, cost).map_err(|e| AuthError::Internal(format!("bcrypt hash: {e}")))
}

/// Verify a password against a bcrypt hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    bcrypt::verify(password, hash).map_err(|e| AuthError::Internal(format!("bcrypt verify: {e}")))
}

fn dummy_hash(cost: u32) -> Result<String, AuthError> {
    let mut cache = DUMMY_HASHES
        .lock()
        .map_err(|_| AuthError::Internal("dummy hash cache poisoned".into()))?;
    if let Some(hash) = cache.get(&cost) {
        return Ok(hash.clone());
    }
    let hash = hash_password("prompta-unknown-account", cost)?;
    cache.insert(cost, hash.clone());
    Ok(hash)
}

/// Run one full verification against a throwaway hash at `cost` and
/// discard the outcome. A login for an unknown account pays the same
/// bcrypt cost as a wrong password.
pub fn verify_dummy(password: &str, cost: u32) {
    if let Ok(hash) = dummy_hash(cost) {
        let _ = verify_password(password, &hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_salted_and_verifies() {
        let a = hash_password("secret1", 4).unwrap();
        let b = hash_password("secret1", 4).unwrap();
        assert_ne!(a, b);
        assert!(!a.contains("secret1"));
        assert!(verify_password("secret1", &a).unwrap());
        assert!(verify_password("secret1", &b).unwrap());
    }

    #[test]
    fn wrong_password_does_not_verify() {
        let hash = hash_password("secret1", 4).unwrap();
        assert!(!verify_password("secret2", &hash).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("secret1", "not-a-bcrypt-hash").is_err());
    }

    #[test]
    fn dummy_hash_uses_requested_cost_and_is_reused() {
        let first = dummy_hash(5).unwrap();
        assert!(first.starts_with("$2b$05$"));
        assert_eq!(dummy_hash(5).unwrap(), first);
        assert!(dummy_hash(4).unwrap().starts_with("$2b$04$"));
    }

    #[test]
    fn dummy_verification_never_matches() {
        let hash = dummy_hash(4).unwrap();
        assert!(!verify_password("secret1", &hash).unwrap());
        verify_dummy("secret1", 4);
    }
}
