//! Opaque refresh tokens.
//!
//! Refresh tokens are random secrets, never signed. The server keeps only
//! a SHA-256 digest, so a token is useful solely as a lookup key.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::models::auth::IssuedRefreshToken;

/// Random bytes per refresh token.
const REFRESH_TOKEN_BYTES: usize = 48;

/// Mint a refresh token expiring `ttl` after `now`.
pub fn issue_refresh_token(ttl: Duration, now: DateTime<Utc>) -> IssuedRefreshToken {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    let secret = URL_SAFE_NO_PAD.encode(bytes);
    let hash = hash_refresh_token(&secret);
    IssuedRefreshToken {
        secret,
        hash,
        expires_at: now + ttl,
    }
}

/// SHA-256 hash a refresh token for storage.
pub fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_hash_matches_secret() {
        let now = Utc::now();
        let token = issue_refresh_token(Duration::days(7), now);
        assert_eq!(token.hash, hash_refresh_token(&token.secret));
        assert_ne!(token.hash, token.secret);
        assert_eq!(token.expires_at, now + Duration::days(7));
    }

    #[test]
    fn secrets_are_long_and_unique() {
        let a = issue_refresh_token(Duration::days(7), Utc::now());
        let b = issue_refresh_token(Duration::days(7), Utc::now());
        assert_ne!(a.secret, b.secret);
        // 48 bytes base64url without padding.
        assert_eq!(a.secret.len(), 64);
    }

    #[test]
    fn hash_is_hex_sha256() {
        let h = hash_refresh_token("abc");
        assert_eq!(
            h,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
