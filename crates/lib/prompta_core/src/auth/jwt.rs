//! JWT access token generation and verification.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use tracing::{info, warn};

use super::AuthError;
use crate::models::auth::{Role, TokenClaims};

/// Generate a signed JWT access token (HS256) expiring `ttl` after `now`.
pub fn generate_access_token(
    user_id: &str,
    role: Role,
    secret: &[u8],
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<String, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::Signing("signing secret is not configured".into()));
    }
    let claims = TokenClaims {
        sub: user_id.to_string(),
        role,
        exp: (now + ttl).timestamp(),
        iat: now.timestamp(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AuthError::Signing(format!("jwt encode: {e}")))
}

/// Decode and validate an access token.
///
/// Expiry surfaces as [`AuthError::TokenExpired`]; any other failure
/// (bad signature, malformed token, wrong algorithm) as
/// [`AuthError::Unauthenticated`].
pub fn decode_access_token(token: &str, secret: &[u8]) -> Result<TokenClaims, AuthError> {
    let key = DecodingKey::from_secret(secret);
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.leeway = 0;
    decode::<TokenClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::Unauthenticated("Invalid token".into()),
        })
}

/// Verify a JWT access token, returning the claims on success.
pub fn verify_access_token(token: &str, secret: &[u8]) -> Option<TokenClaims> {
    decode_access_token(token, secret).ok()
}

/// Resolve the access-token signing secret.
///
/// Order: `JWT_SECRET`, then `AUTH_SECRET`, then a secret persisted under
/// the user data dir (generated on first run).
pub fn resolve_jwt_secret() -> String {
    ["JWT_SECRET", "AUTH_SECRET"]
        .into_iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|secret| !secret.is_empty())
        .unwrap_or_else(|| load_or_create_secret(&jwt_secret_path()))
}

/// Read the secret stored at `path`, or generate one and try to store it.
///
/// A secret that cannot be persisted is still returned, but tokens signed
/// with it stop verifying after a restart.
fn load_or_create_secret(path: &Path) -> String {
    if let Ok(existing) = std::fs::read_to_string(path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    match persist_secret(path, &secret) {
        Ok(()) => info!(path = %path.display(), "generated new JWT secret"),
        Err(e) => warn!(
            path = %path.display(),
            error = %e,
            "generated JWT secret could not be saved; sessions will not survive a restart"
        ),
    }
    secret
}

fn persist_secret(path: &Path, secret: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, secret)
}

fn jwt_secret_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("prompta")
        .join("jwt-secret")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret";

    #[test]
    fn issued_token_carries_identity_and_expiry() {
        let now = Utc::now();
        let token =
            generate_access_token("user-1", Role::Admin, SECRET, Duration::minutes(15), now)
                .unwrap();
        let claims = verify_access_token(&token, SECRET).expect("valid token");
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[test]
    fn issuance_is_deterministic_for_fixed_clock() {
        let now = Utc::now();
        let a = generate_access_token("u", Role::User, SECRET, Duration::minutes(15), now).unwrap();
        let b = generate_access_token("u", Role::User, SECRET, Duration::minutes(15), now).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_secret_is_a_signing_error() {
        let err = generate_access_token("u", Role::User, b"", Duration::minutes(15), Utc::now())
            .unwrap_err();
        assert!(matches!(err, AuthError::Signing(_)));
    }

    #[test]
    fn expired_token_is_distinguishable() {
        let issued = Utc::now() - Duration::hours(1);
        let token =
            generate_access_token("u", Role::User, SECRET, Duration::minutes(15), issued).unwrap();
        assert!(matches!(
            decode_access_token(&token, SECRET),
            Err(AuthError::TokenExpired)
        ));
        assert!(verify_access_token(&token, SECRET).is_none());
    }

    #[test]
    fn wrong_secret_is_unauthenticated() {
        let token =
            generate_access_token("u", Role::User, SECRET, Duration::minutes(15), Utc::now())
                .unwrap();
        assert!(matches!(
            decode_access_token(&token, b"other-secret"),
            Err(AuthError::Unauthenticated(_))
        ));
    }

    #[test]
    fn garbage_is_unauthenticated() {
        assert!(matches!(
            decode_access_token("not.a.jwt", SECRET),
            Err(AuthError::Unauthenticated(_))
        ));
    }

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("prompta-jwt-{}", crate::uuid::uuidv7()))
    }

    #[test]
    fn generated_secret_is_persisted_and_reloaded() {
        let dir = scratch_dir();
        let path = dir.join("nested").join("jwt-secret");
        let first = load_or_create_secret(&path);
        assert_eq!(first.len(), 64);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), first);
        assert_eq!(load_or_create_secret(&path), first);
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn unwritable_location_still_yields_a_secret() {
        let dir = scratch_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let blocker = dir.join("file");
        std::fs::write(&blocker, "").unwrap();
        // Parent is a regular file, so the directory cannot be created.
        let path = blocker.join("jwt-secret");
        let secret = load_or_create_secret(&path);
        assert_eq!(secret.len(), 64);
        assert!(!path.exists());
        std::fs::remove_dir_all(dir).unwrap();
    }
}
