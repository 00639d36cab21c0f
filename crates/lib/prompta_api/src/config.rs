//! API server configuration.

use chrono::Duration;
use prompta_core::auth::AuthConfig;

use crate::services::auth::resolve_jwt_secret;

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3100").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub pg_connection_url: String,
    /// JWT signing secret for access tokens.
    pub jwt_secret: String,
    /// Mark auth cookies `Secure`. On in production.
    pub cookie_secure: bool,
    /// Token lifetimes and session limits.
    pub auth: AuthConfig,
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                     | Default                             |
    /// |------------------------------|-------------------------------------|
    /// | `BIND_ADDR`                  | `127.0.0.1:3100`                    |
    /// | `DATABASE_URL`               | `postgres://localhost:5432/prompta` |
    /// | `JWT_SECRET` / `AUTH_SECRET` | generated & persisted to file       |
    /// | `PROMPTA_ENV`                | `development`                       |
    /// | `ACCESS_TOKEN_TTL_SECS`      | `900`                               |
    /// | `REFRESH_TOKEN_TTL_DAYS`     | `7`                                 |
    /// | `MAX_SESSIONS`               | `5`                                 |
    /// | `BCRYPT_COST`                | `10`                                |
    pub fn from_env() -> Self {
        let defaults = AuthConfig::default();
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3100".into()),
            pg_connection_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/prompta".into()),
            jwt_secret: resolve_jwt_secret(),
            cookie_secure: is_production(std::env::var("PROMPTA_ENV").ok().as_deref()),
            auth: AuthConfig {
                access_token_ttl: access_token_ttl(env_parse("ACCESS_TOKEN_TTL_SECS"))
                    .unwrap_or(defaults.access_token_ttl),
                refresh_token_ttl: refresh_token_ttl(env_parse("REFRESH_TOKEN_TTL_DAYS"))
                    .unwrap_or(defaults.refresh_token_ttl),
                max_sessions: env_parse("MAX_SESSIONS")
                    .filter(|n: &usize| *n > 0)
                    .unwrap_or(defaults.max_sessions),
                bcrypt_cost: env_parse("BCRYPT_COST")
                    .filter(|c: &u32| BCRYPT_COST_RANGE.contains(c))
                    .unwrap_or(defaults.bcrypt_cost),
            },
        }
    }
}

/// Longest accepted access-token lifetime: one day.
const MAX_ACCESS_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;
/// Longest accepted refresh-token lifetime: one year.
const MAX_REFRESH_TOKEN_TTL_DAYS: i64 = 365;
/// Costs bcrypt accepts.
const BCRYPT_COST_RANGE: std::ops::RangeInclusive<u32> = 4..=31;

/// Access-token TTL from a raw seconds value; `None` when out of range.
fn access_token_ttl(secs: Option<i64>) -> Option<Duration> {
    secs.filter(|s| (1..=MAX_ACCESS_TOKEN_TTL_SECS).contains(s))
        .map(Duration::seconds)
}

/// Refresh-token TTL from a raw day count; `None` when out of range.
fn refresh_token_ttl(days: Option<i64>) -> Option<Duration> {
    days.filter(|d| (1..=MAX_REFRESH_TOKEN_TTL_DAYS).contains(d))
        .map(Duration::days)
}

/// Whether the deployment environment name means production.
pub fn is_production(env: Option<&str>) -> bool {
    matches!(env, Some(e) if e.eq_ignore_ascii_case("production"))
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_detection() {
        assert!(is_production(Some("production")));
        assert!(is_production(Some("PRODUCTION")));
        assert!(!is_production(Some("development")));
        assert!(!is_production(None));
    }

    #[test]
    fn token_ttls_reject_non_positive_and_huge_values() {
        assert_eq!(access_token_ttl(Some(60)), Some(Duration::seconds(60)));
        assert_eq!(access_token_ttl(Some(0)), None);
        assert_eq!(access_token_ttl(Some(-5)), None);
        assert_eq!(access_token_ttl(Some(i64::MAX)), None);
        assert_eq!(access_token_ttl(None), None);

        assert_eq!(refresh_token_ttl(Some(7)), Some(Duration::days(7)));
        assert_eq!(refresh_token_ttl(Some(365)), Some(Duration::days(365)));
        assert_eq!(refresh_token_ttl(Some(0)), None);
        assert_eq!(refresh_token_ttl(Some(-1)), None);
        assert_eq!(refresh_token_ttl(Some(i64::MAX)), None);
    }
}
