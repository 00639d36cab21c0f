//! Cookie service: set/read/clear httpOnly auth cookies.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

use crate::routes::POST_AUTH_REFRESH;

/// Cookie name for the access token.
pub const ACCESS_COOKIE: &str = "access_token";
/// Cookie name for the refresh token.
pub const REFRESH_COOKIE: &str = "refresh_token";

/// Path the refresh cookie is scoped to.
pub const REFRESH_COOKIE_PATH: &str = POST_AUTH_REFRESH;

fn base_cookie(name: &str, value: String, path: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((name.to_string(), value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .path(path.to_string())
        .build()
}

/// Build the access token cookie, valid on every path.
pub fn access_cookie(token: &str, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    let mut cookie = base_cookie(ACCESS_COOKIE, token.to_string(), "/", secure);
    cookie.set_max_age(Duration::seconds(max_age_secs));
    cookie
}

/// Build the refresh token cookie, sent only to the refresh endpoint.
pub fn refresh_cookie(token: &str, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    let mut cookie = base_cookie(REFRESH_COOKIE, token.to_string(), REFRESH_COOKIE_PATH, secure);
    cookie.set_max_age(Duration::seconds(max_age_secs));
    cookie
}

/// Build an expired access cookie to clear auth state.
pub fn clear_access_cookie(secure: bool) -> Cookie<'static> {
    let mut cookie = base_cookie(ACCESS_COOKIE, String::new(), "/", secure);
    cookie.set_max_age(Duration::ZERO);
    cookie
}

/// Build an expired refresh cookie. Path must match the one it was set with.
pub fn clear_refresh_cookie(secure: bool) -> Cookie<'static> {
    let mut cookie = base_cookie(REFRESH_COOKIE, String::new(), REFRESH_COOKIE_PATH, secure);
    cookie.set_max_age(Duration::ZERO);
    cookie
}

/// Add both token cookies to the jar.
pub fn set_token_cookies(
    jar: CookieJar,
    access_token: &str,
    access_max_age_secs: i64,
    refresh_token: &str,
    refresh_max_age_secs: i64,
    secure: bool,
) -> CookieJar {
    jar.add(access_cookie(access_token, access_max_age_secs, secure))
        .add(refresh_cookie(refresh_token, refresh_max_age_secs, secure))
}

/// Replace both token cookies with expired ones.
pub fn clear_token_cookies(jar: CookieJar, secure: bool) -> CookieJar {
    jar.add(clear_access_cookie(secure))
        .add(clear_refresh_cookie(secure))
}

/// Read a non-empty cookie value.
pub fn cookie_value(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}
