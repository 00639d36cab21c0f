//! Route paths.

pub const GET_API_HEALTH: &str = "/api/health";

pub const POST_AUTH_REGISTER: &str = "/api/auth/register";
pub const POST_AUTH_LOGIN: &str = "/api/auth/login";
pub const POST_AUTH_REFRESH: &str = "/api/auth/refresh";
pub const POST_AUTH_LOGOUT: &str = "/api/auth/logout";
pub const POST_AUTH_LOGOUT_ALL: &str = "/api/auth/logout-all";
pub const GET_AUTH_ME: &str = "/api/auth/me";
pub const GET_AUTH_SESSIONS: &str = "/api/auth/sessions";

pub const GET_ADMIN_USER_SESSIONS: &str = "/api/admin/users/{id}/sessions";
