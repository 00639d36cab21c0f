//! Request extractors.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header::USER_AGENT;
use axum::http::request::Parts;
use prompta_core::models::auth::ClientMeta;

/// The requesting client's user agent and IP, recorded on new sessions.
///
/// The IP is the first `X-Forwarded-For` hop, else the socket peer when the
/// server was started with connect info, else `"unknown"`.
#[derive(Debug, Clone)]
pub struct Client(pub ClientMeta);

impl<S: Send + Sync> FromRequestParts<S> for Client {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let mut meta = ClientMeta::default();

        if let Some(ua) = parts
            .headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
        {
            meta.user_agent = ua.to_string();
        }

        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        if let Some(ip) = forwarded {
            meta.ip_address = ip.to_string();
        } else if let Some(ConnectInfo(addr)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
            meta.ip_address = addr.ip().to_string();
        }

        Ok(Client(meta))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    async fn extract(req: Request<()>) -> ClientMeta {
        let (mut parts, _) = req.into_parts();
        Client::from_request_parts(&mut parts, &()).await.unwrap().0
    }

    #[tokio::test]
    async fn prefers_first_forwarded_hop() {
        let req = Request::builder()
            .header(USER_AGENT, "curl/8.0")
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(())
            .unwrap();
        let meta = extract(req).await;
        assert_eq!(meta.user_agent, "curl/8.0");
        assert_eq!(meta.ip_address, "203.0.113.7");
    }

    #[tokio::test]
    async fn falls_back_to_connect_info() {
        let mut req = Request::builder().body(()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 4000))));
        let meta = extract(req).await;
        assert_eq!(meta.ip_address, "192.0.2.1");
        assert_eq!(meta.user_agent, "unknown");
    }

    #[tokio::test]
    async fn unknown_without_any_source() {
        let meta = extract(Request::builder().body(()).unwrap()).await;
        assert_eq!(meta, ClientMeta::default());
    }
}
