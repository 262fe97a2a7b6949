use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap},
};

pub const UNKNOWN_CLIENT: &str = "unknown";

/// Best-effort client address for rate limiting and verification.
///
/// Prefers the edge proxy's `CF-Connecting-IP`, then the first hop of
/// `X-Forwarded-For`, then the socket peer when the server was started with
/// connect info, and otherwise reports `unknown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl ClientIp {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self::resolve(headers, None)
    }

    pub fn resolve(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        let header_value = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        if let Some(ip) = header_value("cf-connecting-ip") {
            return ClientIp(ip.to_string());
        }

        let forwarded = header_value("x-forwarded-for")
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty());

        match (forwarded, peer) {
            (Some(ip), _) => ClientIp(ip.to_string()),
            (None, Some(peer)) => ClientIp(peer.ip().to_string()),
            (None, None) => ClientIp(UNKNOWN_CLIENT.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(ClientIp::resolve(&parts.headers, peer))
    }
}
