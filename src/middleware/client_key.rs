use axum::{
    extract::{ConnectInfo, Request},
    http::{Extensions, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::convert::Infallible;
use std::net::SocketAddr;
use tracing::debug;

/// 无法识别来源时使用的共享限流键
pub const FALLBACK_CLIENT_KEY: &str = "unknown";

/// 客户端限流键
///
/// 存储在请求扩展中,准入管道按该键维护各自的限流窗口
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientKey(pub String);

impl ClientKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// 客户端识别中间件
///
/// 解析请求来源并将限流键存储到请求扩展中
///
/// # 解析顺序
///
/// 1. `x-forwarded-for` header 的第一跳
/// 2. `x-real-ip` header
/// 3. socket 对端地址
/// 4. 以上都不可用时,退化为共享的 "unknown" 键
pub async fn resolve_client_key(mut request: Request, next: Next) -> Response {
    let client_key = resolve_from(request.headers(), request.extensions());
    debug!("🔑 Resolved client key: {}", client_key.as_str());
    request.extensions_mut().insert(client_key);
    next.run(request).await
}

fn resolve_from(headers: &HeaderMap, extensions: &Extensions) -> ClientKey {
    // 1. x-forwarded-for 第一跳
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|h| h.to_str().ok()) {
        if let Some(first_hop) = forwarded.split(',').next() {
            let first_hop = first_hop.trim();
            if !first_hop.is_empty() {
                return ClientKey(first_hop.to_string());
            }
        }
    }

    // 2. x-real-ip
    if let Some(real_ip) = headers.get("x-real-ip").and_then(|h| h.to_str().ok()) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return ClientKey(real_ip.to_string());
        }
    }

    // 3. socket 对端地址
    if let Some(ConnectInfo(addr)) = extensions.get::<ConnectInfo<SocketAddr>>() {
        return ClientKey(addr.ip().to_string());
    }

    ClientKey(FALLBACK_CLIENT_KEY.to_string())
}

/// Axum 提取器:从请求扩展中提取客户端限流键
///
/// 中间件未运行时直接按同样的顺序解析,因此永不失败
pub struct ClientKeyExtractor(pub ClientKey);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for ClientKeyExtractor
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        if let Some(client_key) = parts.extensions.get::<ClientKey>() {
            return Ok(ClientKeyExtractor(client_key.clone()));
        }
        Ok(ClientKeyExtractor(resolve_from(
            &parts.headers,
            &parts.extensions,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;

    fn request_with_headers(headers: &[(&str, &str)]) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder().uri("/api/enhance");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).expect("Failed to build request")
    }

    #[test]
    fn test_forwarded_for_takes_first_hop() {
        let request = request_with_headers(&[("x-forwarded-for", "203.0.113.7, 10.0.0.1")]);
        let key = resolve_from(request.headers(), request.extensions());
        assert_eq!(key.as_str(), "203.0.113.7");
    }

    #[test]
    fn test_real_ip_used_when_forwarded_for_missing() {
        let request = request_with_headers(&[("x-real-ip", "198.51.100.2")]);
        let key = resolve_from(request.headers(), request.extensions());
        assert_eq!(key.as_str(), "198.51.100.2");
    }

    #[test]
    fn test_forwarded_for_wins_over_real_ip() {
        let request = request_with_headers(&[
            ("x-forwarded-for", "203.0.113.7"),
            ("x-real-ip", "198.51.100.2"),
        ]);
        let key = resolve_from(request.headers(), request.extensions());
        assert_eq!(key.as_str(), "203.0.113.7");
    }

    #[test]
    fn test_connect_info_used_when_headers_missing() {
        let mut request = request_with_headers(&[]);
        let addr: SocketAddr = "192.0.2.33:52100".parse().expect("Failed to parse addr");
        request.extensions_mut().insert(ConnectInfo(addr));
        let key = resolve_from(request.headers(), request.extensions());
        assert_eq!(key.as_str(), "192.0.2.33");
    }

    #[test]
    fn test_falls_back_to_shared_key() {
        let request = request_with_headers(&[]);
        let key = resolve_from(request.headers(), request.extensions());
        assert_eq!(key.as_str(), FALLBACK_CLIENT_KEY);
    }

    #[test]
    fn test_empty_forwarded_for_falls_through() {
        let request = request_with_headers(&[("x-forwarded-for", "  "), ("x-real-ip", "198.51.100.2")]);
        let key = resolve_from(request.headers(), request.extensions());
        assert_eq!(key.as_str(), "198.51.100.2");
    }
}
