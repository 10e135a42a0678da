use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use crate::{db::CacheKey, error::AppError, routes::AppState};

const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
const WINDOW_SECS: u64 = 60;

/// Client address taken from `X-Forwarded-For` behind `trusted_proxies` proxies
///
/// Each trusted proxy appends the address of the peer it received the
/// request from, so the client is the entry `trusted_proxies` places from the
/// right. Anything further left is caller-controlled and ignored.
fn forwarded_client(header: &str, trusted_proxies: usize) -> Option<IpAddr> {
    if trusted_proxies == 0 {
        return None;
    }

    let entries: Vec<&str> = header
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    let index = entries.len().checked_sub(trusted_proxies)?;
    entries[index].parse().ok()
}

/// Identifies the caller, falling back to the peer address
fn client_id(request: &Request, trusted_proxies: usize) -> String {
    request
        .headers()
        .get(FORWARDED_FOR_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|value| forwarded_client(value, trusted_proxies))
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        })
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn limit_message(limit: u32) -> String {
    format!("No more than {} requests per minute", limit)
}

/// Fixed-window request limiter keyed by client and minute
///
/// A limit of zero disables it. When Redis is unreachable requests pass.
pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let limit = state.config.rate_limit_per_minute;
    if limit == 0 {
        return next.run(request).await;
    }

    let client = client_id(&request, state.config.trusted_proxy_count);
    let minute = Utc::now().timestamp() / WINDOW_SECS as i64;

    match state
        .cache
        .increment(&CacheKey::RateLimit(client.clone(), minute), WINDOW_SECS)
        .await
    {
        Ok(count) if count > u64::from(limit) => {
            tracing::warn!(client = %client, count = count, "Rate limit exceeded");
            AppError::TooManyRequests(limit_message(limit)).into_response()
        }
        Ok(_) => next.run(request).await,
        Err(e) => {
            tracing::warn!(error = %e, client = %client, "Rate limiter unavailable, allowing request");
            next.run(request).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http;
    use axum::body::Body;

    fn peer(request: &mut Request) {
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 5000))));
    }

    #[test]
    fn test_forwarded_for_ignored_without_trusted_proxies() {
        let mut request = http::Request::builder()
            .header(FORWARDED_FOR_HEADER, "203.0.113.7")
            .body(Body::empty())
            .unwrap();
        peer(&mut request);
        assert_eq!(client_id(&request, 0), "192.0.2.1");
    }

    #[test]
    fn test_spoofed_entries_left_of_trusted_proxy_are_ignored() {
        // the caller sent "1.1.1.1"; the proxy appended the real peer
        let request = http::Request::builder()
            .header(FORWARDED_FOR_HEADER, "1.1.1.1, 203.0.113.7")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_id(&request, 1), "203.0.113.7");

        let other = http::Request::builder()
            .header(FORWARDED_FOR_HEADER, "9.9.9.9, 203.0.113.7")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_id(&other, 1), client_id(&request, 1));
    }

    #[test]
    fn test_forwarded_client_with_proxy_chain() {
        assert_eq!(
            forwarded_client("1.1.1.1, 203.0.113.7, 10.0.0.2", 2),
            Some("203.0.113.7".parse().unwrap())
        );
        assert_eq!(forwarded_client("10.0.0.2", 2), None);
        assert_eq!(forwarded_client("not-an-ip", 1), None);
        assert_eq!(forwarded_client("", 1), None);
    }

    #[test]
    fn test_short_or_invalid_header_falls_back_to_peer() {
        let mut request = http::Request::builder()
            .header(FORWARDED_FOR_HEADER, "garbage")
            .body(Body::empty())
            .unwrap();
        peer(&mut request);
        assert_eq!(client_id(&request, 1), "192.0.2.1");
    }

    #[test]
    fn test_client_id_unknown() {
        let request = http::Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_id(&request, 1), "unknown");
    }

    #[test]
    fn test_limit_message() {
        assert_eq!(limit_message(10), "No more than 10 requests per minute");
    }
}
