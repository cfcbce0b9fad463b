//! Rate limiting middleware.
//!
//! Limits registration attempts per client IP with a keyed governor limiter
//! allowing `limit` requests per `window`, replenished evenly across the
//! window. The client IP is the socket peer; `X-Forwarded-For` is only
//! consulted when the peer is a configured trusted proxy.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::{Clock, DefaultClock},
    DefaultKeyedRateLimiter, Quota, RateLimiter,
};
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    num::NonZeroU32,
    sync::{Arc, Weak},
    time::Duration,
};
use tokio::task::JoinHandle;

use crate::app::AppState;
use crate::error::ApiError;

/// Key used when the peer address is unavailable.
const UNKNOWN_CLIENT: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

/// Rate limiter state shared across all requests, keyed by client IP.
pub struct RateLimiterState {
    limiter: DefaultKeyedRateLimiter<IpAddr>,
    trusted_proxies: Vec<IpAddr>,
    limit: u32,
    window: Duration,
}

impl RateLimiterState {
    /// Returns `None` when `limit` is zero (rate limiting disabled) or the
    /// window is empty.
    pub fn new(limit: u32, window: Duration, trusted_proxies: Vec<IpAddr>) -> Option<Self> {
        let burst = NonZeroU32::new(limit)?;
        let quota = Quota::with_period(window / limit)?.allow_burst(burst);
        Some(Self {
            limiter: RateLimiter::keyed(quota),
            trusted_proxies,
            limit,
            window,
        })
    }

    /// Ok if the client may proceed, otherwise the retry-after in seconds.
    pub fn check(&self, client: IpAddr) -> Result<(), u64> {
        self.limiter.check_key(&client).map_err(|not_until| {
            let wait = not_until.wait_time_from(DefaultClock::default().now());
            wait.as_secs().max(1)
        })
    }

    /// Drop per-client state that has fully replenished.
    pub fn prune(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }

    /// Client IP for `req`: the socket peer, or the nearest untrusted
    /// `X-Forwarded-For` hop when the peer is a trusted proxy.
    pub fn client_ip(&self, req: &Request<Body>) -> IpAddr {
        let Some(peer) = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
        else {
            return UNKNOWN_CLIENT;
        };

        if !self.trusted_proxies.contains(&peer) {
            return peer;
        }
        self.forwarded_client(req).unwrap_or(peer)
    }

    /// Walks `X-Forwarded-For` from the right, skipping trusted proxies.
    /// An unparseable hop ends the walk; nothing left of it can be trusted.
    fn forwarded_client(&self, req: &Request<Body>) -> Option<IpAddr> {
        let hops: Vec<&str> = req
            .headers()
            .get_all("x-forwarded-for")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect();

        for hop in hops.into_iter().rev() {
            let ip: IpAddr = hop.parse().ok()?;
            if !self.trusted_proxies.contains(&ip) {
                return Some(ip);
            }
        }
        None
    }
}

impl std::fmt::Debug for RateLimiterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiterState")
            .field("limit", &self.limit)
            .field("window", &self.window)
            .field("trusted_proxies", &self.trusted_proxies)
            .field("tracked_clients", &self.tracked_clients())
            .finish()
    }
}

/// Periodically prune `state` until it is dropped.
pub fn spawn_pruner(state: &Arc<RateLimiterState>, every: Duration) -> JoinHandle<()> {
    let weak: Weak<RateLimiterState> = Arc::downgrade(state);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.tick().await;
        loop {
            interval.tick().await;
            match weak.upgrade() {
                Some(state) => {
                    state.prune();
                    tracing::debug!(
                        tracked_clients = state.tracked_clients(),
                        "Pruned registration rate limiter"
                    );
                }
                None => break,
            }
        }
    })
}

/// Middleware that applies the per-client registration rate limit.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(ref rate_limiter) = state.rate_limiter {
        let client = rate_limiter.client_ip(&req);
        if let Err(retry_after) = rate_limiter.check(client) {
            tracing::warn!(client = %client, retry_after, "Registration rate limit exceeded");
            return rate_limited_response(retry_after);
        }
    }

    next.run(req).await
}

fn rate_limited_response(retry_after: u64) -> Response {
    let mut response = ApiError::RateLimited.into_response();
    if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
        response.headers_mut().insert(header::RETRY_AFTER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    const WINDOW: Duration = Duration::from_secs(15 * 60);

    fn limiter(limit: u32) -> RateLimiterState {
        RateLimiterState::new(limit, WINDOW, Vec::new()).unwrap()
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn request_from(peer: &str, forwarded_for: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder();
        if let Some(forwarded) = forwarded_for {
            builder = builder.header("x-forwarded-for", forwarded);
        }
        let mut req = builder.body(Body::empty()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::new(ip(peer), 5555)));
        req
    }

    #[test]
    fn test_zero_limit_disables() {
        assert!(RateLimiterState::new(0, WINDOW, Vec::new()).is_none());
        assert!(RateLimiterState::new(5, Duration::ZERO, Vec::new()).is_none());
    }

    #[test]
    fn test_allows_burst_then_limits() {
        let state = limiter(5);
        for i in 0..5 {
            assert!(state.check(ip("10.0.0.1")).is_ok(), "Request {} should be allowed", i);
        }
        let retry_after = state.check(ip("10.0.0.1")).unwrap_err();
        assert!(retry_after >= 1);
    }

    #[test]
    fn test_clients_are_independent() {
        let state = limiter(1);
        assert!(state.check(ip("10.0.0.1")).is_ok());
        assert!(state.check(ip("10.0.0.2")).is_ok());
        assert!(state.check(ip("10.0.0.1")).is_err());
        assert!(state.check(ip("10.0.0.2")).is_err());
        assert_eq!(state.tracked_clients(), 2);
    }

    #[test]
    fn test_forwarded_for_ignored_from_untrusted_peer() {
        let state = limiter(1);
        let mut allowed = 0;
        for i in 0..1000u32 {
            let forwarded = format!("198.51.{}.{}", i / 256, i % 256);
            let req = request_from("203.0.113.9", Some(&forwarded));
            let client = state.client_ip(&req);
            assert_eq!(client, ip("203.0.113.9"));
            if state.check(client).is_ok() {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 1);
        assert_eq!(state.tracked_clients(), 1);
    }

    #[test]
    fn test_forwarded_for_honoured_from_trusted_proxy() {
        let state = RateLimiterState::new(5, WINDOW, vec![ip("10.0.0.5"), ip("10.0.0.6")]).unwrap();

        let req = request_from("10.0.0.5", Some("203.0.113.7"));
        assert_eq!(state.client_ip(&req), ip("203.0.113.7"));

        // The rightmost untrusted hop wins; a client-supplied prefix is ignored.
        let req = request_from("10.0.0.5", Some("1.2.3.4, 203.0.113.7, 10.0.0.6"));
        assert_eq!(state.client_ip(&req), ip("203.0.113.7"));

        // Garbage or absent header falls back to the proxy itself.
        let req = request_from("10.0.0.5", Some("not-an-ip"));
        assert_eq!(state.client_ip(&req), ip("10.0.0.5"));
        let req = request_from("10.0.0.5", None);
        assert_eq!(state.client_ip(&req), ip("10.0.0.5"));
    }

    #[test]
    fn test_client_ip_without_peer_address() {
        let state = limiter(1);
        let bare = Request::builder()
            .header("x-forwarded-for", "203.0.113.7")
            .body(Body::empty())
            .unwrap();
        assert_eq!(state.client_ip(&bare), UNKNOWN_CLIENT);
    }

    #[test]
    fn test_prune_keeps_limited_clients() {
        let state = limiter(1);
        assert!(state.check(ip("10.0.0.1")).is_ok());
        state.prune();
        // Still inside the window, so the client stays limited.
        assert!(state.check(ip("10.0.0.1")).is_err());
        assert!(format!("{:?}", state).contains("tracked_clients"));
    }

    #[tokio::test]
    async fn test_pruner_stops_when_state_dropped() {
        let state = Arc::new(limiter(1));
        let handle = spawn_pruner(&state, Duration::from_millis(10));
        drop(state);
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("pruner should exit once the limiter is gone")
            .unwrap();
    }

    #[test]
    fn test_rate_limited_response_format() {
        let response = rate_limited_response(60);
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "60");
    }
}
