//! Per-IP fixed-window rate limiting
//!
//! Counters live behind the `RateLimitStore` trait so the pipeline can be
//! built with a fresh store per test and a shared one per process.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use hyper::header::{HeaderName, RETRY_AFTER};
use hyper::StatusCode;

use super::{Flow, RequestContext};
use crate::config::RateLimitConfig;
use crate::error::Fault;
use crate::http;
use crate::logger;
use crate::routing;

const LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const RESET_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Counter state for one client after a hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    pub count: u32,
    pub resets_at: DateTime<Utc>,
}

pub trait RateLimitStore: Send + Sync {
    /// Count one request from `key` and return the updated window
    fn hit(&self, key: IpAddr, now: DateTime<Utc>) -> WindowState;

    /// Drop windows that ended before `now`; returns how many were removed
    fn prune(&self, now: DateTime<Utc>) -> usize;
}

/// Process-local counters
#[derive(Debug)]
pub struct MemoryStore {
    window: TimeDelta,
    windows: Mutex<HashMap<IpAddr, WindowState>>,
}

impl MemoryStore {
    pub fn new(window: Duration) -> Self {
        Self {
            window: TimeDelta::from_std(window).unwrap_or(TimeDelta::hours(1)),
            windows: Mutex::new(HashMap::new()),
        }
    }
}

impl RateLimitStore for MemoryStore {
    fn hit(&self, key: IpAddr, now: DateTime<Utc>) -> WindowState {
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        let state = windows.entry(key).or_insert(WindowState {
            count: 0,
            resets_at: now + self.window,
        });
        if state.resets_at <= now {
            *state = WindowState {
                count: 0,
                resets_at: now + self.window,
            };
        }
        state.count = state.count.saturating_add(1);
        *state
    }

    fn prune(&self, now: DateTime<Utc>) -> usize {
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        let before = windows.len();
        windows.retain(|_, state| state.resets_at > now);
        before - windows.len()
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    max: u32,
    scope: String,
    message: String,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig, store: Arc<dyn RateLimitStore>) -> Self {
        Self {
            store,
            max: config.max,
            scope: config.scope.clone(),
            message: config.message.clone(),
        }
    }

    pub fn store(&self) -> Arc<dyn RateLimitStore> {
        Arc::clone(&self.store)
    }

    pub fn apply(&self, ctx: &mut RequestContext) -> Flow {
        if routing::match_prefix(ctx.path(), &self.scope).is_none() {
            return Flow::Next;
        }

        let now = Utc::now();
        let state = self.store.hit(ctx.client_ip, now);
        let remaining = self.max.saturating_sub(state.count);

        ctx.set_response_header(LIMIT_HEADER, &self.max.to_string());
        ctx.set_response_header(REMAINING_HEADER, &remaining.to_string());
        ctx.set_response_header(RESET_HEADER, &state.resets_at.timestamp().to_string());

        if state.count <= self.max {
            return Flow::Next;
        }

        logger::log_debug(&format!(
            "Rate limit exceeded for {} ({} requests)",
            ctx.client_ip, state.count
        ));
        let retry_after = (state.resets_at - now).num_seconds().max(0);
        ctx.set_response_header(RETRY_AFTER, &retry_after.to_string());
        Flow::Respond(http::build_text_response(
            StatusCode::TOO_MANY_REQUESTS,
            &self.message,
        ))
    }
}

/// Prune expired windows every `every` until the task is dropped
pub async fn run_sweeper(store: Arc<dyn RateLimitStore>, every: Duration) -> Result<(), Fault> {
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        let removed = store.prune(Utc::now());
        if removed > 0 {
            logger::log_debug(&format!("Rate limiter pruned {removed} expired windows"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::context::test_context;
    use hyper::Method;

    fn limiter() -> RateLimiter {
        let config = crate::config::test_config().rate_limit;
        let store = Arc::new(MemoryStore::new(Duration::from_secs(config.window_secs)));
        RateLimiter::new(&config, store)
    }

    fn hit(limiter: &RateLimiter, ip: [u8; 4], path: &str) -> (Flow, RequestContext) {
        let mut ctx = test_context(Method::GET, path);
        ctx.client_ip = IpAddr::from(ip);
        (limiter.apply(&mut ctx), ctx)
    }

    #[test]
    fn test_thousand_and_first_request_is_rejected() {
        let limiter = limiter();
        for _ in 0..999 {
            assert!(matches!(hit(&limiter, [10, 0, 0, 1], "/api/v1/products").0, Flow::Next));
        }
        let (flow, ctx) = hit(&limiter, [10, 0, 0, 1], "/api/v1/products");
        assert!(matches!(flow, Flow::Next));
        assert_eq!(ctx.response_headers[REMAINING_HEADER], "0");

        match hit(&limiter, [10, 0, 0, 1], "/api/v1/orders").0 {
            Flow::Respond(resp) => assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS),
            Flow::Next => panic!("1001st request should be limited"),
        }

        let (flow, ctx) = hit(&limiter, [10, 0, 0, 2], "/api/v1/orders");
        assert!(matches!(flow, Flow::Next));
        assert_eq!(ctx.response_headers[REMAINING_HEADER], "999");
    }

    #[test]
    fn test_paths_outside_scope_are_not_counted() {
        let limiter = limiter();
        let (flow, ctx) = hit(&limiter, [10, 0, 0, 1], "/orders");
        assert!(matches!(flow, Flow::Next));
        assert!(ctx.response_headers.is_empty());
        let (_, ctx) = hit(&limiter, [10, 0, 0, 1], "/apiary");
        assert!(ctx.response_headers.is_empty());
    }

    #[test]
    fn test_window_resets_and_prunes() {
        let store = MemoryStore::new(Duration::from_secs(60));
        let ip = IpAddr::from([10, 0, 0, 1]);
        let t0 = Utc::now();
        assert_eq!(store.hit(ip, t0).count, 1);
        assert_eq!(store.hit(ip, t0 + TimeDelta::seconds(30)).count, 2);
        assert_eq!(store.hit(ip, t0 + TimeDelta::seconds(61)).count, 1);

        assert_eq!(store.prune(t0 + TimeDelta::seconds(90)), 0);
        assert_eq!(store.prune(t0 + TimeDelta::seconds(200)), 1);
    }
}
