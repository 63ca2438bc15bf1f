// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Fixed-Window Rate Limiter
//!
//! Counts requests per client in fixed windows and rejects with 429 once a
//! client exceeds `max_requests` inside one window.
//!
//! ## Keys
//!
//! A client is its network address, followed directly by the principal ID
//! when the request is authenticated. Layer the limiter after
//! `authenticate` / `optional_auth` so the principal is visible.
//!
//! ## Windows
//!
//! - First request: window opens with count 1
//! - Window older than `window`: reset to count 1
//! - Otherwise: count + 1, rejected once it exceeds `max_requests`
//!
//! A client can burst up to `2 * max_requests` across a window boundary.
//!
//! ## Sweep
//!
//! [`RateLimiter::start`] spawns a background task that evicts idle windows
//! every `sweep_interval`; [`RateLimiter::stop`] cancels it.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{
        header::{HeaderName, RETRY_AFTER},
        HeaderValue,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth::Principal;
use crate::error::ApiError;

const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

/// Address used when the peer address is unknown.
const UNKNOWN_CLIENT: &str = "unknown";

/// Rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Window length
    pub window: Duration,
    /// Requests allowed per window
    pub max_requests: u32,
    /// How often idle windows are evicted
    pub sweep_interval: Duration,
    /// Take the client address from `X-Forwarded-For` / `X-Real-IP`
    pub trust_proxy: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            max_requests: 100,
            sweep_interval: Duration::from_secs(60),
            trust_proxy: false,
        }
    }
}

/// Outcome of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

#[derive(Debug, Clone, Copy)]
struct RateWindow {
    count: u32,
    window_start: Instant,
}

struct Sweeper {
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

/// Process-wide request counter, shared by every request through the
/// `rate_limit` middleware.
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Mutex<HashMap<String, RateWindow>>,
    sweeper: Mutex<Option<Sweeper>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
            sweeper: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Count one request for `key` now.
    pub fn check(&self, key: &str) -> RateDecision {
        self.check_at(key, Instant::now())
    }

    /// Count one request for `key` at `now`.
    ///
    /// The whole read-modify-write happens under the map lock, so concurrent
    /// requests for one key are never under-counted.
    pub fn check_at(&self, key: &str, now: Instant) -> RateDecision {
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        let empty = RateWindow {
            count: 0,
            window_start: now,
        };

        let window = windows.entry(key.to_string()).or_insert(empty);
        if self.is_expired(window, now) {
            *window = empty;
        }
        window.count = window.count.saturating_add(1);

        if window.count > self.config.max_requests {
            let age = now.saturating_duration_since(window.window_start);
            RateDecision::Limited {
                retry_after: self.config.window.saturating_sub(age),
            }
        } else {
            RateDecision::Allowed {
                remaining: self.config.max_requests - window.count,
            }
        }
    }

    fn is_expired(&self, window: &RateWindow, now: Instant) -> bool {
        now.saturating_duration_since(window.window_start) > self.config.window
    }

    /// Evict every window idle for longer than the window length.
    /// Returns the number of evicted keys.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        let before = windows.len();
        windows.retain(|_, window| !self.is_expired(window, now));
        before - windows.len()
    }

    /// Number of keys currently tracked.
    pub fn tracked(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Current count for `key`, if tracked.
    pub fn count(&self, key: &str) -> Option<u32> {
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(|window| window.count)
    }

    /// Spawn the background sweep. No-op when it is already running.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(self: &Arc<Self>) {
        let mut sweeper = self.sweeper.lock().unwrap_or_else(PoisonError::into_inner);
        if sweeper.is_some() {
            return;
        }

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(run_sweeper(
            Arc::downgrade(self),
            self.config.sweep_interval,
            shutdown.clone(),
        ));

        *sweeper = Some(Sweeper { shutdown, handle });
    }

    /// Cancel the background sweep and wait for it to finish.
    pub async fn stop(&self) {
        let sweeper = self
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(Sweeper { shutdown, handle }) = sweeper {
            shutdown.cancel();
            if let Err(e) = handle.await {
                warn!(error = %e, "Rate limit sweeper did not shut down cleanly");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

async fn run_sweeper(limiter: Weak<RateLimiter>, period: Duration, shutdown: CancellationToken) {
    info!(interval_ms = period.as_millis() as u64, "Rate limit sweeper starting");

    loop {
        tokio::select! {
            _ = tokio::time::sleep(period) => {},
            _ = shutdown.cancelled() => {
                info!("Rate limit sweeper shutting down");
                return;
            }
        }

        let Some(limiter) = limiter.upgrade() else {
            return;
        };

        let evicted = limiter.sweep();
        if evicted > 0 {
            debug!(evicted, tracked = limiter.tracked(), "Evicted idle rate windows");
        }
    }
}

/// Rate-limit key: address immediately followed by the principal ID.
pub fn client_key(addr: &str, user_id: Option<&str>) -> String {
    match user_id {
        Some(id) => format!("{addr}{id}"),
        None => addr.to_string(),
    }
}

/// Best-effort client address for `request`.
pub fn client_addr(request: &Request, trust_proxy: bool) -> String {
    if trust_proxy {
        let headers = request.headers();
        let forwarded = headers
            .get(X_FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        let real_ip = headers
            .get(X_REAL_IP)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        if let Some(addr) = forwarded.or(real_ip) {
            return addr.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Rate-limit middleware.
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let addr = client_addr(&request, limiter.config.trust_proxy);
    let user_id = request.extensions().get::<Principal>().map(|p| p.id.as_str());
    let key = client_key(&addr, user_id);

    match limiter.check(&key) {
        RateDecision::Allowed { remaining } => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(limiter.config.max_requests));
            headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(remaining));
            response
        }
        RateDecision::Limited { retry_after } => {
            warn!(client = %key, path = %request.uri().path(), "Rate limit exceeded");

            // Round up so clients never retry inside the current window.
            let retry_secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            let mut response =
                ApiError::too_many_requests("Too many requests, please try again later.")
                    .into_response();
            let headers = response.headers_mut();
            headers.insert(RETRY_AFTER, HeaderValue::from(retry_secs.max(1)));
            headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(limiter.config.max_requests));
            headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(0u32));
            response
        }
    }
}
