//! Per-client sliding-window rate limiting.
//!
//! Each limiter keeps the request timestamps of every client address seen in
//! the current window. Stale entries are swept every `cleanup_interval`
//! requests, and the number of tracked addresses is hard-capped.
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::config::LimitConfig;
use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_secs: u64,
    pub cleanup_interval: u64,
    pub max_tracked_ips: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 300,
            window_secs: 15 * 60,
            cleanup_interval: 100,
            max_tracked_ips: 10_000,
        }
    }
}

impl From<LimitConfig> for RateLimitConfig {
    fn from(limit: LimitConfig) -> Self {
        Self {
            max_requests: limit.max_requests,
            window_secs: limit.window_secs,
            ..Default::default()
        }
    }
}

pub struct RateLimiter {
    config: RateLimitConfig,
    state: RwLock<HashMap<IpAddr, Vec<Instant>>>,
    request_count: AtomicU64,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            state: RwLock::new(HashMap::new()),
            request_count: AtomicU64::new(0),
        }
    }

    fn cutoff(&self, now: Instant) -> Instant {
        now.checked_sub(Duration::from_secs(self.config.window_secs))
            .unwrap_or(now)
    }

    /// Records a request from `ip`, or rejects it when the window is full.
    pub fn check(&self, ip: IpAddr) -> Result<(), AppError> {
        let now = Instant::now();
        let cutoff = self.cutoff(now);

        let count = self.request_count.fetch_add(1, Ordering::Relaxed);
        if count > 0 && count % self.config.cleanup_interval == 0 {
            self.cleanup();
        }

        let mut state = self
            .state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if !state.contains_key(&ip) && state.len() >= self.config.max_tracked_ips {
            drop(state);
            self.cleanup();
            state = self
                .state
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if !state.contains_key(&ip) && state.len() >= self.config.max_tracked_ips {
                tracing::warn!(ip = %ip, tracked_ips = state.len(), "rate limiter full, rejecting new client");
                return Err(AppError::RateLimited);
            }
        }

        let timestamps = state.entry(ip).or_default();
        timestamps.retain(|&t| t > cutoff);
        if timestamps.len() >= self.config.max_requests as usize {
            tracing::warn!(
                ip = %ip,
                requests = timestamps.len(),
                max = self.config.max_requests,
                "rate limit exceeded"
            );
            return Err(AppError::RateLimited);
        }
        timestamps.push(now);
        Ok(())
    }

    pub fn cleanup(&self) {
        let cutoff = self.cutoff(Instant::now());
        let mut state = self
            .state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        state.retain(|_, timestamps| {
            timestamps.retain(|&t| t > cutoff);
            !timestamps.is_empty()
        });
    }

    pub fn tracked_ips(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

/// Client address: the socket peer, else the first `X-Forwarded-For` hop.
fn client_ip(req: &Request) -> IpAddr {
    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip();
    }
    req.headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

pub async fn enforce(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    limiter.check(client_ip(&req))?;
    Ok(next.run(req).await)
}
