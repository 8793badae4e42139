//! Per-endpoint pacing for dashboard calls
//!
//! Pacing is reactive: a limiter stays dormant until its endpoint answers
//! with a 429, then throttles every later call to that endpoint. Detail
//! fetches additionally retry with exponential backoff.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use log::debug;
use tokio::sync::RwLock;

/// Dashboard endpoints with their own pacing budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// GET/POST /login
    Login,
    /// POST /portal/sms/received/getsms
    Ranges,
    /// POST /portal/sms/received/getsms/number
    Numbers,
    /// POST /portal/sms/received/getsms/number/sms
    Details,
}

impl Endpoint {
    pub const ALL: [Endpoint; 4] = [
        Endpoint::Login,
        Endpoint::Ranges,
        Endpoint::Numbers,
        Endpoint::Details,
    ];

    /// Path relative to the dashboard base URL.
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Login => "/login",
            Endpoint::Ranges => "/portal/sms/received/getsms",
            Endpoint::Numbers => "/portal/sms/received/getsms/number",
            Endpoint::Details => "/portal/sms/received/getsms/number/sms",
        }
    }

    /// Requests per minute once throttling kicks in.
    pub fn per_minute(&self) -> u32 {
        match self {
            Endpoint::Login => 6,
            Endpoint::Ranges => 30,
            Endpoint::Numbers => 60,
            Endpoint::Details => 120,
        }
    }
}

/// Limiter state for a single endpoint.
pub struct EndpointRateLimiter {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    active: AtomicBool,
    endpoint: Endpoint,
}

impl EndpointRateLimiter {
    pub fn new(endpoint: Endpoint) -> Self {
        let per_minute = NonZeroU32::new(endpoint.per_minute()).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: RateLimiter::direct(Quota::per_minute(per_minute)),
            active: AtomicBool::new(false),
            endpoint,
        }
    }

    pub fn activate(&self) {
        let was_active = self.active.swap(true, Ordering::SeqCst);
        if !was_active {
            debug!("Pacing activated for {:?}", self.endpoint);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub async fn wait_if_active(&self) {
        if self.is_active() {
            debug!("Waiting for {:?} limiter", self.endpoint);
            self.limiter.until_ready().await;
        }
    }
}

/// Limiters for every dashboard endpoint.
pub struct RateLimiterSet {
    limiters: RwLock<HashMap<Endpoint, EndpointRateLimiter>>,
}

impl Default for RateLimiterSet {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiterSet {
    pub fn new() -> Self {
        let map = Endpoint::ALL
            .into_iter()
            .map(|endpoint| (endpoint, EndpointRateLimiter::new(endpoint)))
            .collect();

        Self {
            limiters: RwLock::new(map),
        }
    }

    pub async fn wait_for(&self, endpoint: Endpoint) {
        let limiters = self.limiters.read().await;
        if let Some(limiter) = limiters.get(&endpoint) {
            limiter.wait_if_active().await;
        }
    }

    /// Called when an endpoint answers 429.
    pub async fn activate(&self, endpoint: Endpoint) {
        let limiters = self.limiters.read().await;
        if let Some(limiter) = limiters.get(&endpoint) {
            limiter.activate();
        }
    }

    pub async fn is_active(&self, endpoint: Endpoint) -> bool {
        let limiters = self.limiters.read().await;
        limiters
            .get(&endpoint)
            .is_some_and(EndpointRateLimiter::is_active)
    }
}

/// Exponential backoff schedule for retried calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
    pub max_attempts: u32,
}

impl Backoff {
    /// Detail fetches: 5s, 10s, 20s... capped at 60s, three attempts.
    pub const DETAIL: Backoff = Backoff {
        initial: Duration::from_secs(5),
        max: Duration::from_secs(60),
        max_attempts: 3,
    };

    /// Delay to wait after the given zero-based attempt failed.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial.saturating_mul(factor).min(self.max)
    }
}
