//! Per-requester token buckets.
//!
//! Time is passed in explicitly (`now` from the context clock) so the
//! simulation harness can drive refills with a virtual clock.

use crate::config::RateLimitConfig;
use ethology_env::RequesterId;
use std::collections::HashMap;
use std::time::Duration;

/// Absorbs float error so a refill of exactly one token is never lost.
const EPSILON: f64 = 1e-6;

/// Token bucket, lazily refilled on each acquisition attempt.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: f64,
    tokens: f64,
    refill_per_sec: f64,
    last_refill: Duration,
}

impl TokenBucket {
    /// A full bucket.
    pub fn new(capacity: u32, refill_per_sec: f64, now: Duration) -> Self {
        Self {
            capacity: capacity as f64,
            tokens: capacity as f64,
            refill_per_sec,
            last_refill: now,
        }
    }

    /// Takes one token if available.
    pub fn try_acquire(&mut self, now: Duration) -> bool {
        self.refill(now);
        if self.tokens + EPSILON >= 1.0 {
            self.tokens = (self.tokens - 1.0).max(0.0);
            true
        } else {
            false
        }
    }

    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    fn refill(&mut self, now: Duration) {
        let elapsed = now.saturating_sub(self.last_refill).as_secs_f64();
        if elapsed > 0.0 {
            self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
            self.last_refill = now;
        }
    }
}

/// One bucket per requester, created full on first contact.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: HashMap<RequesterId, TokenBucket>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: HashMap::new(),
        }
    }

    /// Consumes one token from the requester's bucket.
    pub fn try_acquire(&mut self, requester: RequesterId, now: Duration) -> bool {
        let config = self.config;
        self.buckets
            .entry(requester)
            .or_insert_with(|| TokenBucket::new(config.capacity, config.refill_per_sec, now))
            .try_acquire(now)
    }

    /// Forgets every requester.
    pub fn clear(&mut self) {
        self.buckets.clear();
    }

    pub fn tracked_requesters(&self) -> usize {
        self.buckets.len()
    }
}
