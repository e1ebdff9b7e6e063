//! Per-caller token buckets for artwork submissions.
//!
//! The limiter is an ordinary value held in application state, so every
//! router (and every test) gets its own independent set of buckets.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Buckets idle this long are full again and can be forgotten.
const IDLE_EVICTION: Duration = Duration::from_secs(10 * 60);

/// Sweep idle buckets once the map grows past this size.
const SWEEP_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone)]
struct TokenBucket {
    tokens: f64,
    capacity: f64,
    refill_rate: f64, // tokens per second
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, refill_rate: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            capacity,
            refill_rate,
            last_refill: now,
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }

    fn try_acquire(&mut self, now: Instant) -> bool {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn time_until_next_token(&self) -> Duration {
        if self.tokens >= 1.0 || self.refill_rate <= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64((1.0 - self.tokens) / self.refill_rate)
        }
    }
}

/// Outcome of a rejected acquisition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryAfter(pub Duration);

/// Allows `per_minute` submissions per caller, with a burst of the same size.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    buckets: Arc<Mutex<HashMap<Uuid, TokenBucket>>>,
    per_minute: u32,
}

impl RateLimiter {
    pub fn new(per_minute: u32) -> Self {
        Self {
            buckets: Arc::new(Mutex::new(HashMap::new())),
            per_minute,
        }
    }

    /// A limiter of zero never rejects anything.
    pub fn is_disabled(&self) -> bool {
        self.per_minute == 0
    }

    /// Take one token from `caller`'s bucket.
    pub async fn check(&self, caller: Uuid) -> Result<(), RetryAfter> {
        self.check_at(caller, Instant::now()).await
    }

    async fn check_at(&self, caller: Uuid, now: Instant) -> Result<(), RetryAfter> {
        if self.is_disabled() {
            return Ok(());
        }
        let capacity = f64::from(self.per_minute);
        let refill_rate = capacity / 60.0;

        let mut buckets = self.buckets.lock().await;
        if buckets.len() >= SWEEP_THRESHOLD {
            let before = buckets.len();
            buckets.retain(|_, bucket| now.duration_since(bucket.last_refill) < IDLE_EVICTION);
            tracing::debug!(evicted = before - buckets.len(), "swept idle rate limit buckets");
        }

        let bucket = buckets
            .entry(caller)
            .or_insert_with(|| TokenBucket::new(capacity, refill_rate, now));
        if bucket.try_acquire(now) {
            tracing::trace!(%caller, tokens_remaining = bucket.tokens, "rate limit token acquired");
            Ok(())
        } else {
            let wait = bucket.time_until_next_token();
            tracing::debug!(%caller, wait_ms = wait.as_millis() as u64, "rate limit reached");
            Err(RetryAfter(wait))
        }
    }
}
