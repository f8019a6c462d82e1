//! Query embeddings for hybrid search.
//!
//! The embedding service is an external collaborator reached through [`EmbeddingService`].
//! Calls are gated by a per-user token bucket; an exhausted bucket is reported as
//! [`EmbeddingError::RateLimited`] and handled like any other embedding failure.

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use parking_lot::Mutex;

use crate::EmbeddingError;

/// Computes vector embeddings for query text.
pub trait EmbeddingService: Send + Sync {
    /// Returns the embedding of `text` produced by `model`.
    fn embed(&self, text: &str, model: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// An embedding service that always answers with the same vector.
///
/// Useful when the embedding was computed elsewhere and only the query needs building.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticEmbedding {
    /// The vector returned for every request.
    vector: Vec<f32>,
}

impl StaticEmbedding {
    /// Creates a service answering with `vector`.
    pub fn new(vector: Vec<f32>) -> Self {
        Self { vector }
    }
}

impl EmbeddingService for StaticEmbedding {
    fn embed(&self, _text: &str, _model: &str) -> Result<Vec<f32>, EmbeddingError> {
        if self.vector.is_empty() {
            return Err(EmbeddingError::Empty);
        }
        Ok(self.vector.clone())
    }
}

/// How often idle buckets are swept from a [`RateLimiter`].
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// A token bucket.
///
/// Refills at `rate` tokens per second up to `capacity`.
#[derive(Debug)]
struct TokenBucket {
    /// Tokens currently available.
    tokens: f64,
    /// When the bucket was last refilled.
    last_refill: Instant,
    /// Maximum number of tokens.
    capacity: f64,
    /// Tokens added per second.
    rate: f64,
}

impl TokenBucket {
    /// Creates a full bucket.
    fn new(capacity: f64, rate: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_refill: now,
            capacity,
            rate,
        }
    }

    /// Returns the tokens available at `now`.
    fn available(&self, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        (self.tokens + elapsed * self.rate).min(self.capacity)
    }

    /// Returns true when the bucket has refilled completely by `now`.
    ///
    /// A full bucket is indistinguishable from a fresh one, so it can be dropped.
    fn is_full(&self, now: Instant) -> bool {
        self.available(now) >= self.capacity
    }

    /// Takes one token, returning false when none is left.
    fn try_acquire(&mut self, now: Instant) -> bool {
        self.tokens = self.available(now);
        self.last_refill = now;
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Buckets plus the time of the last sweep.
#[derive(Debug)]
struct Buckets {
    /// Buckets keyed by user id.
    by_user: HashMap<u64, TokenBucket>,
    /// When full buckets were last dropped.
    last_sweep: Instant,
}

/// Per-user limiter for embedding requests.
///
/// Safe to share between threads; each user gets an independent bucket. Buckets that have
/// refilled completely are dropped periodically, so the map only holds recently active users.
#[derive(Debug)]
pub struct RateLimiter {
    /// Per-user buckets.
    buckets: Mutex<Buckets>,
    /// Burst size of a fresh bucket.
    capacity: f64,
    /// Refill rate in tokens per second.
    rate: f64,
}

impl RateLimiter {
    /// Creates a limiter allowing `requests` per user per minute.
    pub fn per_minute(requests: u32) -> Self {
        let capacity = f64::from(requests);
        Self {
            buckets: Mutex::new(Buckets {
                by_user: HashMap::new(),
                last_sweep: Instant::now(),
            }),
            capacity,
            rate: capacity / 60.0,
        }
    }

    /// Consumes one request from `user_id`'s budget.
    pub fn check(&self, user_id: u64) -> Result<(), EmbeddingError> {
        self.check_at(user_id, Instant::now())
    }

    /// Consumes one request from `user_id`'s budget as of `now`.
    pub fn check_at(&self, user_id: u64, now: Instant) -> Result<(), EmbeddingError> {
        let mut buckets = self.buckets.lock();
        if now.saturating_duration_since(buckets.last_sweep) >= SWEEP_INTERVAL {
            buckets.by_user.retain(|_, bucket| !bucket.is_full(now));
            buckets.last_sweep = now;
        }
        let bucket = buckets
            .by_user
            .entry(user_id)
            .or_insert_with(|| TokenBucket::new(self.capacity, self.rate, now));
        if bucket.try_acquire(now) {
            Ok(())
        } else {
            Err(EmbeddingError::RateLimited { user_id })
        }
    }

    /// Returns the number of users currently tracked.
    pub fn tracked_users(&self) -> usize {
        self.buckets.lock().by_user.len()
    }
}
