//! Deployment environment shared by every build.

use esq_config::Config;

use crate::embeddings::{EmbeddingService, RateLimiter};

/// Everything a build reads besides the caller's options.
#[derive(Clone, Copy)]
pub struct BuildEnv<'a> {
    /// Effective configuration.
    pub config: &'a Config,
    /// Embedding service for hybrid search, if any.
    pub embeddings: Option<&'a dyn EmbeddingService>,
    /// Per-user limiter guarding the embedding service.
    pub limiter: Option<&'a RateLimiter>,
}

impl<'a> BuildEnv<'a> {
    /// Creates an environment without embedding support.
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            embeddings: None,
            limiter: None,
        }
    }

    /// Adds an embedding service and its limiter.
    pub fn with_embeddings(
        self,
        service: &'a dyn EmbeddingService,
        limiter: &'a RateLimiter,
    ) -> Self {
        Self {
            embeddings: Some(service),
            limiter: Some(limiter),
            ..self
        }
    }
}
