//! Identity resolution - maps a face sample to an enrolled user.
//!
//! "No match" is an ordinary outcome. Only a failed or slow extraction is
//! an error, so callers can tell an unknown face from a broken extractor.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::{timeout, Duration};

use crate::config::MatchSettings;
use crate::domain::{nearest_match, Embedding, MatchOutcome};
use crate::errors::{AppError, AppResult};
use crate::infra::{EmbeddingExtractor, UserDirectory};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Extract an embedding from `image` and match it.
    async fn resolve_image(&self, image: Vec<u8>) -> AppResult<MatchOutcome>;

    /// Match a pre-computed probe embedding.
    async fn resolve_embedding(&self, probe: Embedding) -> AppResult<MatchOutcome>;
}

/// Linear-scan resolver over the directory's eligible embeddings.
pub struct IdentityResolver {
    directory: Arc<dyn UserDirectory>,
    extractor: Arc<dyn EmbeddingExtractor>,
    settings: MatchSettings,
}

impl IdentityResolver {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        extractor: Arc<dyn EmbeddingExtractor>,
        settings: MatchSettings,
    ) -> Self {
        Self {
            directory,
            extractor,
            settings,
        }
    }
}

#[async_trait]
impl IdentityService for IdentityResolver {
    async fn resolve_image(&self, image: Vec<u8>) -> AppResult<MatchOutcome> {
        if image.is_empty() {
            return Err(AppError::validation("image is empty"));
        }

        let limit = Duration::from_millis(self.settings.extractor_timeout_ms);
        let probe = timeout(limit, self.extractor.extract(image))
            .await
            .map_err(|_| {
                AppError::external(format!(
                    "extraction timed out after {} ms",
                    self.settings.extractor_timeout_ms
                ))
            })??;

        self.resolve_embedding(probe).await
    }

    async fn resolve_embedding(&self, probe: Embedding) -> AppResult<MatchOutcome> {
        probe.ensure_dimension(self.settings.dimension)?;

        let enrolled = self.directory.find_eligible_embeddings().await?;
        let outcome = nearest_match(&probe, &enrolled, self.settings.threshold);

        match &outcome {
            MatchOutcome::Matched {
                user_id, distance, ..
            } => tracing::debug!(%user_id, distance, "Face matched"),
            MatchOutcome::NoMatch { nearest_distance } => {
                tracing::info!(
                    ?nearest_distance,
                    candidates = enrolled.len(),
                    "Face not recognized"
                )
            }
            MatchOutcome::Ambiguous { user_ids, distance } => {
                tracing::warn!(?user_ids, distance, "Ambiguous face match rejected")
            }
        }

        Ok(outcome)
    }
}
