//! Embedding extractor client.
//!
//! The face model runs as a separate HTTP service. It takes raw image bytes
//! and answers with `{"embedding": [f32; D]}` or `{"error": "..."}`.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

use crate::config::EXTRACTOR_CONNECT_TIMEOUT_MS;
use crate::domain::Embedding;
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Turns a captured image into a face embedding.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait EmbeddingExtractor: Send + Sync {
    /// Fails with `ExternalService` when no embedding could be produced.
    async fn extract(&self, image: Vec<u8>) -> AppResult<Embedding>;
}

#[derive(Debug, Deserialize)]
struct ExtractorResponse {
    #[serde(default)]
    embedding: Option<Vec<f32>>,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP client for the extractor service.
pub struct HttpEmbeddingExtractor {
    client: reqwest::Client,
    url: String,
}

impl HttpEmbeddingExtractor {
    /// `timeout` bounds the whole request; connecting gets a shorter budget.
    pub fn new(url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("attendance-engine/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(timeout.min(Duration::from_millis(EXTRACTOR_CONNECT_TIMEOUT_MS)))
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::internal(format!("extractor client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl EmbeddingExtractor for HttpEmbeddingExtractor {
    async fn extract(&self, image: Vec<u8>) -> AppResult<Embedding> {
        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image)
            .send()
            .await
            .map_err(|e| AppError::external(format!("extractor unreachable: {}", e)))?;

        let status = response.status();
        let body: ExtractorResponse = response
            .json()
            .await
            .map_err(|e| AppError::external(format!("unreadable extractor response: {}", e)))?;

        interpret(status, body)
    }
}

fn interpret(status: StatusCode, body: ExtractorResponse) -> AppResult<Embedding> {
    match (status.is_success(), body.embedding) {
        (true, Some(values)) => Embedding::new(values)
            .map_err(|e| AppError::external(format!("invalid embedding: {}", e))),
        _ => {
            let reason = body
                .error
                .unwrap_or_else(|| format!("extractor returned {}", status));
            tracing::debug!(%status, %reason, "Extraction failed");
            Err(AppError::external(reason))
        }
    }
}
