// SPDX-License-Identifier: MIT

//! Bounded retries for a generation backend
//!
//! The workflow engine never retries a step. A model that needs retries is
//! wrapped here once, at construction time.

use super::{Content, GenerationConfig, Model};
use crate::adk::error::{ModelError, NourishError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Client errors that no retry can fix: 4xx other than 408 and 429, and
/// exhausted quotas
fn is_non_retryable(err: &NourishError) -> bool {
    let msg = err.to_string();
    if is_quota_exhausted(&msg) {
        return true;
    }

    if let NourishError::Http(http_err) = err {
        if let Some(status) = http_err.status() {
            let code = status.as_u16();
            return status.is_client_error() && code != 429 && code != 408;
        }
    }

    // Backends report the status inside the message text
    for word in msg.split(|c: char| !c.is_ascii_digit()) {
        if let Ok(code) = word.parse::<u16>() {
            if (400..500).contains(&code) {
                return code != 429 && code != 408;
            }
        }
    }
    false
}

fn is_quota_exhausted(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("insufficient_quota")
        || lower.contains("exceeded your current quota")
        || lower.contains("billing")
}

/// Wraps a model and retries failed calls with linear backoff
pub struct RetryingModel {
    inner: Arc<dyn Model>,
    max_retries: u32,
    backoff: Duration,
}

impl RetryingModel {
    pub fn new(inner: Arc<dyn Model>, max_retries: u32, backoff_ms: u64) -> Self {
        Self {
            inner,
            max_retries,
            backoff: Duration::from_millis(backoff_ms),
        }
    }
}

#[async_trait]
impl Model for RetryingModel {
    fn provider(&self) -> &str {
        self.inner.provider()
    }

    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
    ) -> Result<Content> {
        let attempts = self.max_retries + 1;
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.inner.generate_content(history, config).await {
                Ok(content) => return Ok(content),
                Err(e) if is_non_retryable(&e) => {
                    log::warn!(
                        "{} call failed with a non-retryable error: {}",
                        self.inner.provider(),
                        e
                    );
                    return Err(e);
                }
                Err(e) => {
                    log::warn!(
                        "{} call failed (attempt {}/{}): {}",
                        self.inner.provider(),
                        attempt,
                        attempts,
                        e
                    );
                    last_error = e.to_string();
                    if attempt < attempts && !self.backoff.is_zero() {
                        tokio::time::sleep(self.backoff * attempt).await;
                    }
                }
            }
        }

        Err(ModelError::RetriesExhausted {
            attempts,
            last_error,
        }
        .into())
    }
}
