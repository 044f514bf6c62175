//! Speech-to-text collaborator.

use async_trait::async_trait;
use backoff::{future::retry_notify, ExponentialBackoff};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

use super::http::{is_transient_error, is_transient_status};
use crate::error::{Result, SirenError};

/// Audio transcription contract.
///
/// `transcribe` fails with `TranscriptionFailed` on unrecoverable input; the
/// caller records the incident as an error result and excludes it from alert
/// dispatch.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &[u8]) -> Result<String>;
}

/// Configuration for the remote ASR service client.
#[derive(Debug, Clone)]
pub struct HttpTranscriberConfig {
    /// Base URL of the transcription service.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum retry attempts for transient errors.
    pub max_retries: u32,
}

impl HttpTranscriberConfig {
    /// Build from environment. Requires `SIREN_ASR_URL`.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("SIREN_ASR_URL").ok()?;
        Some(Self {
            base_url,
            timeout: Duration::from_secs(30),
            max_retries: 3,
        })
    }
}

/// Response shape of the remote ASR service.
#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    text: String,
}

/// HTTP client for a remote transcription service.
pub struct HttpTranscriber {
    client: reqwest::Client,
    config: HttpTranscriberConfig,
}

impl HttpTranscriber {
    pub fn new(config: HttpTranscriberConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                SirenError::TranscriptionFailed(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self { client, config })
    }

    async fn transcribe_once(
        &self,
        audio: &[u8],
    ) -> std::result::Result<String, backoff::Error<SirenError>> {
        let url = format!("{}/transcribe", self.config.base_url.trim_end_matches('/'));
        let start = Instant::now();

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(audio.to_vec())
            .send()
            .await
            .map_err(|e| {
                let latency_ms = start.elapsed().as_millis();
                warn!(error = %e, latency_ms = latency_ms as u64, "ASR request failed");
                if is_transient_error(&e) {
                    backoff::Error::transient(SirenError::TranscriptionFailed(format!(
                        "Transient error (will retry): {e}"
                    )))
                } else {
                    backoff::Error::permanent(SirenError::TranscriptionFailed(format!(
                        "ASR request failed: {e}"
                    )))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let err = SirenError::TranscriptionFailed(format!("ASR returned status: {status}"));
            return if is_transient_status(status) {
                Err(backoff::Error::transient(err))
            } else {
                Err(backoff::Error::permanent(err))
            };
        }

        let parsed: TranscriptResponse = response.json().await.map_err(|e| {
            backoff::Error::permanent(SirenError::TranscriptionFailed(format!(
                "Failed to parse ASR response: {e}"
            )))
        })?;

        debug!(
            latency_ms = start.elapsed().as_millis() as u64,
            "Transcription fetched"
        );

        Ok(parsed.text.trim().to_string())
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    #[instrument(level = "info", skip_all, fields(audio_bytes = audio.len()))]
    async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        let backoff = ExponentialBackoff {
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(2),
            max_elapsed_time: Some(self.config.timeout * self.config.max_retries),
            ..Default::default()
        };

        retry_notify(
            backoff,
            || async { self.transcribe_once(audio).await },
            |err: SirenError, duration: Duration| {
                warn!(
                    error = %err,
                    retry_after_ms = duration.as_millis() as u64,
                    "Retry scheduled"
                );
            },
        )
        .await
    }
}

/// Deterministic transcriber for tests and offline development.
pub struct MockTranscriber {
    transcript: String,
    fail_with: Option<String>,
}

impl MockTranscriber {
    /// Always returns the given transcript.
    pub fn new(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            fail_with: None,
        }
    }

    /// Always fails with `TranscriptionFailed`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            transcript: String::new(),
            fail_with: Some(reason.into()),
        }
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(&self, _audio: &[u8]) -> Result<String> {
        match &self.fail_with {
            Some(reason) => Err(SirenError::TranscriptionFailed(reason.clone())),
            None => Ok(self.transcript.clone()),
        }
    }
}
