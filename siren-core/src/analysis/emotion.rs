//! Emotion-from-audio collaborator.
//!
//! The contract is infallible: whatever goes wrong inside the provider, the
//! caller receives an emotion label, with CALM as the documented fallback.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{instrument, warn};

use crate::triage::Emotion;

/// Emotion classification contract. Never fails.
#[async_trait]
pub trait EmotionClassifier: Send + Sync {
    async fn classify(&self, audio: &[u8]) -> Emotion;
}

/// Configuration for the remote emotion service client.
#[derive(Debug, Clone)]
pub struct HttpEmotionClassifierConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl HttpEmotionClassifierConfig {
    /// Build from environment. Requires `SIREN_EMOTION_URL`.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("SIREN_EMOTION_URL").ok()?;
        Some(Self {
            base_url,
            timeout: Duration::from_secs(15),
        })
    }
}

#[derive(Debug, Deserialize)]
struct EmotionResponse {
    emotion: String,
}

/// HTTP client for a remote emotion-classification service.
///
/// Any transport or parse failure falls back to `Emotion::Calm`; the failure
/// is logged, never surfaced.
pub struct HttpEmotionClassifier {
    client: reqwest::Client,
    config: HttpEmotionClassifierConfig,
}

impl HttpEmotionClassifier {
    pub fn new(config: HttpEmotionClassifierConfig) -> Option<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .ok()?;
        Some(Self { client, config })
    }

    async fn classify_remote(&self, audio: &[u8]) -> Option<Emotion> {
        let url = format!("{}/classify", self.config.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(audio.to_vec())
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "Emotion service returned error status");
            return None;
        }

        let parsed: EmotionResponse = response.json().await.ok()?;
        Some(Emotion::parse_lossy(&parsed.emotion))
    }
}

#[async_trait]
impl EmotionClassifier for HttpEmotionClassifier {
    #[instrument(level = "debug", skip_all, fields(audio_bytes = audio.len()))]
    async fn classify(&self, audio: &[u8]) -> Emotion {
        match self.classify_remote(audio).await {
            Some(emotion) => emotion,
            None => {
                warn!("Emotion classification unavailable, falling back to CALM");
                Emotion::Calm
            }
        }
    }
}

/// Fixed-label classifier for tests.
pub struct MockEmotionClassifier {
    emotion: Emotion,
}

impl MockEmotionClassifier {
    pub fn new(emotion: Emotion) -> Self {
        Self { emotion }
    }
}

#[async_trait]
impl EmotionClassifier for MockEmotionClassifier {
    async fn classify(&self, _audio: &[u8]) -> Emotion {
        self.emotion
    }
}
