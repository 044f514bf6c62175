//! Analysis collaborator contracts.
//!
//! Speech-to-text, emotion-from-audio, entity extraction and geocoding are
//! external collaborators consumed through narrow traits. Their internal
//! algorithms are out of scope for the engine; only the input/output contract
//! matters here. Each trait ships with an HTTP-backed provider and a
//! deterministic mock for tests and offline development.

pub mod emotion;
pub mod entities;
pub mod geocode;
pub mod http;
pub mod transcribe;

pub use emotion::{EmotionClassifier, HttpEmotionClassifier, MockEmotionClassifier};
pub use entities::{EntityExtractor, KeywordEntityExtractor, MockEntityExtractor};
pub use geocode::{
    GeocodedLocation, Geocoder, LocationData, MockGeocoder, NearbyService, NominatimGeocoder,
};
pub use transcribe::{HttpTranscriber, MockTranscriber, Transcriber};

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::triage::Emotion;

/// Entities extracted from a transcript by the NER collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedEntities {
    pub emergency_type: Option<String>,
    pub location: Option<String>,
    pub priority_level: Option<String>,
}

/// Derived analysis for one audio artifact: everything the collaborators
/// produce before triage assigns a priority.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub transcript: String,
    pub emotion: Emotion,
    pub entities: ExtractedEntities,
}

/// Bundles the three routing collaborators behind one call.
///
/// The pipeline is invoked at most once per first-seen content fingerprint;
/// resubmissions of identical bytes are served from the fingerprint store.
pub struct AnalysisPipeline {
    transcriber: Arc<dyn Transcriber>,
    emotion: Arc<dyn EmotionClassifier>,
    entities: Arc<dyn EntityExtractor>,
}

impl AnalysisPipeline {
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        emotion: Arc<dyn EmotionClassifier>,
        entities: Arc<dyn EntityExtractor>,
    ) -> Self {
        Self {
            transcriber,
            emotion,
            entities,
        }
    }

    /// Run transcription, emotion classification and entity extraction over
    /// one audio artifact.
    ///
    /// Transcription failure aborts the analysis; emotion classification
    /// never fails (it degrades to CALM internally).
    pub async fn analyze(&self, audio: &[u8]) -> Result<Analysis> {
        let transcript = self.transcriber.transcribe(audio).await?;
        let emotion = self.emotion.classify(audio).await;
        let entities = self.entities.extract(&transcript);

        tracing::debug!(
            transcript_len = transcript.len(),
            emotion = %emotion,
            location = entities.location.as_deref().unwrap_or("-"),
            "Analysis complete"
        );

        Ok(Analysis {
            transcript,
            emotion,
            entities,
        })
    }
}
