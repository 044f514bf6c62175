//! Siren Core - incident deduplication and triage primitives
//!
//! This crate provides the domain logic for the Siren alert-routing engine:
//!
//! - Content fingerprinting (SHA3-256 over raw audio bytes) for dedup
//! - The keyword/emotion triage policy (priority 1-4)
//! - The bag-of-words location-matching predicate
//! - Analysis collaborator contracts (ASR, emotion, NER, geocoding) with
//!   HTTP-backed providers and deterministic mocks
//! - The incident report payload pushed to response centers
//!
//! # Example
//!
//! ```
//! use siren_core::{classify, location_matches, ContentFingerprint, Emotion};
//!
//! let fp = ContentFingerprint::from_bytes(b"raw call audio");
//! assert_eq!(fp, ContentFingerprint::from_bytes(b"raw call audio"));
//!
//! assert_eq!(classify("There is a fire at the building", Emotion::Calm), 1);
//! assert!(location_matches("Springfield, IL", "Springfield", "Illinois"));
//! ```

pub mod analysis;
pub mod error;
pub mod fingerprint;
pub mod matching;
pub mod report;
pub mod triage;

// Re-export main types for convenience
pub use analysis::{
    Analysis, AnalysisPipeline, EmotionClassifier, EntityExtractor, ExtractedEntities,
    GeocodedLocation, Geocoder, HttpEmotionClassifier, HttpTranscriber, KeywordEntityExtractor,
    LocationData, MockEmotionClassifier, MockEntityExtractor, MockGeocoder, MockTranscriber,
    NearbyService, NominatimGeocoder, Transcriber,
};
pub use error::{Result, SirenError};
pub use fingerprint::ContentFingerprint;
pub use matching::location_matches;
pub use report::IncidentReport;
pub use triage::{classify, priority_label, Emotion};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// Integration test: analyze a call end to end with mocks, classify it,
    /// and build the report that would be dispatched.
    #[tokio::test]
    async fn test_full_triage_workflow() {
        let pipeline = AnalysisPipeline::new(
            Arc::new(MockTranscriber::new(
                "There is a fire at Springfield, the whole block is burning",
            )),
            Arc::new(MockEmotionClassifier::new(Emotion::Panic)),
            Arc::new(KeywordEntityExtractor::new()),
        );

        let audio = b"call bytes".to_vec();
        let fingerprint = ContentFingerprint::from_bytes(&audio);
        let analysis = pipeline.analyze(&audio).await.expect("analysis");

        let priority = classify(&analysis.transcript, analysis.emotion);
        assert_eq!(priority, 1);

        let report = IncidentReport::new(
            &analysis.transcript,
            analysis.emotion,
            &analysis.entities,
            priority,
            "call.wav",
        );
        assert_eq!(report.priority_text, "CRITICAL");
        assert_eq!(report.location.as_deref(), Some("Springfield"));

        // Identical bytes hit the same fingerprint, so a resubmission would
        // be served from cache instead of re-running the pipeline.
        assert_eq!(fingerprint, ContentFingerprint::from_bytes(&audio));

        // And the extracted location routes to a matching center.
        assert!(location_matches(
            report.location.as_deref().unwrap(),
            "Springfield",
            "Illinois"
        ));
    }
}
