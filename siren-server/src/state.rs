//! Application state module
//!
//! Defines shared state accessible across all request handlers.

use std::sync::Arc;

use siren_core::{AnalysisPipeline, Geocoder};

use crate::dispatch::AlertDispatcher;
use crate::store::{AlertHistory, CenterRegistry, FingerprintStore, HashLocks};

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    /// Dedup cache of analysis results keyed by content hash
    pub fingerprints: Arc<FingerprintStore>,
    /// Response centers and their push subscriptions
    pub registry: Arc<CenterRegistry>,
    /// Session-scoped alert log
    pub history: Arc<AlertHistory>,
    /// Routes reports to matched centers
    pub dispatcher: Arc<AlertDispatcher>,
    /// Transcription, emotion and entity extraction collaborators
    pub pipeline: Arc<AnalysisPipeline>,
    /// Location lookup for the map-display endpoint
    pub geocoder: Arc<dyn Geocoder>,
    /// Per-fingerprint locks serializing first-seen analysis
    pub hash_locks: Arc<HashLocks>,
    /// Maximum accepted audio file size in bytes
    pub max_file_size: usize,
}
