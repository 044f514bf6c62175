//! Siren Server - REST API for incident dedup, triage and alert routing
//!
//! Wires the storage layer, analysis collaborators and dispatcher together
//! and serves the HTTP API.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use siren_core::{
    AnalysisPipeline, EmotionClassifier, Geocoder, HttpEmotionClassifier, HttpTranscriber,
    KeywordEntityExtractor, MockEmotionClassifier, MockTranscriber, NominatimGeocoder, Transcriber,
};
use siren_core::analysis::emotion::HttpEmotionClassifierConfig;
use siren_core::analysis::geocode::NominatimGeocoderConfig;
use siren_core::analysis::transcribe::HttpTranscriberConfig;
use siren_core::Emotion;

use siren_server::dispatch::{AlertDispatcher, HttpPushClient, PushDelivery};
use siren_server::routes::create_router_with_config;
use siren_server::store::{self, AlertHistory, CenterRegistry, FingerprintStore, HashLocks};
use siren_server::{AppState, Config};

/// Build the transcription collaborator from the environment.
///
/// `SIREN_ASR_URL` selects the HTTP client. Without it the server only
/// starts when `ALLOW_MOCK_ANALYSIS=true`, which swaps in the deterministic
/// mock for local development.
fn build_transcriber() -> Option<Arc<dyn Transcriber>> {
    if let Some(config) = HttpTranscriberConfig::from_env() {
        match HttpTranscriber::new(config) {
            Ok(t) => return Some(Arc::new(t)),
            Err(e) => {
                tracing::error!(error = %e, "Failed to build transcription client");
                return None;
            }
        }
    }

    let allow_mock = std::env::var("ALLOW_MOCK_ANALYSIS")
        .map(|v| v.to_lowercase() == "true")
        .unwrap_or(false);
    if allow_mock {
        tracing::warn!("SIREN_ASR_URL not set, using mock transcriber (ALLOW_MOCK_ANALYSIS)");
        Some(Arc::new(MockTranscriber::new(
            "mock transcript: no transcription service configured",
        )))
    } else {
        tracing::error!("SIREN_ASR_URL not set and mock analysis not allowed");
        None
    }
}

/// Build the emotion collaborator. Degrades to the CALM mock when no
/// classifier service is configured; emotion only ever escalates priority.
fn build_emotion_classifier() -> Arc<dyn EmotionClassifier> {
    match HttpEmotionClassifierConfig::from_env().and_then(HttpEmotionClassifier::new) {
        Some(classifier) => Arc::new(classifier),
        None => {
            tracing::warn!("SIREN_EMOTION_URL not set, emotion defaults to CALM");
            Arc::new(MockEmotionClassifier::new(Emotion::Calm))
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting siren-server");

    // Storage: PostgreSQL when DATABASE_URL is set, in-memory otherwise.
    let (fingerprints, registry, history) = match &config.database_url {
        Some(url) => {
            let pool = match store::connect(url, config.database_max_connections).await {
                Ok(pool) => pool,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to connect to database");
                    std::process::exit(1);
                }
            };
            (
                Arc::new(FingerprintStore::postgres(pool.clone())),
                Arc::new(CenterRegistry::postgres(pool.clone())),
                Arc::new(AlertHistory::postgres(pool)),
            )
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory stores");
            (
                Arc::new(FingerprintStore::memory()),
                Arc::new(CenterRegistry::memory()),
                Arc::new(AlertHistory::memory()),
            )
        }
    };

    // Analysis collaborators.
    let Some(transcriber) = build_transcriber() else {
        std::process::exit(1);
    };
    let pipeline = Arc::new(AnalysisPipeline::new(
        transcriber,
        build_emotion_classifier(),
        Arc::new(KeywordEntityExtractor::new()),
    ));

    let geocoder: Arc<dyn Geocoder> =
        match NominatimGeocoder::new(NominatimGeocoderConfig::default()) {
            Ok(g) => Arc::new(g),
            Err(e) => {
                tracing::error!(error = %e, "Failed to build geocoder");
                std::process::exit(1);
            }
        };

    // Push delivery.
    let push: Option<Arc<dyn PushDelivery>> = if config.push_enabled {
        match HttpPushClient::new() {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                tracing::error!(error = %e, "Failed to build push client");
                std::process::exit(1);
            }
        }
    } else {
        tracing::warn!("Push delivery disabled, alerts are logged without notification");
        None
    };

    let dispatcher = Arc::new(AlertDispatcher::new(registry.clone(), history.clone(), push));

    let state = AppState {
        fingerprints,
        registry,
        history,
        dispatcher,
        pipeline,
        geocoder,
        hash_locks: Arc::new(HashLocks::new()),
        max_file_size: config.max_file_size(),
    };

    let app = create_router_with_config(state, &config);
    let addr = config.socket_addr();

    tracing::info!(%addr, "Listening");
    tracing::info!("Swagger UI available at http://{addr}/docs");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "Failed to bind");
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            tracing::error!("Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
