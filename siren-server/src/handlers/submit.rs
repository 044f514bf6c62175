//! Call recording submission handlers
//!
//! Handles POST /upload (batch) and POST /record (single recording). Both
//! run the same per-file path: fingerprint the bytes, serve duplicates from
//! the fingerprint store, otherwise analyze, triage, dispatch and cache.

use axum::{
    extract::{Multipart, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use siren_core::{classify, priority_label, ContentFingerprint, Emotion, ExtractedEntities, IncidentReport};

use crate::error::ApiError;
use crate::multipart::MultipartFields;
use crate::state::AppState;
use crate::store::AnalysisRecord;

/// Sort key placing failed submissions after every real priority.
const FAILED_SORT_PRIORITY: u8 = 99;

/// Per-file result of a successful analysis pass.
#[derive(Debug, Serialize, ToSchema)]
pub struct AnalyzedSubmission {
    /// Filename as submitted (first-seen name for duplicates)
    pub filename: String,
    /// SHA3-256 content fingerprint, hex-encoded
    pub content_hash: String,
    /// Whether this content was already known and served from cache
    pub duplicate: bool,
    pub transcript: String,
    #[schema(value_type = String, example = "PANIC")]
    pub emotion: Emotion,
    #[schema(value_type = Object)]
    pub entities: ExtractedEntities,
    /// Triage priority, 1 (critical) to 4 (low)
    pub priority: u8,
    pub priority_text: String,
    /// Whether this pass raised an alert
    pub alert_sent: bool,
    pub matched_centers: Vec<String>,
    /// Successful push deliveries in this pass
    pub notifications_sent: usize,
    /// Routing outcome summary
    pub message: String,
    pub processed_at: DateTime<Utc>,
}

/// Per-file result when analysis failed. Failed submissions are never cached
/// and never dispatched.
#[derive(Debug, Serialize, ToSchema)]
pub struct FailedSubmission {
    pub filename: String,
    pub error: String,
    pub processed_at: DateTime<Utc>,
}

/// One entry of a batch response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum SubmissionResult {
    Analyzed(AnalyzedSubmission),
    Failed(FailedSubmission),
}

impl SubmissionResult {
    fn sort_priority(&self) -> u8 {
        match self {
            Self::Analyzed(a) => a.priority,
            Self::Failed(_) => FAILED_SORT_PRIORITY,
        }
    }
}

/// Response for the batch upload endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    /// Per-file results, most urgent first
    pub results: Vec<SubmissionResult>,
    pub count: usize,
}

/// Process one recording end to end.
///
/// The per-fingerprint lock makes the analyze-then-cache section atomic:
/// when identical bytes are submitted concurrently, exactly one submission
/// runs the collaborators and the rest observe its cached record.
async fn process_submission(
    state: &AppState,
    filename: &str,
    audio: &[u8],
) -> Result<SubmissionResult, ApiError> {
    let content_hash = ContentFingerprint::from_bytes(audio).to_hex();

    let lock = state.hash_locks.lock_for(&content_hash);
    let _guard = lock.lock().await;

    if let Some(cached) = state.fingerprints.get(&content_hash).await.map_err(ApiError::from)? {
        // Duplicate content: skip the collaborators, re-run routing so
        // centers registered since the first submission still get alerted.
        let report = IncidentReport::new(
            &cached.transcript,
            cached.emotion,
            &cached.entities,
            cached.priority,
            &cached.filename,
        );
        let outcome = state.dispatcher.dispatch(&report).await?;

        let mut refreshed = cached.clone();
        refreshed.alert_sent = outcome.alert_sent;
        refreshed.notified_centers = outcome.matched_centers.clone();
        state.fingerprints.put(&refreshed).await?;

        tracing::info!(content_hash = %content_hash, filename = %filename, "Duplicate submission");

        return Ok(SubmissionResult::Analyzed(AnalyzedSubmission {
            filename: cached.filename,
            content_hash,
            duplicate: true,
            transcript: cached.transcript,
            emotion: cached.emotion,
            entities: cached.entities,
            priority: cached.priority,
            priority_text: priority_label(cached.priority).to_string(),
            alert_sent: outcome.alert_sent,
            matched_centers: outcome.matched_centers,
            notifications_sent: outcome.notifications_sent,
            message: outcome.message,
            processed_at: Utc::now(),
        }));
    }

    let analysis = match state.pipeline.analyze(audio).await {
        Ok(analysis) => analysis,
        Err(e) => {
            tracing::warn!(filename = %filename, error = %e, "Analysis failed");
            return Ok(SubmissionResult::Failed(FailedSubmission {
                filename: filename.to_string(),
                error: e.to_string(),
                processed_at: Utc::now(),
            }));
        }
    };

    let priority = classify(&analysis.transcript, analysis.emotion);
    let report = IncidentReport::new(
        &analysis.transcript,
        analysis.emotion,
        &analysis.entities,
        priority,
        filename,
    );
    let outcome = state.dispatcher.dispatch(&report).await?;

    let record = AnalysisRecord {
        content_hash: content_hash.clone(),
        filename: filename.to_string(),
        transcript: analysis.transcript,
        emotion: analysis.emotion,
        entities: analysis.entities,
        priority,
        alert_sent: outcome.alert_sent,
        notified_centers: outcome.matched_centers.clone(),
        processed_at: Utc::now(),
    };
    state.fingerprints.put(&record).await?;

    Ok(SubmissionResult::Analyzed(AnalyzedSubmission {
        filename: record.filename,
        content_hash,
        duplicate: false,
        transcript: record.transcript,
        emotion: record.emotion,
        entities: record.entities,
        priority,
        priority_text: priority_label(priority).to_string(),
        alert_sent: outcome.alert_sent,
        matched_centers: outcome.matched_centers,
        notifications_sent: outcome.notifications_sent,
        message: outcome.message,
        processed_at: record.processed_at,
    }))
}

/// Upload a batch of call recordings
///
/// Accepts multipart/form-data with any number of file fields. Every file is
/// fingerprinted, analyzed (or served from the dedup cache), triaged and
/// routed. Results come back most urgent first; files whose analysis failed
/// sort last.
#[utoipa::path(
    post,
    path = "/upload",
    tag = "Submission",
    request_body(
        content_type = "multipart/form-data",
        description = "One or more audio recordings in 'files' fields"
    ),
    responses(
        (status = 200, description = "Batch processed", body = UploadResponse),
        (status = 400, description = "No files, unsupported format, or file too large"),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let fields = MultipartFields::parse(&mut multipart, state.max_file_size).await?;
    let files = fields.require_files()?;

    let mut results = Vec::with_capacity(files.len());
    for file in files {
        let result = process_submission(&state, file.file_name_or_default(), &file.data).await?;
        results.push(result);
    }

    // Stable sort: equal priorities keep submission order.
    results.sort_by_key(|r| r.sort_priority());

    let count = results.len();
    Ok(Json(UploadResponse { results, count }))
}

/// Submit a single live recording
///
/// Same pipeline as /upload for exactly one file, but an analysis failure is
/// reported as an HTTP error instead of a per-file entry.
#[utoipa::path(
    post,
    path = "/record",
    tag = "Submission",
    request_body(
        content_type = "multipart/form-data",
        description = "One audio recording in a 'file' field"
    ),
    responses(
        (status = 200, description = "Recording processed", body = AnalyzedSubmission),
        (status = 400, description = "Missing file, unsupported format, or file too large"),
        (status = 422, description = "Analysis failed for this recording"),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn record_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalyzedSubmission>, ApiError> {
    let fields = MultipartFields::parse(&mut multipart, state.max_file_size).await?;
    let file = fields.require_one_file()?;

    match process_submission(&state, file.file_name_or_default(), &file.data).await? {
        SubmissionResult::Analyzed(analyzed) => Ok(Json(analyzed)),
        SubmissionResult::Failed(failed) => Err(ApiError::Siren(
            siren_core::SirenError::AnalysisFailed(failed.error),
        )),
    }
}
