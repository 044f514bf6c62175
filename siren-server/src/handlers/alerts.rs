//! Alert history and ingestion handlers

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use siren_core::{Emotion, ExtractedEntities, IncidentReport};

use crate::dispatch::DispatchOutcome;
use crate::error::ApiError;
use crate::state::AppState;
use crate::store::{history::QUERY_LIMIT, AlertEntry};

/// Query parameters for the alert history endpoint
#[derive(Debug, Deserialize, IntoParams)]
pub struct AlertHistoryParams {
    /// Restrict to alerts whose matched centers contain this exact name
    pub center: Option<String>,
}

/// Response listing the current session's alerts
#[derive(Debug, Serialize, ToSchema)]
pub struct AlertsResponse {
    /// Newest first, capped at the query limit
    #[schema(value_type = Vec<Object>)]
    pub alerts: Vec<AlertEntry>,
    pub count: usize,
}

/// Request body for ingesting an externally-built alert
///
/// Used by upstream systems that already ran their own analysis and only
/// need routing. The report travels through the same dispatcher as uploaded
/// recordings.
#[derive(Debug, Deserialize, ToSchema)]
pub struct IngestAlertRequest {
    pub transcript: String,
    /// PANIC, DISTRESS or CALM; unknown labels degrade to CALM
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "PANIC")]
    pub emotion: Option<Emotion>,
    #[serde(default)]
    pub emergency_type: Option<String>,
    /// Location to route on; absent means the alert cannot be routed
    #[serde(default)]
    pub location: Option<String>,
    /// Priority 1 (critical) to 4 (low)
    pub priority: u8,
    #[serde(default = "default_source")]
    pub source: String,
}

fn default_source() -> String {
    "external".to_string()
}

/// List alerts raised during this server session
#[utoipa::path(
    get,
    path = "/alerts",
    tag = "Alerts",
    params(AlertHistoryParams),
    responses(
        (status = 200, description = "Session alerts, newest first", body = AlertsResponse)
    )
)]
pub async fn list_alerts_handler(
    State(state): State<AppState>,
    Query(params): Query<AlertHistoryParams>,
) -> Result<Json<AlertsResponse>, ApiError> {
    let center = params
        .center
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let alerts = state.history.recent(center, QUERY_LIMIT).await?;
    let count = alerts.len();
    Ok(Json(AlertsResponse { alerts, count }))
}

/// Route an externally-built alert
#[utoipa::path(
    post,
    path = "/alerts",
    tag = "Alerts",
    request_body = IngestAlertRequest,
    responses(
        (status = 200, description = "Routing outcome", body = DispatchOutcome),
        (status = 400, description = "Blank transcript or priority out of range")
    )
)]
pub async fn ingest_alert_handler(
    State(state): State<AppState>,
    Json(request): Json<IngestAlertRequest>,
) -> Result<Json<DispatchOutcome>, ApiError> {
    if request.transcript.trim().is_empty() {
        return Err(ApiError::bad_request("Field 'transcript' must not be blank"));
    }
    if !(1..=4).contains(&request.priority) {
        return Err(ApiError::bad_request(
            "Field 'priority' must be between 1 (critical) and 4 (low)",
        ));
    }

    let entities = ExtractedEntities {
        emergency_type: request.emergency_type,
        location: request.location,
        priority_level: None,
    };
    let report = IncidentReport::new(
        &request.transcript,
        request.emotion.unwrap_or(Emotion::Calm),
        &entities,
        request.priority,
        &request.source,
    );

    let outcome = state.dispatcher.dispatch(&report).await?;
    Ok(Json(outcome))
}
