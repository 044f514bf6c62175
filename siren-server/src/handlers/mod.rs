//! HTTP request handlers
//!
//! This module contains all the request handlers for the API endpoints.

pub mod alerts;
pub mod centers;
pub mod geocode;
pub mod health;
pub mod submit;

pub use crate::state::AppState;
pub use alerts::{
    ingest_alert_handler, list_alerts_handler, AlertHistoryParams, AlertsResponse,
    IngestAlertRequest,
};
pub use centers::{
    list_centers_handler, register_center_handler, subscribe_handler, CentersResponse,
    RegisterCenterRequest, SubscribeRequest, SubscribeResponse,
};
pub use geocode::{geocode_handler, GeocodeParams};
pub use health::{health, ready, HealthResponse, ReadyResponse};
pub use submit::{
    record_handler, upload_handler, AnalyzedSubmission, FailedSubmission, SubmissionResult,
    UploadResponse,
};
