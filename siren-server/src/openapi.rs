//! OpenAPI documentation configuration
//!
//! Generates OpenAPI 3.0 specification for the Siren dispatch API.

use utoipa::OpenApi;

use crate::dispatch::DispatchOutcome;
use crate::handlers::{
    AlertsResponse, AnalyzedSubmission, CentersResponse, FailedSubmission, HealthResponse,
    IngestAlertRequest, ReadyResponse, RegisterCenterRequest, SubmissionResult,
    SubscribeRequest, SubscribeResponse, UploadResponse,
};

/// Siren Dispatch API - OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Siren - Incident Dispatch API",
        version = "0.1.0",
        description = r#"
## Incident Deduplication, Triage and Alert Routing

Siren ingests emergency call recordings and turns them into routed alerts:

- **Content fingerprinting** - SHA3-256 dedup so identical audio is analyzed once
- **Triage** - keyword and emotion based priority, 1 (critical) to 4 (low)
- **Routing** - bag-of-words location matching against registered response centers
- **Push delivery** - per-subscription notification with dead-endpoint pruning
- **Session history** - alert log scoped to the current server run

### How It Works

1. **Upload** recordings via `POST /upload` (batch) or `POST /record` (single)
2. Each file is fingerprinted; duplicates are served from the cache
3. New content is transcribed, classified and triaged
4. The extracted location is matched against every registered center
5. Matched centers are alerted through their push subscriptions
"#,
        license(
            name = "MIT OR Apache-2.0",
            url = "https://github.com/siren-dispatch/siren/blob/main/LICENSE"
        )
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    tags(
        (name = "Submission", description = "Upload and analyze call recordings"),
        (name = "Centers", description = "Response center registration and push subscriptions"),
        (name = "Alerts", description = "Session alert history and external alert ingestion"),
        (name = "Geocoding", description = "Location resolution for the map display"),
        (name = "Health", description = "Service health and readiness endpoints")
    ),
    paths(
        crate::handlers::health::health,
        crate::handlers::health::ready,
        crate::handlers::submit::upload_handler,
        crate::handlers::submit::record_handler,
        crate::handlers::centers::list_centers_handler,
        crate::handlers::centers::register_center_handler,
        crate::handlers::centers::subscribe_handler,
        crate::handlers::alerts::list_alerts_handler,
        crate::handlers::alerts::ingest_alert_handler,
        crate::handlers::geocode::geocode_handler,
    ),
    components(
        schemas(
            HealthResponse,
            ReadyResponse,
            UploadResponse,
            SubmissionResult,
            AnalyzedSubmission,
            FailedSubmission,
            CentersResponse,
            RegisterCenterRequest,
            SubscribeRequest,
            SubscribeResponse,
            AlertsResponse,
            IngestAlertRequest,
            DispatchOutcome,
        )
    )
)]
pub struct ApiDoc;
