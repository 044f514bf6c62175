//! Center registration and subscription handlers

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::state::AppState;
use crate::store::{Center, NewCenter};

/// Request body for registering a response center
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterCenterRequest {
    /// Center name, unique case-insensitively
    pub name: String,
    /// City or locality the center covers
    pub location: String,
    /// State or region the center covers
    pub state: String,
    /// Kind of center (default "General")
    #[serde(default = "default_center_type")]
    pub center_type: String,
}

fn default_center_type() -> String {
    "General".to_string()
}

/// Response listing registered centers
#[derive(Debug, Serialize, ToSchema)]
pub struct CentersResponse {
    #[schema(value_type = Vec<Object>)]
    pub centers: Vec<Center>,
    pub count: usize,
}

/// Request body for subscribing an endpoint to a center's alerts
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubscribeRequest {
    /// Name of the center this endpoint listens for; not required to be
    /// registered yet
    pub center_name: String,
    /// Push subscription as produced by the client; `endpoint` is required,
    /// everything else is stored opaquely as delivery credentials
    #[schema(value_type = Object)]
    pub subscription: serde_json::Value,
}

/// Response for a stored subscription
#[derive(Debug, Serialize, ToSchema)]
pub struct SubscribeResponse {
    pub success: bool,
    pub center_name: String,
    pub endpoint: String,
}

/// List registered response centers
#[utoipa::path(
    get,
    path = "/centers",
    tag = "Centers",
    responses(
        (status = 200, description = "Centers in registration order", body = CentersResponse)
    )
)]
pub async fn list_centers_handler(
    State(state): State<AppState>,
) -> Result<Json<CentersResponse>, ApiError> {
    let centers = state.registry.list().await?;
    let count = centers.len();
    Ok(Json(CentersResponse { centers, count }))
}

/// Register a new response center
///
/// Names are unique case-insensitively; a clash answers 409 without touching
/// the existing registration.
#[utoipa::path(
    post,
    path = "/centers",
    tag = "Centers",
    request_body = RegisterCenterRequest,
    responses(
        (status = 201, description = "Center registered"),
        (status = 400, description = "Missing or blank field"),
        (status = 409, description = "A center with this name already exists")
    )
)]
pub async fn register_center_handler(
    State(state): State<AppState>,
    Json(request): Json<RegisterCenterRequest>,
) -> Result<(StatusCode, Json<Center>), ApiError> {
    let name = request.name.trim();
    let location = request.location.trim();
    let region = request.state.trim();

    if name.is_empty() || location.is_empty() || region.is_empty() {
        return Err(ApiError::bad_request(
            "Fields 'name', 'location' and 'state' are required and must not be blank",
        ));
    }

    let center = state
        .registry
        .register(NewCenter {
            name: name.to_string(),
            location: location.to_string(),
            state: region.to_string(),
            center_type: request.center_type.trim().to_string(),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(center)))
}

/// Subscribe a push endpoint to a center's alerts
///
/// An endpoint belongs to at most one center; re-subscribing moves it. The
/// center name is deliberately not checked against the registry, so an
/// endpoint can subscribe before its center's registration propagates.
#[utoipa::path(
    post,
    path = "/subscribe",
    tag = "Centers",
    request_body = SubscribeRequest,
    responses(
        (status = 200, description = "Subscription stored", body = SubscribeResponse),
        (status = 400, description = "Missing center name or endpoint")
    )
)]
pub async fn subscribe_handler(
    State(state): State<AppState>,
    Json(request): Json<SubscribeRequest>,
) -> Result<Json<SubscribeResponse>, ApiError> {
    let center_name = request.center_name.trim();
    if center_name.is_empty() {
        return Err(ApiError::bad_request(
            "Field 'center_name' must not be blank",
        ));
    }

    let endpoint = request
        .subscription
        .get("endpoint")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("Subscription must carry a non-empty 'endpoint'"))?
        .to_string();

    let subscription = state
        .registry
        .subscribe(center_name, &endpoint, request.subscription)
        .await?;

    Ok(Json(SubscribeResponse {
        success: true,
        center_name: subscription.center_name,
        endpoint: subscription.endpoint,
    }))
}
