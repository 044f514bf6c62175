//! Geocoding handler for the map display

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use siren_core::LocationData;

use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters for the geocode endpoint
#[derive(Debug, Deserialize, IntoParams)]
pub struct GeocodeParams {
    /// Free-text location to resolve
    pub location: Option<String>,
}

/// Resolve a location string to coordinates and nearby emergency services
///
/// Display-only: the routing engine never consults coordinates. A location
/// the geocoder does not know answers 200 with `found: false`.
#[utoipa::path(
    get,
    path = "/geocode",
    tag = "Geocoding",
    params(GeocodeParams),
    responses(
        (status = 200, description = "Resolution result (found may be false)"),
        (status = 400, description = "Missing location parameter"),
        (status = 502, description = "Geocoding collaborator failed")
    )
)]
pub async fn geocode_handler(
    State(state): State<AppState>,
    Query(params): Query<GeocodeParams>,
) -> Result<Json<LocationData>, ApiError> {
    let location = params
        .location
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("Query parameter 'location' is required"))?;

    let data = state.geocoder.resolve(location).await?;
    Ok(Json(data))
}
