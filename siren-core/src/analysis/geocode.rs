//! Geocoding and nearby-service lookup collaborator.
//!
//! Used only by the map-display feature; the routing engine itself never
//! consults coordinates. Backed by Nominatim for forward geocoding and
//! Overpass (with mirror fallback) for nearby emergency services.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::{Result, SirenError};

/// Earth radius in km.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// How many nearby services to return.
const MAX_NEARBY_SERVICES: usize = 5;

/// A geocoded incident location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodedLocation {
    pub lat: f64,
    pub lon: f64,
    pub display_name: String,
}

/// An emergency service near the incident.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearbyService {
    #[serde(rename = "type")]
    pub service_type: String,
    pub type_label: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub distance_km: f64,
}

/// Complete map-display payload for one location string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationData {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeocodedLocation>,
    #[serde(default)]
    pub emergency_services: Vec<NearbyService>,
}

impl LocationData {
    pub fn not_found() -> Self {
        Self {
            found: false,
            location: None,
            emergency_services: Vec::new(),
        }
    }
}

/// Geocode/directory lookup contract.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn resolve(&self, location: &str) -> Result<LocationData>;
}

/// Straight-line distance between two coordinates in km (haversine).
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    let d = 2.0 * EARTH_RADIUS_KM * a.sqrt().asin();
    (d * 10.0).round() / 10.0
}

/// Configuration for the OpenStreetMap-backed geocoder.
#[derive(Debug, Clone)]
pub struct NominatimGeocoderConfig {
    pub nominatim_url: String,
    /// Overpass mirrors tried in order until one answers.
    pub overpass_urls: Vec<String>,
    pub timeout: Duration,
    pub user_agent: String,
    /// Search radius for nearby services, in metres.
    pub radius_m: u32,
}

impl Default for NominatimGeocoderConfig {
    fn default() -> Self {
        Self {
            nominatim_url: "https://nominatim.openstreetmap.org/search".to_string(),
            overpass_urls: vec![
                "https://overpass-api.de/api/interpreter".to_string(),
                "https://overpass.kumi.systems/api/interpreter".to_string(),
                "https://maps.mail.ru/osm/tools/overpass/api/interpreter".to_string(),
            ],
            timeout: Duration::from_secs(25),
            user_agent: "siren-dispatch/0.1".to_string(),
            radius_m: 5000,
        }
    }
}

#[derive(Debug, Deserialize)]
struct NominatimResult {
    lat: String,
    lon: String,
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    #[serde(rename = "type")]
    element_type: String,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    center: Option<OverpassCenter>,
    #[serde(default)]
    tags: std::collections::HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct OverpassCenter {
    lat: f64,
    lon: f64,
}

fn amenity_label(amenity: &str) -> String {
    match amenity {
        "hospital" => "Hospital".to_string(),
        "clinic" | "doctors" => "Clinic".to_string(),
        "police" => "Police Station".to_string(),
        "fire_station" => "Fire Station".to_string(),
        other => {
            let mut label = String::new();
            for word in other.split('_') {
                if !label.is_empty() {
                    label.push(' ');
                }
                let mut chars = word.chars();
                if let Some(first) = chars.next() {
                    label.extend(first.to_uppercase());
                    label.push_str(chars.as_str());
                }
            }
            label
        }
    }
}

/// OpenStreetMap geocoder: Nominatim search plus Overpass amenity lookup.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    config: NominatimGeocoderConfig,
}

impl NominatimGeocoder {
    pub fn new(config: NominatimGeocoderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                SirenError::GeocodingFailed(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self { client, config })
    }

    async fn geocode(&self, location: &str) -> Result<Option<GeocodedLocation>> {
        let results: Vec<NominatimResult> = self
            .client
            .get(&self.config.nominatim_url)
            .query(&[
                ("q", location),
                ("format", "json"),
                ("limit", "1"),
                ("addressdetails", "1"),
            ])
            .send()
            .await?
            .error_for_status()
            .map_err(|e| SirenError::GeocodingFailed(format!("Nominatim error: {e}")))?
            .json()
            .await
            .map_err(|e| SirenError::GeocodingFailed(format!("Invalid Nominatim response: {e}")))?;

        let Some(first) = results.into_iter().next() else {
            return Ok(None);
        };

        let lat = first
            .lat
            .parse::<f64>()
            .map_err(|e| SirenError::GeocodingFailed(format!("Invalid latitude: {e}")))?;
        let lon = first
            .lon
            .parse::<f64>()
            .map_err(|e| SirenError::GeocodingFailed(format!("Invalid longitude: {e}")))?;

        Ok(Some(GeocodedLocation {
            lat,
            lon,
            display_name: first.display_name,
        }))
    }

    fn overpass_query(&self, lat: f64, lon: f64) -> String {
        let r = self.config.radius_m;
        format!(
            r#"[out:json][timeout:20];
(
  node["amenity"="hospital"](around:{r},{lat},{lon});
  node["amenity"="clinic"](around:{r},{lat},{lon});
  node["amenity"="doctors"](around:{r},{lat},{lon});
  node["amenity"="police"](around:{r},{lat},{lon});
  node["amenity"="fire_station"](around:{r},{lat},{lon});
  way["amenity"="hospital"](around:{r},{lat},{lon});
  way["amenity"="clinic"](around:{r},{lat},{lon});
);
out center body;"#
        )
    }

    /// Nearest named emergency services, sorted by haversine distance.
    ///
    /// Mirrors are tried in order; an empty list is returned when all fail,
    /// the map still renders without service markers.
    async fn nearby_services(&self, lat: f64, lon: f64) -> Vec<NearbyService> {
        let query = self.overpass_query(lat, lon);

        for url in &self.config.overpass_urls {
            debug!(url = %url, "Querying Overpass mirror");

            let response = match self
                .client
                .post(url)
                .form(&[("data", query.as_str())])
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    warn!(url = %url, error = %e, "Overpass mirror failed, trying next");
                    continue;
                }
            };

            if !response.status().is_success() {
                warn!(url = %url, status = %response.status(), "Overpass mirror error status");
                continue;
            }

            let parsed: OverpassResponse = match response.json().await {
                Ok(p) => p,
                Err(e) => {
                    warn!(url = %url, error = %e, "Invalid Overpass response");
                    continue;
                }
            };

            let mut services: Vec<NearbyService> = parsed
                .elements
                .into_iter()
                .filter_map(|el| {
                    let name = el.tags.get("name")?.trim().to_string();
                    if name.is_empty() {
                        return None;
                    }
                    let amenity = el
                        .tags
                        .get("amenity")
                        .cloned()
                        .unwrap_or_else(|| "unknown".to_string());

                    let (s_lat, s_lon) = match el.element_type.as_str() {
                        "node" => (el.lat?, el.lon?),
                        "way" => {
                            let center = el.center?;
                            (center.lat, center.lon)
                        }
                        _ => return None,
                    };

                    Some(NearbyService {
                        type_label: amenity_label(&amenity),
                        service_type: amenity,
                        name,
                        lat: s_lat,
                        lon: s_lon,
                        distance_km: haversine_distance(lat, lon, s_lat, s_lon),
                    })
                })
                .collect();

            services.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
            services.truncate(MAX_NEARBY_SERVICES);
            return services;
        }

        warn!("All Overpass mirrors failed or timed out");
        Vec::new()
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    #[instrument(level = "info", skip(self))]
    async fn resolve(&self, location: &str) -> Result<LocationData> {
        let Some(geocoded) = self.geocode(location).await? else {
            return Ok(LocationData::not_found());
        };

        let emergency_services = self.nearby_services(geocoded.lat, geocoded.lon).await;

        Ok(LocationData {
            found: true,
            location: Some(geocoded),
            emergency_services,
        })
    }
}

/// Fixed-result geocoder for tests.
pub struct MockGeocoder {
    data: LocationData,
}

impl MockGeocoder {
    pub fn new(data: LocationData) -> Self {
        Self { data }
    }

    pub fn not_found() -> Self {
        Self::new(LocationData::not_found())
    }

    pub fn at(lat: f64, lon: f64, display_name: impl Into<String>) -> Self {
        Self::new(LocationData {
            found: true,
            location: Some(GeocodedLocation {
                lat,
                lon,
                display_name: display_name.into(),
            }),
            emergency_services: Vec::new(),
        })
    }
}

#[async_trait]
impl Geocoder for MockGeocoder {
    async fn resolve(&self, _location: &str) -> Result<LocationData> {
        Ok(self.data.clone())
    }
}
