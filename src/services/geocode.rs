use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;

use crate::error::AppResult;

/// Turns coordinates into a human-readable place label.
///
/// This adapter never fails: every transport or parse problem degrades to
/// `None`, and callers fall back to using raw coordinates as the label.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    /// Best-effort "city, region" (or "city, country") string
    async fn reverse(&self, latitude: f64, longitude: f64) -> Option<String>;
}

#[derive(Debug, Deserialize)]
struct ReverseGeocodeResponse {
    #[serde(default)]
    address: Option<OsmAddress>,
}

#[derive(Debug, Default, Deserialize)]
struct OsmAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    suburb: Option<String>,
    state: Option<String>,
    country: Option<String>,
}

/// Builds the label from an OSM address block.
///
/// Prefers "city, state", then "city, country"; towns, villages and suburbs
/// stand in for a missing city.
fn location_label(address: &OsmAddress) -> Option<String> {
    let city = address
        .city
        .as_deref()
        .or(address.town.as_deref())
        .or(address.village.as_deref())
        .or(address.suburb.as_deref())?;

    if let Some(state) = address.state.as_deref() {
        Some(format!("{}, {}", city, state))
    } else {
        address
            .country
            .as_deref()
            .map(|country| format!("{}, {}", city, country))
    }
}

/// Reverse geocoder backed by the OpenStreetMap Nominatim endpoint
pub struct NominatimGeocoder {
    http_client: HttpClient,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(base_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            base_url,
        }
    }

    async fn lookup(&self, latitude: f64, longitude: f64) -> AppResult<Option<String>> {
        let url = format!("{}/reverse", self.base_url);

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("format", "json"),
                ("lat", &latitude.to_string()),
                ("lon", &longitude.to_string()),
                ("zoom", "10"),
            ])
            .send()
            .await?;

        let body: ReverseGeocodeResponse = response.json().await?;
        Ok(body.address.as_ref().and_then(location_label))
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    async fn reverse(&self, latitude: f64, longitude: f64) -> Option<String> {
        match self.lookup(latitude, longitude).await {
            Ok(label) => label,
            Err(e) => {
                tracing::warn!(error = %e, latitude, longitude, "Reverse geocoding failed");
                None
            }
        }
    }
}
