use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::services::geo;

/// A recommended place returned to the client.
///
/// Produced by the generators; `distance` and `formatted_distance` are
/// attached later by the post-processor and absent until then.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub name: String,
    #[serde(rename = "type")]
    pub category: String,
    pub description: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub rating: Option<f64>,
    pub hours: Option<String>,
    pub image_url: Option<String>,
    pub external_url: Option<String>,
    pub distance: Option<f64>,
    pub formatted_distance: Option<String>,
}

/// Recommendation as produced by a generative model, before normalization.
///
/// Every field is optional: models routinely omit coordinates, ratings and
/// hours, and the generators backfill them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecommendation {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub category: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub rating: Option<f64>,
    pub hours: Option<String>,
    pub image_url: Option<String>,
    pub external_url: Option<String>,
}

/// Placeholder values for fields a model response left out
pub const FALLBACK_NAME: &str = "Unknown Business";
pub const FALLBACK_CATEGORY: &str = "Place";
pub const FALLBACK_DESCRIPTION: &str = "No description available";
pub const FALLBACK_ADDRESS: &str = "Address not available";

/// Validated search request from the client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_radius")]
    pub radius: f64,
}

fn default_radius() -> f64 {
    10.0
}

impl SearchRequest {
    /// Rejects malformed requests before any network or model call is made.
    pub fn validate(&self) -> AppResult<()> {
        if self.query.trim().is_empty() {
            return Err(AppError::InvalidInput("Query is required".to_string()));
        }
        if !geo::is_valid_coordinates(self.latitude, self.longitude) {
            return Err(AppError::InvalidInput(
                "Invalid coordinates provided".to_string(),
            ));
        }
        if !(1.0..=50.0).contains(&self.radius) {
            return Err(AppError::InvalidInput(
                "Radius must be between 1 and 50 km".to_string(),
            ));
        }
        Ok(())
    }
}

/// One parsed result from the search results page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub content: Option<String>,
}

/// Origin of a search, echoed back in the response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// Full search response; also the unit stored in the cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub recommendations: Vec<Recommendation>,
    pub query: String,
    pub location: Location,
    pub radius: f64,
    pub count: usize,
}
