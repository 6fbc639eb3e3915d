use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::models::RawRecommendation;

/// Response schema both generators hand to schema-aware providers.
///
/// Mirrors the `Recommendation` wire shape: an object with a required
/// `recommendations` array whose items carry the place fields.
pub fn recommendations_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "recommendations": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "type": { "type": "string" },
                        "description": { "type": "string" },
                        "address": { "type": "string" },
                        "latitude": { "type": "number" },
                        "longitude": { "type": "number" },
                        "rating": { "type": "number" },
                        "hours": { "type": "string" },
                        "imageUrl": { "type": ["string", "null"] },
                        "externalUrl": { "type": ["string", "null"] }
                    },
                    "required": ["name", "type", "description", "address", "latitude", "longitude"]
                }
            }
        },
        "required": ["recommendations"]
    })
}

/// Pulls the raw recommendation list out of a model response.
///
/// A present-but-empty array is a valid answer; a missing or non-array
/// `recommendations` field is a generation error. Items that do not even
/// loosely fit the shape are dropped rather than failing the batch.
pub fn parse_recommendations(payload: &Value) -> AppResult<Vec<RawRecommendation>> {
    let items = payload
        .get("recommendations")
        .and_then(|r| r.as_array())
        .ok_or_else(|| {
            AppError::Generation("Model response missing recommendations array".to_string())
        })?;

    Ok(items
        .iter()
        .filter_map(|item| serde_json::from_value(item.clone()).ok())
        .collect())
}
