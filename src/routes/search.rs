use axum::{extract::State, Json};
use serde_json::Value;

use crate::{
    cached,
    error::{AppError, AppResult},
    models::{Location, SearchRequest, SearchResponse},
    services::postprocess,
    store::CacheKey,
};

use super::AppState;

/// Handler for the recommendation search endpoint.
///
/// Validates the request, serves a cached response when the normalized
/// parameters have been seen before, and otherwise runs the full discovery
/// pipeline and stores the post-processed result.
pub async fn search(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> AppResult<Json<SearchResponse>> {
    let request: SearchRequest =
        serde_json::from_value(body).map_err(|e| AppError::InvalidInput(e.to_string()))?;
    request.validate()?;

    let key = CacheKey::Search {
        query: request.query.clone(),
        latitude: request.latitude,
        longitude: request.longitude,
        radius: request.radius,
    };

    let response: SearchResponse = cached!(state.cache, key, async {
        let recommendations = state.discovery.discover(&request).await?;
        let recommendations = postprocess::post_process(
            recommendations,
            request.latitude,
            request.longitude,
            request.radius,
        );

        Ok::<SearchResponse, AppError>(SearchResponse {
            count: recommendations.len(),
            recommendations,
            query: request.query.clone(),
            location: Location {
                latitude: request.latitude,
                longitude: request.longitude,
            },
            radius: request.radius,
        })
    })?;

    Ok(Json(response))
}
