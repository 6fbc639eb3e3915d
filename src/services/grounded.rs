use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::{
    error::AppResult,
    models::{
        RawRecommendation, Recommendation, SearchHit, FALLBACK_ADDRESS, FALLBACK_CATEGORY,
        FALLBACK_DESCRIPTION, FALLBACK_NAME,
    },
    services::{providers::GenerativeProvider, schema},
};

/// Per-hit scraped content is cut to this many characters inside the prompt
const PROMPT_CONTENT_CHARS: usize = 500;

/// One orchestration run's query context, shared with the grounded generator
#[derive(Debug, Clone)]
pub struct SearchTask {
    pub query: String,
    pub location_label: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
}

/// Extracts recommendations strictly from supplied web-search data.
///
/// An empty output is a valid low-confidence answer, not a failure; only a
/// malformed model response is an error.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GroundedGenerator: Send + Sync {
    async fn generate(
        &self,
        hits: &[SearchHit],
        task: &SearchTask,
    ) -> AppResult<Vec<Recommendation>>;
}

/// Search-grounded generator over a generative model provider
pub struct SearchGroundedGenerator {
    provider: Arc<dyn GenerativeProvider>,
}

impl SearchGroundedGenerator {
    pub fn new(provider: Arc<dyn GenerativeProvider>) -> Self {
        Self { provider }
    }
}

/// Search hits as the compact JSON block embedded in the prompt
fn serialize_hits(hits: &[SearchHit]) -> String {
    let data: Vec<serde_json::Value> = hits
        .iter()
        .map(|hit| {
            json!({
                "title": hit.title,
                "snippet": hit.snippet,
                "url": hit.url,
                "content": hit
                    .content
                    .as_deref()
                    .map(|c| c.chars().take(PROMPT_CONTENT_CHARS).collect::<String>())
                    .unwrap_or_default(),
            })
        })
        .collect();

    serde_json::to_string_pretty(&data).unwrap_or_else(|_| "[]".to_string())
}

fn build_prompt(hits: &[SearchHit], task: &SearchTask) -> String {
    let search_data = serialize_hits(hits);

    format!(
        r#"You are an expert local discovery agent. I've gathered web search results for the query "{query}" near location "{location}" ({latitude}, {longitude}) within {radius}km radius.

SEARCH RESULTS DATA:
{search_data}

Your task is to analyze these real web search results and extract information about actual places, businesses, restaurants, activities, or attractions that match the user's query.

IMPORTANT INSTRUCTIONS:
1. Only extract information about places that are mentioned in the search results
2. Create realistic recommendations based on the actual data found
3. If you find specific business names, addresses, or details in the search results, use them
4. For missing information (rating, hours, exact coordinates), make reasonable estimates based on typical businesses of that type
5. Ensure all recommendations are within the specified radius of {latitude}, {longitude}
6. Focus on the most relevant and popular places mentioned in the search results

Return a JSON object with a "recommendations" array where each item has: name, type, description, address, latitude, longitude, rating, hours, imageUrl, externalUrl.

Extract 4-8 recommendations from the search results. If no relevant places are found in the search results, return an empty array."#,
        query = task.query,
        location = task.location_label,
        latitude = task.latitude,
        longitude = task.longitude,
        radius = task.radius_km,
    )
}

/// Missing coordinates fall back to the query origin; text fields get the
/// shared placeholders. Ratings and hours stay absent when the model did not
/// estimate them.
fn normalize(raw: RawRecommendation, task: &SearchTask) -> Recommendation {
    Recommendation {
        name: raw.name.unwrap_or_else(|| FALLBACK_NAME.to_string()),
        category: raw.category.unwrap_or_else(|| FALLBACK_CATEGORY.to_string()),
        description: raw
            .description
            .unwrap_or_else(|| FALLBACK_DESCRIPTION.to_string()),
        address: raw.address.unwrap_or_else(|| FALLBACK_ADDRESS.to_string()),
        latitude: raw.latitude.unwrap_or(task.latitude),
        longitude: raw.longitude.unwrap_or(task.longitude),
        rating: raw.rating,
        hours: raw.hours,
        image_url: raw.image_url,
        external_url: raw.external_url,
        distance: None,
        formatted_distance: None,
    }
}

#[async_trait]
impl GroundedGenerator for SearchGroundedGenerator {
    async fn generate(
        &self,
        hits: &[SearchHit],
        task: &SearchTask,
    ) -> AppResult<Vec<Recommendation>> {
        let prompt = build_prompt(hits, task);
        let response_schema = schema::recommendations_schema();

        let payload = self
            .provider
            .generate_structured(&prompt, Some(&response_schema))
            .await?;

        let raw_items = schema::parse_recommendations(&payload)?;
        let recommendations: Vec<Recommendation> = raw_items
            .into_iter()
            .map(|raw| normalize(raw, task))
            .collect();

        tracing::info!(
            count = recommendations.len(),
            provider = self.provider.name(),
            "Search-grounded generation completed"
        );

        Ok(recommendations)
    }
}
