use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;

use crate::{
    error::AppResult,
    models::{
        RawRecommendation, Recommendation, FALLBACK_ADDRESS, FALLBACK_CATEGORY,
        FALLBACK_DESCRIPTION, FALLBACK_NAME,
    },
    services::{providers::GenerativeProvider, schema},
};

/// Degrees of latitude per kilometer, near enough for offset sampling
const KM_PER_DEGREE: f64 = 111.0;

/// Synthetic coordinates stay within this fraction of the radius
const RADIUS_MARGIN: f64 = 0.9;

/// Produces recommendations purely from the model's latent knowledge.
///
/// Used when web search yields nothing, and to top up the grounded
/// generator's output when it falls short.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KnowledgeGenerator: Send + Sync {
    async fn generate(
        &self,
        query: &str,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
        location_label: Option<&str>,
    ) -> AppResult<Vec<Recommendation>>;
}

/// Knowledge-only generator over a generative model provider
pub struct ModelKnowledgeGenerator {
    provider: Arc<dyn GenerativeProvider>,
}

impl ModelKnowledgeGenerator {
    pub fn new(provider: Arc<dyn GenerativeProvider>) -> Self {
        Self { provider }
    }
}

fn build_prompt(
    query: &str,
    latitude: f64,
    longitude: f64,
    radius_km: f64,
    location_label: Option<&str>,
) -> String {
    let location = location_label
        .map(String::from)
        .unwrap_or_else(|| format!("{}, {}", latitude, longitude));

    format!(
        r#"I need comprehensive recommendations for "{query}" near {location} (coordinates: {latitude}, {longitude}) within {radius_km}km radius.

Please provide 10-20 realistic recommendations based on what would typically be available in this area. Include:

1. Well-known chains that commonly have locations in major cities
2. Popular local establishments that are typical for this type of query
3. Diverse options across different price ranges and styles
4. Various locations spread throughout the search radius

For coordinates, generate realistic positions within {radius_km}km of {latitude}, {longitude}.

Return a JSON object with a "recommendations" array where each item has: name, type, description, address, latitude, longitude, rating (1-5 scale), hours, imageUrl, externalUrl.

Generate 12-20 diverse recommendations for maximum user choice."#
    )
}

/// Fills the gaps a model response may leave.
///
/// Items without coordinates get one sampled uniformly in direction and in
/// distance up to 90% of the radius from the origin; missing ratings are
/// drawn from [3.0, 5.0); text fields fall back to fixed placeholders.
fn normalize<R: Rng>(
    raw: RawRecommendation,
    latitude: f64,
    longitude: f64,
    radius_km: f64,
    rng: &mut R,
) -> Recommendation {
    let (item_lat, item_lon) = match (raw.latitude, raw.longitude) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => synthetic_coordinate(latitude, longitude, radius_km, rng),
    };

    Recommendation {
        name: raw.name.unwrap_or_else(|| FALLBACK_NAME.to_string()),
        category: raw.category.unwrap_or_else(|| FALLBACK_CATEGORY.to_string()),
        description: raw
            .description
            .unwrap_or_else(|| FALLBACK_DESCRIPTION.to_string()),
        address: raw.address.unwrap_or_else(|| FALLBACK_ADDRESS.to_string()),
        latitude: item_lat,
        longitude: item_lon,
        rating: raw.rating.or_else(|| Some(rng.gen_range(3.0..5.0))),
        hours: raw.hours.or_else(|| Some("Hours vary".to_string())),
        image_url: raw.image_url,
        external_url: raw.external_url,
        distance: None,
        formatted_distance: None,
    }
}

/// Random point within 90% of the radius, via uniform angle and distance
fn synthetic_coordinate<R: Rng>(
    latitude: f64,
    longitude: f64,
    radius_km: f64,
    rng: &mut R,
) -> (f64, f64) {
    let max_offset_deg = (radius_km / KM_PER_DEGREE) * RADIUS_MARGIN;
    let angle = rng.gen_range(0.0..std::f64::consts::TAU);
    let distance = rng.gen_range(0.0..max_offset_deg);

    (
        latitude + angle.cos() * distance,
        longitude + angle.sin() * distance,
    )
}

#[async_trait]
impl KnowledgeGenerator for ModelKnowledgeGenerator {
    async fn generate(
        &self,
        query: &str,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
        location_label: Option<&str>,
    ) -> AppResult<Vec<Recommendation>> {
        let prompt = build_prompt(query, latitude, longitude, radius_km, location_label);
        let response_schema = schema::recommendations_schema();

        let payload = self
            .provider
            .generate_structured(&prompt, Some(&response_schema))
            .await?;

        let raw_items = schema::parse_recommendations(&payload)?;

        let mut rng = rand::thread_rng();
        let recommendations: Vec<Recommendation> = raw_items
            .into_iter()
            .map(|raw| normalize(raw, latitude, longitude, radius_km, &mut rng))
            .collect();

        tracing::info!(
            count = recommendations.len(),
            provider = self.provider.name(),
            "Knowledge-only generation completed"
        );

        Ok(recommendations)
    }
}
