use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    error::{AppError, AppResult},
    models::{Recommendation, SearchHit, SearchRequest},
    services::{
        geocode::ReverseGeocoder,
        grounded::{GroundedGenerator, SearchTask},
        knowledge::KnowledgeGenerator,
        websearch::WebSearcher,
    },
};

/// How many query variants are actually searched
const SEARCH_VARIANTS_TO_RUN: usize = 3;

/// Pause between search requests; upstream blocks rapid-fire queries
const SEARCH_DELAY: Duration = Duration::from_millis(1500);

/// Pause between page scrapes
const SCRAPE_DELAY: Duration = Duration::from_millis(500);

/// Only the first few unique hits are scrape candidates
const SCRAPE_CANDIDATES: usize = 5;

/// Grounded output below this count gets topped up with knowledge results
const TARGET_COUNT: usize = 8;

/// Review/travel sites whose result pages are worth scraping
const SCRAPE_ALLOWED_DOMAINS: &[&str] = &[
    "yelp.com",
    "google.com",
    "tripadvisor.com",
    "foursquare.com",
    "opentable.com",
];

/// Outcome of the search-grounded strategy for one request
enum GroundedAttempt {
    /// Met the target count, nothing else to do
    Complete(Vec<Recommendation>),
    /// Produced something, but below target; top up with knowledge results
    Partial(Vec<Recommendation>),
    /// No search data, or generation failed; knowledge-only takes over
    Unavailable,
}

/// Orchestrates the recommendation strategies for one search request.
///
/// The grounded strategy (web search + extraction) runs first; the
/// knowledge-only strategy fills in when search yields nothing, when the
/// grounded output falls short of the target, or when grounding fails
/// outright. Only when every strategy has failed does an error cross this
/// boundary; callers never see partial results from a failed run.
pub struct DiscoveryService {
    geocoder: Arc<dyn ReverseGeocoder>,
    searcher: Arc<dyn WebSearcher>,
    grounded: Arc<dyn GroundedGenerator>,
    knowledge: Arc<dyn KnowledgeGenerator>,
}

impl DiscoveryService {
    pub fn new(
        geocoder: Arc<dyn ReverseGeocoder>,
        searcher: Arc<dyn WebSearcher>,
        grounded: Arc<dyn GroundedGenerator>,
        knowledge: Arc<dyn KnowledgeGenerator>,
    ) -> Self {
        Self {
            geocoder,
            searcher,
            grounded,
            knowledge,
        }
    }

    /// Runs the full strategy chain for a validated request
    pub async fn discover(&self, request: &SearchRequest) -> AppResult<Vec<Recommendation>> {
        tracing::info!(query = %request.query, "Starting discovery run");

        let location_label = self
            .geocoder
            .reverse(request.latitude, request.longitude)
            .await;
        tracing::info!(
            location = location_label.as_deref().unwrap_or("coordinates only"),
            "Resolved location context"
        );

        let task = SearchTask {
            query: request.query.clone(),
            location_label: location_label
                .clone()
                .unwrap_or_else(|| format!("{}, {}", request.latitude, request.longitude)),
            latitude: request.latitude,
            longitude: request.longitude,
            radius_km: request.radius,
        };

        match self.grounded_attempt(&task).await {
            GroundedAttempt::Complete(recommendations) => {
                tracing::info!(count = recommendations.len(), "Grounded strategy complete");
                return Ok(recommendations);
            }
            GroundedAttempt::Partial(partial) => {
                tracing::info!(
                    count = partial.len(),
                    target = TARGET_COUNT,
                    "Grounded output below target, merging with knowledge results"
                );
                match self
                    .knowledge_generate(request, location_label.as_deref())
                    .await
                {
                    Ok(extra) => {
                        let merged = merge_by_name(partial, extra);
                        tracing::info!(count = merged.len(), "Merged strategies");
                        return Ok(merged);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Knowledge top-up failed, retrying knowledge-only");
                    }
                }
            }
            GroundedAttempt::Unavailable => {}
        }

        // Last strategy standing: knowledge-only, alone
        match self
            .knowledge_generate(request, location_label.as_deref())
            .await
        {
            Ok(recommendations) => {
                tracing::info!(
                    count = recommendations.len(),
                    "Knowledge-only strategy complete"
                );
                Ok(recommendations)
            }
            Err(e) => Err(AppError::AllStrategiesFailed(e.to_string())),
        }
    }

    /// Search, scrape and extract; every failure collapses to `Unavailable`
    async fn grounded_attempt(&self, task: &SearchTask) -> GroundedAttempt {
        let hits = self.gather_search_hits(&task.query, &task.location_label).await;

        if hits.is_empty() {
            tracing::info!("No usable web search results, skipping grounded strategy");
            return GroundedAttempt::Unavailable;
        }
        tracing::info!(hits = hits.len(), "Collected unique search results");

        let hits = self.scrape_top_hits(hits).await;

        match self.grounded.generate(&hits, task).await {
            Ok(recommendations) if recommendations.len() >= TARGET_COUNT => {
                GroundedAttempt::Complete(recommendations)
            }
            Ok(recommendations) => GroundedAttempt::Partial(recommendations),
            Err(e) => {
                tracing::warn!(error = %e, "Grounded generation failed, falling back");
                GroundedAttempt::Unavailable
            }
        }
    }

    /// Runs the first few query variants and dedupes the hits by URL
    async fn gather_search_hits(&self, query: &str, location_label: &str) -> Vec<SearchHit> {
        let variants = build_query_variants(query, location_label);

        let mut all_hits = Vec::new();
        for (i, variant) in variants.iter().take(SEARCH_VARIANTS_TO_RUN).enumerate() {
            if i > 0 {
                tokio::time::sleep(SEARCH_DELAY).await;
            }
            all_hits.extend(self.searcher.search(variant).await);
        }

        dedupe_by_url(all_hits)
    }

    /// Attaches page content to the allow-listed hits among the top
    /// `SCRAPE_CANDIDATES` results; hits further down are never scraped
    async fn scrape_top_hits(&self, mut hits: Vec<SearchHit>) -> Vec<SearchHit> {
        let mut scraped = 0;

        for hit in hits.iter_mut().take(SCRAPE_CANDIDATES) {
            if !is_scrape_allowed(&hit.url) {
                continue;
            }

            if scraped > 0 {
                tokio::time::sleep(SCRAPE_DELAY).await;
            }

            let content = self.searcher.scrape(&hit.url).await;
            if !content.is_empty() {
                hit.content = Some(content);
            }
            scraped += 1;
        }

        if scraped > 0 {
            tracing::info!(scraped, "Enriched top results with page content");
        }
        hits
    }

    async fn knowledge_generate(
        &self,
        request: &SearchRequest,
        location_label: Option<&str>,
    ) -> AppResult<Vec<Recommendation>> {
        self.knowledge
            .generate(
                &request.query,
                request.latitude,
                request.longitude,
                request.radius,
                location_label,
            )
            .await
    }
}

/// Query-text variants combining the user query and the location label.
/// Only the first `SEARCH_VARIANTS_TO_RUN` are executed.
fn build_query_variants(query: &str, location_label: &str) -> Vec<String> {
    vec![
        format!("{} in {}", query, location_label),
        format!("{} near {}", query, location_label),
        format!("best {} {}", query, location_label),
        format!("{} {} reviews", query, location_label),
        format!("{} {} yelp google maps", query, location_label),
    ]
}

fn is_scrape_allowed(url: &str) -> bool {
    SCRAPE_ALLOWED_DOMAINS.iter().any(|domain| url.contains(domain))
}

/// Keeps the first hit per URL, preserving order
fn dedupe_by_url(hits: Vec<SearchHit>) -> Vec<SearchHit> {
    let mut seen = HashSet::new();
    hits.into_iter()
        .filter(|hit| seen.insert(hit.url.clone()))
        .collect()
}

/// Merges two strategy outputs, deduplicating by case-insensitive exact
/// business name; the first occurrence wins.
fn merge_by_name(
    primary: Vec<Recommendation>,
    extra: Vec<Recommendation>,
) -> Vec<Recommendation> {
    let mut seen = HashSet::new();
    primary
        .into_iter()
        .chain(extra)
        .filter(|rec| seen.insert(rec.name.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::geocode::MockReverseGeocoder;
    use crate::services::grounded::MockGroundedGenerator;
    use crate::services::knowledge::MockKnowledgeGenerator;
    use crate::services::websearch::MockWebSearcher;

    fn request() -> SearchRequest {
        SearchRequest {
            query: "coffee".to_string(),
            latitude: 40.7128,
            longitude: -74.0060,
            radius: 5.0,
        }
    }

    fn place(name: &str) -> Recommendation {
        Recommendation {
            name: name.to_string(),
            category: "Cafe".to_string(),
            description: "A cafe".to_string(),
            address: "Somewhere".to_string(),
            latitude: 40.713,
            longitude: -74.005,
            rating: Some(4.2),
            hours: None,
            image_url: None,
            external_url: None,
            distance: None,
            formatted_distance: None,
        }
    }

    fn hit(url: &str) -> SearchHit {
        SearchHit {
            title: "A result title".to_string(),
            url: url.to_string(),
            snippet: "a snippet".to_string(),
            content: None,
        }
    }

    fn geocoder_returning(label: Option<&'static str>) -> MockReverseGeocoder {
        let mut geocoder = MockReverseGeocoder::new();
        geocoder
            .expect_reverse()
            .returning(move |_, _| label.map(String::from));
        geocoder
    }

    fn service(
        geocoder: MockReverseGeocoder,
        searcher: MockWebSearcher,
        grounded: MockGroundedGenerator,
        knowledge: MockKnowledgeGenerator,
    ) -> DiscoveryService {
        DiscoveryService::new(
            Arc::new(geocoder),
            Arc::new(searcher),
            Arc::new(grounded),
            Arc::new(knowledge),
        )
    }

    #[test]
    fn test_query_variants_include_location() {
        let variants = build_query_variants("coffee", "Brooklyn, New York");
        assert_eq!(variants.len(), 5);
        assert_eq!(variants[0], "coffee in Brooklyn, New York");
        assert!(variants.iter().all(|v| v.contains("Brooklyn, New York")));
    }

    #[test]
    fn test_dedupe_by_url_keeps_first() {
        let hits = vec![hit("https://a.example"), hit("https://b.example"), hit("https://a.example")];
        let unique = dedupe_by_url(hits);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].url, "https://a.example");
        assert_eq!(unique[1].url, "https://b.example");
    }

    #[test]
    fn test_merge_by_name_is_case_insensitive_first_wins() {
        let merged = merge_by_name(
            vec![place("Cafe A"), place("cafe a")],
            vec![place("Cafe B"), place("CAFE A")],
        );

        let names: Vec<&str> = merged.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Cafe A", "Cafe B"]);
    }

    #[test]
    fn test_scrape_allow_list() {
        assert!(is_scrape_allowed("https://www.yelp.com/biz/somewhere"));
        assert!(is_scrape_allowed("https://www.tripadvisor.com/r"));
        assert!(!is_scrape_allowed("https://random-blog.example/post"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_search_results_short_circuits_to_knowledge() {
        let mut searcher = MockWebSearcher::new();
        searcher.expect_search().times(3).returning(|_| Vec::new());
        searcher.expect_scrape().times(0);

        let mut grounded = MockGroundedGenerator::new();
        grounded.expect_generate().times(0);

        let mut knowledge = MockKnowledgeGenerator::new();
        knowledge
            .expect_generate()
            .times(1)
            .returning(|_, _, _, _, _| Ok(vec![place("Cafe A")]));

        let service = service(
            geocoder_returning(Some("New York, New York")),
            searcher,
            grounded,
            knowledge,
        );

        let result = service.discover(&request()).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name, "Cafe A");
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_grounded_output_is_topped_up_by_knowledge() {
        let mut searcher = MockWebSearcher::new();
        searcher
            .expect_search()
            .times(3)
            .returning(|_| vec![hit("https://random-blog.example/post")]);

        let mut grounded = MockGroundedGenerator::new();
        grounded
            .expect_generate()
            .times(1)
            .returning(|_, _| Ok(Vec::new()));

        let mut knowledge = MockKnowledgeGenerator::new();
        knowledge
            .expect_generate()
            .times(1)
            .returning(|_, _, _, _, _| Ok(vec![place("Cafe A"), place("Cafe B")]));

        let service = service(
            geocoder_returning(Some("New York, New York")),
            searcher,
            grounded,
            knowledge,
        );

        let result = service.discover(&request()).await.unwrap();
        let names: Vec<&str> = result.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Cafe A", "Cafe B"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_grounded_meeting_target_skips_knowledge() {
        let mut searcher = MockWebSearcher::new();
        searcher
            .expect_search()
            .times(3)
            .returning(|_| vec![hit("https://random-blog.example/post")]);

        let full: Vec<Recommendation> = (0..8).map(|i| place(&format!("Place {}", i))).collect();
        let mut grounded = MockGroundedGenerator::new();
        grounded
            .expect_generate()
            .times(1)
            .returning(move |_, _| Ok(full.clone()));

        let mut knowledge = MockKnowledgeGenerator::new();
        knowledge.expect_generate().times(0);

        let service = service(
            geocoder_returning(Some("New York, New York")),
            searcher,
            grounded,
            knowledge,
        );

        let result = service.discover(&request()).await.unwrap();
        assert_eq!(result.len(), 8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_grounded_output_merges_and_dedupes() {
        let mut searcher = MockWebSearcher::new();
        searcher
            .expect_search()
            .times(3)
            .returning(|_| vec![hit("https://random-blog.example/post")]);

        let mut grounded = MockGroundedGenerator::new();
        grounded
            .expect_generate()
            .times(1)
            .returning(|_, _| Ok(vec![place("Cafe A"), place("Cafe B")]));

        let mut knowledge = MockKnowledgeGenerator::new();
        knowledge
            .expect_generate()
            .times(1)
            .returning(|_, _, _, _, _| Ok(vec![place("cafe a"), place("Cafe C")]));

        let service = service(
            geocoder_returning(None),
            searcher,
            grounded,
            knowledge,
        );

        let result = service.discover(&request()).await.unwrap();
        let names: Vec<&str> = result.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Cafe A", "Cafe B", "Cafe C"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_grounded_failure_falls_back_to_knowledge_only() {
        let mut searcher = MockWebSearcher::new();
        searcher
            .expect_search()
            .times(3)
            .returning(|_| vec![hit("https://random-blog.example/post")]);

        let mut grounded = MockGroundedGenerator::new();
        grounded
            .expect_generate()
            .times(1)
            .returning(|_, _| Err(AppError::Generation("bad model output".to_string())));

        let mut knowledge = MockKnowledgeGenerator::new();
        knowledge
            .expect_generate()
            .times(1)
            .returning(|_, _, _, _, _| Ok(vec![place("Cafe A")]));

        let service = service(
            geocoder_returning(Some("New York, New York")),
            searcher,
            grounded,
            knowledge,
        );

        let result = service.discover(&request()).await.unwrap();
        assert_eq!(result.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_strategies_failing_surfaces_aggregate_error() {
        let mut searcher = MockWebSearcher::new();
        searcher.expect_search().times(3).returning(|_| Vec::new());

        let mut grounded = MockGroundedGenerator::new();
        grounded.expect_generate().times(0);

        let mut knowledge = MockKnowledgeGenerator::new();
        knowledge
            .expect_generate()
            .times(1)
            .returning(|_, _, _, _, _| Err(AppError::Generation("model down".to_string())));

        let service = service(
            geocoder_returning(None),
            searcher,
            grounded,
            knowledge,
        );

        let result = service.discover(&request()).await;
        assert!(matches!(result, Err(AppError::AllStrategiesFailed(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_allow_listed_urls_are_scraped() {
        let mut searcher = MockWebSearcher::new();
        searcher.expect_search().times(3).returning(|_| {
            vec![
                hit("https://www.yelp.com/biz/cafe-a"),
                hit("https://random-blog.example/post"),
            ]
        });
        searcher
            .expect_scrape()
            .times(1)
            .withf(|url| url.contains("yelp.com"))
            .returning(|_| "Scraped page text".to_string());

        let mut grounded = MockGroundedGenerator::new();
        grounded
            .expect_generate()
            .times(1)
            .withf(|hits, _| {
                hits.iter()
                    .any(|h| h.content.as_deref() == Some("Scraped page text"))
            })
            .returning(|_, _| Ok((0..8).map(|i| place(&format!("P{}", i))).collect()));

        let knowledge = MockKnowledgeGenerator::new();

        let service = service(
            geocoder_returning(Some("New York, New York")),
            searcher,
            grounded,
            knowledge,
        );

        let result = service.discover(&request()).await.unwrap();
        assert_eq!(result.len(), 8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_allow_listed_hit_outside_top_candidates_is_not_scraped() {
        let mut searcher = MockWebSearcher::new();
        searcher.expect_search().times(3).returning(|_| {
            vec![
                hit("https://blog-one.example/a"),
                hit("https://blog-two.example/b"),
                hit("https://blog-three.example/c"),
                hit("https://blog-four.example/d"),
                hit("https://blog-five.example/e"),
                hit("https://www.yelp.com/biz/cafe-far-down"),
            ]
        });
        searcher.expect_scrape().times(0);

        let mut grounded = MockGroundedGenerator::new();
        grounded
            .expect_generate()
            .times(1)
            .withf(|hits, _| hits.iter().all(|h| h.content.is_none()))
            .returning(|_, _| Ok((0..8).map(|i| place(&format!("P{}", i))).collect()));

        let knowledge = MockKnowledgeGenerator::new();

        let service = service(
            geocoder_returning(Some("New York, New York")),
            searcher,
            grounded,
            knowledge,
        );

        let result = service.discover(&request()).await.unwrap();
        assert_eq!(result.len(), 8);
    }
}
