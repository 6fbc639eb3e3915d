use std::sync::Arc;

use localscout_api::config::Config;
use localscout_api::routes::{create_router, AppState};
use localscout_api::services::{
    geocode::NominatimGeocoder, grounded::SearchGroundedGenerator,
    knowledge::ModelKnowledgeGenerator, providers, websearch::DuckDuckGoSearcher,
    DiscoveryService,
};
use localscout_api::store::Cache;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = Config::from_env()?;

    // Wire up the pipeline collaborators
    let provider = providers::create_provider(&config)?;
    tracing::info!(provider = provider.name(), "Model provider selected");

    let geocoder = Arc::new(NominatimGeocoder::new(config.geocode_url.clone()));
    let searcher = Arc::new(DuckDuckGoSearcher::new(config.search_url.clone()));
    let grounded = Arc::new(SearchGroundedGenerator::new(provider.clone()));
    let knowledge = Arc::new(ModelKnowledgeGenerator::new(provider));

    let discovery = Arc::new(DiscoveryService::new(geocoder, searcher, grounded, knowledge));

    // Cache lives for the whole process and is torn down with it
    let state = AppState::new(discovery, Cache::new());

    let app = create_router(state);

    // Start the server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}
