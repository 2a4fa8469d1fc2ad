// Runs one search against the demo providers and prints the result as JSON.
//
//   deal_search [request.json] [engine-config.json]
//
// Without a request file it searches NYC -> Paris flights for 2025-07-15..22.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use travel_deal_engine::demo_providers::default_adapters;
use travel_deal_engine::provider_cache::{CacheConfig, CachedAdapter};
use travel_deal_engine::{
    EngineConfig, ProviderAdapter, ResultAggregator, SearchError, SearchRequest,
    StaticDestinationKnowledge, TripKind,
};

fn default_request() -> SearchRequest {
    SearchRequest {
        kind: Some(TripKind::Flight),
        origin: Some("NYC".to_string()),
        destination: Some("Paris".to_string()),
        departure_date: Some("2025-07-15".to_string()),
        return_date: Some("2025-07-22".to_string()),
        party_size: Some(2),
        ..SearchRequest::default()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "travel_deal_engine=info,deal_search=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let request = match args.next() {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading search request {}", path))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing search request {}", path))?
        }
        None => default_request(),
    };
    let config = match args.next() {
        Some(path) => EngineConfig::from_json_file(&path)
            .with_context(|| format!("loading engine config {}", path))?,
        None => EngineConfig::default(),
    };

    let adapters: Vec<Arc<dyn ProviderAdapter>> = default_adapters()
        .into_iter()
        .map(|adapter| {
            Arc::new(CachedAdapter::new(adapter, CacheConfig::default())) as Arc<dyn ProviderAdapter>
        })
        .collect();

    let engine = ResultAggregator::new(
        config,
        adapters,
        Arc::new(StaticDestinationKnowledge::default()),
    )?;
    tracing::info!(providers = ?engine.providers().collect::<Vec<_>>(), "engine ready");

    match engine.search_request(request).await {
        Ok(result) => {
            tracing::info!(summary = ?result.summary(), "search finished");
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Err(SearchError::NoResults { failures }) => {
            for failure in &failures {
                tracing::error!(%failure, "provider failed");
            }
            anyhow::bail!("no provider returned results")
        }
        Err(e) => Err(e.into()),
    }
}
