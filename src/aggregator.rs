// Result aggregator
// The engine's entry point. One search runs the pipeline
// Collecting -> Normalizing -> Ranking -> Compiling -> Done, and only ends in
// Failed when not a single provider answered.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::adapter::ProviderAdapter;
use crate::config::{ConfigError, EngineConfig};
use crate::deal::Deal;
use crate::dispatcher::{ProviderFailure, ProviderQueryDispatcher};
use crate::insights::{
    DealAlert, DestinationInsights, DestinationKnowledgeSource, InsightsCompiler,
    PopularDestination,
};
use crate::normalizer::{provider_slug, DealNormalizer, RecordRejection};
use crate::ranker::DealRanker;
use crate::search_params::{SearchParameters, SearchRequest, ValidationError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error("Invalid search: {0}")]
    Validation(#[from] ValidationError),

    #[error("No provider returned results ({} failed)", .failures.len())]
    NoResults { failures: Vec<ProviderFailure> },

    #[error("Search did not finish within {after_ms}ms")]
    RequestTimeout { after_ms: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationState {
    Collecting,
    Normalizing,
    Ranking,
    Compiling,
    Done,
    Failed,
}

impl AggregationState {
    // Forward edge of the happy path; terminal states stay put
    pub fn next(self) -> Self {
        match self {
            AggregationState::Collecting => AggregationState::Normalizing,
            AggregationState::Normalizing => AggregationState::Ranking,
            AggregationState::Ranking => AggregationState::Compiling,
            AggregationState::Compiling => AggregationState::Done,
            AggregationState::Done => AggregationState::Done,
            AggregationState::Failed => AggregationState::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, AggregationState::Done | AggregationState::Failed)
    }
}

impl fmt::Display for AggregationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggregationState::Collecting => "collecting",
            AggregationState::Normalizing => "normalizing",
            AggregationState::Ranking => "ranking",
            AggregationState::Compiling => "compiling",
            AggregationState::Done => "done",
            AggregationState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub status: AggregationState,
    pub deals: Vec<Deal>,
    pub insights: Option<DestinationInsights>,
    pub partial: bool,
    pub failed_providers: BTreeSet<String>,
    pub failures: Vec<ProviderFailure>,
    pub rejected_records: Vec<RecordRejection>,
    pub dropped_counts: BTreeMap<String, usize>,
    pub filtered_by_budget: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSummary {
    pub deals_found: usize,
    pub best_savings: Option<u32>,
    pub average_savings: f64,
}

impl SearchResult {
    pub fn summary(&self) -> SearchSummary {
        let average_savings = if self.deals.is_empty() {
            0.0
        } else {
            let total: u32 = self.deals.iter().map(|d| d.savings_percent).sum();
            (total as f64 / self.deals.len() as f64 * 10.0).round() / 10.0
        };

        SearchSummary {
            deals_found: self.deals.len(),
            best_savings: self.deals.iter().map(|d| d.savings_percent).max(),
            average_savings,
        }
    }
}

pub struct ResultAggregator {
    config: EngineConfig,
    adapters: Vec<Arc<dyn ProviderAdapter>>,
    dispatcher: ProviderQueryDispatcher,
    normalizer: DealNormalizer,
    ranker: DealRanker,
    insights: InsightsCompiler,
}

impl ResultAggregator {
    pub fn new(
        config: EngineConfig,
        adapters: Vec<Arc<dyn ProviderAdapter>>,
        knowledge: Arc<dyn DestinationKnowledgeSource>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        // Deal ids are built from the provider slug, so slugs must be unique too
        let mut seen = HashSet::new();
        for adapter in &adapters {
            if !seen.insert(provider_slug(adapter.name())) {
                return Err(ConfigError::DuplicateProvider(adapter.name().to_string()));
            }
        }

        let dispatcher = match config.max_concurrent_providers {
            Some(limit) => ProviderQueryDispatcher::with_concurrency_limit(limit),
            None => ProviderQueryDispatcher::new(),
        };

        Ok(Self {
            normalizer: DealNormalizer::new(config.currency.clone()),
            ranker: DealRanker::new(),
            insights: InsightsCompiler::new(knowledge),
            dispatcher,
            adapters,
            config,
        })
    }

    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.adapters.iter().map(|a| a.name())
    }

    pub fn popular_destinations(&self) -> Vec<PopularDestination> {
        self.insights.popular_destinations()
    }

    pub fn deal_alerts(&self) -> Vec<DealAlert> {
        self.insights.deal_alerts()
    }

    pub async fn search_request(&self, request: SearchRequest) -> Result<SearchResult, SearchError> {
        let params = SearchParameters::try_from(request)?;
        self.search(&params).await
    }

    pub async fn search(&self, params: &SearchParameters) -> Result<SearchResult, SearchError> {
        match self.config.request_timeout() {
            Some(limit) => tokio::time::timeout(limit, self.run(params))
                .await
                .map_err(|_| {
                    tracing::warn!(
                        destination = %params.destination(),
                        after_ms = limit.as_millis() as u64,
                        "search abandoned"
                    );
                    SearchError::RequestTimeout {
                        after_ms: limit.as_millis() as u64,
                    }
                })?,
            None => self.run(params).await,
        }
    }

    async fn run(&self, params: &SearchParameters) -> Result<SearchResult, SearchError> {
        let mut state = AggregationState::Collecting;
        tracing::debug!(state = %state, key = %params.cache_key(), "search started");

        let outcome = self
            .dispatcher
            .dispatch(params, &self.adapters, self.config.provider_timeout())
            .await;

        if outcome.results.is_empty() {
            state = AggregationState::Failed;
            tracing::warn!(
                state = %state,
                failed = outcome.failures.len(),
                "no provider returned results"
            );
            return Err(SearchError::NoResults {
                failures: outcome.failures,
            });
        }

        state = advance(state);
        let mut deals = Vec::new();
        let mut rejected_records = Vec::new();
        let mut dropped_counts = BTreeMap::new();
        for (provider, payload) in &outcome.results {
            let normalized = self.normalizer.normalize(provider, payload);
            dropped_counts.insert(provider.clone(), normalized.rejections.len());
            deals.extend(normalized.deals);
            rejected_records.extend(normalized.rejections);
        }

        let band = self
            .config
            .budget_bands
            .band_for(params.kind(), params.budget_tier());
        let before = deals.len();
        deals.retain(|deal: &Deal| {
            band.contains(deal.price.amount)
                && params.max_budget().map_or(true, |max| deal.price.amount <= max)
        });
        let filtered_by_budget = before - deals.len();

        state = advance(state);
        let deals = self.ranker.rank(deals);

        state = advance(state);
        let insights = match self.insights.compile(params.destination()) {
            Ok(insights) => Some(insights),
            Err(e) => {
                tracing::debug!(error = %e, "continuing without insights");
                None
            }
        };

        state = advance(state);
        let failed_providers: BTreeSet<String> = outcome
            .failures
            .iter()
            .map(|f| f.provider.clone())
            .collect();

        tracing::info!(
            destination = %params.destination(),
            deals = deals.len(),
            providers = outcome.results.len(),
            failed = failed_providers.len(),
            rejected = rejected_records.len(),
            filtered = filtered_by_budget,
            "search complete"
        );

        Ok(SearchResult {
            status: state,
            deals,
            insights,
            partial: !failed_providers.is_empty(),
            failed_providers,
            failures: outcome.failures,
            rejected_records,
            dropped_counts,
            filtered_by_budget,
        })
    }
}

fn advance(state: AggregationState) -> AggregationState {
    let next = state.next();
    tracing::debug!(from = %state, to = %next, "aggregation state");
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::AdapterError;
    use crate::insights::StaticDestinationKnowledge;
    use crate::mock_providers::{
        fare, fare_quotes, hotel, hotel_rates, paris_flight, paris_hotel, rate, Behaviour,
        ScriptedAdapter,
    };
    use crate::search_params::{BudgetTier, TripKind};
    use chrono::NaiveDate;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    fn aggregator(adapters: Vec<Arc<dyn ProviderAdapter>>) -> ResultAggregator {
        aggregator_with(EngineConfig::default(), adapters)
    }

    fn aggregator_with(
        config: EngineConfig,
        adapters: Vec<Arc<dyn ProviderAdapter>>,
    ) -> ResultAggregator {
        ResultAggregator::new(
            config,
            adapters,
            Arc::new(StaticDestinationKnowledge::default()),
        )
        .unwrap()
    }

    fn single_fare(name: &str, price: f64, original: f64, rating: f64) -> Arc<dyn ProviderAdapter> {
        let params = paris_flight();
        ScriptedAdapter::flight(
            name,
            Behaviour::Payload(fare_quotes(
                "USD",
                vec![fare(
                    &format!("{}-1", name),
                    &format!("{} fare", name),
                    price,
                    original,
                    rating,
                    &params,
                )],
            )),
        )
        .into_dyn()
    }

    fn failing(name: &str) -> Arc<dyn ProviderAdapter> {
        ScriptedAdapter::flight(
            name,
            Behaviour::Fail(AdapterError::Unavailable("connection refused".to_string())),
        )
        .into_dyn()
    }

    fn to(destination: &str) -> SearchParameters {
        let date = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        SearchParameters::builder(TripKind::Flight)
            .origin("NYC")
            .destination(destination)
            .dates(date("2025-07-15"), date("2025-07-22"))
            .party_size(2)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_paris_example_ranking() {
        let engine = aggregator(vec![
            single_fare("Expedia", 520.0, 750.0, 4.3),
            single_fare("Skyscanner", 450.0, 680.0, 4.5),
        ]);

        let result = assert_ok!(engine.search(&paris_flight()).await);
        assert_eq!(result.status, AggregationState::Done);
        assert!(!result.partial);
        assert_eq!(result.deals.len(), 2);
        assert_eq!(result.deals[0].price.amount, 450.0);
        assert_eq!(result.deals[0].provider, "Skyscanner");
        assert_eq!(result.deals[1].price.amount, 520.0);
        assert!(result.insights.is_some());

        for deal in &result.deals {
            assert!(deal.price.amount <= deal.original_price.amount);
            assert_eq!(deal.savings_amount, deal.original_price.amount - deal.price.amount);
            assert!((0.0..=5.0).contains(&deal.rating));
        }
    }

    #[tokio::test]
    async fn test_partial_results() {
        let mut config = EngineConfig::default();
        config.provider_timeout_ms = 50;
        let engine = aggregator_with(
            config,
            vec![
                single_fare("Skyscanner", 450.0, 680.0, 4.5),
                failing("Kayak"),
                single_fare("Expedia", 520.0, 750.0, 4.3),
                ScriptedAdapter::flight("Slow", Behaviour::Delay(Duration::from_secs(10)))
                    .into_dyn(),
            ],
        );

        let result = assert_ok!(engine.search(&paris_flight()).await);
        assert_eq!(result.status, AggregationState::Done);
        assert!(result.partial);
        assert_eq!(result.deals.len(), 2);
        assert_eq!(
            result.failed_providers,
            ["Kayak", "Slow"].iter().map(|s| s.to_string()).collect()
        );
        assert!(result.failures.iter().any(|f| f.is_timeout()));
    }

    #[tokio::test]
    async fn test_all_providers_failing_is_no_results() {
        let engine = aggregator(vec![failing("Kayak"), failing("Expedia")]);

        let error = assert_err!(engine.search(&paris_flight()).await);
        match error {
            SearchError::NoResults { failures } => {
                let providers: Vec<_> = failures.iter().map(|f| f.provider.as_str()).collect();
                assert_eq!(providers, vec!["Kayak", "Expedia"]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_destination_degrades_insights() {
        let engine = aggregator(vec![ScriptedAdapter::flight("Skyscanner", Behaviour::Respond).into_dyn()]);

        let result = assert_ok!(engine.search(&to("Atlantis")).await);
        assert_eq!(result.status, AggregationState::Done);
        assert!(result.insights.is_none());
        assert_eq!(result.deals.len(), 1);
    }

    #[tokio::test]
    async fn test_zero_deals_is_not_an_error() {
        let engine = aggregator(vec![ScriptedAdapter::flight(
            "Skyscanner",
            Behaviour::Payload(fare_quotes("USD", vec![])),
        )
        .into_dyn()]);

        let result = assert_ok!(engine.search(&paris_flight()).await);
        assert!(result.deals.is_empty());
        assert!(!result.partial);
        assert_eq!(result.summary().best_savings, None);
    }

    #[tokio::test]
    async fn test_rejected_records_do_not_mark_partial() {
        let params = paris_flight();
        let engine = aggregator(vec![ScriptedAdapter::flight(
            "Skyscanner",
            Behaviour::Payload(fare_quotes(
                "USD",
                vec![
                    fare("OK", "Good", 450.0, 680.0, 4.5, &params),
                    fare("BAD", "Inverted", 900.0, 680.0, 4.5, &params),
                ],
            )),
        )
        .into_dyn()]);

        let result = assert_ok!(engine.search(&params).await);
        assert!(!result.partial);
        assert_eq!(result.deals.len(), 1);
        assert_eq!(result.rejected_records.len(), 1);
        assert_eq!(result.dropped_counts.get("Skyscanner"), Some(&1));
    }

    #[tokio::test]
    async fn test_hotel_search_only_queries_hotel_providers() {
        let flight = ScriptedAdapter::flight("Skyscanner", Behaviour::Respond);
        let flight_calls = flight.calls();
        let params = paris_hotel();
        let engine = aggregator(vec![
            flight.into_dyn(),
            ScriptedAdapter::hotel(
                "Booking.com",
                Behaviour::Payload(hotel_rates(
                    "USD",
                    &params,
                    vec![hotel(
                        "BK-1",
                        "Luxury Hotel in Paris",
                        4.7,
                        vec![rate("R1", 200.0, 280.0, &[]), rate("R2", 180.0, 280.0, &["weekend-special"])],
                    )],
                )),
            )
            .into_dyn(),
        ]);

        let result = assert_ok!(engine.search(&params).await);
        assert_eq!(flight_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        // Two rates of the same hotel collapse to the cheaper one
        assert_eq!(result.deals.len(), 1);
        assert_eq!(result.deals[0].price.amount, 180.0);
        assert!(result.failed_providers.is_empty());
    }

    #[tokio::test]
    async fn test_budget_tier_filters_deals() {
        let engine = aggregator(vec![
            single_fare("Skyscanner", 450.0, 680.0, 4.5),
            single_fare("Kayak", 680.0, 950.0, 4.7),
        ]);

        let date = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        let budget = SearchParameters::builder(TripKind::Flight)
            .origin("NYC")
            .destination("Paris")
            .dates(date("2025-07-15"), date("2025-07-22"))
            .budget_tier(BudgetTier::Budget)
            .build()
            .unwrap();
        let result = assert_ok!(engine.search(&budget).await);
        assert_eq!(result.deals.len(), 1);
        assert_eq!(result.deals[0].provider, "Skyscanner");
        assert_eq!(result.filtered_by_budget, 1);

        let capped = SearchParameters::builder(TripKind::Flight)
            .origin("NYC")
            .destination("Paris")
            .dates(date("2025-07-15"), date("2025-07-22"))
            .max_budget(400.0)
            .build()
            .unwrap();
        let result = assert_ok!(engine.search(&capped).await);
        assert!(result.deals.is_empty());
        assert_eq!(result.filtered_by_budget, 2);
    }

    #[tokio::test]
    async fn test_duplicate_providers_are_rejected() {
        let result = ResultAggregator::new(
            EngineConfig::default(),
            vec![failing("Kayak"), failing("kayak")],
            Arc::new(StaticDestinationKnowledge::default()),
        );
        assert!(matches!(result, Err(ConfigError::DuplicateProvider(name)) if name == "kayak"));
    }

    #[tokio::test]
    async fn test_search_request_validation() {
        let engine = aggregator(vec![failing("Kayak")]);
        let request = SearchRequest {
            kind: Some(TripKind::Flight),
            origin: Some("  ".to_string()),
            destination: Some("Paris".to_string()),
            departure_date: Some("2025-07-15".to_string()),
            return_date: Some("2025-07-22".to_string()),
            ..SearchRequest::default()
        };

        let error = assert_err!(engine.search_request(request).await);
        assert_eq!(error, SearchError::Validation(ValidationError::MissingField("origin")));
    }

    #[tokio::test]
    async fn test_request_timeout_wraps_search() {
        let mut config = EngineConfig::default();
        config.request_timeout_ms = Some(30);
        let engine = aggregator_with(
            config,
            vec![ScriptedAdapter::flight("Slow", Behaviour::Delay(Duration::from_secs(5))).into_dyn()],
        );

        let error = assert_err!(engine.search(&paris_flight()).await);
        assert_eq!(error, SearchError::RequestTimeout { after_ms: 30 });
    }

    #[tokio::test]
    async fn test_order_does_not_depend_on_arrival() {
        let params = paris_flight();
        let delayed = |name: &str, delay_ms: u64| {
            // Delay returns the default payload: 450/680 with a per-provider title
            ScriptedAdapter::flight(name, Behaviour::Delay(Duration::from_millis(delay_ms))).into_dyn()
        };

        let fast_first = aggregator(vec![delayed("A", 1), delayed("B", 40), delayed("C", 20)]);
        let slow_first = aggregator(vec![delayed("A", 40), delayed("B", 1), delayed("C", 20)]);

        let first = assert_ok!(fast_first.search(&params).await);
        let second = assert_ok!(slow_first.search(&params).await);
        let ids = |r: &SearchResult| r.deals.iter().map(|d| d.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
        assert_eq!(ids(&first), vec!["a-0-A-1", "b-0-B-1", "c-0-C-1"]);
    }

    #[test]
    fn test_state_machine_is_linear() {
        let mut state = AggregationState::Collecting;
        let mut visited = vec![state];
        while !state.is_terminal() {
            state = state.next();
            visited.push(state);
        }
        assert_eq!(
            visited,
            vec![
                AggregationState::Collecting,
                AggregationState::Normalizing,
                AggregationState::Ranking,
                AggregationState::Compiling,
                AggregationState::Done,
            ]
        );
        assert_eq!(AggregationState::Failed.next(), AggregationState::Failed);
    }

    #[test]
    fn test_summary() {
        use crate::deal::fixtures::flight_deal;

        let result = SearchResult {
            status: AggregationState::Done,
            deals: vec![
                flight_deal("a", "P1", 450.0, 680.0, 4.5),
                flight_deal("b", "P2", 520.0, 750.0, 4.3),
            ],
            insights: None,
            partial: false,
            failed_providers: BTreeSet::new(),
            failures: vec![],
            rejected_records: vec![],
            dropped_counts: BTreeMap::new(),
            filtered_by_budget: 0,
        };

        let summary = result.summary();
        assert_eq!(summary.deals_found, 2);
        assert_eq!(summary.best_savings, Some(34));
        assert_eq!(summary.average_savings, 32.5);
    }
}
