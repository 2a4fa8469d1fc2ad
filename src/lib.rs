// Travel deal aggregation and insight engine

pub mod adapter;
pub mod aggregator;
pub mod config;
pub mod deal;
pub mod demo_providers;
pub mod dispatcher;
pub mod http_adapter;
pub mod insights;
pub mod normalizer;
pub mod provider_cache;
pub mod ranker;
pub mod search_params;
pub mod supplier;
pub mod xml_response;

#[cfg(test)]
pub mod mock_providers;

// Re-export key types for convenience
pub use adapter::{AdapterError, ProviderAdapter};
pub use aggregator::{AggregationState, ResultAggregator, SearchError, SearchResult, SearchSummary};
pub use config::{BudgetBands, ConfigError, CurrencyConfig, EngineConfig, PriceBand};
pub use deal::{DateRange, Deal, DealCategory, DealDetails, Money};
pub use dispatcher::{DispatchOutcome, FailureKind, ProviderFailure, ProviderQueryDispatcher};
pub use http_adapter::{HttpProviderAdapter, HttpProviderConfig, PayloadFormat, RetryConfig};
pub use insights::{
    DestinationInsights, DestinationKnowledgeSource, DestinationProfile, InsightsCompiler,
    InsightsError, StaticDestinationKnowledge,
};
pub use normalizer::{DealNormalizer, Normalized, RecordRejection, RejectReason};
pub use provider_cache::{CacheConfig, CachedAdapter, EvictionPolicy};
pub use ranker::{ComparisonCriteria, DealComparison, DealRanker};
pub use search_params::{
    BudgetTier, SearchParameters, SearchParametersBuilder, SearchRequest, TripKind,
    ValidationError,
};
pub use supplier::RawPayload;
pub use xml_response::XmlAvailResponse;
