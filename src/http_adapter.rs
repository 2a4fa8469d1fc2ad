// HTTP provider adapter
// Talks to a provider's search endpoint over HTTP and decodes the body into
// the matching RawPayload variant. Retries live here, never in the dispatcher.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::time::sleep;

use crate::adapter::{AdapterError, ProviderAdapter};
use crate::config::ConfigError;
use crate::search_params::{SearchParameters, TripKind, DATE_FORMAT};
use crate::supplier::RawPayload;
use crate::xml_response::XmlAvailResponse;

// Wire format the provider answers in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadFormat {
    FareQuotesJson,
    FlightOffersJson,
    HotelRatesJson,
    HotelAvailXml,
}

impl PayloadFormat {
    pub fn kind(&self) -> TripKind {
        match self {
            PayloadFormat::FareQuotesJson | PayloadFormat::FlightOffersJson => TripKind::Flight,
            PayloadFormat::HotelRatesJson | PayloadFormat::HotelAvailXml => TripKind::Hotel,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpProviderConfig {
    pub name: String,
    pub base_url: String,
    pub api_key: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    pub format: PayloadFormat,
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_timeout_ms() -> u64 {
    2000
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct AdapterStats {
    pub requests_sent: usize,
    pub requests_succeeded: usize,
    pub requests_failed: usize,
    pub requests_retried: usize,
    pub average_response_time_ms: f64,
}

pub struct HttpProviderAdapter {
    config: HttpProviderConfig,
    client: reqwest::Client,
    stats: Mutex<AdapterStats>,
}

impl HttpProviderAdapter {
    pub fn new(config: HttpProviderConfig) -> Result<Self, ConfigError> {
        if config.name.trim().is_empty() {
            return Err(ConfigError::Invalid("provider name must not be empty".to_string()));
        }
        if !(config.base_url.starts_with("http://") || config.base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "base_url for {} must be an http(s) URL, got {:?}",
                config.name, config.base_url
            )));
        }
        if config.timeout_ms == 0 {
            return Err(ConfigError::Invalid(format!(
                "timeout_ms for {} must be greater than zero",
                config.name
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ConfigError::Invalid(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            client,
            stats: Mutex::new(AdapterStats::default()),
        })
    }

    pub fn stats(&self) -> AdapterStats {
        self.stats.lock().clone()
    }

    pub fn search_url(&self) -> String {
        format!("{}/search", self.config.base_url.trim_end_matches('/'))
    }

    async fn fetch(&self, params: &SearchParameters) -> Result<RawPayload, AdapterError> {
        let started = Instant::now();
        self.stats.lock().requests_sent += 1;

        let result = self.fetch_once(params).await;

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        let mut stats = self.stats.lock();
        match &result {
            Ok(_) => stats.requests_succeeded += 1,
            Err(_) => stats.requests_failed += 1,
        }
        let settled = (stats.requests_succeeded + stats.requests_failed) as f64;
        stats.average_response_time_ms += (elapsed_ms - stats.average_response_time_ms) / settled;

        result
    }

    async fn fetch_once(&self, params: &SearchParameters) -> Result<RawPayload, AdapterError> {
        let response = self
            .client
            .get(self.search_url())
            .header("X-Api-Key", &self.config.api_key)
            .query(&query_pairs(params))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body: Bytes = response.bytes().await.map_err(transport_error)?;

        if !status.is_success() {
            return Err(AdapterError::Status {
                status_code: status.as_u16(),
                message: String::from_utf8_lossy(&body).trim().to_string(),
            });
        }

        decode(self.config.format, &body)
    }
}

#[async_trait]
impl ProviderAdapter for HttpProviderAdapter {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn kind(&self) -> TripKind {
        self.config.format.kind()
    }

    async fn search(&self, params: &SearchParameters) -> Result<RawPayload, AdapterError> {
        let mut attempt = 0;
        loop {
            match self.fetch(params).await {
                Ok(payload) => return Ok(payload),
                Err(e) if e.is_retryable() && attempt < self.config.retry.max_retries => {
                    let backoff = calculate_backoff(attempt, &self.config.retry);
                    tracing::warn!(
                        provider = %self.config.name,
                        attempt = attempt + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "retrying provider request"
                    );
                    self.stats.lock().requests_retried += 1;
                    sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

pub fn query_pairs(params: &SearchParameters) -> Vec<(&'static str, String)> {
    let mut pairs = vec![("kind", params.kind().to_string())];
    if let Some(origin) = params.origin() {
        pairs.push(("origin", origin.to_string()));
    }
    pairs.push(("destination", params.destination().to_string()));
    pairs.push((
        "departureDate",
        params.departure_date().format(DATE_FORMAT).to_string(),
    ));
    pairs.push((
        "returnDate",
        params.return_date().format(DATE_FORMAT).to_string(),
    ));
    pairs.push(("partySize", params.party_size().to_string()));
    if let Some(max_budget) = params.max_budget() {
        pairs.push(("maxBudget", max_budget.to_string()));
    }
    pairs
}

pub fn decode(format: PayloadFormat, body: &[u8]) -> Result<RawPayload, AdapterError> {
    match format {
        PayloadFormat::FareQuotesJson => serde_json::from_slice(body)
            .map(RawPayload::FareQuotes)
            .map_err(malformed),
        PayloadFormat::FlightOffersJson => serde_json::from_slice(body)
            .map(RawPayload::FlightOffers)
            .map_err(malformed),
        PayloadFormat::HotelRatesJson => serde_json::from_slice(body)
            .map(RawPayload::HotelRates)
            .map_err(malformed),
        PayloadFormat::HotelAvailXml => {
            let xml = std::str::from_utf8(body).map_err(malformed)?;
            XmlAvailResponse::from_xml(xml)
                .map(RawPayload::HotelAvailability)
                .map_err(malformed)
        }
    }
}

fn malformed(e: impl std::fmt::Display) -> AdapterError {
    AdapterError::Malformed(e.to_string())
}

fn transport_error(e: reqwest::Error) -> AdapterError {
    if e.is_timeout() {
        AdapterError::Unavailable("request timed out".to_string())
    } else {
        AdapterError::Unavailable(e.to_string())
    }
}

pub fn calculate_backoff(retry_attempt: u32, config: &RetryConfig) -> Duration {
    let base_backoff_ms = (config.initial_backoff_ms as f64
        * config.backoff_multiplier.powf(retry_attempt as f64))
    .min(config.max_backoff_ms as f64);

    // Spread retries from many callers
    let jitter = rand::random::<f64>() * config.jitter_factor * base_backoff_ms;
    let backoff_ms = base_backoff_ms * (1.0 - config.jitter_factor / 2.0) + jitter;

    Duration::from_millis(backoff_ms as u64)
}
