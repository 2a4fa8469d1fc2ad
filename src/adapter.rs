// Provider adapter capability
// One adapter per travel-data source. The engine only ever sees this trait;
// transport, authentication and retry policy live behind it.

use async_trait::async_trait;
use thiserror::Error;

use crate::search_params::{SearchParameters, TripKind};
use crate::supplier::RawPayload;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdapterError {
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Provider returned status {status_code}: {message}")]
    Status { status_code: u16, message: String },

    #[error("Malformed provider payload: {0}")]
    Malformed(String),

    #[error("Provider call cancelled")]
    Cancelled,
}

impl AdapterError {
    // Transient conditions worth another attempt inside the adapter
    pub fn is_retryable(&self) -> bool {
        match self {
            AdapterError::Unavailable(_) => true,
            AdapterError::Status { status_code, .. } => {
                *status_code == 429 || (500..600).contains(status_code)
            }
            AdapterError::Malformed(_) | AdapterError::Cancelled => false,
        }
    }
}

#[async_trait]
pub trait ProviderAdapter: Send + Sync + 'static {
    // Display name of the source; also the key used in failed_providers
    fn name(&self) -> &str;

    // Which kind of search this adapter can answer
    fn kind(&self) -> TripKind;

    // Query the source. Dropping the returned future must be safe at any
    // await point: that is how an abandoned search releases the adapter.
    async fn search(&self, params: &SearchParameters) -> Result<RawPayload, AdapterError>;
}
