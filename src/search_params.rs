// Trip search parameters
// Validated once at construction; everything downstream reads them immutably

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

// Error types for search parameter validation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Return date {return_date} is before departure date {departure_date}")]
    ReturnBeforeDeparture {
        departure_date: NaiveDate,
        return_date: NaiveDate,
    },

    #[error("Party size must be at least 1, got {0}")]
    InvalidPartySize(u32),

    #[error("Invalid date for {field}: {value}")]
    InvalidDate { field: &'static str, value: String },

    #[error("Invalid budget: {0}")]
    InvalidBudget(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripKind {
    #[serde(alias = "flights")]
    Flight,
    #[serde(alias = "hotels")]
    Hotel,
}

impl fmt::Display for TripKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TripKind::Flight => write!(f, "flight"),
            TripKind::Hotel => write!(f, "hotel"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BudgetTier {
    Budget,
    Standard,
    Premium,
    #[default]
    Any,
}

// Unvalidated search form as collected by the intake wizard
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchRequest {
    pub kind: Option<TripKind>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub departure_date: Option<String>,
    pub return_date: Option<String>,
    pub party_size: Option<u32>,
    pub budget_tier: Option<BudgetTier>,
    pub max_budget: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParameters {
    kind: TripKind,
    origin: Option<String>,
    destination: String,
    departure_date: NaiveDate,
    return_date: NaiveDate,
    party_size: u32,
    budget_tier: BudgetTier,
    max_budget: Option<f64>,
}

impl SearchParameters {
    pub fn builder(kind: TripKind) -> SearchParametersBuilder {
        SearchParametersBuilder::new(kind)
    }

    pub fn kind(&self) -> TripKind {
        self.kind
    }

    // Always Some for flights, always None for hotels
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn departure_date(&self) -> NaiveDate {
        self.departure_date
    }

    pub fn return_date(&self) -> NaiveDate {
        self.return_date
    }

    pub fn party_size(&self) -> u32 {
        self.party_size
    }

    pub fn budget_tier(&self) -> BudgetTier {
        self.budget_tier
    }

    pub fn max_budget(&self) -> Option<f64> {
        self.max_budget
    }

    pub fn nights(&self) -> u32 {
        (self.return_date - self.departure_date).num_days().max(0) as u32
    }

    /// Stable key over every field that can change what a provider returns.
    /// `max_budget` is sent upstream, so it is part of the key; the budget
    /// tier is only applied after normalization.
    pub fn cache_key(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}:{}:{}",
            self.kind,
            self.origin.as_deref().unwrap_or("-").to_lowercase(),
            self.destination.to_lowercase(),
            self.departure_date.format(DATE_FORMAT),
            self.return_date.format(DATE_FORMAT),
            self.party_size,
            self.max_budget
                .map_or_else(|| "-".to_string(), |max| max.to_string())
        )
    }
}

#[derive(Debug, Clone)]
pub struct SearchParametersBuilder {
    kind: TripKind,
    origin: Option<String>,
    destination: Option<String>,
    departure_date: Option<NaiveDate>,
    return_date: Option<NaiveDate>,
    party_size: u32,
    budget_tier: BudgetTier,
    max_budget: Option<f64>,
}

impl SearchParametersBuilder {
    fn new(kind: TripKind) -> Self {
        Self {
            kind,
            origin: None,
            destination: None,
            departure_date: None,
            return_date: None,
            party_size: 1,
            budget_tier: BudgetTier::Any,
            max_budget: None,
        }
    }

    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    pub fn dates(mut self, departure_date: NaiveDate, return_date: NaiveDate) -> Self {
        self.departure_date = Some(departure_date);
        self.return_date = Some(return_date);
        self
    }

    pub fn party_size(mut self, party_size: u32) -> Self {
        self.party_size = party_size;
        self
    }

    pub fn budget_tier(mut self, budget_tier: BudgetTier) -> Self {
        self.budget_tier = budget_tier;
        self
    }

    pub fn max_budget(mut self, max_budget: f64) -> Self {
        self.max_budget = Some(max_budget);
        self
    }

    pub fn build(self) -> Result<SearchParameters, ValidationError> {
        let destination =
            non_blank(self.destination).ok_or(ValidationError::MissingField("destination"))?;

        let origin = match self.kind {
            TripKind::Flight => {
                Some(non_blank(self.origin).ok_or(ValidationError::MissingField("origin"))?)
            }
            TripKind::Hotel => None,
        };

        let departure_date = self
            .departure_date
            .ok_or(ValidationError::MissingField("departureDate"))?;
        let return_date = self
            .return_date
            .ok_or(ValidationError::MissingField("returnDate"))?;
        if return_date < departure_date {
            return Err(ValidationError::ReturnBeforeDeparture {
                departure_date,
                return_date,
            });
        }

        if self.party_size < 1 {
            return Err(ValidationError::InvalidPartySize(self.party_size));
        }

        if let Some(max_budget) = self.max_budget {
            if !max_budget.is_finite() || max_budget <= 0.0 {
                return Err(ValidationError::InvalidBudget(format!(
                    "max budget must be a positive amount, got {}",
                    max_budget
                )));
            }
        }

        Ok(SearchParameters {
            kind: self.kind,
            origin,
            destination,
            departure_date,
            return_date,
            party_size: self.party_size,
            budget_tier: self.budget_tier,
            max_budget: self.max_budget,
        })
    }
}

impl TryFrom<SearchRequest> for SearchParameters {
    type Error = ValidationError;

    fn try_from(request: SearchRequest) -> Result<Self, Self::Error> {
        let kind = request.kind.ok_or(ValidationError::MissingField("kind"))?;
        let departure_date = parse_date("departureDate", request.departure_date)?;
        let return_date = parse_date("returnDate", request.return_date)?;

        let mut builder = SearchParameters::builder(kind)
            .dates(departure_date, return_date)
            .party_size(request.party_size.unwrap_or(1))
            .budget_tier(request.budget_tier.unwrap_or_default());
        if let Some(origin) = request.origin {
            builder = builder.origin(origin);
        }
        if let Some(destination) = request.destination {
            builder = builder.destination(destination);
        }
        if let Some(max_budget) = request.max_budget {
            builder = builder.max_budget(max_budget);
        }
        builder.build()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_date(field: &'static str, value: Option<String>) -> Result<NaiveDate, ValidationError> {
    let raw = non_blank(value).ok_or(ValidationError::MissingField(field))?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT)
        .map_err(|_| ValidationError::InvalidDate { field, value: raw })
}
