// Canonical deal model shared by every provider after normalization

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use crate::search_params::DATE_FORMAT;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Money {
    pub amount: f64,
    pub currency: String,
}

impl Money {
    pub fn new(amount: f64, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {}", self.amount, self.currency)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn nights(&self) -> u32 {
        (self.end - self.start).num_days().max(0) as u32
    }
}

// Rendered the way the original result cards show it: "2025-07-15 - 2025-07-22"
impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            self.start.format(DATE_FORMAT),
            self.end.format(DATE_FORMAT)
        )
    }
}

impl Serialize for DateRange {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DealCategory {
    FlashSale,
    EarlyBird,
    Premium,
    WeekendSpecial,
    LastMinute,
    Standard,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DealDetails {
    #[serde(rename_all = "camelCase")]
    Flight { duration_minutes: u32 },
    #[serde(rename_all = "camelCase")]
    Hotel {
        amenities: BTreeSet<String>,
        nights: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub id: String,
    pub title: String,
    pub price: Money,
    pub original_price: Money,
    pub savings_amount: f64,
    pub savings_percent: u32,
    pub provider: String,
    pub rating: f64,
    pub date_range: DateRange,
    pub category: DealCategory,
    pub details: DealDetails,
}

impl Deal {
    // Savings are always derived here so they can never disagree with the prices.
    // Callers must have checked price <= original_price already.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: String,
        title: String,
        price: Money,
        original_price: Money,
        provider: String,
        rating: f64,
        date_range: DateRange,
        category: DealCategory,
        details: DealDetails,
    ) -> Self {
        let savings_amount = original_price.amount - price.amount;
        let savings_percent = if original_price.amount > 0.0 {
            (savings_amount / original_price.amount * 100.0).round() as u32
        } else {
            0
        };

        Self {
            id,
            title,
            price,
            original_price,
            savings_amount,
            savings_percent,
            provider,
            rating,
            date_range,
            category,
            details,
        }
    }

    /// Savings over the whole stay for hotel deals (priced per night),
    /// or the plain savings amount for flights.
    pub fn stay_savings(&self) -> f64 {
        match &self.details {
            DealDetails::Hotel { nights, .. } => self.savings_amount * (*nights).max(1) as f64,
            DealDetails::Flight { .. } => self.savings_amount,
        }
    }

    pub fn duration_minutes(&self) -> Option<u32> {
        match self.details {
            DealDetails::Flight { duration_minutes } => Some(duration_minutes),
            DealDetails::Hotel { .. } => None,
        }
    }

    pub fn amenities(&self) -> Option<&BTreeSet<String>> {
        match &self.details {
            DealDetails::Hotel { amenities, .. } => Some(amenities),
            DealDetails::Flight { .. } => None,
        }
    }
}
