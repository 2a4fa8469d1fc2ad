// Deal normalizer
// Maps every provider payload variant onto the canonical Deal. Records are
// validated one by one: a bad record is dropped and reported, the rest of the
// batch carries on.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;

use crate::config::CurrencyConfig;
use crate::deal::{DateRange, Deal, DealCategory, DealDetails, Money};
use crate::search_params::DATE_FORMAT;
use crate::supplier::{FareQuoteResponse, FlightOfferResponse, HotelRateResponse, RawPayload};
use crate::xml_response::XmlAvailResponse;

#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RejectReason {
    #[error("price {price} exceeds original price {original_price}")]
    PriceAboveOriginal { price: f64, original_price: f64 },

    #[error("invalid amount: {value}")]
    InvalidAmount { value: String },

    #[error("rating {rating} outside 0-5")]
    RatingOutOfRange { rating: f64 },

    #[error("invalid rating: {value}")]
    InvalidRating { value: String },

    #[error("invalid duration: {value}")]
    InvalidDuration { value: String },

    #[error("missing title")]
    MissingTitle,

    #[error("invalid dates: {value}")]
    InvalidDates { value: String },

    #[error("unknown currency: {currency}")]
    UnknownCurrency { currency: String },
}

#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[error("{provider} record {record_ref}: {reason}")]
pub struct RecordRejection {
    pub provider: String,
    pub record_ref: String,
    pub reason: RejectReason,
}

#[derive(Debug, Default)]
pub struct Normalized {
    pub deals: Vec<Deal>,
    pub rejections: Vec<RecordRejection>,
}

// Provider tag -> category. Tags are compared after lowercasing and turning
// '_' and ' ' into '-'; the first tag found here wins.
const CATEGORY_TAGS: &[(&str, DealCategory)] = &[
    ("flash-sale", DealCategory::FlashSale),
    ("early-bird", DealCategory::EarlyBird),
    ("premium", DealCategory::Premium),
    ("weekend-special", DealCategory::WeekendSpecial),
    ("last-minute", DealCategory::LastMinute),
    ("standard", DealCategory::Standard),
];

pub fn category_from_tags<'a>(tags: impl IntoIterator<Item = &'a str>) -> DealCategory {
    tags.into_iter()
        .find_map(|tag| {
            let tag = tag.trim().to_lowercase().replace(['_', ' '], "-");
            CATEGORY_TAGS
                .iter()
                .find(|(known, _)| *known == tag)
                .map(|(_, category)| *category)
        })
        .unwrap_or(DealCategory::Standard)
}

// Parses "8h 30m", "8h30m", "7h" or "45m" into minutes
pub fn parse_duration_minutes(value: &str) -> Option<u32> {
    let mut total: u32 = 0;
    let mut digits = String::new();
    let mut saw_unit = false;

    for c in value.chars().filter(|c| !c.is_whitespace()) {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let amount: u32 = digits.parse().ok()?;
        digits.clear();
        let minutes = match c.to_ascii_lowercase() {
            'h' => amount.checked_mul(60)?,
            'm' => amount,
            _ => return None,
        };
        total = total.checked_add(minutes)?;
        saw_unit = true;
    }

    if !digits.is_empty() || !saw_unit || total == 0 {
        return None;
    }
    Some(total)
}

// Provider record mapped onto canonical field names, not yet validated
struct Candidate {
    record_ref: String,
    title: String,
    price: f64,
    original_price: f64,
    currency: String,
    rating: f64,
    dates: Result<DateRange, String>,
    category: DealCategory,
    details: Result<DealDetails, RejectReason>,
}

#[derive(Debug, Clone)]
pub struct DealNormalizer {
    currency: CurrencyConfig,
}

impl DealNormalizer {
    pub fn new(currency: CurrencyConfig) -> Self {
        Self { currency }
    }

    pub fn display_currency(&self) -> &str {
        &self.currency.display
    }

    pub fn normalize(&self, provider: &str, payload: &RawPayload) -> Normalized {
        let candidates = match payload {
            RawPayload::FareQuotes(response) => fare_quote_candidates(response),
            RawPayload::FlightOffers(response) => flight_offer_candidates(response),
            RawPayload::HotelRates(response) => hotel_rate_candidates(response),
            RawPayload::HotelAvailability(response) => availability_candidates(response),
        };

        let slug = provider_slug(provider);
        let mut normalized = Normalized::default();
        for (index, candidate) in candidates.into_iter().enumerate() {
            let (record_ref, outcome) = match candidate {
                Ok(candidate) => (
                    candidate.record_ref.clone(),
                    self.admit(provider, &slug, index, candidate),
                ),
                Err(unmapped) => (unmapped.record_ref, Err(unmapped.reason)),
            };
            match outcome {
                Ok(deal) => normalized.deals.push(deal),
                Err(reason) => normalized.rejections.push(RecordRejection {
                    provider: provider.to_string(),
                    record_ref,
                    reason,
                }),
            }
        }

        for rejection in &normalized.rejections {
            tracing::warn!(
                provider = %rejection.provider,
                record = %rejection.record_ref,
                reason = %rejection.reason,
                "record rejected"
            );
        }
        normalized
    }

    fn admit(
        &self,
        provider: &str,
        slug: &str,
        index: usize,
        candidate: Candidate,
    ) -> Result<Deal, RejectReason> {
        if candidate.title.trim().is_empty() {
            return Err(RejectReason::MissingTitle);
        }
        for amount in [candidate.price, candidate.original_price] {
            if !amount.is_finite() || amount < 0.0 {
                return Err(RejectReason::InvalidAmount {
                    value: amount.to_string(),
                });
            }
        }
        if candidate.price > candidate.original_price {
            return Err(RejectReason::PriceAboveOriginal {
                price: candidate.price,
                original_price: candidate.original_price,
            });
        }
        if !(0.0..=5.0).contains(&candidate.rating) {
            return Err(RejectReason::RatingOutOfRange {
                rating: candidate.rating,
            });
        }
        let date_range = candidate
            .dates
            .map_err(|value| RejectReason::InvalidDates { value })?;
        let details = candidate.details?;

        let rate = self
            .currency
            .rate_for(&candidate.currency)
            .ok_or_else(|| RejectReason::UnknownCurrency {
                currency: candidate.currency.clone(),
            })?;
        let display = self.currency.display.clone();

        Ok(Deal::new(
            format!("{}-{}-{}", slug, index, candidate.record_ref),
            candidate.title.trim().to_string(),
            Money::new(to_cents(candidate.price * rate), display.clone()),
            Money::new(to_cents(candidate.original_price * rate), display),
            provider.to_string(),
            candidate.rating,
            date_range,
            candidate.category,
            details,
        ))
    }
}

fn fare_quote_candidates(response: &FareQuoteResponse) -> Vec<Result<Candidate, Unmapped>> {
    response
        .fares
        .iter()
        .map(|fare| {
            Ok(Candidate {
                record_ref: fare.fare_id.clone(),
                title: fare.title.clone(),
                price: fare.price,
                original_price: fare.original_price,
                currency: response.currency.clone(),
                rating: fare.rating,
                dates: date_range(&fare.outbound_date, &fare.inbound_date),
                category: category_from_tags(fare.tags.iter().map(String::as_str)),
                details: parse_duration_minutes(&fare.duration)
                    .map(|duration_minutes| DealDetails::Flight { duration_minutes })
                    .ok_or_else(|| RejectReason::InvalidDuration {
                        value: fare.duration.clone(),
                    }),
            })
        })
        .collect()
}

fn flight_offer_candidates(response: &FlightOfferResponse) -> Vec<Result<Candidate, Unmapped>> {
    response
        .offers
        .iter()
        .map(|offer| {
            Ok(Candidate {
                record_ref: offer.offer_ref.clone(),
                title: offer.headline.clone(),
                price: offer.amount_cents as f64 / 100.0,
                original_price: offer.was_amount_cents as f64 / 100.0,
                currency: offer.currency_code.clone(),
                // Reviews are scored out of ten
                rating: offer.review_score / 2.0,
                dates: date_range(&offer.depart_on, &offer.return_on),
                category: category_from_tags(offer.promo.as_deref()),
                details: if offer.duration_minutes > 0 {
                    Ok(DealDetails::Flight {
                        duration_minutes: offer.duration_minutes,
                    })
                } else {
                    Err(RejectReason::InvalidDuration {
                        value: offer.duration_minutes.to_string(),
                    })
                },
            })
        })
        .collect()
}

fn hotel_rate_candidates(response: &HotelRateResponse) -> Vec<Result<Candidate, Unmapped>> {
    let dates = date_range(&response.check_in, &response.check_out);
    let mut candidates = Vec::new();
    for hotel in &response.hotels {
        let amenities = amenity_set(hotel.amenities.iter().map(String::as_str));
        for rate in &hotel.rates {
            candidates.push(Ok(Candidate {
                record_ref: format!("{}.{}", hotel.hotel_id, rate.rate_id),
                title: hotel.name.clone(),
                price: rate.nightly_price,
                original_price: rate.rack_rate,
                currency: response.currency.clone(),
                rating: hotel.guest_rating,
                dates: dates.clone(),
                category: category_from_tags(rate.deal_tags.iter().map(String::as_str)),
                details: Ok(hotel_details(&dates, amenities.clone())),
            }));
        }
    }
    candidates
}

fn availability_candidates(response: &XmlAvailResponse) -> Vec<Result<Candidate, Unmapped>> {
    let dates = date_range(&response.check_in, &response.check_out);
    let mut candidates = Vec::new();
    for hotel in &response.hotels.hotels {
        let amenities = amenity_set(hotel.amenities.amenities.iter().map(String::as_str));
        for meal_plan in &hotel.meal_plans.meal_plans {
            for option in &meal_plan.options.options {
                let record_ref = if option.id.is_empty() {
                    format!("{}.{}", hotel.hotel_id, meal_plan.code)
                } else {
                    option.id.clone()
                };
                let parsed = parse_amount(&option.price.amount)
                    .and_then(|price| {
                        parse_amount(&option.price.list_amount).map(|list| (price, list))
                    })
                    .and_then(|(price, list)| {
                        parse_rating(&hotel.rating).map(|rating| (price, list, rating))
                    });

                let (price, original_price, rating) = match parsed {
                    Ok(values) => values,
                    Err(reason) => {
                        candidates.push(Err(Unmapped { record_ref, reason }));
                        continue;
                    }
                };
                let currency = if option.price.currency.is_empty() {
                    response.currency.clone()
                } else {
                    option.price.currency.clone()
                };

                candidates.push(Ok(Candidate {
                    record_ref,
                    title: hotel.hotel_name.clone(),
                    price,
                    original_price,
                    currency,
                    rating,
                    dates: dates.clone(),
                    category: category_from_tags(option.promo.as_deref()),
                    details: Ok(hotel_details(&dates, amenities.clone())),
                }));
            }
        }
    }
    candidates
}

// A record that could not even be mapped onto a candidate
struct Unmapped {
    record_ref: String,
    reason: RejectReason,
}

fn hotel_details(dates: &Result<DateRange, String>, amenities: BTreeSet<String>) -> DealDetails {
    // Bad dates are reported by the date check, nights is irrelevant then
    let nights = dates.as_ref().map(DateRange::nights).unwrap_or(0);
    DealDetails::Hotel { amenities, nights }
}

fn amenity_set<'a>(amenities: impl Iterator<Item = &'a str>) -> BTreeSet<String> {
    amenities
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect()
}

fn date_range(start: &str, end: &str) -> Result<DateRange, String> {
    let start_date = NaiveDate::parse_from_str(start.trim(), DATE_FORMAT)
        .map_err(|_| format!("{} - {}", start, end))?;
    let end_date = NaiveDate::parse_from_str(end.trim(), DATE_FORMAT)
        .map_err(|_| format!("{} - {}", start, end))?;
    if end_date < start_date {
        return Err(format!("{} - {}", start, end));
    }
    Ok(DateRange::new(start_date, end_date))
}

fn parse_amount(value: &str) -> Result<f64, RejectReason> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| RejectReason::InvalidAmount {
            value: value.to_string(),
        })
}

fn parse_rating(value: &str) -> Result<f64, RejectReason> {
    parse_amount(value).map_err(|_| RejectReason::InvalidRating {
        value: value.to_string(),
    })
}

fn to_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

pub fn provider_slug(provider: &str) -> String {
    let slug: String = provider
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    slug.trim_matches('-').to_string()
}
