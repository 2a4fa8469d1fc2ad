// Raw provider payloads
// Every known provider response shape is one variant of RawPayload; the
// normalizer owns one explicit mapping per variant.

use serde::{Deserialize, Serialize};

use crate::search_params::TripKind;
use crate::xml_response::XmlAvailResponse;

#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    FareQuotes(FareQuoteResponse),
    FlightOffers(FlightOfferResponse),
    HotelRates(HotelRateResponse),
    HotelAvailability(XmlAvailResponse),
}

impl RawPayload {
    pub fn kind(&self) -> TripKind {
        match self {
            RawPayload::FareQuotes(_) | RawPayload::FlightOffers(_) => TripKind::Flight,
            RawPayload::HotelRates(_) | RawPayload::HotelAvailability(_) => TripKind::Hotel,
        }
    }

    pub fn record_count(&self) -> usize {
        match self {
            RawPayload::FareQuotes(r) => r.fares.len(),
            RawPayload::FlightOffers(r) => r.offers.len(),
            RawPayload::HotelRates(r) => r.hotels.iter().map(|h| h.rates.len()).sum(),
            RawPayload::HotelAvailability(r) => r
                .hotels
                .hotels
                .iter()
                .flat_map(|h| h.meal_plans.meal_plans.iter())
                .map(|mp| mp.options.options.len())
                .sum(),
        }
    }
}

// Fare quote feed: major-unit prices, human readable durations ("8h 30m")
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FareQuoteResponse {
    pub currency: String,
    pub fares: Vec<FareQuote>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FareQuote {
    pub fare_id: String,
    pub title: String,
    pub price: f64,
    pub original_price: f64,
    pub rating: f64,
    pub outbound_date: String,
    pub inbound_date: String,
    pub duration: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

// Flight offer feed: minor-unit prices, integer minutes, 0-10 review score
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightOfferResponse {
    pub offers: Vec<FlightOffer>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightOffer {
    pub offer_ref: String,
    pub headline: String,
    pub currency_code: String,
    pub amount_cents: i64,
    pub was_amount_cents: i64,
    pub review_score: f64,
    pub depart_on: String,
    pub return_on: String,
    pub duration_minutes: u32,
    pub promo: Option<String>,
}

// Hotel rate sheet: one entry per hotel, per-night rates, stay dates on the response
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HotelRateResponse {
    pub search_id: String,
    pub currency: String,
    pub check_in: String,
    pub check_out: String,
    pub hotels: Vec<SupplierHotel>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SupplierHotel {
    pub hotel_id: String,
    pub name: String,
    pub guest_rating: f64,
    #[serde(default)]
    pub amenities: Vec<String>,
    pub rates: Vec<SupplierRate>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SupplierRate {
    pub rate_id: String,
    pub board_type: String,
    pub nightly_price: f64,
    pub rack_rate: f64,
    #[serde(default)]
    pub deal_tags: Vec<String>,
}
