// Demo providers
// In-process adapters that answer with the product's sample catalogue after a
// random network-like delay. Each one speaks a different payload shape so the
// whole normalization path is exercised end to end.

use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

use crate::adapter::{AdapterError, ProviderAdapter};
use crate::search_params::{SearchParameters, TripKind, DATE_FORMAT};
use crate::supplier::{
    FareQuote, FareQuoteResponse, FlightOffer, FlightOfferResponse, HotelRateResponse,
    RawPayload, SupplierHotel, SupplierRate,
};
use crate::xml_response::{
    XmlAmenities, XmlAvailResponse, XmlHotel, XmlHotels, XmlMealPlan, XmlMealPlans, XmlOption,
    XmlOptions, XmlPrice,
};

type PayloadBuilder = fn(&SearchParameters) -> Result<RawPayload, AdapterError>;

pub struct StaticProvider {
    name: &'static str,
    kind: TripKind,
    latency_ms: (u64, u64),
    build: PayloadBuilder,
}

impl StaticProvider {
    pub fn new(name: &'static str, kind: TripKind, build: PayloadBuilder) -> Self {
        Self {
            name,
            kind,
            latency_ms: (50, 250),
            build,
        }
    }

    pub fn with_latency(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.latency_ms = (min_ms.min(max_ms), max_ms.max(min_ms));
        self
    }
}

#[async_trait]
impl ProviderAdapter for StaticProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn kind(&self) -> TripKind {
        self.kind
    }

    async fn search(&self, params: &SearchParameters) -> Result<RawPayload, AdapterError> {
        let (min, max) = self.latency_ms;
        let delay = rand::thread_rng().gen_range(min..=max);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        (self.build)(params)
    }
}

pub fn default_adapters() -> Vec<Arc<dyn ProviderAdapter>> {
    vec![
        Arc::new(StaticProvider::new("Skyscanner", TripKind::Flight, skyscanner)),
        Arc::new(StaticProvider::new("Expedia", TripKind::Flight, expedia)),
        Arc::new(StaticProvider::new("Kayak", TripKind::Flight, kayak)),
        Arc::new(StaticProvider::new("Booking.com", TripKind::Hotel, booking)),
        Arc::new(StaticProvider::new("Hotels.com", TripKind::Hotel, hotels_com)),
    ]
}

fn dates(params: &SearchParameters) -> (String, String) {
    (
        params.departure_date().format(DATE_FORMAT).to_string(),
        params.return_date().format(DATE_FORMAT).to_string(),
    )
}

fn origin(params: &SearchParameters) -> &str {
    params.origin().unwrap_or("Anywhere")
}

fn skyscanner(params: &SearchParameters) -> Result<RawPayload, AdapterError> {
    let (outbound_date, inbound_date) = dates(params);
    Ok(RawPayload::FareQuotes(FareQuoteResponse {
        currency: "USD".to_string(),
        fares: vec![FareQuote {
            fare_id: "SK-1".to_string(),
            title: format!("{} to {} Round-trip", origin(params), params.destination()),
            price: 450.0,
            original_price: 680.0,
            rating: 4.5,
            outbound_date,
            inbound_date,
            duration: "8h 30m".to_string(),
            tags: vec!["flash-sale".to_string()],
        }],
    }))
}

#[allow(clippy::too_many_arguments)]
fn flight_offer(
    params: &SearchParameters,
    offer_ref: &str,
    headline: String,
    amount_cents: i64,
    was_amount_cents: i64,
    review_score: f64,
    duration_minutes: u32,
    promo: &str,
) -> FlightOffer {
    let (depart_on, return_on) = dates(params);
    FlightOffer {
        offer_ref: offer_ref.to_string(),
        headline,
        currency_code: "USD".to_string(),
        amount_cents,
        was_amount_cents,
        review_score,
        depart_on,
        return_on,
        duration_minutes,
        promo: Some(promo.to_string()),
    }
}

fn expedia(params: &SearchParameters) -> Result<RawPayload, AdapterError> {
    let headline = format!("Direct Flight {}-{}", origin(params), params.destination());
    Ok(RawPayload::FlightOffers(FlightOfferResponse {
        offers: vec![flight_offer(
            params, "EX-1", headline, 52000, 75000, 8.6, 465, "early_bird",
        )],
    }))
}

fn kayak(params: &SearchParameters) -> Result<RawPayload, AdapterError> {
    let headline = "Premium Economy Special".to_string();
    Ok(RawPayload::FlightOffers(FlightOfferResponse {
        offers: vec![flight_offer(
            params, "KY-1", headline, 68000, 95000, 9.4, 440, "premium",
        )],
    }))
}

fn booking(params: &SearchParameters) -> Result<RawPayload, AdapterError> {
    let (check_in, check_out) = dates(params);
    Ok(RawPayload::HotelRates(HotelRateResponse {
        search_id: format!("BK-{}", rand::random::<u32>()),
        currency: "USD".to_string(),
        check_in,
        check_out,
        hotels: vec![SupplierHotel {
            hotel_id: "BK-1001".to_string(),
            name: format!("Luxury Hotel in {}", params.destination()),
            guest_rating: 4.7,
            amenities: ["WiFi", "Pool", "Spa", "Restaurant"]
                .iter()
                .map(|a| a.to_string())
                .collect(),
            rates: vec![SupplierRate {
                rate_id: "R1".to_string(),
                board_type: "RO".to_string(),
                nightly_price: 180.0,
                rack_rate: 280.0,
                deal_tags: vec!["weekend_special".to_string()],
            }],
        }],
    }))
}

// Goes through a real XML document so the quick-xml path is exercised
fn hotels_com(params: &SearchParameters) -> Result<RawPayload, AdapterError> {
    let (check_in, check_out) = dates(params);
    let response = XmlAvailResponse {
        currency: "USD".to_string(),
        check_in,
        check_out,
        hotels: XmlHotels {
            hotels: vec![XmlHotel {
                hotel_id: "HC-77".to_string(),
                hotel_name: format!("Boutique Hotel {}", params.destination()),
                rating: "4.4".to_string(),
                amenities: XmlAmenities {
                    amenities: ["WiFi", "Breakfast", "Gym"]
                        .iter()
                        .map(|a| a.to_string())
                        .collect(),
                },
                meal_plans: XmlMealPlans {
                    meal_plans: vec![XmlMealPlan {
                        code: "BB".to_string(),
                        options: XmlOptions {
                            options: vec![XmlOption {
                                id: "HC-77-BB-1".to_string(),
                                promo: Some("last-minute".to_string()),
                                price: XmlPrice {
                                    currency: "USD".to_string(),
                                    amount: "145.00".to_string(),
                                    list_amount: "220.00".to_string(),
                                },
                            }],
                        },
                    }],
                },
            }],
        },
    };

    let xml = response
        .to_xml()
        .map_err(|e| AdapterError::Malformed(e.to_string()))?;
    XmlAvailResponse::from_xml(&xml)
        .map(RawPayload::HotelAvailability)
        .map_err(|e| AdapterError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CurrencyConfig;
    use crate::deal::DealCategory;
    use crate::mock_providers::{paris_flight, paris_hotel};
    use crate::normalizer::DealNormalizer;

    #[test]
    fn test_default_adapters_cover_both_kinds() {
        let adapters = default_adapters();
        let flights = adapters.iter().filter(|a| a.kind() == TripKind::Flight).count();
        let hotels = adapters.iter().filter(|a| a.kind() == TripKind::Hotel).count();
        assert_eq!((flights, hotels), (3, 2));
    }

    #[tokio::test]
    async fn test_every_demo_payload_normalizes_cleanly() {
        let normalizer = DealNormalizer::new(CurrencyConfig::default());

        for adapter in default_adapters() {
            let adapter = StaticProvider::new(
                "probe",
                adapter.kind(),
                match adapter.name() {
                    "Skyscanner" => skyscanner,
                    "Expedia" => expedia,
                    "Kayak" => kayak,
                    "Booking.com" => booking,
                    _ => hotels_com,
                },
            )
            .with_latency(0, 0);
            let params = match adapter.kind() {
                TripKind::Flight => paris_flight(),
                TripKind::Hotel => paris_hotel(),
            };

            let payload = adapter.search(&params).await.unwrap();
            assert_eq!(payload.kind(), adapter.kind());
            let normalized = normalizer.normalize("probe", &payload);
            assert!(normalized.rejections.is_empty(), "{:?}", normalized.rejections);
            assert_eq!(normalized.deals.len(), 1);
        }
    }

    #[test]
    fn test_sample_catalogue_values() {
        let normalizer = DealNormalizer::new(CurrencyConfig::default());

        let sky = normalizer.normalize("Skyscanner", &skyscanner(&paris_flight()).unwrap());
        assert_eq!(sky.deals[0].title, "NYC to Paris Round-trip");
        assert_eq!(sky.deals[0].category, DealCategory::FlashSale);

        let kayak = normalizer.normalize("Kayak", &kayak(&paris_flight()).unwrap());
        assert_eq!(kayak.deals[0].price.amount, 680.0);
        assert_eq!(kayak.deals[0].rating, 4.7);
        assert_eq!(kayak.deals[0].duration_minutes(), Some(440));

        let boutique = normalizer.normalize("Hotels.com", &hotels_com(&paris_hotel()).unwrap());
        assert_eq!(boutique.deals[0].title, "Boutique Hotel Paris");
        assert_eq!(boutique.deals[0].savings_amount, 75.0);
        assert_eq!(boutique.deals[0].category, DealCategory::LastMinute);
    }
}
