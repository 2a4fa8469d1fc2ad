// Scripted adapters for exercising the engine without real providers

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::adapter::{AdapterError, ProviderAdapter};
use crate::search_params::{SearchParameters, TripKind, DATE_FORMAT};
use crate::supplier::{
    FareQuote, FareQuoteResponse, HotelRateResponse, RawPayload, SupplierHotel, SupplierRate,
};

#[derive(Debug, Clone)]
pub enum Behaviour {
    // Answer immediately with a one-record payload for the adapter's kind
    Respond,
    // Answer with the default payload after sleeping
    Delay(Duration),
    // Answer immediately with exactly this payload
    Payload(RawPayload),
    Fail(AdapterError),
    Panic,
    // Answer with a payload of the other trip kind
    WrongKind,
}

pub struct ScriptedAdapter {
    name: String,
    kind: TripKind,
    behaviour: Behaviour,
    calls: Arc<AtomicUsize>,
    released: Arc<AtomicBool>,
}

// Flags the adapter call as finished or dropped, whichever happens first
struct ReleaseGuard(Arc<AtomicBool>);

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl ScriptedAdapter {
    pub fn new(name: &str, kind: TripKind, behaviour: Behaviour) -> Self {
        Self {
            name: name.to_string(),
            kind,
            behaviour,
            calls: Arc::new(AtomicUsize::new(0)),
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn flight(name: &str, behaviour: Behaviour) -> Self {
        Self::new(name, TripKind::Flight, behaviour)
    }

    pub fn hotel(name: &str, behaviour: Behaviour) -> Self {
        Self::new(name, TripKind::Hotel, behaviour)
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    pub fn released(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.released)
    }

    pub fn into_dyn(self) -> Arc<dyn ProviderAdapter> {
        Arc::new(self)
    }

    fn default_payload(&self, kind: TripKind, params: &SearchParameters) -> RawPayload {
        match kind {
            TripKind::Flight => fare_quotes(
                "USD",
                vec![fare(
                    &format!("{}-1", self.name),
                    &format!("{} special to {}", self.name, params.destination()),
                    450.0,
                    680.0,
                    4.5,
                    params,
                )],
            ),
            TripKind::Hotel => hotel_rates(
                "USD",
                params,
                vec![hotel(
                    &format!("{}-H1", self.name),
                    &format!("{} pick in {}", self.name, params.destination()),
                    4.4,
                    vec![rate("R1", 145.0, 220.0, &[])],
                )],
            ),
        }
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> TripKind {
        self.kind
    }

    async fn search(&self, params: &SearchParameters) -> Result<RawPayload, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _guard = ReleaseGuard(Arc::clone(&self.released));

        match &self.behaviour {
            Behaviour::Respond => Ok(self.default_payload(self.kind, params)),
            Behaviour::Delay(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(self.default_payload(self.kind, params))
            }
            Behaviour::Payload(payload) => Ok(payload.clone()),
            Behaviour::Fail(error) => Err(error.clone()),
            Behaviour::Panic => panic!("scripted adapter {} panicked", self.name),
            Behaviour::WrongKind => {
                let other = match self.kind {
                    TripKind::Flight => TripKind::Hotel,
                    TripKind::Hotel => TripKind::Flight,
                };
                Ok(self.default_payload(other, params))
            }
        }
    }
}

pub fn fare_quotes(currency: &str, fares: Vec<FareQuote>) -> RawPayload {
    RawPayload::FareQuotes(FareQuoteResponse {
        currency: currency.to_string(),
        fares,
    })
}

pub fn fare(
    id: &str,
    title: &str,
    price: f64,
    original_price: f64,
    rating: f64,
    params: &SearchParameters,
) -> FareQuote {
    FareQuote {
        fare_id: id.to_string(),
        title: title.to_string(),
        price,
        original_price,
        rating,
        outbound_date: params.departure_date().format(DATE_FORMAT).to_string(),
        inbound_date: params.return_date().format(DATE_FORMAT).to_string(),
        duration: "8h 30m".to_string(),
        tags: vec![],
    }
}

pub fn hotel_rates(currency: &str, params: &SearchParameters, hotels: Vec<SupplierHotel>) -> RawPayload {
    RawPayload::HotelRates(HotelRateResponse {
        search_id: "scripted".to_string(),
        currency: currency.to_string(),
        check_in: params.departure_date().format(DATE_FORMAT).to_string(),
        check_out: params.return_date().format(DATE_FORMAT).to_string(),
        hotels,
    })
}

pub fn hotel(id: &str, name: &str, guest_rating: f64, rates: Vec<SupplierRate>) -> SupplierHotel {
    SupplierHotel {
        hotel_id: id.to_string(),
        name: name.to_string(),
        guest_rating,
        amenities: vec!["WiFi".to_string()],
        rates,
    }
}

pub fn rate(id: &str, nightly_price: f64, rack_rate: f64, tags: &[&str]) -> SupplierRate {
    SupplierRate {
        rate_id: id.to_string(),
        board_type: "RO".to_string(),
        nightly_price,
        rack_rate,
        deal_tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

pub fn paris_flight() -> SearchParameters {
    paris_search(TripKind::Flight)
}

pub fn paris_hotel() -> SearchParameters {
    paris_search(TripKind::Hotel)
}

fn paris_search(kind: TripKind) -> SearchParameters {
    let date = |s: &str| chrono::NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap();
    SearchParameters::builder(kind)
        .origin("NYC")
        .destination("Paris")
        .dates(date("2025-07-15"), date("2025-07-22"))
        .party_size(2)
        .build()
        .unwrap()
}

// Minimal HTTP/1.1 provider endpoint on a local port. The responder gets the
// zero-based request number and the request head and returns status and body.
pub struct StubServer {
    base_url: String,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<String>>>,
    task: JoinHandle<()>,
}

impl StubServer {
    pub async fn start<F>(respond: F) -> Self
    where
        F: Fn(usize, &str) -> (u16, String) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let task = tokio::spawn({
            let hits = Arc::clone(&hits);
            let requests = Arc::clone(&requests);
            async move {
                while let Ok((mut socket, _)) = listener.accept().await {
                    let mut head = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => break,
                            Ok(n) => head.extend_from_slice(&chunk[..n]),
                        }
                    }
                    let head = String::from_utf8_lossy(&head).to_string();

                    let index = hits.fetch_add(1, Ordering::SeqCst);
                    let (status, body) = respond(index, &head);
                    requests.lock().push(head);

                    let response = format!(
                        "HTTP/1.1 {} Stub\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                }
            }
        });

        Self {
            base_url,
            hits,
            requests,
            task,
        }
    }

    // Answers with the given statuses in order, then repeats the last one
    pub async fn scripted(responses: Vec<(u16, String)>) -> Self {
        Self::start(move |index, _| responses[index.min(responses.len() - 1)].clone()).await
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// JSON body of a fare-quotes provider answering with `count` fares
pub fn fare_quotes_json(params: &SearchParameters, count: usize) -> String {
    let fares = (0..count)
        .map(|i| {
            fare(
                &format!("SK-{}", i + 1),
                &format!("NYC to {} fare {}", params.destination(), i + 1),
                400.0 + 50.0 * i as f64,
                680.0,
                4.5,
                params,
            )
        })
        .collect();
    serde_json::to_string(&FareQuoteResponse {
        currency: "USD".to_string(),
        fares,
    })
    .unwrap()
}
