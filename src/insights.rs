// Destination insights
// Describes the place, not the trip: everything here is keyed by destination
// name alone and ignores dates, party size and budget.

use chrono::{Month, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InsightsError {
    #[error("Unknown destination: {0}")]
    UnknownDestination(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DestinationProfile {
    pub name: String,
    pub currency: String,
    pub best_months: Vec<Month>,
    pub popular_months: Vec<Month>,
    pub average_celsius: i32,
    pub top_attractions: Vec<String>,
    pub travel_tips: Vec<String>,
    pub current_deals: u32,
    pub average_savings_percent: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationInsights {
    pub destination: String,
    pub best_time_to_visit: String,
    pub average_temperature: String,
    pub currency: String,
    pub top_attractions: Vec<String>,
    pub travel_tips: Vec<String>,
    pub current_deals_available: u32,
    pub average_savings_this_month: u32,
    pub popular_months: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopularDestination {
    pub name: String,
    pub average_savings: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealAlert {
    pub destination: String,
    pub savings_percent: u32,
    pub expires_on: NaiveDate,
}

// Backing store for destination facts
pub trait DestinationKnowledgeSource: Send + Sync + 'static {
    // `name` arrives trimmed and lowercased
    fn lookup(&self, name: &str) -> Option<DestinationProfile>;

    fn popular(&self) -> Vec<PopularDestination> {
        Vec::new()
    }

    fn alerts(&self) -> Vec<DealAlert> {
        Vec::new()
    }
}

#[derive(Clone)]
pub struct InsightsCompiler {
    source: Arc<dyn DestinationKnowledgeSource>,
}

impl InsightsCompiler {
    pub fn new(source: Arc<dyn DestinationKnowledgeSource>) -> Self {
        Self { source }
    }

    pub fn compile(&self, destination: &str) -> Result<DestinationInsights, InsightsError> {
        let requested = destination.trim();
        let key = requested.to_lowercase();

        let profile = self
            .source
            .lookup(&key)
            .or_else(|| {
                // "Paris, France" falls back to "Paris"
                let (city, _) = key.split_once(',')?;
                self.source.lookup(city.trim())
            })
            .ok_or_else(|| InsightsError::UnknownDestination(requested.to_string()))?;

        Ok(DestinationInsights {
            destination: requested.to_string(),
            best_time_to_visit: month_ranges(&profile.best_months),
            average_temperature: format_temperature(profile.average_celsius),
            currency: profile.currency,
            top_attractions: profile.top_attractions,
            travel_tips: profile.travel_tips,
            current_deals_available: profile.current_deals,
            average_savings_this_month: profile.average_savings_percent,
            popular_months: profile
                .popular_months
                .iter()
                .map(|m| m.name().to_string())
                .collect(),
        })
    }

    pub fn popular_destinations(&self) -> Vec<PopularDestination> {
        self.source.popular()
    }

    // Soonest expiry first
    pub fn deal_alerts(&self) -> Vec<DealAlert> {
        let mut alerts = self.source.alerts();
        alerts.sort_by_key(|a| a.expires_on);
        alerts
    }
}

/// Collapses months into comma separated runs of consecutive months,
/// e.g. `[Apr, May, Jun, Sep, Oct, Nov]` becomes "April-June, September-November".
/// Runs do not wrap around the year end.
pub fn month_ranges(months: &[Month]) -> String {
    let mut numbers: Vec<u32> = months.iter().map(|m| m.number_from_month()).collect();
    numbers.sort_unstable();
    numbers.dedup();

    let mut runs: Vec<(u32, u32)> = Vec::new();
    for n in numbers {
        match runs.last_mut() {
            Some((_, end)) if *end + 1 == n => *end = n,
            _ => runs.push((n, n)),
        }
    }

    runs.into_iter()
        .map(|(start, end)| {
            if start == end {
                month_name(start)
            } else {
                format!("{}-{}", month_name(start), month_name(end))
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn month_name(number: u32) -> String {
    u8::try_from(number)
        .ok()
        .and_then(|n| Month::try_from(n).ok())
        .map(|m| m.name().to_string())
        .unwrap_or_default()
}

pub fn format_temperature(celsius: i32) -> String {
    let fahrenheit = (celsius as f64 * 9.0 / 5.0 + 32.0).round() as i32;
    format!("{}°C ({}°F)", celsius, fahrenheit)
}

// Built-in catalogue used by the demo binary and tests
pub struct StaticDestinationKnowledge {
    profiles: HashMap<String, DestinationProfile>,
    popular: Vec<PopularDestination>,
    alerts: Vec<DealAlert>,
}

impl StaticDestinationKnowledge {
    pub fn new(profiles: Vec<DestinationProfile>) -> Self {
        Self {
            profiles: profiles
                .into_iter()
                .map(|p| (p.name.to_lowercase(), p))
                .collect(),
            popular: Vec::new(),
            alerts: Vec::new(),
        }
    }

    pub fn with_popular(mut self, popular: Vec<PopularDestination>) -> Self {
        self.popular = popular;
        self
    }

    pub fn with_alerts(mut self, alerts: Vec<DealAlert>) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl DestinationKnowledgeSource for StaticDestinationKnowledge {
    fn lookup(&self, name: &str) -> Option<DestinationProfile> {
        self.profiles.get(name).cloned()
    }

    fn popular(&self) -> Vec<PopularDestination> {
        self.popular.clone()
    }

    fn alerts(&self) -> Vec<DealAlert> {
        self.alerts.clone()
    }
}

impl Default for StaticDestinationKnowledge {
    fn default() -> Self {
        use Month::*;

        let profiles = vec![
            profile(
                "Paris",
                "EUR",
                &[April, May, June, September, October, November],
                &[May, June, September, October],
                22,
                &["Eiffel Tower", "Louvre Museum", "Notre Dame", "Arc de Triomphe"],
                &[
                    "Book flights 6-8 weeks in advance for best deals",
                    "Consider off-season travel for 40% savings",
                    "Use public transport for budget-friendly local travel",
                    "Many museums are free on first Sunday of each month",
                ],
                12,
                34,
            ),
            profile(
                "Tokyo",
                "JPY",
                &[March, April, May, October, November],
                &[March, April, November],
                16,
                &["Senso-ji Temple", "Shibuya Crossing", "Meiji Shrine", "Tsukiji Outer Market", "Tokyo Skytree"],
                &[
                    "Get a Suica card for trains and convenience stores",
                    "Cherry blossom season books out months ahead",
                    "Many restaurants are cash only",
                ],
                9,
                28,
            ),
            profile(
                "New York",
                "USD",
                &[April, May, June, September, October],
                &[June, September, December],
                13,
                &["Central Park", "Statue of Liberty", "Metropolitan Museum of Art", "Times Square", "Brooklyn Bridge"],
                &[
                    "A weekly unlimited MetroCard pays off after a dozen rides",
                    "Broadway lottery tickets are far cheaper than box office",
                    "Midweek hotel rates are usually lowest",
                ],
                15,
                42,
            ),
            profile(
                "London",
                "GBP",
                &[May, June, July, August, September],
                &[June, July, August],
                15,
                &["British Museum", "Tower of London", "Westminster Abbey", "Tate Modern"],
                &[
                    "Contactless payment caps daily Tube fares",
                    "Most major museums are free to enter",
                    "Pack a light rain jacket in every season",
                ],
                11,
                31,
            ),
            profile(
                "Barcelona",
                "EUR",
                &[May, June, September, October],
                &[June, July, August],
                21,
                &["Sagrada Familia", "Park Guell", "La Rambla", "Gothic Quarter"],
                &[
                    "Book Sagrada Familia tickets online in advance",
                    "Dinner rarely starts before 9pm",
                    "Watch for pickpockets on La Rambla",
                ],
                10,
                38,
            ),
            profile(
                "Bali",
                "IDR",
                &[April, May, June, July, August, September],
                &[July, August],
                27,
                &["Uluwatu Temple", "Tegallalang Rice Terraces", "Ubud Monkey Forest", "Mount Batur"],
                &[
                    "The dry season runs April to October",
                    "Hire a driver for day trips instead of renting a car",
                    "Carry small notes for temple donations",
                ],
                7,
                45,
            ),
            profile(
                "Iceland",
                "ISK",
                &[June, July, August],
                &[June, July, August, December],
                11,
                &["Blue Lagoon", "Golden Circle", "Jokulsarlon Glacier Lagoon", "Reynisfjara Beach"],
                &[
                    "Northern lights are best seen September to March",
                    "Fuel up whenever you can outside Reykjavik",
                    "Weather changes fast, check road conditions daily",
                ],
                6,
                52,
            ),
            profile(
                "Costa Rica",
                "CRC",
                &[December, January, February, March, April],
                &[January, February, March],
                26,
                &["Arenal Volcano", "Manuel Antonio National Park", "Monteverde Cloud Forest", "Tortuguero"],
                &[
                    "Green season (May to November) brings the lowest prices",
                    "Four-wheel drive helps on rural roads",
                    "US dollars are widely accepted",
                ],
                8,
                38,
            ),
        ];

        let popular = [
            ("Paris", 35),
            ("Tokyo", 28),
            ("New York", 42),
            ("London", 31),
            ("Barcelona", 38),
        ]
        .into_iter()
        .map(|(name, average_savings)| PopularDestination {
            name: name.to_string(),
            average_savings,
        })
        .collect();

        let alerts = [
            ("Bali", 45, (2025, 6, 15)),
            ("Iceland", 52, (2025, 6, 10)),
            ("Costa Rica", 38, (2025, 6, 20)),
        ]
        .into_iter()
        .filter_map(|(destination, savings_percent, (y, m, d))| {
            Some(DealAlert {
                destination: destination.to_string(),
                savings_percent,
                expires_on: NaiveDate::from_ymd_opt(y, m, d)?,
            })
        })
        .collect();

        Self::new(profiles).with_popular(popular).with_alerts(alerts)
    }
}

#[allow(clippy::too_many_arguments)]
fn profile(
    name: &str,
    currency: &str,
    best_months: &[Month],
    popular_months: &[Month],
    average_celsius: i32,
    top_attractions: &[&str],
    travel_tips: &[&str],
    current_deals: u32,
    average_savings_percent: u32,
) -> DestinationProfile {
    DestinationProfile {
        name: name.to_string(),
        currency: currency.to_string(),
        best_months: best_months.to_vec(),
        popular_months: popular_months.to_vec(),
        average_celsius,
        top_attractions: top_attractions.iter().map(|s| s.to_string()).collect(),
        travel_tips: travel_tips.iter().map(|s| s.to_string()).collect(),
        current_deals,
        average_savings_percent,
    }
}
