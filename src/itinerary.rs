// Flight itinerary search and normalization into result rows
use chrono::NaiveDate;
use tracing::{debug, error, warn};

use crate::http_client::{ApiError, FlightApi, HttpTransport};
use crate::models::{
    parse_timestamp, AirportOption, CabinClass, FlightOffer, PassengerCount, RawItinerary,
    RawItineraryData, SearchCriteria, DATE_FORMAT,
};

pub const SEARCH_FLIGHTS_PATH: &str = "/v2/flights/searchFlights";
pub const SORT_BY: &str = "best";

// Which legs of an itinerary feed a result row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LegPolicy {
    // Airline, times, duration and stops all come from the first leg.
    // Any further legs (return or connecting segments) are not shown.
    #[default]
    DirectLegOnly,
}

// Criteria with everything a search request needs
#[derive(Debug, Clone, PartialEq)]
pub struct FlightQuery {
    pub origin: AirportOption,
    pub destination: AirportOption,
    pub date: NaiveDate,
    pub cabin_class: CabinClass,
    pub adults: PassengerCount,
}

impl FlightQuery {
    // None when origin, destination or departure date is unset
    pub fn from_criteria(criteria: &SearchCriteria) -> Option<Self> {
        Some(Self {
            origin: criteria.origin.clone()?,
            destination: criteria.destination.clone()?,
            date: criteria.departure_date?,
            cabin_class: criteria.cabin_class,
            adults: criteria.passengers,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    // Preconditions not met, nothing was sent
    Skipped,
    Completed(Vec<FlightOffer>),
    Failed,
}

impl<T: HttpTransport> FlightApi<T> {
    // Runs an itinerary search for the given criteria.
    // Returns `SearchOutcome::Skipped` without a request when origin,
    // destination or departure date is missing. Request and decoding failures
    // are logged and reported as `SearchOutcome::Failed`.
    pub async fn search_flights(&self, criteria: &SearchCriteria) -> SearchOutcome {
        let Some(query) = FlightQuery::from_criteria(criteria) else {
            debug!("search skipped, origin/destination/date incomplete");
            return SearchOutcome::Skipped;
        };

        match self.fetch_flights(&query).await {
            Ok(offers) => SearchOutcome::Completed(offers),
            Err(e) => {
                error!(
                    origin = %query.origin.code,
                    destination = %query.destination.code,
                    date = %query.date,
                    error = %e,
                    "Error searching flights"
                );
                SearchOutcome::Failed
            }
        }
    }

    pub async fn fetch_flights(&self, query: &FlightQuery) -> Result<Vec<FlightOffer>, ApiError> {
        let config = self.config();
        let params = [
            ("originSkyId", query.origin.code.clone()),
            ("destinationSkyId", query.destination.code.clone()),
            ("originEntityId", query.origin.entity_id.clone()),
            ("destinationEntityId", query.destination.entity_id.clone()),
            ("date", query.date.format(DATE_FORMAT).to_string()),
            ("cabinClass", query.cabin_class.as_str().to_string()),
            ("adults", query.adults.to_string()),
            ("sortBy", SORT_BY.to_string()),
            ("currency", config.currency.clone()),
            ("market", config.market.clone()),
            ("countryCode", config.country_code.clone()),
        ];
        let data: RawItineraryData = self.get_data(SEARCH_FLIGHTS_PATH, &params).await?;

        let offers = normalize_itineraries(data.itineraries, LegPolicy::DirectLegOnly);
        debug!(count = offers.len(), "itineraries normalized");
        Ok(offers)
    }
}

pub fn normalize_itineraries(itineraries: Vec<RawItinerary>, policy: LegPolicy) -> Vec<FlightOffer> {
    itineraries
        .into_iter()
        .filter_map(|itinerary| normalize_itinerary(itinerary, policy))
        .collect()
}

// An itinerary without any leg has nothing to show and is dropped
pub fn normalize_itinerary(itinerary: RawItinerary, policy: LegPolicy) -> Option<FlightOffer> {
    let RawItinerary { id, price, legs } = itinerary;

    let leg = match policy {
        LegPolicy::DirectLegOnly => legs.into_iter().next(),
    };
    let Some(leg) = leg else {
        warn!(itinerary = %id, "skipping itinerary without legs");
        return None;
    };

    let airline = leg
        .carriers
        .marketing
        .into_iter()
        .next()
        .map(|carrier| carrier.name)
        .unwrap_or_default();

    Some(FlightOffer {
        airline,
        departure_time: parse_timestamp(&leg.departure),
        arrival_time: parse_timestamp(&leg.arrival),
        duration_minutes: leg.duration_in_minutes,
        stop_count: leg.stop_count,
        formatted_price: price.formatted,
    })
}

pub fn format_duration(total_minutes: u32) -> String {
    format!("{}h {}m", total_minutes / 60, total_minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::http_client::mock_transport::MockTransport;
    use crate::models::{parse_date, RawCarrier, RawCarriers, RawLeg, RawPrice};
    use serde_json::json;
    use test_case::test_case;

    fn api() -> FlightApi<MockTransport> {
        FlightApi::with_transport(MockTransport::new(), ClientConfig::new("http://mock", "key"))
    }

    fn complete_criteria() -> SearchCriteria {
        SearchCriteria {
            origin: Some(AirportOption::new("New York (JFK)", "JFK", "95565058")),
            destination: Some(AirportOption::new("Los Angeles (LAX)", "LAX", "95673368")),
            departure_date: parse_date("2025-03-01"),
            ..SearchCriteria::default()
        }
    }

    fn leg(minutes: u32, stops: u32, carrier: &str) -> RawLeg {
        RawLeg {
            id: format!("leg-{minutes}"),
            departure: "2025-03-01T08:00:00".to_string(),
            arrival: "2025-03-01T13:30:00".to_string(),
            duration_in_minutes: minutes,
            stop_count: stops,
            carriers: RawCarriers {
                marketing: vec![RawCarrier {
                    id: Some(1),
                    name: carrier.to_string(),
                    logo_url: String::new(),
                }],
            },
        }
    }

    #[test_case(0, "0h 0m")]
    #[test_case(59, "0h 59m")]
    #[test_case(60, "1h 0m")]
    #[test_case(125, "2h 5m")]
    #[test_case(330, "5h 30m")]
    #[test_case(1441, "24h 1m")]
    fn test_format_duration(minutes: u32, expected: &str) {
        assert_eq!(format_duration(minutes), expected);
    }

    #[test]
    fn test_direct_leg_only_ignores_later_legs() {
        let itinerary = RawItinerary {
            id: "it-1".to_string(),
            price: RawPrice {
                raw: Some(420.0),
                formatted: "$420".to_string(),
            },
            legs: vec![leg(330, 0, "Delta"), leg(600, 2, "United")],
        };

        let offer = normalize_itinerary(itinerary, LegPolicy::DirectLegOnly).unwrap();

        assert_eq!(offer.airline, "Delta");
        assert_eq!(offer.duration_minutes, 330);
        assert_eq!(offer.duration_label(), "5h 30m");
        assert_eq!(offer.stop_count, 0);
        assert_eq!(offer.formatted_price, "$420");
    }

    #[test]
    fn test_itinerary_without_legs_is_dropped() {
        let offers = normalize_itineraries(
            vec![
                RawItinerary::default(),
                RawItinerary {
                    legs: vec![leg(90, 1, "JetBlue")],
                    ..RawItinerary::default()
                },
            ],
            LegPolicy::DirectLegOnly,
        );

        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].airline, "JetBlue");
    }

    #[test]
    fn test_leg_without_carrier_has_empty_airline() {
        let mut bare = leg(45, 0, "unused");
        bare.carriers.marketing.clear();
        bare.departure.clear();

        let offer = normalize_itinerary(
            RawItinerary {
                legs: vec![bare],
                ..RawItinerary::default()
            },
            LegPolicy::DirectLegOnly,
        )
        .unwrap();

        assert_eq!(offer.airline, "");
        assert_eq!(offer.departure_time, None);
        assert_eq!(offer.formatted_price, "");
    }

    #[test]
    fn test_flight_query_requires_origin_destination_and_date() {
        assert!(FlightQuery::from_criteria(&complete_criteria()).is_some());

        let mut criteria = complete_criteria();
        criteria.origin = None;
        assert!(FlightQuery::from_criteria(&criteria).is_none());

        let mut criteria = complete_criteria();
        criteria.destination = None;
        assert!(FlightQuery::from_criteria(&criteria).is_none());

        let mut criteria = complete_criteria();
        criteria.departure_date = None;
        assert!(FlightQuery::from_criteria(&criteria).is_none());
    }

    #[tokio::test]
    async fn test_incomplete_criteria_skips_request() {
        let api = api();
        let mut criteria = complete_criteria();
        criteria.departure_date = None;

        assert_eq!(api.search_flights(&criteria).await, SearchOutcome::Skipped);
        assert!(api.transport().requests().is_empty());
    }

    #[tokio::test]
    async fn test_search_jfk_to_lax() {
        let api = api();
        api.transport().respond(
            SEARCH_FLIGHTS_PATH,
            json!({
                "status": true,
                "timestamp": 1700000000000i64,
                "data": {
                    "context": { "status": "complete", "totalResults": 1 },
                    "itineraries": [{
                        "id": "13542-2503010800--32171-0-12712-2503011130",
                        "price": { "raw": 158.98, "formatted": "$159" },
                        "legs": [{
                            "id": "13542-2503010800--32171-0-12712-2503011130",
                            "departure": "2025-03-01T08:00:00",
                            "arrival": "2025-03-01T11:30:00",
                            "durationInMinutes": 330,
                            "stopCount": 0,
                            "carriers": {
                                "marketing": [{ "id": -32171, "name": "JetBlue", "logoUrl": "" }],
                                "operationType": "fully_operated"
                            }
                        }]
                    }]
                }
            }),
        );

        let outcome = api.search_flights(&complete_criteria()).await;

        let SearchOutcome::Completed(offers) = outcome else {
            panic!("expected completed search, got {outcome:?}");
        };
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].duration_label(), "5h 30m");
        assert_eq!(offers[0].stop_count, 0);
        assert_eq!(offers[0].airline, "JetBlue");
        assert_eq!(offers[0].formatted_price, "$159");

        let requests = api.transport().requests_to(SEARCH_FLIGHTS_PATH);
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.param("originSkyId"), Some("JFK"));
        assert_eq!(request.param("destinationSkyId"), Some("LAX"));
        assert_eq!(request.param("originEntityId"), Some("95565058"));
        assert_eq!(request.param("destinationEntityId"), Some("95673368"));
        assert_eq!(request.param("date"), Some("2025-03-01"));
        assert_eq!(request.param("cabinClass"), Some("economy"));
        assert_eq!(request.param("adults"), Some("1"));
        assert_eq!(request.param("sortBy"), Some("best"));
        assert_eq!(request.param("currency"), Some("USD"));
        assert_eq!(request.param("market"), Some("en-US"));
        assert_eq!(request.param("countryCode"), Some("US"));
    }

    #[tokio::test]
    async fn test_null_leg_fields_keep_the_offer() {
        let api = api();
        api.transport().respond(
            SEARCH_FLIGHTS_PATH,
            json!({
                "status": true,
                "data": {
                    "itineraries": [
                        {
                            "id": "it-1",
                            "price": { "raw": 120.0, "formatted": "$120" },
                            "legs": [{
                                "departure": "2025-03-01T08:00:00",
                                "arrival": "2025-03-01T10:05:00",
                                "durationInMinutes": 125,
                                "stopCount": 0,
                                "carriers": { "marketing": [{ "name": "Delta" }] }
                            }]
                        },
                        {
                            "id": "it-2",
                            "price": { "raw": null, "formatted": null },
                            "legs": [{
                                "departure": "2025-03-01T09:00:00",
                                "arrival": null,
                                "durationInMinutes": 200,
                                "stopCount": null,
                                "carriers": { "marketing": [{ "name": null }] }
                            }]
                        }
                    ]
                }
            }),
        );

        let outcome = api.search_flights(&complete_criteria()).await;

        let SearchOutcome::Completed(offers) = outcome else {
            panic!("expected completed search, got {outcome:?}");
        };
        assert_eq!(offers.len(), 2);
        assert_eq!(offers[0].airline, "Delta");
        assert_eq!(offers[1].stop_count, 0);
        assert_eq!(offers[1].airline, "");
        assert_eq!(offers[1].arrival_time, None);
        assert_eq!(offers[1].formatted_price, "");
    }

    #[tokio::test]
    async fn test_search_failure_is_reported() {
        let api = api();
        api.transport().fail_path(SEARCH_FLIGHTS_PATH);

        assert_eq!(
            api.search_flights(&complete_criteria()).await,
            SearchOutcome::Failed
        );
    }

    #[tokio::test]
    async fn test_search_with_no_itineraries_completes_empty() {
        let api = api();
        api.transport().respond(
            SEARCH_FLIGHTS_PATH,
            json!({ "status": true, "data": { "itineraries": [] } }),
        );

        assert_eq!(
            api.search_flights(&complete_criteria()).await,
            SearchOutcome::Completed(Vec::new())
        );
    }
}
