// Wire records from the flight-data provider and the local display types built from them
use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

// Every response body is wrapped as {status, timestamp, data}
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default = "default_status")]
    pub status: bool,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub message: Option<serde_json::Value>,
    #[serde(default)]
    pub data: Option<T>,
}

fn default_status() -> bool {
    true
}

// Airport suggestion records
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawAirport {
    #[serde(deserialize_with = "null_as_default")]
    pub sky_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub entity_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub presentation: RawPresentation,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawPresentation {
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub suggestion_title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub subtitle: String,
}

// Price calendar records
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawCalendarData {
    pub flights: RawCalendarFlights,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawCalendarFlights {
    pub no_price_label: String,
    pub groups: Vec<RawCalendarGroup>,
    pub days: Vec<RawCalendarDay>,
    pub currency: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawCalendarGroup {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct RawCalendarDay {
    pub day: String,
    pub group: String,
    #[serde(deserialize_with = "number_or_string")]
    pub price: f64,
}

// Price-by-date-range records
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawDatedPrices {
    pub prices: Vec<RawDatedPrice>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct RawDatedPrice {
    pub date: String,
    #[serde(deserialize_with = "number_or_string")]
    pub price: f64,
}

// Itinerary records
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawItineraryData {
    pub itineraries: Vec<RawItinerary>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RawItinerary {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub price: RawPrice,
    #[serde(deserialize_with = "null_as_default")]
    pub legs: Vec<RawLeg>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RawPrice {
    pub raw: Option<f64>,
    #[serde(deserialize_with = "null_as_default")]
    pub formatted: String,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawLeg {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub departure: String,
    #[serde(deserialize_with = "null_as_default")]
    pub arrival: String,
    #[serde(deserialize_with = "null_as_default")]
    pub duration_in_minutes: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub stop_count: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub carriers: RawCarriers,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RawCarriers {
    #[serde(deserialize_with = "null_as_default")]
    pub marketing: Vec<RawCarrier>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawCarrier {
    pub id: Option<i64>,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub logo_url: String,
}

// `#[serde(default)]` only covers absent keys; the provider also sends explicit nulls
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

// Some provider endpoints send prices as strings, others as numbers.
// Unparseable strings become NaN so the day is skipped rather than shown as $0
fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrStr {
        Num(f64),
        Str(String),
        Null,
    }

    Ok(match NumOrStr::deserialize(deserializer)? {
        NumOrStr::Num(n) => n,
        NumOrStr::Str(s) => s.trim().trim_start_matches('$').parse().unwrap_or(f64::NAN),
        NumOrStr::Null => 0.0,
    })
}

// One airport suggestion, as offered to the user in an autocomplete list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AirportOption {
    pub label: String,
    pub code: String,
    pub entity_id: String,
}

impl AirportOption {
    pub fn new(
        label: impl Into<String>,
        code: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            code: code.into(),
            entity_id: entity_id.into(),
        }
    }

    // Unique within a single lookup response
    pub fn key(&self) -> (&str, &str) {
        (&self.code, &self.entity_id)
    }
}

impl From<RawAirport> for AirportOption {
    fn from(raw: RawAirport) -> Self {
        Self {
            label: raw.presentation.suggestion_title,
            code: raw.sky_id,
            entity_id: raw.entity_id,
        }
    }
}

impl fmt::Display for AirportOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TripType {
    #[default]
    RoundTrip,
    OneWay,
}

impl TripType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripType::RoundTrip => "round-trip",
            TripType::OneWay => "one-way",
        }
    }
}

impl FromStr for TripType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "round-trip" | "roundtrip" => Ok(TripType::RoundTrip),
            "one-way" | "oneway" => Ok(TripType::OneWay),
            other => Err(format!("unknown trip type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CabinClass {
    #[default]
    Economy,
    Business,
    First,
}

impl CabinClass {
    // Value sent as the cabinClass query parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            CabinClass::Economy => "economy",
            CabinClass::Business => "business",
            CabinClass::First => "first",
        }
    }
}

impl fmt::Display for CabinClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CabinClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "economy" => Ok(CabinClass::Economy),
            "business" => Ok(CabinClass::Business),
            "first" | "first class" => Ok(CabinClass::First),
            other => Err(format!("unknown cabin class: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassengerCount(NonZeroU32);

impl PassengerCount {
    pub fn new(count: u32) -> Option<Self> {
        NonZeroU32::new(count).map(Self)
    }

    pub fn get(&self) -> u32 {
        self.0.get()
    }
}

impl Default for PassengerCount {
    fn default() -> Self {
        Self(NonZeroU32::MIN)
    }
}

impl fmt::Display for PassengerCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Everything the user has entered into the search form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchCriteria {
    pub origin: Option<AirportOption>,
    pub destination: Option<AirportOption>,
    pub trip_type: TripType,
    pub departure_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
    pub passengers: PassengerCount,
    pub cabin_class: CabinClass,
}

impl SearchCriteria {
    // The return date is kept while one-way is selected but never used
    pub fn effective_return_date(&self) -> Option<NaiveDate> {
        match self.trip_type {
            TripType::RoundTrip => self.return_date,
            TripType::OneWay => None,
        }
    }
}

// Lowest known price per calendar day for one origin/destination pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceCalendar {
    prices: BTreeMap<NaiveDate, f64>,
    currency: Option<String>,
}

impl PriceCalendar {
    pub fn new(currency: Option<String>) -> Self {
        Self {
            prices: BTreeMap::new(),
            currency,
        }
    }

    // Later entries for the same day overwrite earlier ones
    pub fn insert(&mut self, date: NaiveDate, price: f64) {
        self.prices.insert(date, price);
    }

    pub fn price_on(&self, date: NaiveDate) -> Option<f64> {
        self.prices.get(&date).copied()
    }

    pub fn currency(&self) -> Option<&str> {
        self.currency.as_deref()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.prices.iter().map(|(d, p)| (*d, *p))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatedPrice {
    pub date: NaiveDate,
    pub price: f64,
}

// One row of the results table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightOffer {
    pub airline: String,
    pub departure_time: Option<NaiveDateTime>,
    pub arrival_time: Option<NaiveDateTime>,
    pub duration_minutes: u32,
    pub stop_count: u32,
    pub formatted_price: String,
}

impl FlightOffer {
    pub fn duration_label(&self) -> String {
        crate::itinerary::format_duration(self.duration_minutes)
    }
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

// Provider timestamps are local wall-clock times without an offset; accept RFC 3339 too
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.naive_local())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_airport_tolerates_missing_fields() {
        let raw: RawAirport = serde_json::from_value(json!({ "skyId": "JFK" })).unwrap();
        let option = AirportOption::from(raw);

        assert_eq!(option.code, "JFK");
        assert_eq!(option.entity_id, "");
        assert_eq!(option.label, "");
    }

    #[test]
    fn test_calendar_day_price_accepts_strings() {
        let day: RawCalendarDay =
            serde_json::from_value(json!({ "day": "2025-03-01", "price": "$123.5" })).unwrap();
        assert_eq!(day.price, 123.5);

        let day: RawCalendarDay =
            serde_json::from_value(json!({ "day": "2025-03-01", "price": null })).unwrap();
        assert_eq!(day.price, 0.0);
    }

    #[test]
    fn test_calendar_day_unparseable_price_is_nan() {
        let day: RawCalendarDay =
            serde_json::from_value(json!({ "day": "2025-03-01", "price": "N/A" })).unwrap();
        assert!(day.price.is_nan());
    }

    #[test]
    fn test_raw_records_treat_null_as_empty() {
        let raw: RawAirport = serde_json::from_value(json!({
            "skyId": "NYCA",
            "entityId": null,
            "presentation": { "suggestionTitle": null, "subtitle": null }
        }))
        .unwrap();
        assert_eq!(raw.entity_id, "");
        assert_eq!(raw.presentation.suggestion_title, "");

        let leg: RawLeg = serde_json::from_value(json!({
            "departure": null,
            "durationInMinutes": 90,
            "stopCount": null,
            "carriers": { "marketing": [{ "name": null, "logoUrl": null }] }
        }))
        .unwrap();
        assert_eq!(leg.departure, "");
        assert_eq!(leg.duration_in_minutes, 90);
        assert_eq!(leg.stop_count, 0);
        assert_eq!(leg.carriers.marketing[0].name, "");
    }

    #[test]
    fn test_envelope_defaults() {
        let envelope: ApiEnvelope<RawItineraryData> = serde_json::from_value(json!({})).unwrap();
        assert!(envelope.status);
        assert!(envelope.data.is_none());
    }

    #[test]
    fn test_cabin_class_parsing() {
        assert_eq!("Economy".parse::<CabinClass>(), Ok(CabinClass::Economy));
        assert_eq!("first class".parse::<CabinClass>(), Ok(CabinClass::First));
        assert!("premium".parse::<CabinClass>().is_err());
        assert_eq!(CabinClass::Business.as_str(), "business");
    }

    #[test]
    fn test_passenger_count_rejects_zero() {
        assert!(PassengerCount::new(0).is_none());
        assert_eq!(PassengerCount::new(3).map(|p| p.get()), Some(3));
        assert_eq!(PassengerCount::default().get(), 1);
    }

    #[test]
    fn test_effective_return_date_ignored_for_one_way() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 8).unwrap();
        let mut criteria = SearchCriteria {
            return_date: Some(date),
            ..SearchCriteria::default()
        };
        assert_eq!(criteria.effective_return_date(), Some(date));

        criteria.trip_type = TripType::OneWay;
        assert_eq!(criteria.effective_return_date(), None);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(8, 5, 0)
            .unwrap();

        assert_eq!(parse_timestamp("2025-03-01T08:05:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-03-01T08:05"), Some(expected));
        assert_eq!(parse_timestamp("2025-03-01T08:05:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("tomorrow"), None);
    }
}
