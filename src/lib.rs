// Flight search: airport autocomplete, price calendar and itinerary search against a flight-data API

pub mod airports;
pub mod config;
pub mod controller;
pub mod http_client;
pub mod itinerary;
pub mod models;
pub mod price_calendar;
pub mod report;

// Re-export key types for convenience
pub use config::{ClientConfig, ClientError};
pub use controller::{
    AirportField, BusyFlag, FailurePolicy, FormConfig, FormError, FormState, Phase, SearchForm,
};
pub use http_client::{ApiError, ClientStats, FlightApi, HttpTransport, ReqwestTransport};
pub use itinerary::{format_duration, FlightQuery, LegPolicy, SearchOutcome};
pub use models::{
    parse_date, AirportOption, CabinClass, DatedPrice, FlightOffer, PassengerCount,
    PriceCalendar, SearchCriteria, TripType,
};
pub use report::{format_clock, price_hint, render_results_table};
