// Airport autocomplete lookup
use tracing::{debug, error};

use crate::http_client::{ApiError, FlightApi, HttpTransport};
use crate::models::{AirportOption, RawAirport};

pub const SEARCH_AIRPORT_PATH: &str = "/v1/flights/searchAirport";

impl<T: HttpTransport> FlightApi<T> {
    // Suggests airports matching free text typed by the user.
    // An empty query returns no suggestions without touching the network.
    // Failures are logged and also yield no suggestions.
    pub async fn lookup_airports(&self, query: &str) -> Vec<AirportOption> {
        if query.is_empty() {
            return Vec::new();
        }

        match self.fetch_airports(query).await {
            Ok(options) => options,
            Err(e) => {
                error!(query, error = %e, "Error fetching airports");
                Vec::new()
            }
        }
    }

    pub async fn fetch_airports(&self, query: &str) -> Result<Vec<AirportOption>, ApiError> {
        let params = [
            ("query", query.to_string()),
            ("locale", self.config().locale.clone()),
        ];
        let raw: Vec<RawAirport> = self.get_data(SEARCH_AIRPORT_PATH, &params).await?;

        let options: Vec<AirportOption> = raw.into_iter().map(AirportOption::from).collect();
        debug!(query, count = options.len(), "airport suggestions received");
        Ok(options)
    }
}
