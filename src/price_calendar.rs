// Per-day price lookups for an origin/destination pair
use chrono::NaiveDate;
use tracing::{debug, error, warn};

use crate::http_client::{ApiError, FlightApi, HttpTransport};
use crate::models::{
    parse_date, AirportOption, CabinClass, DatedPrice, PassengerCount, PriceCalendar,
    RawCalendarData, RawCalendarFlights, RawDatedPrices, DATE_FORMAT,
};

pub const PRICE_CALENDAR_PATH: &str = "/v1/flights/getPriceCalendar";
pub const PRICES_BY_DATES_PATH: &str = "/v2/flights/searchFlightPricesByDates";

impl<T: HttpTransport> FlightApi<T> {
    // Fetches the price calendar starting at `from_date`.
    // On failure the error is logged and an empty calendar is returned, so the
    // caller never keeps prices that belong to a previous pair.
    pub async fn lookup_price_calendar(
        &self,
        origin: &AirportOption,
        destination: &AirportOption,
        from_date: NaiveDate,
    ) -> PriceCalendar {
        match self
            .fetch_price_calendar(origin, destination, from_date)
            .await
        {
            Ok(calendar) => calendar,
            Err(e) => {
                error!(
                    origin = %origin.code,
                    destination = %destination.code,
                    error = %e,
                    "Error fetching flight prices"
                );
                PriceCalendar::default()
            }
        }
    }

    pub async fn fetch_price_calendar(
        &self,
        origin: &AirportOption,
        destination: &AirportOption,
        from_date: NaiveDate,
    ) -> Result<PriceCalendar, ApiError> {
        let params = [
            ("originSkyId", origin.code.clone()),
            ("destinationSkyId", destination.code.clone()),
            ("fromDate", from_date.format(DATE_FORMAT).to_string()),
            ("currency", self.config().currency.clone()),
        ];
        let data: RawCalendarData = self.get_data(PRICE_CALENDAR_PATH, &params).await?;

        let calendar = build_calendar(data.flights);
        debug!(
            origin = %origin.code,
            destination = %destination.code,
            days = calendar.len(),
            "price calendar received"
        );
        Ok(calendar)
    }

    // Prices for each day of `[start, end]`, used for range views.
    // Either airport unset returns nothing without a request; failures are
    // logged and return nothing.
    pub async fn lookup_prices_by_dates(
        &self,
        origin: Option<&AirportOption>,
        destination: Option<&AirportOption>,
        start: NaiveDate,
        end: NaiveDate,
        cabin_class: CabinClass,
        adults: PassengerCount,
    ) -> Vec<DatedPrice> {
        let (Some(origin), Some(destination)) = (origin, destination) else {
            return Vec::new();
        };

        match self
            .fetch_prices_by_dates(origin, destination, start, end, cabin_class, adults)
            .await
        {
            Ok(prices) => prices,
            Err(e) => {
                error!(
                    origin = %origin.code,
                    destination = %destination.code,
                    error = %e,
                    "Error fetching flight prices by dates"
                );
                Vec::new()
            }
        }
    }

    pub async fn fetch_prices_by_dates(
        &self,
        origin: &AirportOption,
        destination: &AirportOption,
        start: NaiveDate,
        end: NaiveDate,
        cabin_class: CabinClass,
        adults: PassengerCount,
    ) -> Result<Vec<DatedPrice>, ApiError> {
        let config = self.config();
        let params = [
            ("originSkyId", origin.code.clone()),
            ("destinationSkyId", destination.code.clone()),
            ("startDate", start.format(DATE_FORMAT).to_string()),
            ("endDate", end.format(DATE_FORMAT).to_string()),
            ("cabinClass", cabin_class.as_str().to_string()),
            ("adults", adults.to_string()),
            ("currency", config.currency.clone()),
            ("market", config.market.clone()),
            ("countryCode", config.country_code.clone()),
        ];
        let data: RawDatedPrices = self.get_data(PRICES_BY_DATES_PATH, &params).await?;

        Ok(data
            .prices
            .into_iter()
            .filter_map(|p| {
                let Some(date) = parse_date(&p.date) else {
                    warn!(date = %p.date, "skipping price with unparseable date");
                    return None;
                };
                if !p.price.is_finite() || p.price < 0.0 {
                    warn!(date = %p.date, price = p.price, "skipping price with invalid value");
                    return None;
                }
                Some(DatedPrice {
                    date,
                    price: p.price,
                })
            })
            .collect())
    }
}

// Builds the day -> price map in response order; a repeated day keeps the last price seen
pub fn build_calendar(flights: RawCalendarFlights) -> PriceCalendar {
    let mut calendar = PriceCalendar::new(flights.currency);
    for day in flights.days {
        let Some(date) = parse_date(&day.day) else {
            warn!(day = %day.day, "skipping calendar day with unparseable date");
            continue;
        };
        if !day.price.is_finite() || day.price < 0.0 {
            warn!(day = %day.day, price = day.price, "skipping calendar day with invalid price");
            continue;
        }
        calendar.insert(date, day.price);
    }
    calendar
}
