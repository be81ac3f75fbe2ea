// Search form controller
// FormState holds everything the user has entered plus the lookup results; SearchForm drives the
// network calls and applies their results back onto the state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info};

use crate::http_client::{FlightApi, HttpTransport};
use crate::itinerary::{FlightQuery, SearchOutcome};
use crate::models::{
    AirportOption, CabinClass, FlightOffer, PassengerCount, PriceCalendar, SearchCriteria,
    TripType,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("Passenger count must be at least 1")]
    InvalidPassengerCount,

    #[error("Date {date} is before today ({today})")]
    DateInPast { date: NaiveDate, today: NaiveDate },

    #[error("Return date {return_date} is before departure date {departure}")]
    ReturnBeforeDeparture {
        departure: NaiveDate,
        return_date: NaiveDate,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AirportField {
    Origin,
    Destination,
}

// What happens to the shown offers when a search fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    #[default]
    Clear,
    KeepPrevious,
}

#[derive(Debug, Clone, Default)]
pub struct FormConfig {
    pub flight_failure_policy: FailurePolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AirportsLoading { origin: bool, destination: bool },
    PriceCalendarLoading,
    FlightSearchLoading,
    ResultsShown,
}

// Latest-request-wins bookkeeping for one input
#[derive(Debug, Clone, Default)]
struct Sequencer {
    issued: u64,
    in_flight: usize,
}

impl Sequencer {
    fn issue(&mut self) -> u64 {
        self.issued += 1;
        self.in_flight += 1;
        self.issued
    }

    // Makes every outstanding completion stale without issuing a request
    fn invalidate(&mut self) {
        self.issued += 1;
    }

    // True when `seq` is still the newest request for this input
    fn complete(&mut self, seq: u64) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);
        seq == self.issued
    }

    fn is_loading(&self) -> bool {
        self.in_flight > 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarRequest {
    pub origin: AirportOption,
    pub destination: AirportOption,
    pub seq: u64,
}

// The state of one form session.
// All transitions are plain methods so the state machine can be exercised
// without any network. Lookup results are applied through a sequence number
// returned when the lookup was started; results from a superseded lookup are
// dropped.
#[derive(Debug, Clone, Default)]
pub struct FormState {
    criteria: SearchCriteria,
    origin_options: Vec<AirportOption>,
    destination_options: Vec<AirportOption>,
    prices: PriceCalendar,
    offers: Vec<FlightOffer>,
    results_shown: bool,
    origin_lookups: Sequencer,
    destination_lookups: Sequencer,
    calendar_lookups: Sequencer,
}

impl FormState {
    pub fn criteria(&self) -> &SearchCriteria {
        &self.criteria
    }

    pub fn options(&self, field: AirportField) -> &[AirportOption] {
        match field {
            AirportField::Origin => &self.origin_options,
            AirportField::Destination => &self.destination_options,
        }
    }

    pub fn prices(&self) -> &PriceCalendar {
        &self.prices
    }

    pub fn offers(&self) -> &[FlightOffer] {
        &self.offers
    }

    pub fn results_shown(&self) -> bool {
        self.results_shown
    }

    fn lookups_mut(&mut self, field: AirportField) -> &mut Sequencer {
        match field {
            AirportField::Origin => &mut self.origin_lookups,
            AirportField::Destination => &mut self.destination_lookups,
        }
    }

    pub fn begin_airport_lookup(&mut self, field: AirportField) -> u64 {
        self.lookups_mut(field).issue()
    }

    // Input was cleared; pending lookups for the field no longer apply
    pub fn cancel_airport_lookups(&mut self, field: AirportField) {
        self.lookups_mut(field).invalidate();
    }

    pub fn finish_airport_lookup(
        &mut self,
        field: AirportField,
        seq: u64,
        options: Vec<AirportOption>,
    ) -> bool {
        if !self.lookups_mut(field).complete(seq) {
            debug!(?field, seq, "discarding stale airport suggestions");
            return false;
        }
        match field {
            AirportField::Origin => self.origin_options = options,
            AirportField::Destination => self.destination_options = options,
        }
        true
    }

    // The calendar belongs to the previous pair once the origin changes; the next
    // destination selection loads a new one
    pub fn select_origin(&mut self, origin: Option<AirportOption>) {
        if self.criteria.origin != origin {
            self.calendar_lookups.invalidate();
            self.prices = PriceCalendar::default();
        }
        self.criteria.origin = origin;
    }

    // Stores the destination and, when both airports are known, starts a
    // price calendar lookup for the pair.
    // Without a complete pair the calendar is emptied and any outstanding
    // calendar lookup is superseded.
    pub fn select_destination(
        &mut self,
        destination: Option<AirportOption>,
    ) -> Option<CalendarRequest> {
        self.criteria.destination = destination;

        match (&self.criteria.origin, &self.criteria.destination) {
            (Some(origin), Some(destination)) => Some(CalendarRequest {
                origin: origin.clone(),
                destination: destination.clone(),
                seq: self.calendar_lookups.issue(),
            }),
            _ => {
                self.calendar_lookups.invalidate();
                self.prices = PriceCalendar::default();
                None
            }
        }
    }

    // Failed lookups arrive here as an empty calendar
    pub fn finish_price_calendar(&mut self, seq: u64, prices: PriceCalendar) -> bool {
        if !self.calendar_lookups.complete(seq) {
            debug!(seq, "discarding stale price calendar");
            return false;
        }
        self.prices = prices;
        true
    }

    pub fn set_trip_type(&mut self, trip_type: TripType) {
        self.criteria.trip_type = trip_type;
    }

    pub fn set_cabin_class(&mut self, cabin_class: CabinClass) {
        self.criteria.cabin_class = cabin_class;
    }

    pub fn set_passengers(&mut self, count: u32) -> Result<(), FormError> {
        self.criteria.passengers =
            PassengerCount::new(count).ok_or(FormError::InvalidPassengerCount)?;
        Ok(())
    }

    pub fn set_departure_date(
        &mut self,
        date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<(), FormError> {
        if let Some(date) = date {
            if date < today {
                return Err(FormError::DateInPast { date, today });
            }
            if self.criteria.return_date.is_some_and(|r| r < date) {
                debug!(%date, "departure moved past return date, clearing return date");
                self.criteria.return_date = None;
            }
        }
        self.criteria.departure_date = date;
        Ok(())
    }

    pub fn set_return_date(
        &mut self,
        date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<(), FormError> {
        if let Some(date) = date {
            if date < today {
                return Err(FormError::DateInPast { date, today });
            }
            if let Some(departure) = self.criteria.departure_date {
                if date < departure {
                    return Err(FormError::ReturnBeforeDeparture {
                        departure,
                        return_date: date,
                    });
                }
            }
        }
        self.criteria.return_date = date;
        Ok(())
    }

    pub fn finish_search(&mut self, outcome: &SearchOutcome, policy: FailurePolicy) {
        match outcome {
            SearchOutcome::Skipped => {}
            SearchOutcome::Completed(offers) => {
                self.offers = offers.clone();
                self.results_shown = true;
            }
            SearchOutcome::Failed => {
                if policy == FailurePolicy::Clear {
                    self.offers.clear();
                }
            }
        }
    }

    pub fn phase(&self, searching: bool) -> Phase {
        if searching {
            return Phase::FlightSearchLoading;
        }
        if self.calendar_lookups.is_loading() {
            return Phase::PriceCalendarLoading;
        }
        let origin = self.origin_lookups.is_loading();
        let destination = self.destination_lookups.is_loading();
        if origin || destination {
            return Phase::AirportsLoading {
                origin,
                destination,
            };
        }
        if self.results_shown {
            Phase::ResultsShown
        } else {
            Phase::Idle
        }
    }
}

// Shared "search in progress" indicator.
#[derive(Debug, Clone, Default)]
pub struct BusyFlag(Arc<AtomicBool>);

impl BusyFlag {
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    // None when already set; the flag clears when the guard drops
    pub fn try_acquire(&self) -> Option<BusyGuard> {
        self.0
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| BusyGuard(self.0.clone()))
    }
}

#[derive(Debug)]
pub struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

type Today = Box<dyn Fn() -> NaiveDate + Send + Sync>;

pub struct SearchForm<T> {
    api: FlightApi<T>,
    config: FormConfig,
    state: Mutex<FormState>,
    busy: BusyFlag,
    today: Today,
}

impl<T: HttpTransport> SearchForm<T> {
    pub fn new(api: FlightApi<T>) -> Self {
        Self::with_config(api, FormConfig::default())
    }

    pub fn with_config(api: FlightApi<T>, config: FormConfig) -> Self {
        Self {
            api,
            config,
            state: Mutex::new(FormState::default()),
            busy: BusyFlag::default(),
            today: Box::new(|| Local::now().date_naive()),
        }
    }

    // Replaces the local clock used for "today"
    pub fn with_today(mut self, today: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.today = Box::new(today);
        self
    }

    pub fn api(&self) -> &FlightApi<T> {
        &self.api
    }

    pub fn today(&self) -> NaiveDate {
        (self.today)()
    }

    pub fn busy_flag(&self) -> BusyFlag {
        self.busy.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_set()
    }

    pub fn snapshot(&self) -> FormState {
        self.state.lock().clone()
    }

    pub fn criteria(&self) -> SearchCriteria {
        self.state.lock().criteria.clone()
    }

    pub fn offers(&self) -> Vec<FlightOffer> {
        self.state.lock().offers.clone()
    }

    pub fn options(&self, field: AirportField) -> Vec<AirportOption> {
        self.state.lock().options(field).to_vec()
    }

    pub fn prices(&self) -> PriceCalendar {
        self.state.lock().prices.clone()
    }

    pub fn phase(&self) -> Phase {
        self.state.lock().phase(self.busy.is_set())
    }

    // Handles text typed into an airport field by refreshing its suggestions.
    // Empty text sends nothing and leaves the current suggestions in place.
    pub async fn on_airport_input(&self, field: AirportField, text: &str) {
        if text.is_empty() {
            self.state.lock().cancel_airport_lookups(field);
            return;
        }

        let seq = self.state.lock().begin_airport_lookup(field);
        let options = self.api.lookup_airports(text).await;
        self.state.lock().finish_airport_lookup(field, seq, options);
    }

    pub async fn on_origin_input(&self, text: &str) {
        self.on_airport_input(AirportField::Origin, text).await
    }

    pub async fn on_destination_input(&self, text: &str) {
        self.on_airport_input(AirportField::Destination, text).await
    }

    pub fn select_origin(&self, origin: Option<AirportOption>) {
        self.state.lock().select_origin(origin);
    }

    pub async fn select_destination(&self, destination: Option<AirportOption>) {
        let request = self.state.lock().select_destination(destination);
        let Some(request) = request else {
            return;
        };

        let prices = self
            .api
            .lookup_price_calendar(&request.origin, &request.destination, self.today())
            .await;
        self.state
            .lock()
            .finish_price_calendar(request.seq, prices);
    }

    pub fn set_trip_type(&self, trip_type: TripType) {
        self.state.lock().set_trip_type(trip_type);
    }

    pub fn set_cabin_class(&self, cabin_class: CabinClass) {
        self.state.lock().set_cabin_class(cabin_class);
    }

    pub fn set_passengers(&self, count: u32) -> Result<(), FormError> {
        self.state.lock().set_passengers(count)
    }

    pub fn set_departure_date(&self, date: Option<NaiveDate>) -> Result<(), FormError> {
        let today = self.today();
        self.state.lock().set_departure_date(date, today)
    }

    pub fn set_return_date(&self, date: Option<NaiveDate>) -> Result<(), FormError> {
        let today = self.today();
        self.state.lock().set_return_date(date, today)
    }

    // Runs the itinerary search for the current criteria.
    // Does nothing when the criteria are incomplete or a search is already
    // running. The busy flag is set for exactly the duration of the request.
    pub async fn search(&self) -> SearchOutcome {
        let criteria = self.criteria();
        if FlightQuery::from_criteria(&criteria).is_none() {
            debug!("search requested with incomplete criteria");
            return SearchOutcome::Skipped;
        }

        let Some(_busy) = self.busy.try_acquire() else {
            debug!("search already in progress");
            return SearchOutcome::Skipped;
        };

        let outcome = self.api.search_flights(&criteria).await;
        if let SearchOutcome::Completed(offers) = &outcome {
            info!(count = offers.len(), "flight search completed");
        }
        self.state
            .lock()
            .finish_search(&outcome, self.config.flight_failure_policy);
        outcome
    }
}
