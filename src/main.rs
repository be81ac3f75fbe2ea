use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use flight_search::{
    parse_date, price_hint, render_results_table, AirportField, CabinClass, ClientConfig,
    FlightApi, SearchForm, SearchOutcome, TripType,
};

/// Search one-way or round-trip flights between two airports.
#[derive(Debug, Parser)]
#[command(name = "flight-search", version)]
struct Args {
    /// Origin airport or city, e.g. "JFK" or "new york"
    from: String,

    /// Destination airport or city
    to: String,

    /// Departure date (YYYY-MM-DD)
    #[arg(value_parser = parse_cli_date)]
    date: NaiveDate,

    #[arg(long, default_value = "economy", value_parser = parse_cabin)]
    cabin: CabinClass,

    #[arg(long, default_value_t = 1)]
    adults: u32,

    #[arg(long, conflicts_with = "return_date")]
    one_way: bool,

    /// Return date (YYYY-MM-DD) for a round trip
    #[arg(long = "return", value_parser = parse_cli_date)]
    return_date: Option<NaiveDate>,
}

fn parse_cli_date(value: &str) -> Result<NaiveDate, String> {
    parse_date(value).ok_or_else(|| format!("expected YYYY-MM-DD, got {value}"))
}

fn parse_cabin(value: &str) -> Result<CabinClass, String> {
    value.parse()
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let config = ClientConfig::from_env().context("loading provider configuration")?;
    let api = FlightApi::from_config(config).context("building HTTP client")?;
    let form = SearchForm::new(api);

    form.set_cabin_class(args.cabin);
    form.set_passengers(args.adults)?;
    form.set_trip_type(if args.one_way {
        TripType::OneWay
    } else {
        TripType::RoundTrip
    });
    form.set_departure_date(Some(args.date))?;
    form.set_return_date(args.return_date)?;

    futures::join!(
        form.on_origin_input(&args.from),
        form.on_destination_input(&args.to)
    );

    let origin = form
        .options(AirportField::Origin)
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("no airport matches {:?}", args.from))?;
    let destination = form
        .options(AirportField::Destination)
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("no airport matches {:?}", args.to))?;
    info!(origin = %origin, destination = %destination, "airports selected");

    form.select_origin(Some(origin));
    form.select_destination(Some(destination)).await;
    info!(
        date = %args.date,
        calendar_price = %price_hint(&form.prices(), args.date),
        "price calendar hint"
    );

    match form.search().await {
        SearchOutcome::Completed(offers) if offers.is_empty() => {
            println!("No flights found.");
        }
        SearchOutcome::Completed(offers) => {
            print!("{}", render_results_table(&offers));
        }
        SearchOutcome::Failed => bail!("flight search failed, see log for details"),
        SearchOutcome::Skipped => bail!("search criteria incomplete"),
    }

    let stats = form.api().stats();
    info!(
        sent = stats.requests_sent,
        failed = stats.requests_failed,
        "done"
    );
    Ok(())
}
