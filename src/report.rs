// Text rendering of search results and calendar price hints
use std::fmt::Write;

use chrono::{NaiveDate, NaiveDateTime};

use crate::models::{FlightOffer, PriceCalendar};

const HEADERS: [&str; 6] = [
    "Airline",
    "Departure Time",
    "Arrival Time",
    "Duration",
    "Stops",
    "Price",
];

// 12-hour wall clock, e.g. "8:05 AM"
pub fn format_clock(time: Option<NaiveDateTime>) -> String {
    time.map(|t| t.format("%-I:%M %p").to_string())
        .unwrap_or_default()
}

// Label shown under a day in the date picker
pub fn price_hint(calendar: &PriceCalendar, date: NaiveDate) -> String {
    match calendar.price_on(date) {
        Some(price) if price > 0.0 => format!("${price}"),
        _ => "-".to_string(),
    }
}

fn row(offer: &FlightOffer) -> [String; 6] {
    [
        offer.airline.clone(),
        format_clock(offer.departure_time),
        format_clock(offer.arrival_time),
        offer.duration_label(),
        offer.stop_count.to_string(),
        offer.formatted_price.clone(),
    ]
}

// Renders offers as an aligned text table.
// An empty slice renders as an empty string; there is no table to show.
pub fn render_results_table(offers: &[FlightOffer]) -> String {
    if offers.is_empty() {
        return String::new();
    }

    let rows: Vec<[String; 6]> = offers.iter().map(row).collect();
    let mut widths = HEADERS.map(str::len);
    for cells in &rows {
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let header = HEADERS.map(str::to_string);
    push_line(&mut out, &header, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_line(&mut out, &rule, &widths);
    for cells in &rows {
        push_line(&mut out, cells, &widths);
    }
    out
}

fn push_line(out: &mut String, cells: &[String], widths: &[usize; 6]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join(" | ");
    // Writing to a String cannot fail
    let _ = writeln!(out, "{}", line.trim_end());
}
