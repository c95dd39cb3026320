//! Extraction of logged runs from calendar events.
//!
//! A run is logged as a calendar event titled like `ran 3.1` or `ran 3.1: easy with Sam`.

use crate::calendar::Event;
use chrono::{DateTime, NaiveDate};
use std::num::ParseFloatError;
use thiserror::Error;

/// Substring identifying an event as a logged run. The distance in miles follows it.
pub const RUN_MARKER: &str = "ran ";

/// A single logged run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    /// Calendar day of the run, used for weekly bucketing.
    pub date: NaiveDate,
    /// The event start as received from the calendar, used for display.
    pub start: String,
    /// Distance in miles.
    pub distance: f64,
}

/// Errors for events that are marked as runs but can't be turned into a `RunRecord`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("invalid mileage {text:?} in event {title:?}")]
    InvalidDistance {
        title: String,
        text: String,
        #[source]
        source: Option<ParseFloatError>,
    },
    #[error("invalid start date {value:?} in event {title:?}")]
    InvalidDate { title: String, value: String },
    #[error("event {title:?} has no start date")]
    MissingStart { title: String },
}

/// Turns a single event into a `RunRecord`.
///
/// Returns `Ok(None)` for events that are not runs.
pub fn parse_run(event: &Event) -> Result<Option<RunRecord>, ParseError> {
    let Some(marker) = event.title.find(RUN_MARKER) else {
        return Ok(None);
    };

    let distance = parse_distance(&event.title, &event.title[marker + RUN_MARKER.len()..])?;

    let start = event.start.as_str().ok_or_else(|| ParseError::MissingStart {
        title: event.title.clone(),
    })?;

    Ok(Some(RunRecord {
        date: parse_date(event, start)?,
        start: start.to_owned(),
        distance,
    }))
}

/// Extracts all runs from `events`, keeping their order. Fails on the first malformed run.
pub fn extract_runs(events: &[Event]) -> Result<Vec<RunRecord>, ParseError> {
    let mut runs = Vec::new();

    for event in events {
        match parse_run(event)? {
            Some(run) => runs.push(run),
            None => log::trace!("skipping event {:?}", event.title),
        }
    }

    Ok(runs)
}

// The mileage ends at the first colon, anything after it is a free-form note.
fn parse_distance(title: &str, rest: &str) -> Result<f64, ParseError> {
    let text = rest.split(':').next().unwrap_or_default().trim();

    let invalid = |source| ParseError::InvalidDistance {
        title: title.to_owned(),
        text: text.to_owned(),
        source,
    };

    let distance: f64 = text.parse().map_err(|err| invalid(Some(err)))?;

    if !distance.is_finite() || distance < 0.0 {
        return Err(invalid(None));
    }

    // `-0` passes the sign check above; report it as a plain zero.
    Ok(distance.abs())
}

fn parse_date(event: &Event, start: &str) -> Result<NaiveDate, ParseError> {
    let parsed = match &event.start.date_time {
        // Keep the calendar day in the event's own offset rather than converting to UTC.
        Some(date_time) => DateTime::parse_from_rfc3339(date_time).map(|dt| dt.date_naive()),
        None => NaiveDate::parse_from_str(start, "%Y-%m-%d"),
    };

    parsed.map_err(|_| ParseError::InvalidDate {
        title: event.title.clone(),
        value: start.to_owned(),
    })
}
