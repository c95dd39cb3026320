pub mod google;

use super::Result;
use crate::CalendarConfig;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use google::GoogleCalendarClient;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Start of a calendar event, as delivered by the calendar.
///
/// Timed events carry an RFC 3339 `dateTime`, all-day events only a `date`.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EventStart {
    /// Start date and time, e.g. `2020-05-20T07:30:00-04:00`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    /// Start date of an all-day event, e.g. `2020-05-20`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl EventStart {
    /// Creates the start of a timed event.
    pub fn date_time<S: Into<String>>(date_time: S) -> EventStart {
        EventStart {
            date_time: Some(date_time.into()),
            date: None,
        }
    }

    /// Creates the start of an all-day event.
    pub fn date<S: Into<String>>(date: S) -> EventStart {
        EventStart {
            date_time: None,
            date: Some(date.into()),
        }
    }

    /// The start as received, preferring the date-time over the plain date.
    pub fn as_str(&self) -> Option<&str> {
        self.date_time.as_deref().or(self.date.as_deref())
    }

    /// The start as a UTC instant. All-day events start at midnight UTC.
    ///
    /// Returns `None` if the start is missing or malformed.
    pub fn instant(&self) -> Option<NaiveDateTime> {
        match (&self.date_time, &self.date) {
            (Some(date_time), _) => DateTime::parse_from_rfc3339(date_time)
                .ok()
                .map(|dt| dt.naive_utc()),
            (None, Some(date)) => NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0)),
            (None, None) => None,
        }
    }
}

/// Represents a single calendar event.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// The event title.
    #[serde(alias = "summary", default)]
    pub title: String,
    /// The start of the event.
    pub start: EventStart,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.title.fmt(f)
    }
}

/// Represents sources of calendar events.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EventSourceKind {
    /// Use static events from the application configuration.
    Static,
    /// Load events from Google Calendar.
    GoogleCalendar,
}

/// Trait that needs to be implemented by a source of calendar events.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Fetches events from the source.
    async fn fetch_events(&self) -> Result<Vec<Event>>;
}

/// An `EventSource` that returns events from a static list.
pub struct StaticEventSource {
    events: Vec<Event>,
}

impl StaticEventSource {
    /// Creates a new `StaticEventSource` from an iterator.
    pub fn new<I>(iter: I) -> StaticEventSource
    where
        I: IntoIterator,
        I::Item: Into<Event>,
    {
        StaticEventSource {
            events: iter.into_iter().map(Into::into).collect(),
        }
    }

    /// Reads events from a JSON file containing either a list of events or a Google Calendar
    /// `events.list` response with an `items` list.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<StaticEventSource> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum EventsFile {
            List(Vec<Event>),
            Response { items: Vec<Event> },
        }

        let contents = fs::read_to_string(path)?;

        let events = match serde_json::from_str(&contents)? {
            EventsFile::List(events) => events,
            EventsFile::Response { items } => items,
        };

        Ok(StaticEventSource::new(events))
    }
}

#[async_trait]
impl EventSource for StaticEventSource {
    async fn fetch_events(&self) -> Result<Vec<Event>> {
        Ok(self.events.clone())
    }
}

/// An `EventSource` that lists the events of a Google calendar.
#[derive(Debug)]
pub struct GoogleCalendarEventSource {
    client: GoogleCalendarClient,
    lookback: Duration,
    page_size: u32,
}

impl GoogleCalendarEventSource {
    pub async fn new(config: &CalendarConfig) -> Result<GoogleCalendarEventSource> {
        Ok(GoogleCalendarEventSource {
            client: GoogleCalendarClient::new(config.calendar_id.clone()).await?,
            lookback: Duration::days(config.lookback_days),
            page_size: config.max_results,
        })
    }
}

impl From<google::models::Event> for Event {
    fn from(ev: google::models::Event) -> Self {
        Self {
            title: ev.summary.unwrap_or_default(),
            start: EventStart {
                date_time: ev.start.date_time,
                date: ev.start.date,
            },
        }
    }
}

#[async_trait]
impl EventSource for GoogleCalendarEventSource {
    async fn fetch_events(&self) -> Result<Vec<Event>> {
        let now = Utc::now();
        let start = now - self.lookback;
        let end = now + Duration::days(1);

        let events = self
            .client
            .get_all_events(Some(start..end), Some(self.page_size))
            .await?;

        Ok(events.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl<T> EventSource for Box<T>
where
    T: EventSource + ?Sized,
{
    async fn fetch_events(&self) -> Result<Vec<Event>> {
        (**self).fetch_events().await
    }
}

#[async_trait]
impl<T> EventSource for Arc<T>
where
    T: EventSource + ?Sized,
{
    async fn fetch_events(&self) -> Result<Vec<Event>> {
        (**self).fetch_events().await
    }
}

/// The `Calendar` type wraps an event source with additional functionality.
#[derive(Clone)]
pub struct Calendar {
    event_source: Arc<dyn EventSource>,
}

impl Calendar {
    /// Creates a new `Calendar` from an event source.
    pub fn new<T>(event_source: T) -> Calendar
    where
        T: EventSource + 'static,
    {
        Calendar {
            event_source: Arc::new(event_source),
        }
    }

    /// Creates a new `Calendar` from configuration.
    pub async fn from_config(config: &CalendarConfig) -> Result<Calendar> {
        let event_source: Box<dyn EventSource> = match config.event_source {
            EventSourceKind::Static => Box::new(StaticEventSource::new(config.events.clone())),
            EventSourceKind::GoogleCalendar => {
                Box::new(GoogleCalendarEventSource::new(config).await?)
            }
        };

        Ok(Calendar::new(event_source))
    }

    /// Fetches all events from the source, ordered ascending by start.
    pub async fn fetch_events(&self) -> Result<Vec<Event>> {
        log::debug!("fetching calendar events");

        let mut events = self.event_source.fetch_events().await?;

        log::info!("fetched {} calendar events", events.len());

        // Ensure events are always sorted by start. Events without a valid start sort first and
        // are rejected later if they turn out to be runs.
        events.sort_by_key(|event| event.start.instant());

        Ok(events)
    }
}
