pub mod models;

use chrono::{DateTime, SecondsFormat, Utc};
use google_cloud_auth::token::DefaultTokenSourceProvider;
use google_cloud_token::{TokenSource, TokenSourceProvider};
use http::Extensions;
use indexmap::IndexMap;
use reqwest::header::{ACCEPT_ENCODING, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Request, Response};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, Middleware, Next};
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Error while authenticating with google.
    #[error("failed to authenticate: {0}")]
    GCloudAuth(#[from] google_cloud_auth::error::Error),

    /// Error while making a http request.
    #[error("failure requesting remote resource: {0}")]
    Request(#[from] reqwest::Error),

    /// Error while executing some middleware code.
    #[error("request middleware failed with: {0}")]
    RequestMiddleware(#[from] reqwest_middleware::Error),

    /// Error while building http headers.
    #[error("encountered invalid HTTP header value: {0}")]
    InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),

    /// Error when neither a configured calendar id nor `GOOGLE_CALENDAR_ID` is available.
    #[error("missing calendar id; set `calendar.calendar_id` or `GOOGLE_CALENDAR_ID`")]
    MissingCalendarID,

    /// Error while obtaining an authentication token.
    #[error("failed to obtain authentication token: {0}")]
    Token(String),
}

impl From<ClientError> for reqwest_middleware::Error {
    fn from(err: ClientError) -> Self {
        reqwest_middleware::Error::Middleware(anyhow::Error::new(err))
    }
}

struct AuthMiddleware {
    token_source: Arc<dyn TokenSource>,
}

impl AuthMiddleware {
    fn new(token_source: Arc<dyn TokenSource>) -> AuthMiddleware {
        AuthMiddleware { token_source }
    }
}

#[async_trait::async_trait]
impl Middleware for AuthMiddleware {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let token = self
            .token_source
            .token()
            .await
            .map_err(|err| ClientError::Token(err.to_string()))?;

        let mut header = HeaderValue::try_from(token).map_err(ClientError::from)?;
        header.set_sensitive(true);
        req.headers_mut().insert(AUTHORIZATION, header);
        next.run(req, extensions).await
    }
}

/// Google calendar client for listing the events of a single calendar.
#[derive(Debug)]
pub struct GoogleCalendarClient {
    client: ClientWithMiddleware,
    calendar_id: String,
}

impl GoogleCalendarClient {
    /// Create a new google calendar client. Service account credentials are looked up from the
    /// environment, either via the GOOGLE_APPLICATION_CREDENTIALS variable pointing to the json
    /// key file generated in the google cloud console or via the
    /// GOOGLE_APPLICATION_CREDENTIALS_JSON variable containing the content of said json file.
    /// When `calendar_id` is `None`, the id is read from the GOOGLE_CALENDAR_ID variable.
    pub async fn new(calendar_id: Option<String>) -> Result<GoogleCalendarClient, ClientError> {
        let calendar_id = match calendar_id.or_else(|| std::env::var("GOOGLE_CALENDAR_ID").ok()) {
            Some(calendar_id) => calendar_id,
            None => return Err(ClientError::MissingCalendarID),
        };

        // We only need readonly access.
        let scopes = ["https://www.googleapis.com/auth/calendar.readonly"];
        let config = google_cloud_auth::project::Config::default().with_scopes(&scopes);

        let token_source = DefaultTokenSourceProvider::new(config)
            .await?
            .token_source();

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_str("gzip")?);

        let client = ClientBuilder::new(
            reqwest::Client::builder()
                .default_headers(headers)
                .timeout(Duration::from_secs(10))
                .build()?,
        )
        .with(AuthMiddleware::new(token_source))
        .build();

        Ok(GoogleCalendarClient {
            client,
            calendar_id,
        })
    }

    /// Queries a single page of events from the google calendar. The query can be filtered by a
    /// date range and the number of results can be limited, in which case the result might carry
    /// a page token that should be passed to the next request to get the next page of events.
    pub async fn get_events(
        &self,
        date_range: Option<Range<DateTime<Utc>>>,
        event_count: Option<u32>,
        next_page_token: Option<String>,
    ) -> Result<(Vec<models::Event>, Option<String>), ClientError> {
        let events_request = self.client.get(format!(
            "https://www.googleapis.com/calendar/v3/calendars/{}/events",
            self.calendar_id
        ));

        let query = build_query_parameters(&date_range, &event_count, &next_page_token);

        let events = events_request
            .query(&query)
            .send()
            .await?
            .error_for_status()?
            .json::<models::Events>()
            .await?;

        log::debug!("fetched {} events from Google Calendar", events.items.len());

        Ok((events.items, events.next_page_token))
    }

    /// Queries all events in `date_range`, following page tokens until the last page.
    pub async fn get_all_events(
        &self,
        date_range: Option<Range<DateTime<Utc>>>,
        page_size: Option<u32>,
    ) -> Result<Vec<models::Event>, ClientError> {
        let mut events = Vec::new();
        let mut page_token = None;

        loop {
            let (page, next_page_token) = self
                .get_events(date_range.clone(), page_size, page_token)
                .await?;
            events.extend(page);

            match next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(events)
    }
}

fn build_query_parameters(
    date_range: &Option<Range<DateTime<Utc>>>,
    event_count: &Option<u32>,
    next_page_token: &Option<String>,
) -> IndexMap<&'static str, String> {
    // Google requires rfc3339 format for the times with a fixed offset
    // see: https://developers.google.com/calendar/api/v3/reference/events/list

    let mut query_parameters: IndexMap<&'static str, String> = IndexMap::from([
        // expand recurring events into single instances
        ("singleEvents", "true".to_owned()),
        // order ascending by start time
        ("orderBy", "startTime".to_owned()),
    ]);

    if let Some(range) = date_range {
        // limit the events by a time frame
        query_parameters.insert(
            "timeMin",
            range.start.to_rfc3339_opts(SecondsFormat::Secs, true),
        );
        query_parameters.insert(
            "timeMax",
            range.end.to_rfc3339_opts(SecondsFormat::Secs, true),
        );
    }

    if let Some(count) = event_count {
        // limit the number of events per page
        query_parameters.insert("maxResults", count.to_string());
    }

    if let Some(token) = next_page_token {
        // page token returned by previous request to fetch the next page
        query_parameters.insert("pageToken", token.clone());
    }

    query_parameters
}
