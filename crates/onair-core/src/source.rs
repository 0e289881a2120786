//! Schedule byte streams.

use std::io::Read;
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{debug, info};

use crate::config::FetchConfig;
use crate::error::SourceError;

/// Opens the schedule page for a given day.
pub trait ScheduleSource {
    /// `date_key` is the UTC day as `YYYYMMDD`.
    fn open(&mut self, date_key: &str) -> Result<Box<dyn Read>, SourceError>;
}

impl<T: ScheduleSource + ?Sized> ScheduleSource for Box<T> {
    fn open(&mut self, date_key: &str) -> Result<Box<dyn Read>, SourceError> {
        (**self).open(date_key)
    }
}

/// Fetches `{url_prefix}{date_key}` over HTTP(S).
///
/// The body is handed out as a stream; nothing is buffered beyond what
/// the caller reads.
pub struct HttpSource {
    client: Client,
    url_prefix: String,
}

impl HttpSource {
    /// # Errors
    ///
    /// Returns an error if the prefix is not a URL or the HTTP client
    /// cannot be built.
    pub fn new(fetch: &FetchConfig) -> Result<Self, SourceError> {
        url::Url::parse(&fetch.url_prefix)
            .map_err(|_| SourceError::InvalidUrl(fetch.url_prefix.clone()))?;

        let client = Client::builder()
            .user_agent(fetch.user_agent.clone())
            .timeout(fetch.timeout_secs.map(Duration::from_secs))
            .build()?;

        Ok(Self {
            client,
            url_prefix: fetch.url_prefix.clone(),
        })
    }

    pub fn url_for(&self, date_key: &str) -> String {
        format!("{}{}", self.url_prefix, date_key)
    }
}

impl ScheduleSource for HttpSource {
    fn open(&mut self, date_key: &str) -> Result<Box<dyn Read>, SourceError> {
        let url = self.url_for(date_key);
        debug!(%url, "requesting schedule");

        let resp = self.client.get(&url).send()?;
        let status = resp.status();
        info!(%url, status = status.as_u16(), "schedule page response");
        if !status.is_success() {
            return Err(SourceError::Status {
                url,
                status: status.as_u16(),
            });
        }
        Ok(Box::new(resp))
    }
}
