//! HTML report-page source for downdetector-style status sites.

use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use governor::Quota;
use governor::RateLimiter;
use governor::clock::QuantaClock;
use governor::state::InMemoryState;
use governor::state::direct::NotKeyed;
use log::debug;
use log::info;
use log::warn;

use crate::source::OutageSample;
use crate::source::OutageSource;
use crate::source::error::SourceError;
use crate::source::report_parser::parse_report;

const REQUESTS_PER_SECOND: NonZeroU32 = NonZeroU32::new(2).unwrap();

/// Fetches report pages with a browser-like client and parses them with
/// [`parse_report`].
pub struct DowndetectorSource {
    client: wreq::Client,
    limiter: RateLimiter<NotKeyed, InMemoryState, QuantaClock>,
}

impl DowndetectorSource {
    /// Creates a source whose every fetch is bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, SourceError> {
        // Status sites reject obvious bots, so present as a regular browser
        let client = wreq::Client::builder()
            .emulation(wreq_util::Emulation::Chrome137)
            .timeout(timeout)
            .build()?;

        let limiter = RateLimiter::direct(Quota::per_second(REQUESTS_PER_SECOND));

        Ok(Self { client, limiter })
    }

    /// Fetches and parses the page, reporting every failure.
    pub async fn try_fetch_sample(&self, url: &str) -> Result<OutageSample, SourceError> {
        if self.limiter.check().is_err() {
            info!("Report source is ratelimited. Waiting...");
        }
        self.limiter.until_ready().await;

        debug!("Making request to: {url}");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::UnexpectedStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        parse_report(&body)
    }
}

#[async_trait]
impl OutageSource for DowndetectorSource {
    async fn fetch_sample(&self, url: &str) -> OutageSample {
        match self.try_fetch_sample(url).await {
            Ok(sample) => sample,
            Err(e) => {
                warn!("Failed to read report page {url}, using an empty sample: {e}");
                OutageSample::empty()
            }
        }
    }
}
