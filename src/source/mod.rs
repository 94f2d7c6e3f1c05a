//! Outage report sources.
//!
//! A source turns a service's report page into an [`OutageSample`]. Sources never fail: any
//! fetch or parse problem degrades to [`OutageSample::empty`] so a single broken page can't stop
//! a poll cycle.

pub mod downdetector_source;
pub mod error;
pub mod report_parser;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

/// One observation of a service's report page.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutageSample {
    /// Reports during the last hour.
    pub hourly_count: u32,
    /// Reports during the last day.
    pub daily_count: u32,
    /// Report counts of the chart on the page, oldest first.
    pub series: Vec<u32>,
}

impl OutageSample {
    /// The zeroed sample returned when a page can't be fetched or understood.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::empty()
    }
}

#[async_trait]
pub trait OutageSource: Send + Sync {
    /// Fetches and parses the report page at `url`.
    ///
    /// Never fails. Implementations return [`OutageSample::empty`] on any error.
    async fn fetch_sample(&self, url: &str) -> OutageSample;
}
