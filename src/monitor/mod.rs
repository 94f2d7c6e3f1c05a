//! Monitored services and their outage state.

pub mod status_tracker;

use chrono::DateTime;
use chrono::Utc;

use crate::config::MonitoredServiceConfig;
use crate::model::ServiceStateModel;
use crate::monitor::status_tracker::OutageTransition;
use crate::monitor::status_tracker::ServiceStatus;
use crate::source::OutageSample;

/// A third-party service whose outage-report page is polled.
#[derive(Clone, Debug, PartialEq)]
pub struct MonitoredService {
    pub name: String,
    pub url: String,
    pub status: ServiceStatus,
    pub last_hourly_count: u32,
    pub last_daily_count: u32,
    pub last_checked: Option<DateTime<Utc>>,
}

impl MonitoredService {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            status: ServiceStatus::Normal,
            last_hourly_count: 0,
            last_daily_count: 0,
            last_checked: None,
        }
    }

    /// Restores status and counters from a persisted record.
    pub fn restore(&mut self, state: &ServiceStateModel) {
        self.status = ServiceStatus::from_failing(state.is_failing);
        self.last_hourly_count = u32::try_from(state.hourly_count).unwrap_or_default();
        self.last_daily_count = u32::try_from(state.daily_count).unwrap_or_default();
        self.last_checked = Some(state.updated_at);
    }

    pub fn to_state_model(&self) -> ServiceStateModel {
        ServiceStateModel {
            name: self.name.clone(),
            is_failing: self.status.is_failing(),
            hourly_count: i64::from(self.last_hourly_count),
            daily_count: i64::from(self.last_daily_count),
            updated_at: self.last_checked.unwrap_or_else(Utc::now),
        }
    }
}

impl From<&MonitoredServiceConfig> for MonitoredService {
    fn from(config: &MonitoredServiceConfig) -> Self {
        Self::new(&config.name, &config.url)
    }
}

/// Fired when a monitored service starts or stops failing.
#[derive(Clone, Debug, PartialEq)]
pub struct OutageEvent {
    pub service: String,
    pub transition: OutageTransition,
    pub sample: OutageSample,
    pub observed_at: DateTime<Utc>,
}
