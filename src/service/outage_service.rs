//! Tracks the outage status of every monitored service.

use std::sync::Arc;

use chrono::Utc;
use log::debug;
use log::info;
use log::warn;
use tokio::sync::RwLock;

use crate::config::MonitoredServiceConfig;
use crate::monitor::MonitoredService;
use crate::monitor::OutageEvent;
use crate::monitor::status_tracker::StatusTracker;
use crate::repository::Repository;
use crate::repository::table::Table;
use crate::service::error::ServiceError;
use crate::source::OutageSample;
use crate::source::OutageSource;

pub struct OutageService {
    db: Arc<Repository>,
    source: Arc<dyn OutageSource>,
    tracker: StatusTracker,
    services: RwLock<Vec<MonitoredService>>,
    persist_state: bool,
}

impl OutageService {
    /// Every service starts as normal. Call [`Self::load_persisted_states`] to warm-start.
    pub fn new(
        db: Arc<Repository>,
        source: Arc<dyn OutageSource>,
        threshold: u32,
        services: &[MonitoredServiceConfig],
        persist_state: bool,
    ) -> Self {
        Self {
            db,
            source,
            tracker: StatusTracker::new(threshold),
            services: RwLock::new(services.iter().map(MonitoredService::from).collect()),
            persist_state,
        }
    }

    pub fn threshold(&self) -> u32 {
        self.tracker.threshold()
    }

    /// Restores status from the store when persistence is enabled.
    ///
    /// Returns the number of services restored.
    pub async fn load_persisted_states(&self) -> Result<usize, ServiceError> {
        if !self.persist_state {
            return Ok(0);
        }

        let states = self.db.service_state.select_all().await?;

        let mut restored = 0;
        let mut services = self.services.write().await;
        for service in services.iter_mut() {
            if let Some(state) = states.iter().find(|state| state.name == service.name) {
                service.restore(state);
                restored += 1;
            }
        }
        info!("Restored outage state of {restored} services.");
        Ok(restored)
    }

    pub async fn service_names(&self) -> Vec<String> {
        self.services
            .read()
            .await
            .iter()
            .map(|service| service.name.clone())
            .collect()
    }

    pub async fn get_service(&self, name: &str) -> Option<MonitoredService> {
        self.services
            .read()
            .await
            .iter()
            .find(|service| service.name == name)
            .cloned()
    }

    /// Fetches a fresh sample of `name` and advances its status.
    ///
    /// Returns the event to announce when the status changed.
    ///
    /// # Performance
    /// * DB calls: 0 or 1 (with persistence)
    pub async fn check_service(&self, name: &str) -> Result<Option<OutageEvent>, ServiceError> {
        let url = self.service_url(name).await?;

        // The lock is not held across the fetch
        let sample = self.source.fetch_sample(&url).await;
        let observed_at = Utc::now();

        let (event, state) = {
            let mut services = self.services.write().await;
            let service = services
                .iter_mut()
                .find(|service| service.name == name)
                .ok_or_else(|| ServiceError::UnknownService {
                    name: name.to_string(),
                })?;

            let (status, transition) = self.tracker.transition(service.status, sample.hourly_count);
            service.status = status;
            service.last_hourly_count = sample.hourly_count;
            service.last_daily_count = sample.daily_count;
            service.last_checked = Some(observed_at);
            debug!(
                "Service {name}: hourly {}, daily {}, status {status:?}",
                sample.hourly_count, sample.daily_count
            );

            let event = transition.map(|transition| OutageEvent {
                service: service.name.clone(),
                transition,
                sample,
                observed_at,
            });
            (event, service.to_state_model())
        };

        if self.persist_state {
            // DB 1
            if let Err(e) = self.db.service_state.replace(&state).await {
                warn!("Failed to persist outage state of {name}: {e}");
            }
        }

        Ok(event)
    }

    /// Fetches a sample of `name` without touching its status.
    pub async fn live_sample(&self, name: &str) -> Result<OutageSample, ServiceError> {
        let url = self.service_url(name).await?;
        Ok(self.source.fetch_sample(&url).await)
    }

    async fn service_url(&self, name: &str) -> Result<String, ServiceError> {
        self.get_service(name)
            .await
            .map(|service| service.url)
            .ok_or_else(|| ServiceError::UnknownService {
                name: name.to_string(),
            })
    }
}
