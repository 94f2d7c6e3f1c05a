//! Threshold state machine for a monitored service.

use serde::Deserialize;
use serde::Serialize;

/// Whether a monitored service is currently considered down.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceStatus {
    #[default]
    Normal,
    Failing,
}

impl ServiceStatus {
    pub fn is_failing(self) -> bool {
        self == ServiceStatus::Failing
    }

    pub fn from_failing(is_failing: bool) -> Self {
        if is_failing {
            ServiceStatus::Failing
        } else {
            ServiceStatus::Normal
        }
    }
}

/// Direction of a status change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutageTransition {
    Started,
    Resolved,
}

/// Decides status changes from hourly report counts.
///
/// A service is failing while its hourly count is at or above the threshold. Only changes of
/// status produce a transition, so a persisting outage is reported once.
#[derive(Clone, Copy, Debug)]
pub struct StatusTracker {
    threshold: u32,
}

impl StatusTracker {
    pub fn new(threshold: u32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn transition(
        &self,
        previous: ServiceStatus,
        hourly_count: u32,
    ) -> (ServiceStatus, Option<OutageTransition>) {
        let failing_now = hourly_count >= self.threshold;
        match (previous, failing_now) {
            (ServiceStatus::Normal, true) => {
                (ServiceStatus::Failing, Some(OutageTransition::Started))
            }
            (ServiceStatus::Failing, false) => {
                (ServiceStatus::Normal, Some(OutageTransition::Resolved))
            }
            (status, _) => (status, None),
        }
    }
}
