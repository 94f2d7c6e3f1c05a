use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use sqlx::FromRow;

/// A registered chat user eligible to receive notifications.
///
/// Rows are never deleted. `is_blocked` only ever goes from `false` to `true`, when a delivery
/// proves the user unreachable.
#[derive(FromRow, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SubscriberModel {
    /// Telegram user id.
    pub id: i64,
    pub name: Option<String>,
    /// Id of the subscriber whose referral link was used. May point at an unregistered id.
    pub referrer_id: Option<i64>,
    pub joined_at: DateTime<Utc>,
    pub is_blocked: bool,
}

impl Default for SubscriberModel {
    fn default() -> Self {
        Self {
            id: 0,
            name: None,
            referrer_id: None,
            joined_at: Utc::now(),
            is_blocked: false,
        }
    }
}

impl SubscriberModel {
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("id:{}", self.id),
        }
    }
}

/// A message that was broadcast to subscribers, kept for the "recent incidents" view.
#[derive(FromRow, Serialize, Clone, Debug)]
pub struct BroadcastModel {
    pub id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Default for BroadcastModel {
    fn default() -> Self {
        Self {
            id: 0,
            text: String::new(),
            created_at: Utc::now(),
        }
    }
}

/// Last observed state of a monitored service. Only written when outage state persistence is
/// enabled.
#[derive(FromRow, Serialize, Clone, Debug, PartialEq)]
pub struct ServiceStateModel {
    pub name: String,
    pub is_failing: bool,
    pub hourly_count: i64,
    pub daily_count: i64,
    pub updated_at: DateTime<Utc>,
}

/// A subscriber id with the number of users it referred.
#[derive(FromRow, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ReferrerEntry {
    pub id: i64,
    pub name: Option<String>,
    pub count: i64,
}

impl ReferrerEntry {
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("id:{}", self.id),
        }
    }
}

#[derive(FromRow, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct SubscriberStats {
    pub total: i64,
    pub blocked: i64,
    pub new_today: i64,
    pub new_this_week: i64,
    pub new_this_month: i64,
}
