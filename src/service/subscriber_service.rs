//! Subscriber registration, referrals and statistics.

use std::sync::Arc;

use chrono::FixedOffset;
use chrono::Utc;

use crate::model::ReferrerEntry;
use crate::model::SubscriberModel;
use crate::model::SubscriberStats;
use crate::repository::Repository;
use crate::repository::table::Table;
use crate::service::error::ServiceError;
use crate::util::stats_windows;

pub struct SubscriberService {
    db: Arc<Repository>,
    display_offset: FixedOffset,
}

impl SubscriberService {
    pub fn new(db: Arc<Repository>, display_offset: FixedOffset) -> Self {
        Self { db, display_offset }
    }

    /// Registers a subscriber on first contact. A second call for the same id changes nothing.
    ///
    /// A referrer equal to the subscriber itself is dropped.
    ///
    /// # Performance
    /// * DB calls: 1 + 1?
    pub async fn register(
        &self,
        id: i64,
        name: Option<&str>,
        referrer_id: Option<i64>,
    ) -> Result<RegisterResult, ServiceError> {
        let model = SubscriberModel {
            id,
            name: name.map(str::to_string),
            referrer_id: referrer_id.filter(|referrer| *referrer != id),
            joined_at: Utc::now(),
            is_blocked: false,
        };

        // DB 1
        if self.db.subscriber.insert_if_absent(&model).await? {
            return Ok(RegisterResult::Created { subscriber: model });
        }

        // DB 1?
        let existing = self.get(id).await?.ok_or_else(|| ServiceError::UnexpectedResult {
            message: format!("Subscriber {id} vanished right after insert was ignored"),
        })?;
        Ok(RegisterResult::AlreadyRegistered {
            subscriber: existing,
        })
    }

    pub async fn get(&self, id: i64) -> Result<Option<SubscriberModel>, ServiceError> {
        Ok(self.db.subscriber.select(&id).await?)
    }

    /// Stores a new display name. Returns `false` when the subscriber is not registered.
    pub async fn rename(&self, id: i64, name: Option<&str>) -> Result<bool, ServiceError> {
        Ok(self.db.subscriber.update_name(id, name).await?)
    }

    /// Renames `subscriber` only when `current_name` differs from the stored one.
    pub async fn refresh_name(
        &self,
        subscriber: &mut SubscriberModel,
        current_name: Option<&str>,
    ) -> Result<bool, ServiceError> {
        if subscriber.name.as_deref() == current_name {
            return Ok(false);
        }
        let renamed = self.rename(subscriber.id, current_name).await?;
        if renamed {
            subscriber.name = current_name.map(str::to_string);
        }
        Ok(renamed)
    }

    pub async fn mark_blocked(&self, id: i64) -> Result<bool, ServiceError> {
        Ok(self.db.subscriber.mark_blocked(id).await?)
    }

    pub async fn list_active(&self) -> Result<Vec<i64>, ServiceError> {
        Ok(self.db.subscriber.select_active_ids().await?)
    }

    pub async fn referral_count(&self, id: i64) -> Result<i64, ServiceError> {
        Ok(self.db.subscriber.count_by_referrer(id).await?)
    }

    /// 1-based position of `id` among all referrers, `None` when nobody used its link.
    pub async fn referral_rank(&self, id: i64) -> Result<Option<usize>, ServiceError> {
        let ranking = self.db.subscriber.select_referrer_ranking(None).await?;
        Ok(ranking
            .iter()
            .position(|entry| entry.id == id)
            .map(|index| index + 1))
    }

    pub async fn top_referrers(&self, limit: u32) -> Result<Vec<ReferrerEntry>, ServiceError> {
        Ok(self
            .db
            .subscriber
            .select_referrer_ranking(Some(limit))
            .await?)
    }

    /// Totals plus subscribers joined today (display timezone), in the last 7 and 30 days.
    pub async fn stats(&self) -> Result<SubscriberStats, ServiceError> {
        let (today, week, month) = stats_windows(Utc::now(), self.display_offset);
        Ok(self.db.subscriber.select_stats(today, week, month).await?)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegisterResult {
    Created { subscriber: SubscriberModel },
    AlreadyRegistered { subscriber: SubscriberModel },
}

impl RegisterResult {
    pub fn subscriber(&self) -> &SubscriberModel {
        match self {
            RegisterResult::Created { subscriber }
            | RegisterResult::AlreadyRegistered { subscriber } => subscriber,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, RegisterResult::Created { .. })
    }
}
