//! Fanout delivery to every active subscriber and the broadcast history.

use std::fmt;
use std::sync::Arc;

use chrono::FixedOffset;
use chrono::Utc;
use log::debug;
use log::info;
use log::warn;

use crate::model::BroadcastModel;
use crate::repository::Repository;
use crate::repository::table::Table;
use crate::service::error::ServiceError;
use crate::transport::ChatTransport;
use crate::transport::MediaKind;
use crate::transport::error::TransportError;
use crate::transport::escape_html;
use crate::util::start_of_day;

/// What gets delivered to every recipient. Text and captions are plain text.
#[derive(Clone, Debug, PartialEq)]
pub enum BroadcastContent {
    Text(String),
    /// An already uploaded attachment, re-sent by its file id.
    Media {
        kind: MediaKind,
        file_id: String,
        caption: Option<String>,
    },
}

impl BroadcastContent {
    /// Text kept in the broadcast history for this content.
    pub fn record_text(&self) -> String {
        match self {
            BroadcastContent::Text(text) => text.clone(),
            BroadcastContent::Media { kind, caption, .. } => match caption {
                Some(caption) => caption.clone(),
                None => format!("[{}]", kind.field()),
            },
        }
    }
}

/// Outcome counters of one fanout. `delivered + blocked + errors == total`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub blocked: usize,
    pub errors: usize,
    pub total: usize,
}

impl fmt::Display for BroadcastReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "delivered {}, blocked {}, errors {}, total {}",
            self.delivered, self.blocked, self.errors, self.total
        )
    }
}

pub struct BroadcastService {
    db: Arc<Repository>,
    transport: Arc<dyn ChatTransport>,
    display_offset: FixedOffset,
}

impl BroadcastService {
    pub fn new(
        db: Arc<Repository>,
        transport: Arc<dyn ChatTransport>,
        display_offset: FixedOffset,
    ) -> Self {
        Self {
            db,
            transport,
            display_offset,
        }
    }

    /// Attempts delivery of `content` once to every subscriber that has not blocked the bot.
    ///
    /// Recipients are processed one at a time and a failing recipient never stops the rest.
    /// An unreachable recipient is marked blocked for good, any other send error is only
    /// counted. Only a failure to read the recipient list is returned as an error.
    ///
    /// # Performance
    /// * DB calls: 1 + B, where B is the number of newly blocked recipients
    pub async fn fanout(&self, content: &BroadcastContent) -> Result<BroadcastReport, ServiceError> {
        // DB 1
        let recipients = self.db.subscriber.select_active_ids().await?;
        let mut report = BroadcastReport {
            total: recipients.len(),
            ..Default::default()
        };
        info!("Broadcasting to {} subscribers.", report.total);

        for chat_id in recipients {
            match self.deliver(chat_id, content).await {
                Ok(()) => report.delivered += 1,
                Err(e) if e.is_unreachable() => {
                    debug!("Subscriber {chat_id} is unreachable: {e}");
                    report.blocked += 1;
                    // DB B
                    match self.db.subscriber.mark_blocked(chat_id).await {
                        Ok(true) => {}
                        Ok(false) => warn!("Unreachable subscriber {chat_id} is not registered."),
                        Err(e) => warn!("Failed to mark subscriber {chat_id} blocked: {e}"),
                    }
                }
                Err(e) => {
                    warn!("Failed to deliver broadcast to {chat_id}: {e}");
                    report.errors += 1;
                }
            }
        }

        info!("Broadcast finished: {report}.");
        Ok(report)
    }

    async fn deliver(&self, chat_id: i64, content: &BroadcastContent) -> Result<(), TransportError> {
        match content {
            BroadcastContent::Text(text) => {
                self.transport
                    .send_text(chat_id, &escape_html(text), None)
                    .await
            }
            BroadcastContent::Media {
                kind,
                file_id,
                caption,
            } => {
                let caption = caption.as_deref().map(escape_html);
                self.transport
                    .send_media(chat_id, *kind, file_id, caption.as_deref())
                    .await
            }
        }
    }

    pub async fn record(&self, text: &str) -> Result<BroadcastModel, ServiceError> {
        let mut model = BroadcastModel {
            id: 0,
            text: text.to_string(),
            created_at: Utc::now(),
        };
        model.id = self.db.broadcast.insert(&model).await?;
        Ok(model)
    }

    /// Newest broadcasts first.
    pub async fn recent(&self, limit: u32) -> Result<Vec<BroadcastModel>, ServiceError> {
        Ok(self.db.broadcast.select_recent(limit).await?)
    }

    /// Broadcasts of the current day in the display timezone, newest first.
    pub async fn today(&self, limit: u32) -> Result<Vec<BroadcastModel>, ServiceError> {
        let since = start_of_day(Utc::now(), self.display_offset);
        Ok(self.db.broadcast.select_recent_since(since, limit).await?)
    }

    /// Deletes the history recorded before the current day. Returns the number of deleted rows.
    pub async fn prune_before_today(&self) -> Result<u64, ServiceError> {
        let cutoff = start_of_day(Utc::now(), self.display_offset);
        Ok(self.db.broadcast.delete_before(cutoff).await?)
    }

    pub fn display_offset(&self) -> FixedOffset {
        self.display_offset
    }
}
