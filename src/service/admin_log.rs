//! Operational notes sent to the administrators' log chat.

use std::sync::Arc;

use log::info;
use log::warn;

use crate::transport::ChatTransport;
use crate::transport::escape_html;

pub struct AdminLog {
    transport: Arc<dyn ChatTransport>,
    chat_id: Option<i64>,
}

impl AdminLog {
    pub fn new(transport: Arc<dyn ChatTransport>, chat_id: Option<i64>) -> Self {
        Self { transport, chat_id }
    }

    /// Sends `text` to the log chat. Failures are logged and otherwise ignored.
    pub async fn notify(&self, text: &str) {
        info!("[admin-log] {text}");
        let Some(chat_id) = self.chat_id else {
            return;
        };
        if let Err(e) = self
            .transport
            .send_text(chat_id, &escape_html(text), None)
            .await
        {
            warn!("Failed to deliver admin log message to {chat_id}: {e}");
        }
    }
}
