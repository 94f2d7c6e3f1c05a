//! Error handling for bot updates.

use log::debug;
use log::error;
use log::warn;

use crate::bot::Error;
use crate::bot::error::BotError;
use crate::bot::views;
use crate::error::AppError;
use crate::transport::ChatTransport;
use crate::transport::escape_html;

/// What the user is told about a failed update.
#[derive(Debug, PartialEq, Eq)]
enum Reply {
    /// Nothing, the user is not meant to know the command exists.
    Silent,
    Text(String),
}

/// Handles errors raised while processing an update and replies appropriately.
pub struct ErrorHandler;

impl ErrorHandler {
    pub async fn handle(transport: &dyn ChatTransport, chat_id: i64, context: &str, error: Error) {
        let Reply::Text(text) = Self::classify_error(context, &error) else {
            return;
        };
        if let Err(e) = transport.send_text(chat_id, &text, None).await {
            warn!("Failed to report error to chat {chat_id}: {e}");
        }
    }

    /// Classifies an error and returns the reply for the user.
    fn classify_error(context: &str, error: &Error) -> Reply {
        match error.downcast_ref::<BotError>() {
            Some(BotError::PermissionDenied(reason)) => {
                debug!("Ignored {context}: {reason}");
                Reply::Silent
            }
            Some(bot_error) => Reply::Text(format!("❌ {}", escape_html(&bot_error.to_string()))),
            None => {
                // Store and delivery failures: the action may not have been saved
                let ref_id = AppError::log_with_ref(error);
                error!("Unexpected error in {context}: {error:?}");
                Reply::Text(views::error_text(&ref_id))
            }
        }
    }
}
