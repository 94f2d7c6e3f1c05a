//! Outbound chat delivery.
//!
//! [`ChatTransport`] is the seam between the bot logic and the chat network. The production
//! implementation is [`telegram::TelegramClient`].

pub mod error;
pub mod telegram;
pub mod types;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

use crate::transport::error::TransportError;

/// Kind of an attachment that can be re-sent by its file id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Photo,
    Document,
    Video,
}

impl MediaKind {
    /// Bot API method that sends this kind of attachment.
    pub fn method(self) -> &'static str {
        match self {
            MediaKind::Photo => "sendPhoto",
            MediaKind::Document => "sendDocument",
            MediaKind::Video => "sendVideo",
        }
    }

    /// Request field that carries the file id.
    pub fn field(self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Document => "document",
            MediaKind::Video => "video",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InlineButton {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl InlineButton {
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: Some(data.into()),
            url: None,
        }
    }

    pub fn url(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: None,
            url: Some(url.into()),
        }
    }
}

/// Buttons attached under a message, serialized as a Bot API `reply_markup`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct InlineKeyboard {
    pub inline_keyboard: Vec<Vec<InlineButton>>,
}

impl InlineKeyboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row(mut self, buttons: Vec<InlineButton>) -> Self {
        self.inline_keyboard.push(buttons);
        self
    }

    /// Lays `buttons` out `width` per row.
    pub fn grid(buttons: Vec<InlineButton>, width: usize) -> Self {
        let mut keyboard = Self::new();
        let mut buttons = buttons.into_iter().peekable();
        while buttons.peek().is_some() {
            keyboard = keyboard.row(buttons.by_ref().take(width.max(1)).collect());
        }
        keyboard
    }
}

/// Outbound side of the chat network.
///
/// Every text and caption is sent as HTML, so callers escape user-provided content with
/// [`escape_html`].
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<(), TransportError>;

    /// Re-sends an already uploaded attachment by its file id.
    async fn send_media(
        &self,
        chat_id: i64,
        kind: MediaKind,
        file_id: &str,
        caption: Option<&str>,
    ) -> Result<(), TransportError>;

    /// Uploads a PNG image as a photo.
    async fn send_png(
        &self,
        chat_id: i64,
        png: Vec<u8>,
        caption: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<(), TransportError>;

    async fn edit_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<(), TransportError>;

    async fn answer_callback(&self, callback_id: &str) -> Result<(), TransportError>;
}

/// Escapes the characters the Bot API HTML parse mode treats as markup.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a < b && c > d"), "a &lt; b &amp;&amp; c &gt; d");
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_keyboard_grid() {
        let buttons = (0..5)
            .map(|i| InlineButton::callback(i.to_string(), i.to_string()))
            .collect();
        let keyboard = InlineKeyboard::grid(buttons, 2);
        let widths: Vec<_> = keyboard.inline_keyboard.iter().map(Vec::len).collect();
        assert_eq!(widths, vec![2, 2, 1]);
    }

    #[test]
    fn test_button_serialization() {
        let json = serde_json::to_value(InlineButton::url("Share", "https://t.me/x")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "text": "Share", "url": "https://t.me/x" })
        );
    }
}
