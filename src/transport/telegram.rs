//! Telegram Bot API client.

use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use governor::Quota;
use governor::RateLimiter;
use governor::clock::QuantaClock;
use governor::state::InMemoryState;
use governor::state::direct::NotKeyed;
use log::debug;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde::de::IgnoredAny;
use serde_json::Value;
use serde_json::json;
use wreq::header::CONTENT_TYPE;
use wreq::header::HeaderMap;
use wreq::header::HeaderValue;
use wreq::header::USER_AGENT;
use wreq::multipart::Form;
use wreq::multipart::Part;

use crate::transport::ChatTransport;
use crate::transport::InlineKeyboard;
use crate::transport::MediaKind;
use crate::transport::error::TransportError;
use crate::transport::types::Update;
use crate::transport::types::User;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Envelope of every Bot API response.
#[derive(Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramClient {
    client: wreq::Client,
    api_url: String,
    token: String,
    /// Paces outgoing sends under the Bot API bulk-message limit.
    limiter: RateLimiter<NotKeyed, InMemoryState, QuantaClock>,
}

impl TelegramClient {
    pub fn new(
        api_url: impl Into<String>,
        token: impl Into<String>,
        sends_per_second: u32,
    ) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("outage-bot/0.1"));
        let client = wreq::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let rate = NonZeroU32::new(sends_per_second).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            limiter: RateLimiter::direct(Quota::per_second(rate)),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }

    pub async fn get_me(&self) -> Result<User, TransportError> {
        self.call("getMe", None, &json!({})).await
    }

    /// Long-polls for updates after `offset`, waiting up to `timeout` for one to arrive.
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout: Duration,
    ) -> Result<Vec<Update>, TransportError> {
        let body = json!({
            "offset": offset,
            "timeout": timeout.as_secs(),
            "allowed_updates": ["message", "callback_query"],
        });
        let response = self
            .client
            .post(self.method_url("getUpdates"))
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_string())
            .timeout(timeout + REQUEST_TIMEOUT)
            .send()
            .await?;
        let text = response.text().await?;
        Self::parse_response(None, &text)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        chat_id: Option<i64>,
        body: &Value,
    ) -> Result<T, TransportError> {
        self.limiter.until_ready().await;
        debug!("Calling Bot API method {method}");

        let response = self
            .client
            .post(self.method_url(method))
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_string())
            .send()
            .await?;
        let text = response.text().await?;
        Self::parse_response(chat_id, &text)
    }

    async fn call_multipart<T: DeserializeOwned>(
        &self,
        method: &str,
        chat_id: i64,
        form: Form,
    ) -> Result<T, TransportError> {
        self.limiter.until_ready().await;
        debug!("Calling Bot API method {method} (multipart)");

        let response = self
            .client
            .post(self.method_url(method))
            .multipart(form)
            .send()
            .await?;
        let text = response.text().await?;
        Self::parse_response(Some(chat_id), &text)
    }

    /// Unwraps an API envelope, classifying failures addressed to `chat_id`.
    fn parse_response<T: DeserializeOwned>(
        chat_id: Option<i64>,
        body: &str,
    ) -> Result<T, TransportError> {
        let response: ApiResponse<T> = serde_json::from_str(body)?;
        if response.ok
            && let Some(result) = response.result
        {
            return Ok(result);
        }

        let code = response.error_code.unwrap_or_default();
        let description = response
            .description
            .unwrap_or_else(|| "Unknown error".to_string());
        Err(Self::classify_error(chat_id, code, description))
    }

    /// A 403 always means the user cut the bot off. Some 400s mean the chat is gone for good.
    fn classify_error(chat_id: Option<i64>, code: i64, description: String) -> TransportError {
        let lowered = description.to_lowercase();
        let unreachable = code == 403
            || (code == 400
                && (lowered.contains("chat not found") || lowered.contains("user is deactivated")));
        match chat_id {
            Some(chat_id) if unreachable => TransportError::Unreachable {
                chat_id,
                description,
            },
            _ => TransportError::Api { code, description },
        }
    }

    fn with_keyboard(mut body: Value, keyboard: Option<&InlineKeyboard>) -> Value {
        if let Some(keyboard) = keyboard {
            body["reply_markup"] = json!(keyboard);
        }
        body
    }
}

#[async_trait]
impl ChatTransport for TelegramClient {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<(), TransportError> {
        let body = Self::with_keyboard(
            json!({
                "chat_id": chat_id,
                "text": text,
                "parse_mode": "HTML",
                "disable_web_page_preview": true,
            }),
            keyboard,
        );
        self.call::<IgnoredAny>("sendMessage", Some(chat_id), &body)
            .await?;
        Ok(())
    }

    async fn send_media(
        &self,
        chat_id: i64,
        kind: MediaKind,
        file_id: &str,
        caption: Option<&str>,
    ) -> Result<(), TransportError> {
        let mut body = json!({ "chat_id": chat_id });
        body[kind.field()] = json!(file_id);
        if let Some(caption) = caption {
            body["caption"] = json!(caption);
            body["parse_mode"] = json!("HTML");
        }
        self.call::<IgnoredAny>(kind.method(), Some(chat_id), &body)
            .await?;
        Ok(())
    }

    async fn send_png(
        &self,
        chat_id: i64,
        png: Vec<u8>,
        caption: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<(), TransportError> {
        let photo = Part::bytes(png)
            .file_name("chart.png")
            .mime_str("image/png")?;
        let mut form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .text("parse_mode", "HTML")
            .part("photo", photo);
        if let Some(keyboard) = keyboard {
            form = form.text("reply_markup", serde_json::to_string(keyboard)?);
        }
        self.call_multipart::<IgnoredAny>("sendPhoto", chat_id, form)
            .await?;
        Ok(())
    }

    async fn edit_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<(), TransportError> {
        let body = Self::with_keyboard(
            json!({
                "chat_id": chat_id,
                "message_id": message_id,
                "text": text,
                "parse_mode": "HTML",
                "disable_web_page_preview": true,
            }),
            keyboard,
        );
        self.call::<IgnoredAny>("editMessageText", Some(chat_id), &body)
            .await?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), TransportError> {
        self.call::<IgnoredAny>(
            "answerCallbackQuery",
            None,
            &json!({ "callback_query_id": callback_id }),
        )
        .await?;
        Ok(())
    }
}
