#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The recipient can never be reached again (blocked the bot, deleted their account, ...).
    #[error("Chat {chat_id} is unreachable: {description}")]
    Unreachable { chat_id: i64, description: String },

    #[error("Chat API error {code}: {description}")]
    Api { code: i64, description: String },

    #[error("HTTP request failed: {0}")]
    RequestFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Failed to parse API response: {0}")]
    JsonParseFailed(#[from] serde_json::Error),
}

impl TransportError {
    pub fn is_unreachable(&self) -> bool {
        matches!(self, TransportError::Unreachable { .. })
    }
}

impl From<wreq::Error> for TransportError {
    fn from(e: wreq::Error) -> Self {
        TransportError::RequestFailed(Box::new(e))
    }
}
