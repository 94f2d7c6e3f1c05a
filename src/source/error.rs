#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Report page `{url}` answered with status {status}.")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("Invalid report page: missing `{field}`.")]
    MissingField { field: String },

    #[error("Invalid report page: `{field}` has malformed value `{value}`.")]
    MalformedValue { field: String, value: String },
}

impl From<wreq::Error> for SourceError {
    fn from(e: wreq::Error) -> Self {
        SourceError::RequestFailed(Box::new(e))
    }
}
