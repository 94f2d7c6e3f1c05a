use log::error;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AppError {
    #[error("Missing config with key \"{key}\"")]
    MissingConfig { key: String },

    #[error("Invalid config value for \"{key}\": {reason}")]
    InvalidConfig { key: String, reason: String },

    #[error("Configuration error: {msg}")]
    ConfigurationError { msg: String },
}

impl AppError {
    pub fn missing_config(key: &str) -> Self {
        Self::MissingConfig {
            key: key.to_string(),
        }
    }

    pub fn invalid_config(key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    /// Logs an unexpected error under a fresh reference id and returns the id,
    /// so users can quote it back to administrators.
    pub fn log_with_ref(err: &dyn std::fmt::Display) -> String {
        let ref_id = Uuid::new_v4().simple().to_string()[..8].to_string();
        error!("[ref {ref_id}] {err}");
        ref_id
    }
}
