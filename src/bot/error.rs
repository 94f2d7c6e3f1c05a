#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BotError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Unknown menu action \"{0}\"")]
    UnknownMenuAction(String),
}
