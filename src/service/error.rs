use crate::repository::error::DatabaseError;
use crate::transport::error::TransportError;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ServiceError {
    #[error("Unexpected result: {message}")]
    UnexpectedResult { message: String },

    #[error("Unknown monitored service \"{name}\"")]
    UnknownService { name: String },

    #[error("DatabaseError: {0}")]
    DatabaseError(#[from] DatabaseError),

    #[error("TransportError: {0}")]
    TransportError(#[from] TransportError),

    #[error("TemplateError: {0}")]
    TemplateError(#[from] minijinja::Error),
}
