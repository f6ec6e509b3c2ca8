use thiserror::Error;

/// Crate-wide error type.
///
/// `NotFound` and `Validation` map to 404/400 equivalents at whatever
/// transport sits above this crate; everything else is an internal failure
/// propagated as-is.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0} not found")]
    NotFound(String),

    #[error("validation failed on {field}: {message}")]
    Validation { field: String, message: String },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Error::NotFound(what.into())
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// True for errors a caller should surface as a missing resource.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
