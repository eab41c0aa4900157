use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    /// A required field is missing or malformed.
    #[error("{field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("{0} not found")]
    NotFound(&'static str),

    /// The caller is not a participant, owner or reviewer.
    #[error("permission denied: {0}")]
    Permission(&'static str),

    #[error("backend unavailable")]
    BackendUnavailable(#[source] anyhow::Error),
}

impl CoreError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation { field, reason: reason.into() }
    }

    /// Classify a failed insert. A foreign-key violation means a referenced
    /// row (`missing`) does not exist; anything else is a storage failure.
    pub fn from_insert(err: anyhow::Error, missing: &'static str) -> Self {
        if adoptly_db::is_foreign_key_violation(&err) {
            Self::NotFound(missing)
        } else {
            Self::BackendUnavailable(err)
        }
    }
}

impl From<anyhow::Error> for CoreError {
    fn from(err: anyhow::Error) -> Self {
        Self::BackendUnavailable(err)
    }
}
