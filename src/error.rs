use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced by the recurrence/alarm core and its adapters.
#[derive(Debug, Error)]
pub enum Error {
    /// A repeat rule whose fields do not fit its frequency.
    #[error("invalid repeat rule: {0}")]
    Validation(String),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("data store request failed: {0}")]
    Store(#[source] BoxError),

    #[error("delayed execution request failed: {0}")]
    Timer(#[source] BoxError),

    #[error("notification delivery failed: {0}")]
    Notify(#[source] BoxError),

    #[error("malformed payload: {0}")]
    Payload(String),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error("{failed} of {total} records failed")]
    BatchFailed { failed: usize, total: usize },
}

impl Error {
    pub fn store(err: impl Into<BoxError>) -> Self {
        Self::Store(err.into())
    }

    pub fn timer(err: impl Into<BoxError>) -> Self {
        Self::Timer(err.into())
    }

    pub fn notify(err: impl Into<BoxError>) -> Self {
        Self::Notify(err.into())
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Whether redelivering the event that caused this error may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Store(_) | Self::Timer(_) | Self::Notify(_) | Self::BatchFailed { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Payload(err.to_string())
    }
}

impl From<serde_dynamo::Error> for Error {
    fn from(err: serde_dynamo::Error) -> Self {
        Self::Payload(err.to_string())
    }
}
