use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Request failed with status {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Calendar error: {0}")]
    Calendar(String),

    #[error("Internal error: {0}")]
    Internal(#[from] eyre::Report),
}

impl SchedulerError {
    /// True when the backend answered 409, i.e. the resource changed underneath us.
    pub fn is_conflict(&self) -> bool {
        matches!(self, SchedulerError::Conflict(_))
            || matches!(self, SchedulerError::Http { status: 409, .. })
    }

    /// HTTP status carried by the error, if the request reached the server.
    pub fn status(&self) -> Option<u16> {
        match self {
            SchedulerError::Conflict(_) => Some(409),
            SchedulerError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Text suitable for a blocking alert.
    ///
    /// Server-provided messages win over the generic variant description.
    pub fn user_message(&self) -> String {
        match self {
            SchedulerError::Conflict(message)
            | SchedulerError::Http { message, .. }
            | SchedulerError::Validation(message)
            | SchedulerError::Authentication(message)
                if !message.is_empty() =>
            {
                message.clone()
            }
            SchedulerError::Network(_) => {
                "Unable to reach the scheduler. Check your connection and try again.".to_string()
            }
            other => other.to_string(),
        }
    }
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
