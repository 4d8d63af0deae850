use thiserror::Error;

/// Failure of a single remote operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The backend ran the operation and reported a failure. The description
    /// is shown to the user as-is.
    #[error("{0}")]
    Rejected(String),

    /// The call never reached the backend, or its reply was lost.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Arguments or the reply did not match the operation's record shape.
    #[error("Invalid payload for {operation}: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),
}

impl GatewayError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GatewayError>;
