use thiserror::Error;

/// Errors produced while parsing shared value types from their string form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid image size {0:?}: expected WIDTHxHEIGHT")]
    ImageSize(String),

    #[error("Invalid theme mode {0:?}: expected light, dark or system")]
    ThemeMode(String),

    #[error("Invalid model type {0:?}: expected text or image")]
    ModelType(String),
}
