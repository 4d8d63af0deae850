use thiserror::Error;

use scribe_gateway::GatewayError;
use scribe_shared::ModelType;
use scribe_store::StoreError;

/// Errors surfaced to the caller of a store operation.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The action was blocked locally; no remote call was made.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// A remote operation failed. Displays the backend's description as-is.
    #[error(transparent)]
    Remote(#[from] GatewayError),

    #[error("Local store error: {0}")]
    Store(#[from] StoreError),
}

impl ClientError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Local preconditions checked before any remote call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("No account is logged in")]
    NoCurrentUser,

    #[error("Title and content are required")]
    MissingTitleOrContent,

    #[error("No {0} model selected")]
    NoModelSelected(ModelType),

    #[error("A post holds at most {0} images")]
    TooManyImages(usize),

    #[error("Provider name is required")]
    MissingProviderName,

    #[error("Phone number is required")]
    MissingPhone,

    #[error("Verification code is required")]
    MissingVerificationCode,

    #[error("An API key is required before starting the API server")]
    MissingApiKey,

    #[error("Local store is not configured")]
    NoLocalStore,

    #[error("Unknown prompt: {0}")]
    UnknownPrompt(String),

    #[error("Unknown draft: {0}")]
    UnknownDraft(i64),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClientError>;
