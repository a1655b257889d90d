use thiserror::Error;

/// Failures a chat session can surface to the user.
///
/// Every variant is shown to the user as-is; nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// The model-serving daemon could not be reached or refused to list models.
    #[error("Model backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The daemon answered but has no models installed.
    #[error("No models available. Make sure Ollama is running.")]
    EmptyDirectory,

    /// The backend rejected a chat request or the reply stream broke off.
    #[error("Model invocation failed: {0}")]
    ModelInvocation(String),

    #[error("Please select a model from the sidebar to start chatting.")]
    NoModelSelected,

    #[error("Model '{0}' is not in the current model list")]
    UnknownModel(String),
}
