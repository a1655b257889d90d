mod api;
mod cli;

pub use api::ApiModelDirectory;
pub use cli::{ parse_list_output, CliModelDirectory };

use async_trait::async_trait;
use log::info;
use std::sync::Arc;
use super::{ LlmConfig, ModelSource };
use crate::error::ChatError;

/// Lists the models the local daemon can serve.
///
/// Implementations return `ChatError::EmptyDirectory` rather than an empty list and
/// `ChatError::BackendUnavailable` when the daemon cannot be queried. Every call
/// queries the backend; nothing is cached.
#[async_trait]
pub trait ModelDirectory: Send + Sync {
    async fn list_models(&self) -> Result<Vec<String>, ChatError>;

    fn source(&self) -> ModelSource;
}

pub fn new_directory(config: &LlmConfig) -> Arc<dyn ModelDirectory> {
    info!("Model directory source: {}", config.model_source);
    match config.model_source {
        ModelSource::Api => Arc::new(ApiModelDirectory::new(config.base_url.clone())),
        ModelSource::Cli => Arc::new(CliModelDirectory::new(config.ollama_bin.clone())),
    }
}

pub(crate) fn non_empty(models: Vec<String>) -> Result<Vec<String>, ChatError> {
    if models.is_empty() { Err(ChatError::EmptyDirectory) } else { Ok(models) }
}
