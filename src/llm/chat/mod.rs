pub mod ollama;

use async_trait::async_trait;
use futures::{ Future, Stream };
use std::pin::Pin;
use std::sync::Arc;
use super::LlmConfig;
use self::ollama::OllamaClient;
use crate::error::ChatError;
use crate::models::chat::ChatMessage;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Reply fragments in arrival order. Finite and consumed once.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, ChatError>> + Send>>;

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Sends the full `history` (ending with the newest user message) to `model`.
    async fn send(&self, model: &str, history: &[ChatMessage]) -> Result<FragmentStream, ChatError>;

    fn base_url(&self) -> &str;

    fn supports_native_streaming(&self) -> bool {
        false
    }
}

pub fn create_streaming_response<F, Fut>(response_fn: F) -> FragmentStream
    where
        F: FnOnce(mpsc::Sender<Result<String, ChatError>>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static
{
    let (tx, rx) = mpsc::channel(32);

    tokio::spawn(async move {
        response_fn(tx).await;
    });

    Box::pin(ReceiverStream::new(rx))
}

pub fn full_response_as_stream<F, Fut>(response_fn: F) -> FragmentStream
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<String, ChatError>> + Send + 'static
{
    create_streaming_response(move |tx| async move {
        match response_fn().await {
            Ok(response) => {
                if !response.is_empty() {
                    let _ = tx.send(Ok(response)).await;
                }
            }
            Err(e) => {
                let _ = tx.send(Err(e)).await;
            }
        }
    })
}

pub fn new_client(config: &LlmConfig) -> Arc<dyn ChatClient> {
    Arc::new(OllamaClient::from_config(config))
}
