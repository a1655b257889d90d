use crate::error::ChatError;
use crate::llm::chat::ChatClient;
use crate::llm::directory::ModelDirectory;
use crate::models::chat::{ ChatMessage, Conversation };
use async_trait::async_trait;
use chrono::{ DateTime, Utc };
use futures::StreamExt;
use log::{ debug, info, warn };
use serde::{ Deserialize, Serialize };
use std::error::Error;
use uuid::Uuid;

/// Submission state. `submit` holds the session for the whole exchange, so a
/// render only ever observes `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Idle,
    AwaitingResponse,
}

/// Receives reply fragments while a submission is in flight, together with the
/// reply accumulated so far (`fragment` included).
#[async_trait]
pub trait FragmentSink: Send {
    async fn fragment(
        &mut self,
        fragment: &str,
        so_far: &str
    ) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// State of one connected UI: the model list it was shown, the chosen model and
/// its conversation. Nothing here is shared with other sessions.
#[derive(Debug, Clone)]
pub struct ChatSession {
    id: String,
    started_at: DateTime<Utc>,
    models: Vec<String>,
    selected_model: Option<String>,
    conversation: Conversation,
    status: Status,
    pending: Option<String>,
    directory_error: Option<ChatError>,
    invocation_error: Option<String>,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            models: Vec::new(),
            selected_model: None,
            conversation: Conversation::new(),
            status: Status::Idle,
            pending: None,
            directory_error: None,
            invocation_error: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn selected_model(&self) -> Option<&str> {
        self.selected_model.as_deref()
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        self.conversation.as_sequence()
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn directory_error(&self) -> Option<&ChatError> {
        self.directory_error.as_ref()
    }

    pub fn invocation_error(&self) -> Option<&str> {
        self.invocation_error.as_deref()
    }

    /// Queries `directory` and replaces the model list with its answer.
    pub async fn refresh_models(
        &mut self,
        directory: &dyn ModelDirectory
    ) -> Result<(), ChatError> {
        let listing = directory.list_models().await;
        self.apply_listing(listing)
    }

    /// Installs a fresh listing. The current selection survives when the model is
    /// still listed; otherwise the first model is selected.
    pub fn apply_listing(&mut self, listing: Result<Vec<String>, ChatError>) -> Result<(), ChatError> {
        match listing {
            Ok(models) if !models.is_empty() => {
                let keep = self.selected_model
                    .as_ref()
                    .filter(|current| models.contains(current))
                    .cloned();
                self.selected_model = keep.or_else(|| models.first().cloned());
                self.models = models;
                self.directory_error = None;
                info!(
                    "Session {}: {} model(s) available, selected {:?}",
                    self.id,
                    self.models.len(),
                    self.selected_model
                );
                Ok(())
            }
            Ok(_) => self.clear_listing(ChatError::EmptyDirectory),
            Err(e) => self.clear_listing(e),
        }
    }

    fn clear_listing(&mut self, error: ChatError) -> Result<(), ChatError> {
        warn!("Session {}: model directory unavailable: {}", self.id, error);
        self.models.clear();
        self.selected_model = None;
        self.directory_error = Some(error.clone());
        Err(error)
    }

    pub fn select_model(&mut self, model: &str) -> Result<(), ChatError> {
        if !self.models.iter().any(|m| m == model) {
            return Err(ChatError::UnknownModel(model.to_string()));
        }
        info!("Session {}: selected model {}", self.id, model);
        self.selected_model = Some(model.to_string());
        Ok(())
    }

    pub fn reset(&mut self) {
        info!("Session {}: transcript reset ({} message(s) dropped)", self.id, self.conversation.len());
        self.conversation.reset();
        self.pending = None;
        self.invocation_error = None;
    }

    /// Appends `content` as a user message, sends the whole transcript to the
    /// selected model and forwards each reply fragment to `sink`.
    ///
    /// Whatever arrived before a failure is kept as the assistant reply. The
    /// client is never called when no model is selected.
    pub async fn submit(
        &mut self,
        content: &str,
        client: &dyn ChatClient,
        sink: &mut dyn FragmentSink
    ) -> Result<(), ChatError> {
        if self.models.is_empty() {
            return Err(self.directory_error.clone().unwrap_or(ChatError::EmptyDirectory));
        }
        let model = self.selected_model.clone().ok_or(ChatError::NoModelSelected)?;

        self.conversation.append(ChatMessage::user(content));
        self.status = Status::AwaitingResponse;
        self.pending = Some(String::new());
        self.invocation_error = None;
        info!("Session {}: sending {} message(s) to {}", self.id, self.conversation.len(), model);

        let outcome = self.stream_reply(&model, client, sink).await;

        // A completed reply is recorded even when empty, so turns keep alternating.
        let reply = self.pending.take().unwrap_or_default();
        if outcome.is_ok() || !reply.is_empty() {
            self.conversation.append(ChatMessage::assistant(reply));
        }
        self.status = Status::Idle;

        if let Err(e) = &outcome {
            warn!("Session {}: model {} failed: {}", self.id, model, e);
            self.invocation_error = Some(e.to_string());
        }
        outcome
    }

    async fn stream_reply(
        &mut self,
        model: &str,
        client: &dyn ChatClient,
        sink: &mut dyn FragmentSink
    ) -> Result<(), ChatError> {
        let history = self.conversation.as_sequence().to_vec();
        let mut fragments = client.send(model, &history).await?;
        let mut sink_open = true;

        while let Some(fragment) = fragments.next().await {
            let fragment = fragment?;
            debug!("Session {}: fragment of {} byte(s)", self.id, fragment.len());
            let so_far = self.pending.get_or_insert_with(String::new);
            so_far.push_str(&fragment);
            if sink_open {
                if let Err(e) = sink.fragment(&fragment, so_far).await {
                    warn!("Session {}: stopped forwarding fragments: {}", self.id, e);
                    sink_open = false;
                }
            }
        }
        Ok(())
    }
}
