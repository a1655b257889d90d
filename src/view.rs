//! Pure rendering of a session into what the browser draws.

use crate::error::ChatError;
use crate::models::chat::ChatMessage;
use crate::session::ChatSession;
use serde::{ Deserialize, Serialize };

/// Appended to a partial reply while the model is still producing it.
pub const STREAMING_CURSOR: &str = "▌";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    BackendUnavailable {
        message: String,
    },
    EmptyDirectory {
        message: String,
    },
    SelectModel {
        message: String,
    },
    ModelInvocation {
        message: String,
    },
}

impl Notice {
    /// Blocking notices replace the input box.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Notice::BackendUnavailable { .. } | Notice::EmptyDirectory { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    pub title: String,
    pub models: Vec<String>,
    pub selected_model: Option<String>,
    pub transcript: Vec<ChatMessage>,
    pub notice: Option<Notice>,
    pub input_enabled: bool,
    pub reset_enabled: bool,
}

/// Text shown for a reply that is still streaming.
pub fn partial_reply(so_far: &str) -> String {
    format!("{}{}", so_far, STREAMING_CURSOR)
}

pub fn render(title: &str, session: &ChatSession) -> View {
    let notice = match (session.directory_error(), session.invocation_error()) {
        (Some(ChatError::EmptyDirectory), _) =>
            Some(Notice::EmptyDirectory { message: ChatError::EmptyDirectory.to_string() }),
        (Some(other), _) => Some(Notice::BackendUnavailable { message: other.to_string() }),
        (None, Some(message)) => Some(Notice::ModelInvocation { message: message.to_string() }),
        (None, None) if session.selected_model().is_none() =>
            Some(Notice::SelectModel { message: ChatError::NoModelSelected.to_string() }),
        (None, None) => None,
    };

    View {
        title: title.to_string(),
        models: session.models().to_vec(),
        selected_model: session.selected_model().map(str::to_string),
        transcript: session.transcript().to_vec(),
        input_enabled: session.selected_model().is_some(),
        reset_enabled: !session.models().is_empty(),
        notice,
    }
}
