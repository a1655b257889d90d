use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };
use async_trait::async_trait;
use super::{ create_streaming_response, full_response_as_stream, ChatClient, FragmentStream };
use crate::error::ChatError;
use crate::llm::LlmConfig;
use crate::models::chat::ChatMessage;
use futures::StreamExt;
use log::{ debug, warn };

#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: HttpClient,
    base_url: String,
    stream: bool,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Deserialize, Default)]
struct ChunkMessage {
    #[serde(default)]
    content: String,
}

/// One line of `/api/chat` output, or the whole body when not streaming.
#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl OllamaClient {
    pub fn new(base_url: Option<String>, stream: bool) -> Self {
        let url = base_url.unwrap_or_else(|| crate::llm::DEFAULT_OLLAMA_URL.into());

        Self {
            http: HttpClient::new(),
            base_url: url.trim_end_matches('/').to_string(),
            stream,
        }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(Some(config.base_url.clone()), config.stream)
    }

    fn request(&self, model: &str, history: &[ChatMessage], stream: bool) -> ChatRequest {
        ChatRequest {
            model: model.to_string(),
            messages: history.to_vec(),
            stream,
        }
    }

    pub async fn chat(&self, model: &str, history: &[ChatMessage]) -> Result<String, ChatError> {
        chat_once(self.http.clone(), self.chat_url(), self.request(model, history, false)).await
    }

    pub fn chat_stream(&self, model: &str, history: &[ChatMessage]) -> FragmentStream {
        let url = self.chat_url();
        let req = self.request(model, history, true);
        let client = self.http.clone();

        create_streaming_response(move |tx| async move {
            let response = match client.post(&url).json(&req).send().await {
                Ok(response) => response,
                Err(e) => {
                    let _ = tx.send(Err(invocation_error(&url, &e))).await;
                    return;
                }
            };
            if !response.status().is_success() {
                let _ = tx.send(Err(rejected(response).await)).await;
                return;
            }

            let mut buffer: Vec<u8> = Vec::new();
            let mut bytes = response.bytes_stream();

            while let Some(chunk_result) = bytes.next().await {
                match chunk_result {
                    Ok(chunk) => {
                        buffer.extend_from_slice(&chunk);
                        while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                            let line: Vec<u8> = buffer.drain(..=pos).collect();
                            match decode_line(&line) {
                                LineOutcome::Fragment(text) => {
                                    if tx.send(Ok(text)).await.is_err() {
                                        return;
                                    }
                                }
                                LineOutcome::Skip => {}
                                LineOutcome::Done => {
                                    return;
                                }
                                LineOutcome::Failed(message) => {
                                    let _ = tx.send(Err(ChatError::ModelInvocation(message))).await;
                                    return;
                                }
                                LineOutcome::FinalFragment(text) => {
                                    let _ = tx.send(Ok(text)).await;
                                    return;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(ChatError::ModelInvocation(e.to_string()))).await;
                        return;
                    }
                }
            }

            // Body ended without a trailing newline.
            match decode_line(&buffer) {
                LineOutcome::Fragment(text) | LineOutcome::FinalFragment(text) => {
                    let _ = tx.send(Ok(text)).await;
                }
                LineOutcome::Failed(message) => {
                    let _ = tx.send(Err(ChatError::ModelInvocation(message))).await;
                }
                LineOutcome::Skip | LineOutcome::Done => {}
            }
        })
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }
}

async fn chat_once(
    client: HttpClient,
    url: String,
    req: ChatRequest
) -> Result<String, ChatError> {
    let response = client
        .post(&url)
        .json(&req)
        .send().await
        .map_err(|e| invocation_error(&url, &e))?;
    if !response.status().is_success() {
        return Err(rejected(response).await);
    }
    let chunk = response
        .json::<ChatChunk>().await
        .map_err(|e| ChatError::ModelInvocation(format!("Unexpected response format: {}", e)))?;
    if let Some(error) = chunk.error {
        return Err(ChatError::ModelInvocation(error));
    }
    chunk.message
        .map(|m| m.content)
        .ok_or_else(|| ChatError::ModelInvocation("Unexpected response format".into()))
}

#[derive(Debug, PartialEq, Eq)]
enum LineOutcome {
    Fragment(String),
    FinalFragment(String),
    Done,
    Skip,
    Failed(String),
}

fn decode_line(line: &[u8]) -> LineOutcome {
    let text = match std::str::from_utf8(line) {
        Ok(text) => text.trim(),
        Err(e) => {
            warn!("Dropping non UTF-8 line from chat stream: {}", e);
            return LineOutcome::Skip;
        }
    };
    if text.is_empty() {
        return LineOutcome::Skip;
    }

    let chunk = match serde_json::from_str::<ChatChunk>(text) {
        Ok(chunk) => chunk,
        Err(e) => {
            debug!("JSON parse error: {} for line: {}", e, text);
            return LineOutcome::Skip;
        }
    };
    if let Some(error) = chunk.error {
        return LineOutcome::Failed(error);
    }

    let content = chunk.message.map(|m| m.content).unwrap_or_default();
    match (content.is_empty(), chunk.done) {
        (false, false) => LineOutcome::Fragment(content),
        (false, true) => LineOutcome::FinalFragment(content),
        (true, true) => LineOutcome::Done,
        (true, false) => LineOutcome::Skip,
    }
}

fn invocation_error(url: &str, e: &reqwest::Error) -> ChatError {
    if e.is_connect() {
        ChatError::ModelInvocation(format!("Could not connect to Ollama at {}: {}", url, e))
    } else {
        ChatError::ModelInvocation(e.to_string())
    }
}

async fn rejected(response: reqwest::Response) -> ChatError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => ChatError::ModelInvocation(format!("{}: {}", status, body.error)),
        Err(_) if text.trim().is_empty() => ChatError::ModelInvocation(format!("HTTP error: {}", status)),
        Err(_) => ChatError::ModelInvocation(format!("{}: {}", status, text.trim())),
    }
}

#[async_trait]
impl ChatClient for OllamaClient {
    async fn send(&self, model: &str, history: &[ChatMessage]) -> Result<FragmentStream, ChatError> {
        if self.stream {
            return Ok(self.chat_stream(model, history));
        }
        let this = self.clone();
        let model = model.to_string();
        let history = history.to_vec();
        Ok(full_response_as_stream(move || async move { this.chat(&model, &history).await }))
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn supports_native_streaming(&self) -> bool {
        self.stream
    }
}
