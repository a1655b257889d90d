use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use log::debug;
use super::{ non_empty, ModelDirectory };
use crate::error::ChatError;
use crate::llm::ModelSource;

/// Reads the installed models from the daemon's `/api/tags` endpoint.
#[derive(Debug, Clone)]
pub struct ApiModelDirectory {
    http: HttpClient,
    base_url: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Deserialize)]
struct TagEntry {
    name: String,
}

impl ApiModelDirectory {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http: HttpClient::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ModelDirectory for ApiModelDirectory {
    async fn list_models(&self) -> Result<Vec<String>, ChatError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self.http
            .get(&url)
            .send().await
            .map_err(|e| ChatError::BackendUnavailable(format!("{}: {}", self.base_url, e)))?;

        if !response.status().is_success() {
            return Err(
                ChatError::BackendUnavailable(
                    format!("{} answered {}", self.base_url, response.status())
                )
            );
        }

        let tags = response
            .json::<TagsResponse>().await
            .map_err(|e| ChatError::BackendUnavailable(format!("Unreadable model list: {}", e)))?;
        let models: Vec<String> = tags.models
            .into_iter()
            .map(|m| m.name)
            .collect();
        debug!("Daemon at {} lists {} model(s)", self.base_url, models.len());
        non_empty(models)
    }

    fn source(&self) -> ModelSource {
        ModelSource::Api
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::{ closed_base_url, spawn_fake_daemon };
    use axum::{ http::StatusCode, routing::get, Json, Router };
    use serde_json::json;

    #[tokio::test]
    async fn lists_models_in_daemon_order() {
        let app = Router::new().route(
            "/api/tags",
            get(|| async {
                Json(
                    json!({
                    "models": [
                        { "name": "llama3:latest", "size": 4661224676u64 },
                        { "name": "mistral:7b", "size": 4109865159u64 }
                    ]
                })
                )
            })
        );
        let directory = ApiModelDirectory::new(spawn_fake_daemon(app).await);
        assert_eq!(directory.list_models().await.unwrap(), vec!["llama3:latest", "mistral:7b"]);
        assert_eq!(directory.source(), ModelSource::Api);
    }

    #[tokio::test]
    async fn no_installed_models_is_an_empty_directory() {
        let app = Router::new().route("/api/tags", get(|| async { Json(json!({ "models": [] })) }));
        let directory = ApiModelDirectory::new(spawn_fake_daemon(app).await);
        assert_eq!(directory.list_models().await, Err(ChatError::EmptyDirectory));
    }

    #[tokio::test]
    async fn unreachable_daemon_is_backend_unavailable() {
        let directory = ApiModelDirectory::new(closed_base_url().await);
        assert!(matches!(directory.list_models().await, Err(ChatError::BackendUnavailable(_))));
    }

    #[tokio::test]
    async fn server_error_is_backend_unavailable() {
        let app = Router::new().route(
            "/api/tags",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR })
        );
        let directory = ApiModelDirectory::new(spawn_fake_daemon(app).await);
        assert!(matches!(directory.list_models().await, Err(ChatError::BackendUnavailable(_))));
    }
}
