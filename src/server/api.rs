use super::AppState;
use crate::error::ChatError;
use axum::{
    extract::State,
    http::StatusCode,
    response::{ Html, IntoResponse },
    Json,
};
use log::{ info, warn };
use serde::Serialize;

const INDEX_TEMPLATE: &str = include_str!("../../static/index.html");

#[derive(Serialize)]
struct ModelsResponse {
    models: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notice: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn render_index(title: &str) -> String {
    INDEX_TEMPLATE.replace("{{title}}", &escape_html(title))
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub async fn index_handler(State(state): State<AppState>) -> Html<String> {
    Html(render_index(&state.title))
}

pub async fn models_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.directory.list_models().await {
        Ok(models) => {
            info!("Model list requested: {} model(s)", models.len());
            (StatusCode::OK, Json(ModelsResponse { models, notice: None })).into_response()
        }
        Err(ChatError::EmptyDirectory) => {
            let notice = Some(ChatError::EmptyDirectory.to_string());
            (StatusCode::OK, Json(ModelsResponse { models: Vec::new(), notice })).into_response()
        }
        Err(e) => {
            warn!("Model list requested but backend failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse { error: e.to_string() }),
            ).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_carries_escaped_title() {
        let page = render_index("Tom & Jerry's <chat>");
        assert!(page.contains("Tom &amp; Jerry&#39;s &lt;chat&gt;"));
        assert!(!page.contains("{{title}}"));
    }
}
