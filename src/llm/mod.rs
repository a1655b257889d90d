pub mod chat;
pub mod directory;
use crate::cli::Args;
use serde::{ Deserialize, Serialize };
use std::error::Error;
use std::str::FromStr;
use std::fmt;
use url::Url;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// How the list of installed models is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSource {
    /// `GET /api/tags` on the daemon.
    Api,
    /// `ollama list` subprocess.
    Cli,
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSource::Api => write!(f, "api"),
            ModelSource::Cli => write!(f, "cli"),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseModelSourceError {
    message: String,
}

impl fmt::Display for ParseModelSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseModelSourceError {}
impl FromStr for ModelSource {
    type Err = ParseModelSourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "api" | "http" => Ok(ModelSource::Api),
            "cli" | "subprocess" => Ok(ModelSource::Cli),
            _ =>
                Err(ParseModelSourceError {
                    message: format!("Invalid model source: '{}' (expected 'api' or 'cli')", s),
                }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub model_source: ModelSource,
    pub ollama_bin: String,
    pub stream: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model_source: ModelSource::Api,
            ollama_bin: "ollama".to_string(),
            stream: true,
        }
    }
}

impl LlmConfig {
    pub fn from_args(args: &Args) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let base_url = Url::parse(&args.ollama_base_url).map_err(|e|
            format!("Invalid Ollama base URL '{}': {}", args.ollama_base_url, e)
        )?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(format!("Ollama base URL must be http(s): '{}'", base_url).into());
        }

        Ok(Self {
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            model_source: args.model_source.parse()?,
            ollama_bin: args.ollama_bin.clone(),
            stream: !args.no_stream,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use axum::Router;
    use tokio::net::TcpListener;

    /// Serves `app` on an ephemeral local port and returns its base URL.
    pub async fn spawn_fake_daemon(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    /// A base URL nothing is listening on.
    pub async fn closed_base_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parses_model_sources() {
        assert_eq!("api".parse::<ModelSource>(), Ok(ModelSource::Api));
        assert_eq!("CLI".parse::<ModelSource>(), Ok(ModelSource::Cli));
        assert!("grpc".parse::<ModelSource>().is_err());
    }

    #[test]
    fn config_from_args_normalizes_base_url() {
        let args = Args::try_parse_from([
            "slitchat",
            "--ollama-base-url",
            "http://gpu-box:11434/",
            "--no-stream",
        ]).unwrap();
        let config = LlmConfig::from_args(&args).unwrap();
        assert_eq!(config.base_url, "http://gpu-box:11434");
        assert_eq!(config.model_source, ModelSource::Api);
        assert!(!config.stream);
    }

    #[test]
    fn config_rejects_bad_urls_and_sources() {
        let args = Args::try_parse_from(["slitchat", "--ollama-base-url", "not a url"]).unwrap();
        assert!(LlmConfig::from_args(&args).is_err());

        let args = Args::try_parse_from(["slitchat", "--ollama-base-url", "ftp://host"]).unwrap();
        assert!(LlmConfig::from_args(&args).is_err());

        let args = Args::try_parse_from(["slitchat", "--model-source", "grpc"]).unwrap();
        assert!(LlmConfig::from_args(&args).is_err());
    }
}
