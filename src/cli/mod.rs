use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Model Backend Args ---
    /// Base URL of the local Ollama daemon.
    #[arg(long, env = "OLLAMA_BASE_URL", default_value = "http://localhost:11434")]
    pub ollama_base_url: String,

    /// Where the model list comes from (api, cli). `api` asks the daemon over HTTP,
    /// `cli` runs `ollama list`.
    #[arg(long, env = "MODEL_SOURCE", default_value = "api")]
    pub model_source: String,

    /// Ollama executable used when the model source is `cli`.
    #[arg(long, env = "OLLAMA_BIN", default_value = "ollama")]
    pub ollama_bin: String,

    /// Ask the model for a single complete reply instead of a token stream.
    #[arg(long, env = "NO_STREAM", default_value = "false")]
    pub no_stream: bool,

    // --- UI Server Args ---
    /// Host address and port for the UI server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:8501")]
    pub server_addr: String,

    /// Title shown in the browser tab and page header.
    #[arg(long, env = "PAGE_TITLE", default_value = "SlitChat - Ollama Chat Interface")]
    pub page_title: String,

    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,

    /// Optional path to the TLS certificate file (PEM format) for serving HTTPS. Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format) for serving HTTPS. Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}
