pub mod cli;
pub mod error;
pub mod llm;
pub mod models;
pub mod server;
pub mod session;
pub mod view;

use cli::Args;
use llm::LlmConfig;
use llm::chat::new_client as new_chat_client;
use llm::directory::new_directory;
use log::info;
use server::{ AppState, Server };
use std::error::Error;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = LlmConfig::from_args(&args)?;

    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Ollama Base URL: {}", config.base_url);
    info!("Model Source: {}", config.model_source);
    if config.model_source == llm::ModelSource::Cli {
        info!("Ollama Binary: {}", config.ollama_bin);
    }
    info!("Streaming Replies: {}", config.stream);
    info!("Page Title: {}", args.page_title);
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let directory = new_directory(&config);
    let chat_client = new_chat_client(&config);
    info!(
        "Chat client configured: BaseURL={}, NativeStreaming={}",
        chat_client.base_url(),
        chat_client.supports_native_streaming()
    );

    let state = AppState::new(directory, chat_client, &args.page_title);
    let addr = args.server_addr.clone();
    info!("Starting server on: {}", addr);
    let server = Server::new(addr, state, args);
    server.run().await?;

    Ok(())
}
