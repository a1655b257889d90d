pub mod api;
pub mod websocket;

use crate::cli::Args;
use crate::llm::chat::ChatClient;
use crate::llm::directory::ModelDirectory;
use axum::{ routing::get, Router };
use log::{ error, info };
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{ Any, CorsLayer };

/// Shared by every session: configuration and the stateless backend clients.
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<dyn ModelDirectory>,
    pub chat_client: Arc<dyn ChatClient>,
    pub title: Arc<str>,
}

impl AppState {
    pub fn new(
        directory: Arc<dyn ModelDirectory>,
        chat_client: Arc<dyn ChatClient>,
        title: &str
    ) -> Self {
        Self { directory, chat_client, title: Arc::from(title) }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/", get(api::index_handler))
        .route("/api/models", get(api::models_handler))
        .route("/ws", get(websocket::ws_handler))
        .layer(cors)
        .with_state(state)
}

/// Serves the UI on an already bound listener.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<(), Box<dyn Error + Send + Sync>> {
    let app = router(state);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}

pub struct Server {
    addr: String,
    state: AppState,
    args: Args,
}

impl Server {
    pub fn new(addr: String, state: AppState, args: Args) -> Self {
        Self { addr, state, args }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let addr = self.addr.parse::<SocketAddr>().map_err(|e|
            format!("Invalid server address '{}': {}", self.addr, e)
        )?;

        if self.args.enable_tls {
            let (cert_path, key_path) = match (&self.args.tls_cert_path, &self.args.tls_key_path) {
                (Some(cert_path), Some(key_path)) => (cert_path, key_path),
                (Some(_), None) | (None, Some(_)) => {
                    error!("Both --tls-cert-path and --tls-key-path must be provided to enable TLS.");
                    return Err("Missing TLS certificate or key path".into());
                }
                (None, None) => {
                    error!("--enable-tls was set but no certificate/key paths provided.");
                    return Err("TLS enabled without cert/key".into());
                }
            };
            info!("TLS enabled. Loading certificate from '{}' and key from '{}'", cert_path, key_path);
            let tls_config = axum_server::tls_rustls::RustlsConfig
                ::from_pem_file(cert_path, key_path).await
                .map_err(|e| format!("Failed to load TLS certificate/key: {}", e))?;

            info!("Chat UI available at https://{}", addr);
            axum_server
                ::bind_rustls(addr, tls_config)
                .serve(router(self.state.clone()).into_make_service_with_connect_info::<SocketAddr>()).await?;
        } else {
            info!("TLS not enabled. Serving plain HTTP.");
            let listener = TcpListener::bind(addr).await.map_err(|e|
                format!("Failed to bind UI server to {}: {}. Try a different port.", addr, e)
            )?;
            info!("Chat UI available at http://{}", listener.local_addr()?);
            serve(listener, self.state.clone()).await?;
        }

        Ok(())
    }
}
