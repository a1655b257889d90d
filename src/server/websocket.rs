use super::AppState;
use crate::models::websocket::{ ClientMessage, ServerMessage };
use crate::session::{ ChatSession, FragmentSink };
use crate::view::{ partial_reply, render };

use std::error::Error;
use std::net::SocketAddr;

use async_trait::async_trait;
use axum::extract::ws::{ Message, WebSocket, WebSocketUpgrade };
use axum::extract::{ ConnectInfo, State };
use axum::response::IntoResponse;
use chrono::Utc;
use futures::stream::SplitSink;
use futures::{ SinkExt, StreamExt };
use log::{ debug, error, info, warn };

type SocketSender = SplitSink<WebSocket, Message>;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<AppState>
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(peer, socket, state))
}

async fn send_message(
    tx: &mut SocketSender,
    message: &ServerMessage
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let json = serde_json::to_string(message)?;
    tx.send(Message::Text(json.into())).await?;
    Ok(())
}

async fn send_render(
    tx: &mut SocketSender,
    state: &AppState,
    session: &ChatSession
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let view = render(&state.title, session);
    send_message(tx, &(ServerMessage::Render { view, timestamp: Utc::now().timestamp() })).await
}

struct SocketSink<'a> {
    tx: &'a mut SocketSender,
}

#[async_trait]
impl<'a> FragmentSink for SocketSink<'a> {
    async fn fragment(
        &mut self,
        fragment: &str,
        so_far: &str
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let message = ServerMessage::Fragment {
            content: fragment.to_string(),
            partial: partial_reply(so_far),
        };
        send_message(self.tx, &message).await
    }
}

/// Drives one session: every client message is handled to completion, then the
/// whole view is sent back.
pub async fn handle_connection(peer: SocketAddr, socket: WebSocket, state: AppState) {
    let (mut tx, mut rx) = socket.split();
    let mut session = ChatSession::new();
    info!("New chat session {} for {}", session.id(), peer);

    if let Err(e) = session.refresh_models(state.directory.as_ref()).await {
        warn!("Session {} starts without models: {}", session.id(), e);
    }
    if let Err(e) = send_render(&mut tx, &state, &session).await {
        error!("Error sending initial view to {}: {}", peer, e);
        return;
    }

    while let Some(msg) = rx.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                match serde_json::from_str::<ClientMessage>(text.as_str()) {
                    Ok(client_message) => {
                        if
                            let Err(e) = handle_client_message(
                                client_message,
                                &mut session,
                                &state,
                                &mut tx
                            ).await
                        {
                            error!("Error sending message to {}: {}", peer, e);
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Failed to parse message from {}: {}", peer, e);
                        let error_msg = ServerMessage::Error {
                            message: format!("Failed to parse message: {}", e),
                        };
                        if let Err(e) = send_message(&mut tx, &error_msg).await {
                            error!("Error sending parse error to {}: {}", peer, e);
                            break;
                        }
                    }
                }
            }
            Ok(Message::Close(_)) => {
                info!("Received close frame from {}", peer);
                break;
            }
            Ok(Message::Binary(_)) => {
                warn!("Ignoring binary message from {}", peer);
            }
            Ok(_) => {/* ping/pong are answered by the transport */}
            Err(e) => {
                info!("WebSocket connection closed or protocol error for {}: {}", peer, e);
                break;
            }
        }
    }

    let lifetime = Utc::now() - session.started_at();
    info!(
        "Chat session {} for {} closed after {}s, {} message(s) discarded",
        session.id(),
        peer,
        lifetime.num_seconds(),
        session.transcript().len()
    );
}

async fn handle_client_message(
    message: ClientMessage,
    session: &mut ChatSession,
    state: &AppState,
    tx: &mut SocketSender
) -> Result<(), Box<dyn Error + Send + Sync>> {
    match message {
        ClientMessage::SelectModel { model } => {
            if let Err(e) = session.select_model(&model) {
                send_message(tx, &(ServerMessage::Error { message: e.to_string() })).await?;
            }
        }
        ClientMessage::Chat { content } => {
            if content.trim().is_empty() {
                debug!("Session {}: ignoring empty submission", session.id());
            } else {
                if session.selected_model().is_some() {
                    send_message(tx, &ServerMessage::Processing).await?;
                }
                let mut sink = SocketSink { tx: &mut *tx };
                // Failures are part of the rendered view.
                let _ = session.submit(&content, state.chat_client.as_ref(), &mut sink).await;
            }
        }
        ClientMessage::Reset => {
            session.reset();
        }
        ClientMessage::RefreshModels => {
            let _ = session.refresh_models(state.directory.as_ref()).await;
        }
    }
    send_render(tx, state, session).await
}
