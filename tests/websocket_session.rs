use axum::{ routing::{ get, post }, Json, Router };
use futures::{ SinkExt, StreamExt };
use serde_json::{ json, Value };
use slitchat::llm::chat::ollama::OllamaClient;
use slitchat::llm::directory::ApiModelDirectory;
use slitchat::server::{ self, AppState };
use std::sync::atomic::{ AtomicUsize, Ordering };
use std::sync::Arc;
use tokio::net::{ TcpListener, TcpStream };
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{ connect_async, MaybeTlsStream, WebSocketStream };

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const TITLE: &str = "SlitChat - Ollama Chat Interface";

async fn spawn(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr.to_string()
}

/// Fake Ollama daemon listing `models` and answering every chat with `reply` lines.
async fn fake_daemon(models: &[&str], reply: Vec<Value>, chat_calls: Arc<AtomicUsize>) -> String {
    let entries: Vec<Value> = models
        .iter()
        .map(|name| json!({ "name": name }))
        .collect();
    let tags = json!({ "models": entries });
    let body: String = reply
        .iter()
        .map(|line| format!("{}\n", line))
        .collect();
    let app = Router::new()
        .route(
            "/api/tags",
            get(move || {
                let tags = tags.clone();
                async move { Json(tags) }
            })
        )
        .route(
            "/api/chat",
            post(move || {
                let body = body.clone();
                let chat_calls = chat_calls.clone();
                async move {
                    chat_calls.fetch_add(1, Ordering::SeqCst);
                    body
                }
            })
        );
    format!("http://{}", spawn(app).await)
}

async fn start_ui(daemon_url: &str) -> String {
    let state = AppState::new(
        Arc::new(ApiModelDirectory::new(daemon_url)),
        Arc::new(OllamaClient::new(Some(daemon_url.to_string()), true)),
        TITLE
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        server::serve(listener, state).await.unwrap();
    });
    addr.to_string()
}

async fn connect(ui_addr: &str) -> Client {
    let (ws, _) = connect_async(format!("ws://{}/ws", ui_addr)).await.unwrap();
    ws
}

async fn next_json(ws: &mut Client) -> Value {
    loop {
        match ws.next().await.expect("socket closed").unwrap() {
            Message::Text(text) => {
                return serde_json::from_str(&text).unwrap();
            }
            _ => {
                continue;
            }
        }
    }
}

async fn send_json(ws: &mut Client, message: Value) {
    ws.send(Message::Text(message.to_string())).await.unwrap();
}

fn piece(content: &str) -> Value {
    json!({ "message": { "role": "assistant", "content": content }, "done": false })
}

fn done() -> Value {
    json!({ "message": { "role": "assistant", "content": "" }, "done": true })
}

#[tokio::test]
async fn hello_conversation_streams_then_renders_transcript() {
    let calls = Arc::new(AtomicUsize::new(0));
    let daemon = fake_daemon(&["llama3", "mistral"], vec![piece("Hi"), piece(" there!"), done()], calls.clone()).await;
    let ui = start_ui(&daemon).await;
    let mut ws = connect(&ui).await;

    let initial = next_json(&mut ws).await;
    assert_eq!(initial["type"], "render");
    assert_eq!(initial["view"]["title"], TITLE);
    assert_eq!(initial["view"]["models"], json!(["llama3", "mistral"]));
    assert_eq!(initial["view"]["selected_model"], "llama3");
    assert_eq!(initial["view"]["input_enabled"], true);

    send_json(&mut ws, json!({ "type": "select_model", "model": "llama3" })).await;
    let selected = next_json(&mut ws).await;
    assert_eq!(selected["view"]["selected_model"], "llama3");

    send_json(&mut ws, json!({ "type": "chat", "content": "hello" })).await;
    assert_eq!(next_json(&mut ws).await["type"], "processing");

    let first = next_json(&mut ws).await;
    assert_eq!(first, json!({ "type": "fragment", "content": "Hi", "partial": "Hi▌" }));
    let second = next_json(&mut ws).await;
    assert_eq!(second, json!({ "type": "fragment", "content": " there!", "partial": "Hi there!▌" }));

    let finished = next_json(&mut ws).await;
    assert_eq!(finished["type"], "render");
    assert_eq!(
        finished["view"]["transcript"],
        json!([
            { "role": "user", "content": "hello" },
            { "role": "assistant", "content": "Hi there!" }
        ])
    );
    assert_eq!(finished["view"]["notice"], Value::Null);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    send_json(&mut ws, json!({ "type": "reset" })).await;
    let reset = next_json(&mut ws).await;
    assert_eq!(reset["view"]["transcript"], json!([]));
    assert_eq!(reset["view"]["selected_model"], "llama3");
}

#[tokio::test]
async fn sessions_do_not_share_transcripts() {
    let calls = Arc::new(AtomicUsize::new(0));
    let daemon = fake_daemon(&["llama3"], vec![piece("ok"), done()], calls).await;
    let ui = start_ui(&daemon).await;

    let mut first = connect(&ui).await;
    let mut second = connect(&ui).await;
    next_json(&mut first).await;
    next_json(&mut second).await;

    send_json(&mut first, json!({ "type": "chat", "content": "only mine" })).await;
    loop {
        if next_json(&mut first).await["type"] == "render" {
            break;
        }
    }

    send_json(&mut second, json!({ "type": "refresh_models" })).await;
    let view = next_json(&mut second).await;
    assert_eq!(view["view"]["transcript"], json!([]));
}

#[tokio::test]
async fn empty_directory_blocks_chat() {
    let calls = Arc::new(AtomicUsize::new(0));
    let daemon = fake_daemon(&[], vec![piece("never"), done()], calls.clone()).await;
    let ui = start_ui(&daemon).await;
    let mut ws = connect(&ui).await;

    let initial = next_json(&mut ws).await;
    assert_eq!(initial["view"]["models"], json!([]));
    assert_eq!(initial["view"]["selected_model"], Value::Null);
    assert_eq!(initial["view"]["input_enabled"], false);
    assert_eq!(initial["view"]["notice"]["kind"], "empty_directory");
    assert_eq!(
        initial["view"]["notice"]["message"],
        "No models available. Make sure Ollama is running."
    );

    send_json(&mut ws, json!({ "type": "chat", "content": "hello" })).await;
    let after = next_json(&mut ws).await;
    assert_eq!(after["type"], "render");
    assert_eq!(after["view"]["transcript"], json!([]));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn mid_stream_failure_keeps_partial_reply_and_shows_error() {
    let calls = Arc::new(AtomicUsize::new(0));
    let reply = vec![piece("Partial"), json!({ "error": "model runner has unexpectedly stopped" })];
    let daemon = fake_daemon(&["llama3"], reply, calls).await;
    let ui = start_ui(&daemon).await;
    let mut ws = connect(&ui).await;
    next_json(&mut ws).await;

    send_json(&mut ws, json!({ "type": "chat", "content": "hello" })).await;
    let view = loop {
        let message = next_json(&mut ws).await;
        if message["type"] == "render" {
            break message["view"].clone();
        }
    };

    assert_eq!(
        view["transcript"],
        json!([
            { "role": "user", "content": "hello" },
            { "role": "assistant", "content": "Partial" }
        ])
    );
    assert_eq!(view["notice"]["kind"], "model_invocation");
    assert!(
        view["notice"]["message"]
            .as_str()
            .unwrap()
            .contains("model runner has unexpectedly stopped")
    );
    assert_eq!(view["input_enabled"], true);
}

#[tokio::test]
async fn bad_messages_get_an_error_reply() {
    let calls = Arc::new(AtomicUsize::new(0));
    let daemon = fake_daemon(&["llama3"], vec![done()], calls).await;
    let ui = start_ui(&daemon).await;
    let mut ws = connect(&ui).await;
    next_json(&mut ws).await;

    send_json(&mut ws, json!({ "type": "launch_missiles" })).await;
    let reply = next_json(&mut ws).await;
    assert_eq!(reply["type"], "error");

    send_json(&mut ws, json!({ "type": "select_model", "model": "gpt-4" })).await;
    let reply = next_json(&mut ws).await;
    assert_eq!(reply["type"], "error");
    let view = next_json(&mut ws).await;
    assert_eq!(view["view"]["selected_model"], "llama3");
}

#[tokio::test]
async fn http_endpoints_serve_page_and_model_list() {
    let calls = Arc::new(AtomicUsize::new(0));
    let daemon = fake_daemon(&["llama3", "mistral"], vec![done()], calls).await;
    let ui = start_ui(&daemon).await;
    let http = reqwest::Client::new();

    let page = http.get(format!("http://{}/", ui)).send().await.unwrap().text().await.unwrap();
    assert!(page.contains("<title>SlitChat - Ollama Chat Interface</title>"));

    let models: Value = http
        .get(format!("http://{}/api/models", ui))
        .send().await
        .unwrap()
        .json().await
        .unwrap();
    assert_eq!(models, json!({ "models": ["llama3", "mistral"] }));
}

#[tokio::test]
async fn model_list_reports_unreachable_daemon() {
    let closed = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let daemon = format!("http://{}", closed.local_addr().unwrap());
    drop(closed);
    let ui = start_ui(&daemon).await;

    let response = reqwest::get(format!("http://{}/api/models", ui)).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);

    let mut ws = connect(&ui).await;
    let initial = next_json(&mut ws).await;
    assert_eq!(initial["view"]["notice"]["kind"], "backend_unavailable");
    assert_eq!(initial["view"]["models"], json!([]));
}
