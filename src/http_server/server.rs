use axum::{
    body::Bytes,
    extract::{ws::WebSocketUpgrade, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};

use super::auth;
use super::dispatch::CommandDispatcher;
use super::websocket::handle_ws_connection;
use crate::bridge::{CommandRequest, InvokeReply};

/// Shared state for the Axum server.
#[derive(Clone)]
struct AppState {
    dispatcher: CommandDispatcher,
    token: Arc<str>,
}

/// Running command server. Dropping it without [`shutdown`] leaves the
/// server running until the runtime stops.
///
/// [`shutdown`]: CommandServerHandle::shutdown
pub struct CommandServerHandle {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
    pub port: u16,
    pub token: String,
    pub url: String,
    pub localhost_only: bool,
}

/// Status response for the command server.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatus {
    pub running: bool,
    pub url: String,
    pub port: u16,
    pub localhost_only: bool,
}

impl CommandServerHandle {
    pub fn status(&self) -> ServerStatus {
        ServerStatus {
            running: !self.task.is_finished(),
            url: self.url.clone(),
            port: self.port,
            localhost_only: self.localhost_only,
        }
    }

    /// Stop accepting connections and wait for in-flight requests to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            log::error!("Command server task failed: {e}");
        }
    }
}

#[derive(Deserialize)]
struct WsAuth {
    token: Option<String>,
}

/// Start the HTTP + WebSocket command server.
pub async fn start_server(
    dispatcher: CommandDispatcher,
    port: u16,
    token: String,
    localhost_only: bool,
) -> Result<CommandServerHandle, String> {
    let state = AppState {
        dispatcher,
        token: Arc::from(token.as_str()),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        .route("/ws", get(ws_handler))
        .route("/api/auth", get(auth_handler))
        .route("/api/invoke", post(invoke_handler))
        .layer(cors)
        .with_state(state);

    // Bind to localhost only or all interfaces based on preference
    let addr = if localhost_only {
        SocketAddr::from(([127, 0, 0, 1], port))
    } else {
        SocketAddr::from(([0, 0, 0, 0], port))
    };
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind to port {port}: {e}"))?;

    let local_addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get local address: {e}"))?;

    // LAN IP for the URL (only used when not localhost-only)
    let ip = if localhost_only {
        "127.0.0.1".to_string()
    } else {
        get_local_ip().unwrap_or_else(|| "127.0.0.1".to_string())
    };
    let url = format!("http://{ip}:{}", local_addr.port());

    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let task = tokio::spawn(async move {
        log::info!("Command server listening on {local_addr} (localhost_only: {localhost_only})");
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                log::info!("Command server shutting down");
            })
            .await
            .unwrap_or_else(|e| log::error!("Command server error: {e}"));
    });

    Ok(CommandServerHandle {
        shutdown_tx,
        task,
        port: local_addr.port(),
        token,
        url,
        localhost_only,
    })
}

/// WebSocket upgrade handler with token auth.
async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsAuth>,
    State(state): State<AppState>,
) -> Response {
    let provided = params.token.unwrap_or_default();
    if !auth::validate_token(&provided, &state.token) {
        return (StatusCode::UNAUTHORIZED, "Invalid token").into_response();
    }

    let dispatcher = state.dispatcher.clone();
    ws.on_upgrade(move |socket| handle_ws_connection(socket, dispatcher))
}

/// Token validation endpoint. Returns 200 with { ok: true } on success,
/// or 401 with { ok: false, error: "..." } on failure.
async fn auth_handler(Query(params): Query<WsAuth>, State(state): State<AppState>) -> Response {
    let provided = params.token.unwrap_or_default();
    if auth::validate_token(&provided, &state.token) {
        Json(serde_json::json!({ "ok": true })).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(InvokeReply::failure("Invalid token")),
        )
            .into_response()
    }
}

/// One native command per request, authorized by bearer token.
async fn invoke_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let provided = auth::bearer_token(&headers).unwrap_or_default();
    if !auth::validate_token(provided, &state.token) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(InvokeReply::failure("Invalid token")),
        )
            .into_response();
    }

    // Parsed only after auth, so unauthenticated callers always see 401
    let request: CommandRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(InvokeReply::failure(format!("Invalid request body: {e}"))),
            )
                .into_response();
        }
    };

    let command = request.command;
    match state
        .dispatcher
        .dispatch_command(&command, Value::Object(request.args))
        .await
    {
        Ok(data) => Json(InvokeReply::success(data)).into_response(),
        Err(error) => {
            log::warn!("Command '{command}' failed: {error}");
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(InvokeReply::failure(error)),
            )
                .into_response()
        }
    }
}

/// Get the local LAN IP address.
fn get_local_ip() -> Option<String> {
    use std::net::UdpSocket;
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    let addr = socket.local_addr().ok()?;
    Some(addr.ip().to_string())
}

#[cfg(test)]
mod tests {
    use futures_util::{SinkExt, StreamExt};
    use serde_json::json;
    use tokio_tungstenite::tungstenite::Message;

    use super::*;

    async fn local_server() -> CommandServerHandle {
        start_server(CommandDispatcher::new(), 0, auth::generate_token(), true)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn invoke_runs_the_command() {
        let server = local_server().await;

        let reply: InvokeReply = reqwest::Client::new()
            .post(format!("{}/api/invoke", server.url))
            .bearer_auth(&server.token)
            .json(&json!({ "command": "greet", "args": { "name": "Ada" } }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(
            reply,
            InvokeReply::success(json!("Hello, Ada! You've been greeted from Rust!"))
        );
        server.shutdown().await;
    }

    #[tokio::test]
    async fn invoke_rejects_wrong_token() {
        let server = local_server().await;

        let response = reqwest::Client::new()
            .post(format!("{}/api/invoke", server.url))
            .bearer_auth("wrong")
            .json(&json!({ "command": "greet", "args": { "name": "Ada" } }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
        server.shutdown().await;
    }

    #[tokio::test]
    async fn malformed_body_is_checked_after_the_token() {
        let server = local_server().await;
        let client = reqwest::Client::new();

        let denied = client
            .post(format!("{}/api/invoke", server.url))
            .bearer_auth("wrong")
            .body("{ not json")
            .send()
            .await
            .unwrap();
        assert_eq!(denied.status(), reqwest::StatusCode::UNAUTHORIZED);

        let rejected = client
            .post(format!("{}/api/invoke", server.url))
            .bearer_auth(&server.token)
            .body("{ not json")
            .send()
            .await
            .unwrap();
        assert_eq!(rejected.status(), reqwest::StatusCode::BAD_REQUEST);
        let reply: InvokeReply = rejected.json().await.unwrap();
        assert!(!reply.ok);
        assert!(reply.error.unwrap().starts_with("Invalid request body"));
        server.shutdown().await;
    }

    #[tokio::test]
    async fn invoke_reports_handler_errors() {
        let server = local_server().await;

        let response = reqwest::Client::new()
            .post(format!("{}/api/invoke", server.url))
            .bearer_auth(&server.token)
            .json(&json!({ "command": "shout" }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
        let reply: InvokeReply = response.json().await.unwrap();
        assert_eq!(reply, InvokeReply::failure("Unknown command: shout"));
        server.shutdown().await;
    }

    #[tokio::test]
    async fn auth_endpoint_checks_token() {
        let server = local_server().await;
        let client = reqwest::Client::new();

        let ok = client
            .get(format!("{}/api/auth?token={}", server.url, server.token))
            .send()
            .await
            .unwrap();
        assert_eq!(ok.status(), reqwest::StatusCode::OK);

        let denied = client
            .get(format!("{}/api/auth?token=nope", server.url))
            .send()
            .await
            .unwrap();
        assert_eq!(denied.status(), reqwest::StatusCode::UNAUTHORIZED);
        server.shutdown().await;
    }

    #[tokio::test]
    async fn websocket_invoke_round_trip() {
        let server = local_server().await;
        let ws_url = format!(
            "ws://127.0.0.1:{}/ws?token={}",
            server.port, server.token
        );
        let (mut socket, _) = tokio_tungstenite::connect_async(ws_url).await.unwrap();

        let request = json!({ "id": "1", "command": "greet", "args": { "name": "Ada" } });
        socket
            .send(Message::Text(request.to_string()))
            .await
            .unwrap();
        let reply = match socket.next().await.unwrap().unwrap() {
            Message::Text(text) => serde_json::from_str::<Value>(&text).unwrap(),
            other => panic!("unexpected frame: {other:?}"),
        };
        assert_eq!(
            reply,
            json!({
                "type": "response",
                "id": "1",
                "data": "Hello, Ada! You've been greeted from Rust!"
            })
        );

        socket
            .send(Message::Text(json!({ "id": "2", "command": "shout" }).to_string()))
            .await
            .unwrap();
        let reply = match socket.next().await.unwrap().unwrap() {
            Message::Text(text) => serde_json::from_str::<Value>(&text).unwrap(),
            other => panic!("unexpected frame: {other:?}"),
        };
        assert_eq!(reply["type"], "error");
        assert_eq!(reply["id"], "2");
        assert_eq!(reply["error"], "Unknown command: shout");

        socket.close(None).await.unwrap();
        server.shutdown().await;
    }

    #[tokio::test]
    async fn status_reflects_the_running_server() {
        let server = local_server().await;
        let status = server.status();
        assert!(status.running);
        assert_eq!(status.port, server.port);
        assert!(status.localhost_only);
        assert_eq!(status.url, format!("http://127.0.0.1:{}", server.port));
        server.shutdown().await;
    }
}
