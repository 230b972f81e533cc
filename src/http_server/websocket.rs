use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::dispatch::CommandDispatcher;

#[derive(Deserialize)]
struct InvokeRequest {
    id: String,
    command: String,
    #[serde(default)]
    args: Value,
}

#[derive(Serialize)]
struct InvokeResponse {
    #[serde(rename = "type")]
    msg_type: &'static str,
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl InvokeResponse {
    fn from_result(id: String, result: Result<Value, String>) -> Self {
        match result {
            Ok(data) => Self {
                msg_type: "response",
                id,
                data: Some(data),
                error: None,
            },
            Err(error) => Self {
                msg_type: "error",
                id,
                data: None,
                error: Some(error),
            },
        }
    }
}

/// Handle a single WebSocket connection.
/// Reads invoke requests, dispatches them to command handlers, writes
/// responses in request order.
pub async fn handle_ws_connection(socket: WebSocket, dispatcher: CommandDispatcher) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    while let Some(msg) = ws_rx.next().await {
        let response = match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<InvokeRequest>(&text) {
                Ok(req) => {
                    let result = dispatcher.dispatch_command(&req.command, req.args).await;
                    InvokeResponse::from_result(req.id, result)
                }
                Err(e) => InvokeResponse::from_result(
                    "unknown".to_string(),
                    Err(format!("Invalid request: {e}")),
                ),
            },
            Ok(Message::Ping(data)) => {
                if ws_tx.send(Message::Pong(data)).await.is_err() {
                    break;
                }
                continue;
            }
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue, // Ignore binary, pong
        };

        match serde_json::to_string(&response) {
            Ok(json) => {
                if ws_tx.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            Err(e) => log::error!("Failed to serialize WS response: {e}"),
        }
    }

    log::trace!("WebSocket client disconnected");
}
