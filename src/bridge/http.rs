use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

use super::{BridgeError, CommandRequest, InvokeReply, NativeCall};

/// [`NativeCall`] that crosses the process boundary by posting to the
/// command server's `/api/invoke` endpoint.
pub struct HttpNativeCall {
    client: reqwest::Client,
    invoke_url: String,
    token: String,
}

impl HttpNativeCall {
    /// `base_url` is the server URL as reported by its handle, e.g. `http://127.0.0.1:3456`.
    pub fn new(base_url: &str, token: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, token)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str, token: impl Into<String>) -> Self {
        Self {
            client,
            invoke_url: format!("{}/api/invoke", base_url.trim_end_matches('/')),
            token: token.into(),
        }
    }
}

#[async_trait]
impl NativeCall for HttpNativeCall {
    async fn call(&self, request: CommandRequest) -> Result<Value, BridgeError> {
        let response = self
            .client
            .post(&self.invoke_url)
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await
            .map_err(|e| BridgeError::Transport(format!("{}: {e}", self.invoke_url)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(BridgeError::Transport(
                "command server rejected the token".to_string(),
            ));
        }

        let reply: InvokeReply = response
            .json()
            .await
            .map_err(|e| BridgeError::Transport(format!("Invalid reply ({status}): {e}")))?;

        if reply.ok {
            Ok(reply.data.unwrap_or(Value::Null))
        } else {
            let message = reply
                .error
                .unwrap_or_else(|| format!("Command failed with status {status}"));
            Err(BridgeError::from_handler(&request.command, message))
        }
    }
}
