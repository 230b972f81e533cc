use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::watch;

use super::{unknown_method, ViewError, ViewModel};
use crate::fetch::{FetchError, HttpFetch};

/// Local API sidecar endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8008/";

/// Fetches `{ "message": string }` from the local service and keeps the
/// message as observable state.
///
/// Calls are not de-duplicated: when two fetches overlap, whichever response
/// resolves last wins, regardless of call order.
pub struct RemoteMessageFlow {
    endpoint: String,
    fetch: Arc<dyn HttpFetch>,
    message: watch::Sender<String>,
}

impl RemoteMessageFlow {
    pub const NAME: &'static str = "fetchApi";

    pub fn new(endpoint: impl Into<String>, fetch: Arc<dyn HttpFetch>) -> Self {
        let (message, _) = watch::channel(String::new());
        Self {
            endpoint: endpoint.into(),
            fetch,
            message,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn message(&self) -> String {
        self.message.borrow().clone()
    }

    /// Receiver notified on every message replacement.
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.message.subscribe()
    }

    /// GET the endpoint and replace `message` with the body's `message`.
    /// On failure the previous message is kept.
    pub async fn fetch_data(&self) -> Result<String, FetchError> {
        let body = self.fetch.get_json(&self.endpoint).await?;
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .ok_or(FetchError::MissingMessage)?
            .to_string();

        log::trace!("Remote message updated from {}", self.endpoint);
        self.message.send_replace(message.clone());
        Ok(message)
    }
}

#[async_trait]
impl ViewModel for RemoteMessageFlow {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn data(&self) -> Value {
        json!({ "message": self.message() })
    }

    async fn call(&self, method: &str, _args: Vec<Value>) -> Result<Value, ViewError> {
        match method {
            "fetchData" => Ok(Value::String(self.fetch_data().await?)),
            _ => Err(unknown_method(Self::NAME, method)),
        }
    }
}
