//! Native command bridge.
//!
//! The view side never talks to a command handler directly: it hands a
//! [`CommandRequest`] to a [`NativeCall`] capability and awaits the reply.
//! Two capabilities exist:
//! - [`crate::http_server::dispatch::CommandDispatcher`]: in-process
//! - [`HttpNativeCall`]: across the process boundary via the command server

pub mod http;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use http::HttpNativeCall;

/// A named command plus its arguments. Built right before a call, consumed by it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub command: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl CommandRequest {
    pub fn new(command: impl Into<String>, args: Map<String, Value>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }
}

/// Reply body of `POST /api/invoke`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvokeReply {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InvokeReply {
    pub fn success(data: Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The call never reached a handler, or its reply never came back.
    #[error("native call failed: {0}")]
    Transport(String),

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("invalid arguments for '{command}': {message}")]
    InvalidArgs { command: String, message: String },

    /// The handler ran and returned an error.
    #[error("command '{command}' failed: {message}")]
    Command { command: String, message: String },

    #[error("unexpected result from '{command}': {source}")]
    Decode {
        command: String,
        #[source]
        source: serde_json::Error,
    },
}

impl BridgeError {
    /// Classify an error string produced by a command handler.
    pub fn from_handler(command: &str, message: String) -> Self {
        if message.starts_with("Unknown command:") {
            Self::UnknownCommand(command.to_string())
        } else if message.starts_with("Missing field:") || message.starts_with("Invalid field") {
            Self::InvalidArgs {
                command: command.to_string(),
                message,
            }
        } else {
            Self::Command {
                command: command.to_string(),
                message,
            }
        }
    }
}

/// Capability that carries a command to its handler and returns the reply.
#[async_trait]
pub trait NativeCall: Send + Sync {
    async fn call(&self, request: CommandRequest) -> Result<Value, BridgeError>;
}

/// Stateless front for a [`NativeCall`]. One round trip per invocation,
/// no retries, no timeout.
#[derive(Clone)]
pub struct CommandBridge {
    native: Arc<dyn NativeCall>,
}

impl CommandBridge {
    pub fn new(native: Arc<dyn NativeCall>) -> Self {
        Self { native }
    }

    pub async fn invoke(
        &self,
        command: &str,
        args: Map<String, Value>,
    ) -> Result<Value, BridgeError> {
        log::trace!("Invoking native command '{command}'");
        let result = self.native.call(CommandRequest::new(command, args)).await;
        if let Err(e) = &result {
            log::debug!("Native command '{command}' failed: {e}");
        }
        result
    }

    /// Invoke and deserialize the result into `T`.
    pub async fn invoke_as<T: DeserializeOwned>(
        &self,
        command: &str,
        args: Map<String, Value>,
    ) -> Result<T, BridgeError> {
        let value = self.invoke(command, args).await?;
        serde_json::from_value(value).map_err(|source| BridgeError::Decode {
            command: command.to_string(),
            source,
        })
    }
}
