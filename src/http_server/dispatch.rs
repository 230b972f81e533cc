use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::bridge::{BridgeError, CommandRequest, NativeCall};
use crate::config::ShellConfig;
use crate::sidecar::SidecarManager;

/// Native command table. Reachable in-process (as a [`NativeCall`]) and
/// through the command server's HTTP and WebSocket endpoints.
#[derive(Clone, Default)]
pub struct CommandDispatcher {
    sidecar: Option<Arc<SidecarManager>>,
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sidecar(sidecar: Arc<SidecarManager>) -> Self {
        Self {
            sidecar: Some(sidecar),
        }
    }

    pub fn from_config(config: &ShellConfig) -> Self {
        match &config.sidecar_program {
            Some(program) => Self::with_sidecar(Arc::new(SidecarManager::new(
                program.clone(),
                config.sidecar_args.clone(),
            ))),
            None => Self::new(),
        }
    }

    fn sidecar(&self) -> Result<&SidecarManager, String> {
        self.sidecar
            .as_deref()
            .ok_or_else(|| "Sidecar is not configured".to_string())
    }

    pub async fn start_sidecar(&self) -> Result<String, String> {
        let outcome = self.sidecar()?.start().await.map_err(|e| e.to_string())?;
        Ok(outcome.message().to_string())
    }

    pub async fn stop_sidecar(&self) -> Result<String, String> {
        let outcome = self.sidecar()?.stop().await.map_err(|e| e.to_string())?;
        Ok(outcome.message().to_string())
    }

    /// Dispatch a command by name to the corresponding handler.
    ///
    /// Each arm deserializes its args from the JSON value, calls the handler,
    /// then serializes the result.
    pub async fn dispatch_command(&self, command: &str, args: Value) -> Result<Value, String> {
        match command {
            "greet" => {
                let name: String = from_field(&args, "name")?;
                to_value(crate::greet(&name))
            }

            // =================================================================
            // API sidecar
            // =================================================================
            "sidecar_status" => {
                let status = self.sidecar()?.status().await;
                to_value(status)
            }
            "start_sidecar" => to_value(self.start_sidecar().await?),
            "stop_sidecar" => to_value(self.stop_sidecar().await?),

            _ => Err(format!("Unknown command: {command}")),
        }
    }
}

#[async_trait]
impl NativeCall for CommandDispatcher {
    async fn call(&self, request: CommandRequest) -> Result<Value, BridgeError> {
        self.dispatch_command(&request.command, Value::Object(request.args))
            .await
            .map_err(|message| BridgeError::from_handler(&request.command, message))
    }
}

// =============================================================================
// Helper functions for JSON deserialization
// =============================================================================

fn to_value<T: serde::Serialize>(val: T) -> Result<Value, String> {
    serde_json::to_value(val).map_err(|e| format!("Serialization error: {e}"))
}

fn from_field<T: serde::de::DeserializeOwned>(args: &Value, field: &str) -> Result<T, String> {
    args.get(field)
        .ok_or_else(|| format!("Missing field: {field}"))
        .and_then(|v| {
            serde_json::from_value(v.clone()).map_err(|e| format!("Invalid field '{field}': {e}"))
        })
}
