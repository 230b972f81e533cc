//! View-model fragments exposed to declarative bindings.
//!
//! Each fragment is registered by name with a [`ViewModelRegistry`]; bindings
//! read a fragment's state through [`ViewModel::data`] and call its methods
//! through [`ViewModel::call`] with positional JSON arguments.

pub mod file_processing;
pub mod greet;
pub mod registry;
pub mod remote;

use async_trait::async_trait;
use serde_json::Value;

use crate::bridge::BridgeError;
use crate::fetch::FetchError;

pub use file_processing::FileProcessing;
pub use greet::{GreetFlow, GreetHost, GreetState};
pub use registry::{Engine, ViewModelRegistry};
pub use remote::RemoteMessageFlow;

#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("no view model registered as '{0}'")]
    UnknownComponent(String),

    #[error("'{component}' has no method '{method}'")]
    UnknownMethod { component: String, method: String },

    #[error("invalid argument for '{method}': {message}")]
    InvalidArgument { method: String, message: String },

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

#[async_trait]
pub trait ViewModel: Send + Sync {
    /// Registered component name.
    fn name(&self) -> &'static str;

    /// Snapshot of the bindable state.
    fn data(&self) -> Value;

    async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, ViewError>;
}

pub(crate) fn unknown_method(component: &str, method: &str) -> ViewError {
    ViewError::UnknownMethod {
        component: component.to_string(),
        method: method.to_string(),
    }
}
