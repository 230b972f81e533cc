use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};

use super::{unknown_method, ViewError, ViewModel};
use crate::bridge::{BridgeError, CommandBridge};
use crate::dom::{Document, Element, Subscription, Task};

pub const GREET_INPUT: &str = "#greet-input";
pub const GREET_MSG: &str = "#greet-msg";
pub const GREET_FORM: &str = "#greet-form";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GreetState {
    Idle,
    Submitting,
}

struct GreetInner {
    input: Option<Element>,
    output: Option<Element>,
    /// Submissions whose reply has not arrived yet.
    in_flight: usize,
    last_error: Option<String>,
}

/// Wires `#greet-form` submissions to the native `greet` command and writes
/// the reply into `#greet-msg`.
pub struct GreetFlow {
    bridge: CommandBridge,
    inner: Mutex<GreetInner>,
}

impl GreetFlow {
    pub fn new(bridge: CommandBridge) -> Self {
        Self {
            bridge,
            inner: Mutex::new(GreetInner {
                input: None,
                output: None,
                in_flight: 0,
                last_error: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, GreetInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Resolve the greet elements and listen for form submissions.
    ///
    /// Returns `None` when the document has no `#greet-form`.
    pub fn attach(self: &Arc<Self>, document: &Document) -> Option<Subscription> {
        {
            let mut inner = self.lock();
            inner.input = document.query_selector(GREET_INPUT);
            inner.output = document.query_selector(GREET_MSG);
        }

        let flow = Arc::clone(self);
        document.add_event_listener(GREET_FORM, "submit", move |event| {
            event.prevent_default();
            let flow = Arc::clone(&flow);
            let task: Task = Box::pin(async move {
                // Failures are logged and kept in `last_error`
                let _ = flow.greet().await;
            });
            Some(task)
        })
    }

    /// `Submitting` while any submission is still waiting for its reply.
    pub fn state(&self) -> GreetState {
        if self.lock().in_flight > 0 {
            GreetState::Submitting
        } else {
            GreetState::Idle
        }
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    /// Send the input value to the `greet` command and show the reply.
    ///
    /// Returns `Ok(None)` without calling the command when the input or
    /// output element has not been resolved yet.
    pub async fn greet(&self) -> Result<Option<String>, BridgeError> {
        let (input, output) = {
            let mut inner = self.lock();
            let (Some(input), Some(output)) = (inner.input.clone(), inner.output.clone()) else {
                log::debug!("Greet elements not resolved yet, ignoring submit");
                return Ok(None);
            };
            inner.in_flight += 1;
            (input, output)
        };

        let mut args = Map::new();
        args.insert("name".to_string(), Value::String(input.value()));
        let result = self.bridge.invoke("greet", args).await;

        let mut inner = self.lock();
        inner.in_flight = inner.in_flight.saturating_sub(1);
        match result {
            Ok(value) => {
                let text = match value {
                    Value::String(text) => text,
                    other => other.to_string(),
                };
                output.set_text_content(&text);
                inner.last_error = None;
                Ok(Some(text))
            }
            Err(e) => {
                log::error!("Failed to greet: {e}");
                inner.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }
}

/// View-model face of the page's single [`GreetFlow`].
#[derive(Clone)]
pub struct GreetHost {
    flow: Arc<GreetFlow>,
}

impl GreetHost {
    pub const NAME: &'static str = "greet";

    pub fn new(flow: Arc<GreetFlow>) -> Self {
        Self { flow }
    }
}

#[async_trait]
impl ViewModel for GreetHost {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn data(&self) -> Value {
        json!({
            "state": self.flow.state(),
            "lastError": self.flow.last_error(),
        })
    }

    async fn call(&self, method: &str, _args: Vec<Value>) -> Result<Value, ViewError> {
        match method {
            "submit" => {
                let text = self.flow.greet().await?;
                Ok(text.map_or(Value::Null, Value::String))
            }
            _ => Err(unknown_method(Self::NAME, method)),
        }
    }
}
