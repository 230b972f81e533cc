//! Composition root for the view side.

use std::sync::{Arc, Mutex};

use crate::bridge::{CommandBridge, NativeCall};
use crate::config::ShellConfig;
use crate::dom::{Document, Subscription};
use crate::fetch::HttpFetch;
use crate::views::{
    Engine, FileProcessing, GreetFlow, GreetHost, RemoteMessageFlow, ViewModelRegistry,
};

/// Registers the view models, starts the engine, and wires the greet form
/// once the document has loaded.
pub struct Shell {
    engine: Engine,
    greet: Arc<GreetFlow>,
    greet_subscription: Mutex<Option<Subscription>>,
}

impl Shell {
    pub fn build(config: &ShellConfig, native: Arc<dyn NativeCall>, fetch: Arc<dyn HttpFetch>) -> Self {
        let bridge = CommandBridge::new(native);
        let greet = Arc::new(GreetFlow::new(bridge));

        let mut registry = ViewModelRegistry::new();
        registry.register(FileProcessing::NAME, || FileProcessing);

        let endpoint = config.remote_endpoint.clone();
        registry.register(RemoteMessageFlow::NAME, move || {
            RemoteMessageFlow::new(endpoint.clone(), Arc::clone(&fetch))
        });

        let host = Arc::clone(&greet);
        registry.register(GreetHost::NAME, move || GreetHost::new(Arc::clone(&host)));

        Self {
            engine: registry.start(),
            greet,
            greet_subscription: Mutex::new(None),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn greet(&self) -> &Arc<GreetFlow> {
        &self.greet
    }

    /// The document finished loading: resolve the greet elements and listen
    /// for submissions. Calling it again re-wires against the new document.
    pub fn content_loaded(&self, document: &Document) {
        let subscription = self.greet.attach(document);
        if subscription.is_none() {
            log::warn!("No #greet-form in document, greet form is not wired");
        }
        *self.lock_subscription() = subscription;
    }

    /// Stop listening for greet submissions.
    pub fn teardown(&self) {
        if let Some(subscription) = self.lock_subscription().take() {
            subscription.unsubscribe();
        }
    }

    fn lock_subscription(&self) -> std::sync::MutexGuard<'_, Option<Subscription>> {
        self.greet_subscription
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
