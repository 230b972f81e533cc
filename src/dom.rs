//! Minimal document model for the view flows.
//!
//! Elements are addressed by `#id` selectors. Event listeners run
//! synchronously during [`Document::dispatch`]; any async continuation they
//! start is handed back in the [`Dispatch`] instead of being spawned, so the
//! caller plays the role of the event loop and decides when it runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use futures_util::future::BoxFuture;

/// Continuation started by an event listener.
pub type Task = BoxFuture<'static, ()>;

type Listener = Arc<dyn Fn(&mut DomEvent) -> Option<Task> + Send + Sync>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
struct ElementState {
    value: String,
    text_content: String,
}

/// Shared handle to a document element.
#[derive(Debug, Clone)]
pub struct Element {
    id: String,
    state: Arc<Mutex<ElementState>>,
}

impl Element {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            state: Arc::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current value of an input element.
    pub fn value(&self) -> String {
        lock(&self.state).value.clone()
    }

    pub fn set_value(&self, value: &str) {
        lock(&self.state).value = value.to_string();
    }

    pub fn text_content(&self) -> String {
        lock(&self.state).text_content.clone()
    }

    pub fn set_text_content(&self, text: &str) {
        lock(&self.state).text_content = text.to_string();
    }
}

/// Event passed to listeners.
#[derive(Debug)]
pub struct DomEvent {
    kind: String,
    target: String,
    default_prevented: bool,
}

impl DomEvent {
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Id of the element the event was dispatched on.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

struct ListenerEntry {
    id: u64,
    target: String,
    kind: String,
    listener: Listener,
}

#[derive(Default)]
struct DocumentInner {
    elements: Mutex<HashMap<String, Element>>,
    listeners: Mutex<Vec<ListenerEntry>>,
    next_listener_id: AtomicU64,
}

#[derive(Clone, Default)]
pub struct Document {
    inner: Arc<DocumentInner>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the element with `id` (no leading `#`), or return the existing one.
    pub fn create_element(&self, id: &str) -> Element {
        lock(&self.inner.elements)
            .entry(id.to_string())
            .or_insert_with(|| Element::new(id))
            .clone()
    }

    /// Look up an element by `#id`. Other selector forms match nothing.
    pub fn query_selector(&self, selector: &str) -> Option<Element> {
        let id = selector.strip_prefix('#')?;
        lock(&self.inner.elements).get(id).cloned()
    }

    /// Register `listener` for `kind` events on the element matched by
    /// `selector`. Returns `None` when no element matches, mirroring
    /// `querySelector(..)?.addEventListener(..)`.
    pub fn add_event_listener<F>(&self, selector: &str, kind: &str, listener: F) -> Option<Subscription>
    where
        F: Fn(&mut DomEvent) -> Option<Task> + Send + Sync + 'static,
    {
        let element = self.query_selector(selector)?;
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.inner.listeners).push(ListenerEntry {
            id,
            target: element.id().to_string(),
            kind: kind.to_string(),
            listener: Arc::new(listener),
        });
        log::trace!("Added '{kind}' listener #{id} on {selector}");

        Some(Subscription {
            document: Arc::downgrade(&self.inner),
            id,
            active: true,
        })
    }

    /// Fire `kind` on the element matched by `selector`.
    pub fn dispatch(&self, selector: &str, kind: &str) -> Dispatch {
        let target = selector.strip_prefix('#').unwrap_or(selector).to_string();
        let mut event = DomEvent {
            kind: kind.to_string(),
            target,
            default_prevented: false,
        };

        // Snapshot so listeners may add or remove listeners while running
        let listeners: Vec<Listener> = lock(&self.inner.listeners)
            .iter()
            .filter(|entry| entry.target == event.target && entry.kind == event.kind)
            .map(|entry| Arc::clone(&entry.listener))
            .collect();

        let tasks = listeners
            .iter()
            .filter_map(|listener| listener(&mut event))
            .collect();

        Dispatch {
            default_prevented: event.default_prevented,
            tasks,
        }
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.inner.listeners).len()
    }
}

/// Outcome of [`Document::dispatch`].
#[must_use = "pending continuations do nothing unless awaited or spawned"]
pub struct Dispatch {
    default_prevented: bool,
    tasks: Vec<Task>,
}

impl Dispatch {
    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    pub fn into_tasks(self) -> Vec<Task> {
        self.tasks
    }

    /// Run every pending continuation to completion, in listener order.
    pub async fn settle(self) {
        for task in self.tasks {
            task.await;
        }
    }
}

/// Keeps a listener registered. Dropping it (or calling [`unsubscribe`])
/// removes the listener.
///
/// [`unsubscribe`]: Subscription::unsubscribe
pub struct Subscription {
    document: Weak<DocumentInner>,
    id: u64,
    active: bool,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(document) = self.document.upgrade() {
            lock(&document.listeners).retain(|entry| entry.id != self.id);
            log::trace!("Removed listener #{}", self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.remove();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[test]
    fn query_selector_matches_ids_only() {
        let document = Document::new();
        let input = document.create_element("greet-input");
        input.set_value("Ada");

        assert_eq!(document.query_selector("#greet-input").unwrap().value(), "Ada");
        assert!(document.query_selector("greet-input").is_none());
        assert!(document.query_selector("#missing").is_none());
    }

    #[test]
    fn element_handles_share_state() {
        let document = Document::new();
        let msg = document.create_element("greet-msg");
        document
            .query_selector("#greet-msg")
            .unwrap()
            .set_text_content("hi");
        assert_eq!(msg.text_content(), "hi");
    }

    #[test]
    fn listener_on_missing_element_is_not_registered() {
        let document = Document::new();
        assert!(document
            .add_event_listener("#greet-form", "submit", |_| None)
            .is_none());
        assert_eq!(document.listener_count(), 0);
    }

    #[tokio::test]
    async fn dispatch_returns_pending_continuations() {
        let document = Document::new();
        document.create_element("form");
        let ran = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&ran);
        let _subscription = document.add_event_listener("#form", "submit", move |event| {
            event.prevent_default();
            let counter = Arc::clone(&counter);
            Some(Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }) as Task)
        });

        let dispatch = document.dispatch("#form", "submit");
        assert!(dispatch.default_prevented());
        assert_eq!(dispatch.pending(), 1);
        assert_eq!(ran.load(Ordering::SeqCst), 0);

        dispatch.settle().await;
        assert_eq!(ran.load(Ordering::SeqCst), 1);

        // Other event kinds do not reach the listener
        assert_eq!(document.dispatch("#form", "reset").pending(), 0);
    }

    #[test]
    fn unsubscribe_and_drop_remove_listeners() {
        let document = Document::new();
        document.create_element("form");

        let first = document.add_event_listener("#form", "submit", |_| None).unwrap();
        let second = document.add_event_listener("#form", "submit", |_| None).unwrap();
        assert_eq!(document.listener_count(), 2);

        first.unsubscribe();
        assert_eq!(document.listener_count(), 1);

        drop(second);
        assert_eq!(document.listener_count(), 0);
    }
}
