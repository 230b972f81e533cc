use std::collections::BTreeMap;

use super::{ViewError, ViewModel};

type Initializer = Box<dyn Fn() -> Box<dyn ViewModel> + Send + Sync>;

/// Collects named view-model initializers before the engine starts.
///
/// [`start`](Self::start) consumes the registry, so nothing can be
/// registered once the engine is running.
#[derive(Default)]
pub struct ViewModelRegistry {
    initializers: BTreeMap<String, Initializer>,
}

impl ViewModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `initializer` under `name`. A later registration under the
    /// same name replaces the earlier one.
    pub fn register<F, M>(&mut self, name: &str, initializer: F) -> &mut Self
    where
        F: Fn() -> M + Send + Sync + 'static,
        M: ViewModel + 'static,
    {
        let boxed: Initializer = Box::new(move || Box::new(initializer()) as Box<dyn ViewModel>);
        if self.initializers.insert(name.to_string(), boxed).is_some() {
            log::warn!("View model '{name}' registered twice, keeping the latest");
        }
        self
    }

    pub fn start(self) -> Engine {
        log::info!(
            "Starting view engine with {} view model(s)",
            self.initializers.len()
        );
        Engine {
            initializers: self.initializers,
        }
    }
}

/// Running view engine. Passed explicitly to whatever needs to mount
/// components.
pub struct Engine {
    initializers: BTreeMap<String, Initializer>,
}

impl Engine {
    /// Create a fresh instance of the view model registered as `name`.
    pub fn mount(&self, name: &str) -> Result<Box<dyn ViewModel>, ViewError> {
        let initializer = self
            .initializers
            .get(name)
            .ok_or_else(|| ViewError::UnknownComponent(name.to_string()))?;
        log::trace!("Mounting view model '{name}'");
        Ok(initializer())
    }

    pub fn names(&self) -> Vec<&str> {
        self.initializers.keys().map(String::as_str).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.initializers.contains_key(name)
    }
}
