//! Catalog of extension modules compiled into the bot

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::traits::Extension;

/// Builds a fresh extension instance on every import
pub type ExtensionFactory = Arc<dyn Fn() -> Arc<dyn Extension> + Send + Sync>;

/// Entry point name reported for builtin modules
pub const BUILTIN_ENTRY_POINT: &str = "register";

/// Module key -> factory. Manifests select a module with `module: <key>`.
#[derive(Clone, Default)]
pub struct ModuleCatalog {
    factories: HashMap<String, ExtensionFactory>,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding the extensions shipped with the bot
    pub fn bundled() -> Self {
        super::bundled::register_all(Self::new())
    }

    pub fn with_module<F, E>(mut self, key: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> E + Send + Sync + 'static,
        E: Extension + 'static,
    {
        self.add(key, factory);
        self
    }

    pub fn add<F, E>(&mut self, key: impl Into<String>, factory: F)
    where
        F: Fn() -> E + Send + Sync + 'static,
        E: Extension + 'static,
    {
        let factory: ExtensionFactory = Arc::new(move || Arc::new(factory()) as Arc<dyn Extension>);
        self.factories.insert(key.into(), factory);
    }

    pub fn instantiate(&self, key: &str) -> Option<Arc<dyn Extension>> {
        self.factories.get(key).map(|factory| factory())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.factories.contains_key(key)
    }

    pub fn modules(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}
