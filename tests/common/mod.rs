//! Fixtures shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use powi_bot::application::errors::SetupError;
use powi_bot::domain::entities::{Command, EventKind};
use powi_bot::domain::traits::{Extension, Registrar};
use powi_bot::extensions::{Discovery, LifecycleManager, DEFAULT_ENTRY_FILE};
use powi_bot::infrastructure::extensions::{BotRuntime, ModuleCatalog};

/// Registers one command named after itself
pub struct Simple(pub &'static str);

#[async_trait]
impl Extension for Simple {
    fn name(&self) -> &str {
        self.0
    }

    async fn register(&self, host: &mut Registrar) -> Result<(), SetupError> {
        let reply = format!("{} here", self.0);
        host.add_command(Command::new(self.0).with_handler(move |_| Ok(reply.clone())))
            .listen(EventKind::Message, |_| None);
        Ok(())
    }
}

pub struct Failing;

#[async_trait]
impl Extension for Failing {
    fn name(&self) -> &str {
        "failing"
    }

    async fn register(&self, host: &mut Registrar) -> Result<(), SetupError> {
        host.add_command(Command::new("never"));
        Err(SetupError::with_source(
            "could not connect",
            std::io::Error::new(std::io::ErrorKind::Other, "missing API key"),
        ))
    }
}

pub struct Slow;

#[async_trait]
impl Extension for Slow {
    fn name(&self) -> &str {
        "slow"
    }

    async fn register(&self, _host: &mut Registrar) -> Result<(), SetupError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(())
    }
}

/// Counts activations and yields while registering
pub struct Counting(pub Arc<AtomicUsize>);

#[async_trait]
impl Extension for Counting {
    fn name(&self) -> &str {
        "counting"
    }

    async fn register(&self, host: &mut Registrar) -> Result<(), SetupError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        host.add_command(Command::new("count"));
        Ok(())
    }
}

pub fn catalog(counter: Arc<AtomicUsize>) -> ModuleCatalog {
    ModuleCatalog::new()
        .with_module("alpha", || Simple("alpha"))
        .with_module("gamma", || Simple("gamma"))
        .with_module("version", || Simple("version"))
        .with_module("failing", || Failing)
        .with_module("slow", || Slow)
        .with_module("counting", move || Counting(counter.clone()))
}

/// Create `root/dir/extension.yaml` pointing at a builtin module
pub fn write_extension(root: &Path, dir: &str, module: &str) {
    write_manifest(root, dir, &format!("module: {}\n", module));
}

pub fn write_manifest(root: &Path, dir: &str, content: &str) {
    let path = root.join(dir);
    fs::create_dir_all(&path).unwrap();
    fs::write(path.join(DEFAULT_ENTRY_FILE), content).unwrap();
}

pub struct Harness {
    pub root: tempfile::TempDir,
    pub runtime: Arc<BotRuntime>,
    pub manager: Arc<LifecycleManager>,
    pub activations: Arc<AtomicUsize>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(5))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let root = tempfile::tempdir().unwrap();
        let activations = Arc::new(AtomicUsize::new(0));
        let runtime = Arc::new(BotRuntime::new(catalog(activations.clone())));
        let manager = Arc::new(LifecycleManager::new(
            Discovery::new(root.path(), DEFAULT_ENTRY_FILE),
            runtime.clone(),
            timeout,
        ));
        Self {
            root,
            runtime,
            manager,
            activations,
        }
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    pub async fn has_command(&self, name: &str) -> bool {
        self.runtime.commands().read().await.get(name).is_some()
    }
}
