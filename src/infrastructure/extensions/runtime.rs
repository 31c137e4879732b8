//! Bot runtime - imports extension modules and wires them into the bot

use async_trait::async_trait;
use libloading::Library;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::RwLock;

use super::builtin::{ModuleCatalog, BUILTIN_ENTRY_POINT};
use super::events::Subscriptions;
use super::manifest::{ExtensionManifest, ModuleSource};
use super::native::NativeLoader;
use crate::application::errors::RuntimeError;
use crate::domain::entities::{CommandRegistry, Event};
use crate::domain::traits::{Extension, HostRuntime, ModuleInfo, Registrar};
use crate::extensions::discovery::DEFAULT_ENTRY_FILE;

/// Command registry shared between the runtime and the command dispatcher
pub type SharedCommandRegistry = Arc<RwLock<CommandRegistry>>;

/// What an import was made from; a cached import is reused only while the
/// disk still matches it
#[derive(Debug, Clone, PartialEq, Eq)]
struct ModuleStamp {
    manifest: ExtensionManifest,
    /// Modification time of a native library
    modified: Option<SystemTime>,
}

impl ModuleStamp {
    fn read(dir: &Path, entry_file: &str) -> Result<Self, RuntimeError> {
        let manifest = ExtensionManifest::from_file(dir.join(entry_file))?;
        let modified = match manifest.source(dir) {
            ModuleSource::Native { library, .. } => {
                std::fs::metadata(&library).and_then(|m| m.modified()).ok()
            }
            ModuleSource::Builtin { .. } => None,
        };
        Ok(Self { manifest, modified })
    }
}

/// A module that has been imported
#[derive(Clone)]
struct ImportedModule {
    stamp: ModuleStamp,
    info: ModuleInfo,
    extension: Arc<dyn Extension>,
    /// Keeps native code mapped while the extension is alive
    library: Option<Arc<Library>>,
}

struct Activation {
    /// Owner tag of the commands and listeners this activation added
    name: String,
    module: ImportedModule,
}

/// Host runtime of the bot: builtin and native modules, commands, event listeners
pub struct BotRuntime {
    catalog: ModuleCatalog,
    native: NativeLoader,
    entry_file: String,
    imports: RwLock<HashMap<String, ImportedModule>>,
    active: RwLock<HashMap<String, Activation>>,
    commands: SharedCommandRegistry,
    subscriptions: RwLock<Subscriptions>,
}

impl BotRuntime {
    pub fn new(catalog: ModuleCatalog) -> Self {
        Self {
            catalog,
            native: NativeLoader::new(),
            entry_file: DEFAULT_ENTRY_FILE.to_string(),
            imports: RwLock::new(HashMap::new()),
            active: RwLock::new(HashMap::new()),
            commands: Arc::new(RwLock::new(CommandRegistry::new())),
            subscriptions: RwLock::new(Subscriptions::new()),
        }
    }

    pub fn with_entry_file(mut self, entry_file: impl Into<String>) -> Self {
        self.entry_file = entry_file.into();
        self
    }

    /// Use an existing command registry, e.g. one already holding host commands
    pub fn with_commands(mut self, commands: SharedCommandRegistry) -> Self {
        self.commands = commands;
        self
    }

    pub fn commands(&self) -> SharedCommandRegistry {
        self.commands.clone()
    }

    /// Deliver an event to every interested listener, collecting their replies
    pub async fn emit(&self, event: &Event) -> Vec<String> {
        let listeners = self.subscriptions.read().await.matching(event);
        listeners.iter().filter_map(|listener| listener(event)).collect()
    }

    pub async fn listener_count(&self, extension: &str) -> usize {
        self.subscriptions.read().await.count_owned_by(extension)
    }

    fn open(&self, import_path: &str, stamp: ModuleStamp) -> Result<ImportedModule, RuntimeError> {
        let dir = Path::new(import_path);
        let manifest = &stamp.manifest;

        match manifest.source(dir) {
            ModuleSource::Builtin { module } => {
                let extension = self.catalog.instantiate(&module).ok_or_else(|| RuntimeError::Import {
                    import_path: import_path.to_string(),
                    reason: format!("No builtin module named '{}'", module),
                })?;
                let description = manifest
                    .description
                    .clone()
                    .or_else(|| extension.description().map(str::to_string));

                Ok(ImportedModule {
                    stamp,
                    info: ModuleInfo {
                        import_path: import_path.to_string(),
                        entry_point: BUILTIN_ENTRY_POINT.to_string(),
                        description,
                    },
                    extension,
                    library: None,
                })
            }
            ModuleSource::Native { library, entry_point } => {
                let module = self.native.load(import_path, &library, &entry_point)?;
                let description = manifest
                    .description
                    .clone()
                    .or_else(|| module.extension.description().map(str::to_string));

                Ok(ImportedModule {
                    stamp,
                    info: ModuleInfo {
                        import_path: import_path.to_string(),
                        entry_point,
                        description,
                    },
                    extension: module.extension,
                    library: Some(module.library),
                })
            }
        }
    }

    /// Cached import of `import_path`, re-imported when the manifest or the
    /// native library changed on disk since it was made
    async fn imported(&self, import_path: &str) -> Result<ImportedModule, RuntimeError> {
        let stamp = ModuleStamp::read(Path::new(import_path), &self.entry_file)?;

        if let Some(module) = self.imports.read().await.get(import_path) {
            if module.stamp == stamp {
                return Ok(module.clone());
            }
            tracing::debug!("Extension module {} changed on disk, importing again", import_path);
        }

        let module = self.open(import_path, stamp)?;
        tracing::debug!("Imported extension module {}", import_path);

        self.imports
            .write()
            .await
            .insert(import_path.to_string(), module.clone());
        Ok(module)
    }

    async fn activate(&self, import_path: &str) -> Result<(), RuntimeError> {
        if self.active.read().await.contains_key(import_path) {
            return Err(RuntimeError::AlreadyActive(import_path.to_string()));
        }

        let module = self.imported(import_path).await?;
        let name = extension_name(import_path);

        let mut registrar = Registrar::new(name.clone());
        module
            .extension
            .register(&mut registrar)
            .await
            .map_err(|source| RuntimeError::Setup {
                extension: name.clone(),
                source,
            })?;
        let (commands, listeners) = registrar.into_parts();

        // Take every lock before mutating: once the commit starts it runs
        // without suspending, so a cancelled activation never commits halfway.
        let mut registry = self.commands.write().await;
        let mut subscriptions = self.subscriptions.write().await;
        let mut active = self.active.write().await;

        if active.contains_key(import_path) {
            return Err(RuntimeError::AlreadyActive(import_path.to_string()));
        }
        let mut seen = BTreeSet::new();
        for command in &commands {
            if let Some(existing) = registry.conflict(command) {
                return Err(RuntimeError::CommandConflict {
                    command: command.name.clone(),
                    owner: existing.extension.clone().unwrap_or_else(|| "the host".to_string()),
                });
            }
            for trigger in command.triggers() {
                if !seen.insert(trigger.to_lowercase()) {
                    return Err(RuntimeError::CommandConflict {
                        command: trigger.to_string(),
                        owner: name.clone(),
                    });
                }
            }
        }

        let command_count = commands.len();
        let listener_count = listeners.len();
        for command in commands {
            registry.register(command);
        }
        for (kind, listener) in listeners {
            subscriptions.subscribe(name.clone(), kind, listener);
        }
        active.insert(import_path.to_string(), Activation { name: name.clone(), module });

        tracing::info!(
            extension = %name,
            commands = command_count,
            listeners = listener_count,
            "Extension activated"
        );
        Ok(())
    }

    async fn forget_import(&self, import_path: &str) {
        self.imports.write().await.remove(import_path);
    }
}

#[async_trait]
impl HostRuntime for BotRuntime {
    async fn import(&self, import_path: &str) -> Result<ModuleInfo, RuntimeError> {
        Ok(self.imported(import_path).await?.info)
    }

    async fn import_and_activate(&self, import_path: &str) -> Result<(), RuntimeError> {
        let result = self.activate(import_path).await;
        if let Err(RuntimeError::Setup { .. }) | Err(RuntimeError::CommandConflict { .. }) = &result {
            // Next attempt picks up fixed code from disk
            self.forget_import(import_path).await;
        }
        result
    }

    async fn deactivate(&self, import_path: &str) -> Result<(), RuntimeError> {
        let extension = match self.active.read().await.get(import_path) {
            Some(activation) => activation.module.extension.clone(),
            None => return Err(RuntimeError::NotActive(import_path.to_string())),
        };
        let name = extension_name(import_path);

        // A failing teardown keeps the extension fully active
        extension
            .teardown()
            .await
            .map_err(|source| RuntimeError::Teardown {
                extension: name.clone(),
                source,
            })?;

        let mut registry = self.commands.write().await;
        let mut subscriptions = self.subscriptions.write().await;
        let mut active = self.active.write().await;

        let activation = active
            .remove(import_path)
            .ok_or_else(|| RuntimeError::NotActive(import_path.to_string()))?;
        let removed = registry.remove_owned_by(&activation.name);
        let unsubscribed = subscriptions.remove_owned_by(&activation.name);
        drop((registry, subscriptions, active));

        // The next load starts from what is on disk then
        self.forget_import(import_path).await;

        tracing::info!(
            extension = %activation.name,
            commands = removed.len(),
            listeners = unsubscribed,
            "Extension deactivated"
        );
        Ok(())
    }

    fn supports_reload(&self) -> bool {
        true
    }

    async fn reactivate(&self, import_path: &str) -> Result<(), RuntimeError> {
        self.deactivate(import_path).await?;
        self.import_and_activate(import_path).await
    }

    async fn list_active(&self) -> BTreeSet<String> {
        self.active.read().await.keys().cloned().collect()
    }
}

/// Owner tag for an import path: its last component
fn extension_name(import_path: &str) -> String {
    Path::new(import_path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(import_path)
        .to_string()
}
