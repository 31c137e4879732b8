//! Host runtime for extensions
//!
//! Extensions live in directories holding an `extension.yaml` entry file that
//! names either a builtin module compiled into the bot or a shared library
//! exporting a setup symbol.

pub mod builtin;
pub mod bundled;
pub mod events;
pub mod manifest;
pub mod native;
pub mod runtime;

pub use builtin::ModuleCatalog;
pub use manifest::{ExtensionManifest, ModuleSource};
pub use native::NativeLoader;
pub use runtime::{BotRuntime, SharedCommandRegistry};
