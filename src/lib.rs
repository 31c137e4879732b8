//! powi-bot - a chat bot whose commands come from independently loadable extensions

pub mod application;
pub mod domain;
pub mod extensions;
pub mod infrastructure;

pub use application::errors::{BotError, LifecycleError, RuntimeError, SetupError};
pub use domain::traits::{Extension, HostRuntime, Registrar};
pub use extensions::LifecycleManager;
pub use infrastructure::extensions::{BotRuntime, ModuleCatalog};
