//! Domain traits - Abstractions for infrastructure implementations

pub mod bot;
pub mod extension;
pub mod runtime;

pub use bot::{Bot, BotInfo};
pub use extension::{Extension, Listener, Registrar};
pub use runtime::{HostRuntime, ModuleInfo};
