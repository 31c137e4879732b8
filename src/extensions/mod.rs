//! Extension lifecycle
//!
//! Discovery finds candidate directories, the validator decides which of them
//! may be handed to the host runtime, the activator drives load / unload /
//! reload, and the registry records the outcome. [`LifecycleManager`] ties
//! them together and is the only way in from the outside.

pub mod activator;
pub mod discovery;
pub mod locks;
pub mod manager;
pub mod registry;
pub mod validator;

pub use activator::{Activator, DEFAULT_ACTIVATION_TIMEOUT};
pub use discovery::{Candidate, Discovery, DEFAULT_ENTRY_FILE};
pub use locks::{NamedGuard, NamedLocks};
pub use manager::LifecycleManager;
pub use registry::Registry;
pub use validator::{is_valid_name, Validator};
