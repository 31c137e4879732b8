//! Application services - Business logic orchestration

pub mod command_service;
pub mod extension_service;
pub mod message_service;

pub use command_service::{CommandService, OperatorCommand, OWNER_PERMISSION};
pub use extension_service::{render_banner, render_list, ExtensionService};
pub use message_service::MessageService;
