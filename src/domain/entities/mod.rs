//! Domain entities - Core business objects with no external dependencies

pub mod user;
pub mod message;
pub mod command;
pub mod extension;
pub mod event;

pub use user::User;
pub use message::{Message, MessageType, Content};
pub use command::{Command, CommandHandler, CommandRegistry};
pub use extension::{
    ExtensionDescriptor, ExtensionState, ExtensionStatus, FailureKind, FailureReason, Operation,
    Snapshot,
};
pub use event::{Event, EventKind};
