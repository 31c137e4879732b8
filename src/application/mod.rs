//! Application layer - Use cases and business logic
//!
//! This layer contains:
//! - Services: command dispatch, operator commands, message routing
//! - Errors: Domain-specific errors
//! - Messaging: Message parsing

pub mod errors;
pub mod messaging;
pub mod services;
