//! Infrastructure layer - External concerns
//!
//! This layer contains:
//! - Config: Configuration loading
//! - Adapters: Platform integrations (console)
//! - Extensions: The host runtime extensions are loaded into

pub mod adapters;
pub mod config;
pub mod extensions;
