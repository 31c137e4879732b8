//! Domain layer - Core business objects and the seams around them
//! 
//! This layer contains:
//! - Entities: Messages, commands, events, extension descriptors
//! - Traits: Abstractions implemented elsewhere (Bot, Extension, HostRuntime)

pub mod entities;
pub mod traits;
