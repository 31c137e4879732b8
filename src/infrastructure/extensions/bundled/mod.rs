//! Extensions shipped with the bot

pub mod fun;
pub mod general;

use super::builtin::ModuleCatalog;

pub use fun::Fun;
pub use general::General;

pub(super) fn register_all(catalog: ModuleCatalog) -> ModuleCatalog {
    catalog
        .with_module("general", General::new)
        .with_module("fun", || Fun)
}
