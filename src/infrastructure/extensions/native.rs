//! Native extensions - shared libraries exporting a setup symbol

use libloading::{Library, Symbol};
use std::path::Path;
use std::sync::Arc;

use crate::application::errors::RuntimeError;
use crate::domain::traits::Extension;

/// Signature of the exported setup symbol
pub type ExtensionSetupFn = unsafe extern "C" fn() -> *mut Box<dyn Extension>;

/// An extension instance together with the library its code lives in.
///
/// Field order matters: the extension is dropped before the library.
pub struct NativeModule {
    pub extension: Arc<dyn Extension>,
    pub library: Arc<Library>,
}

/// Opens shared libraries and resolves their setup symbol
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeLoader;

impl NativeLoader {
    pub fn new() -> Self {
        Self
    }

    pub fn load(
        &self,
        import_path: &str,
        library_path: &Path,
        entry_point: &str,
    ) -> Result<NativeModule, RuntimeError> {
        if !library_path.exists() {
            return Err(RuntimeError::Import {
                import_path: import_path.to_string(),
                reason: format!("Library not found: {}", library_path.display()),
            });
        }

        let library = unsafe {
            Library::new(library_path).map_err(|e| RuntimeError::Import {
                import_path: import_path.to_string(),
                reason: format!("Failed to load library: {}", e),
            })?
        };

        let extension = unsafe {
            let setup: Symbol<ExtensionSetupFn> = library.get(entry_point.as_bytes()).map_err(|_| {
                RuntimeError::MissingEntryPoint {
                    import_path: import_path.to_string(),
                    entry_point: entry_point.to_string(),
                }
            })?;

            let raw = setup();
            if raw.is_null() {
                return Err(RuntimeError::Import {
                    import_path: import_path.to_string(),
                    reason: format!("{} returned null", entry_point),
                });
            }
            let boxed: Box<Box<dyn Extension>> = Box::from_raw(raw);
            Arc::from(*boxed)
        };

        tracing::debug!("Opened native extension library {}", library_path.display());

        Ok(NativeModule {
            extension,
            library: Arc::new(library),
        })
    }
}

/// Export an extension type from a `cdylib` crate.
///
/// ```ignore
/// struct Weather;
/// // impl powi_bot::domain::traits::Extension for Weather { ... }
/// powi_bot::declare_extension!(Weather, || Weather);
/// ```
#[macro_export]
macro_rules! declare_extension {
    ($ty:ty, $ctor:expr) => {
        #[no_mangle]
        pub extern "C" fn powi_extension_setup() -> *mut Box<dyn $crate::domain::traits::Extension> {
            let ctor: fn() -> $ty = $ctor;
            let extension: Box<dyn $crate::domain::traits::Extension> = Box::new(ctor());
            Box::into_raw(Box::new(extension))
        }
    };
}
