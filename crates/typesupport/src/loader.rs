//! Type support loading from shared libraries.
//!
//! This module is only available with the `dynamic-loading` feature.

// This module needs unsafe for FFI.
#![allow(unsafe_code, reason = "FFI calls for dynamic library loading")]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use libloading::{Library, Symbol};
use parking_lot::Mutex;

use crate::error::ResolutionError;
use crate::resolver::{SymbolSource, TypeSupportFn};

/// Every library opened in this process. Entries are leaked and never
/// unloaded, so accessors and the descriptors they return stay valid.
static LIBRARIES: LazyLock<Mutex<HashMap<PathBuf, &'static Library>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Loads type support libraries from disk.
///
/// With no search directory, library names are handed to the platform
/// loader as-is, so the usual library search path applies.
#[derive(Debug, Clone, Default)]
pub struct TypeSupportLoader {
    search_dir: Option<PathBuf>,
}

impl TypeSupportLoader {
    /// Load through the platform's library search path.
    pub fn system() -> Self {
        Self::default()
    }

    /// Load from `dir` only.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            search_dir: Some(dir.into()),
        }
    }

    /// The directory libraries are loaded from, if any.
    pub fn search_dir(&self) -> Option<&Path> {
        self.search_dir.as_deref()
    }

    fn lib_path(&self, library: &str) -> PathBuf {
        match &self.search_dir {
            Some(dir) => dir.join(library),
            None => PathBuf::from(library),
        }
    }

    fn open(&self, library: &str) -> Result<&'static Library, ResolutionError> {
        let path = self.lib_path(library);
        let cached = LIBRARIES.lock().get(&path).copied();
        if let Some(lib) = cached {
            return Ok(lib);
        }

        if self.search_dir.is_some() && !path.exists() {
            return Err(ResolutionError::LibraryLoad {
                library: path.display().to_string(),
                reason: "library not found".to_owned(),
            });
        }

        // The cache lock is not held here: loading runs library constructors.
        // SAFETY: type support libraries have no initialisation routines
        // with preconditions beyond being loaded once.
        let lib = unsafe { Library::new(&path) }.map_err(|e| ResolutionError::LibraryLoad {
            library: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut libraries = LIBRARIES.lock();
        let lib = *libraries.entry(path).or_insert_with_key(|path| {
            tracing::debug!(library = %path.display(), "loaded type support library");
            Box::leak(Box::new(lib))
        });
        Ok(lib)
    }
}

impl SymbolSource for TypeSupportLoader {
    fn lookup(&self, library: &str, symbol: &str) -> Result<TypeSupportFn, ResolutionError> {
        let lib = self.open(library)?;
        // SAFETY: accessor symbols are exported with the `TypeSupportFn` ABI.
        let accessor: Symbol<'static, TypeSupportFn> = unsafe { lib.get(symbol.as_bytes()) }
            .map_err(|e| ResolutionError::SymbolNotFound {
                library: library.to_owned(),
                symbol: symbol.to_owned(),
                reason: e.to_string(),
            })?;
        tracing::trace!(library, symbol, "found type support accessor");
        Ok(*accessor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_library_in_dir_is_a_load_error() {
        let loader = TypeSupportLoader::in_dir(std::env::temp_dir().join("introspect-missing"));
        match loader.lookup("libnothing__rosidl_typesupport_c.so", "anything") {
            Err(ResolutionError::LibraryLoad { reason, .. }) => {
                assert_eq!(reason, "library not found");
            }
            other => panic!("expected LibraryLoad, got {other:?}"),
        }
    }

    #[test]
    fn unknown_system_library_is_a_load_error() {
        let loader = TypeSupportLoader::system();
        let err = loader
            .lookup("libintrospect_no_such_package__rosidl_typesupport_c.so", "x")
            .unwrap_err();
        assert!(matches!(err, ResolutionError::LibraryLoad { .. }), "{err:?}");
    }

    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    #[test]
    fn missing_symbol_is_reported_with_library() {
        let loader = TypeSupportLoader::system();
        match loader.lookup("libc.so.6", "introspect_no_such_symbol") {
            Err(ResolutionError::SymbolNotFound { library, symbol, .. }) => {
                assert_eq!(library, "libc.so.6");
                assert_eq!(symbol, "introspect_no_such_symbol");
            }
            other => panic!("expected SymbolNotFound, got {other:?}"),
        }
    }

    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    #[test]
    fn libraries_are_opened_once() {
        let loader = TypeSupportLoader::system();
        let first = loader.open("libc.so.6").unwrap();
        let second = loader.open("libc.so.6").unwrap();
        assert!(std::ptr::eq(first, second));
    }

    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    #[test]
    fn concurrent_opens_share_one_handle() {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                std::thread::spawn(|| {
                    let lib = TypeSupportLoader::system().open("libm.so.6").unwrap();
                    std::ptr::from_ref(lib) as usize
                })
            })
            .collect();
        let addresses: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(addresses.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    #[test]
    fn cache_is_unlocked_after_open() {
        let loader = TypeSupportLoader::system();
        loader.open("libc.so.6").unwrap();
        assert!(LIBRARIES.try_lock().is_some());
    }
}
