//! Message type resolution for services.

#![allow(unsafe_code, reason = "invokes type support accessors exported by foreign code")]

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use introspect_core::{
    ForeignTypeSupport, MessageTypeSupport, RawMessageTypeSupport, ServiceTypeSupport,
};
use parking_lot::RwLock;

use crate::error::ResolutionError;
use crate::names::{MessageRole, TypeSupportNames};

/// Signature of a type support accessor exported by a type support library.
pub type TypeSupportFn = unsafe extern "C" fn() -> *const RawMessageTypeSupport;

/// Where accessor functions are looked up.
pub trait SymbolSource: Send + Sync {
    /// Find `symbol` in `library`, loading the library first if needed.
    fn lookup(&self, library: &str, symbol: &str) -> Result<TypeSupportFn, ResolutionError>;
}

/// Request and response descriptors of one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedServiceTypes {
    /// Request message type.
    pub request: MessageTypeSupport,
    /// Response message type.
    pub response: MessageTypeSupport,
}

/// Resolve the request and response descriptors of `service`.
///
/// Either both descriptors are returned or an error is; nothing is kept on
/// failure.
pub fn resolve_message_types(
    source: &dyn SymbolSource,
    service: &dyn ServiceTypeSupport,
) -> Result<ResolvedServiceTypes, ResolutionError> {
    let names = TypeSupportNames::for_service(service.package_name(), service.service_type_name())?;
    let library = names.library_file_name();

    let request = resolve_one(source, &names, &library, MessageRole::Request)?;
    let response = resolve_one(source, &names, &library, MessageRole::Response)?;

    tracing::debug!(
        service = %service.full_name(),
        library,
        "resolved service message type support"
    );
    Ok(ResolvedServiceTypes { request, response })
}

fn resolve_one(
    source: &dyn SymbolSource,
    names: &TypeSupportNames,
    library: &str,
    role: MessageRole,
) -> Result<MessageTypeSupport, ResolutionError> {
    let symbol = names.symbol(role);
    let accessor = source.lookup(library, &symbol)?;
    // SAFETY: accessors take no arguments and return a pointer to a static
    // descriptor (or null); the library stays loaded for the process.
    let raw = unsafe { accessor() };
    let handle = ForeignTypeSupport::new(raw).ok_or(ResolutionError::NullTypeSupport { symbol })?;
    Ok(MessageTypeSupport::foreign(names.type_name(role), handle))
}

/// Resolves message types through a shared [`SymbolSource`].
#[derive(Clone)]
pub struct TypeResolver {
    source: Arc<dyn SymbolSource>,
}

impl TypeResolver {
    /// Resolve through `source`.
    pub fn new(source: Arc<dyn SymbolSource>) -> Self {
        Self { source }
    }

    /// Resolve by loading type support libraries from the default search path.
    #[cfg(feature = "dynamic-loading")]
    pub fn dynamic() -> Self {
        Self::new(Arc::new(crate::loader::TypeSupportLoader::system()))
    }

    /// Resolve the request and response descriptors of `service`.
    pub fn resolve(
        &self,
        service: &dyn ServiceTypeSupport,
    ) -> Result<ResolvedServiceTypes, ResolutionError> {
        resolve_message_types(self.source.as_ref(), service)
    }
}

#[cfg(feature = "dynamic-loading")]
impl Default for TypeResolver {
    fn default() -> Self {
        Self::dynamic()
    }
}

impl fmt::Debug for TypeResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeResolver").finish_non_exhaustive()
    }
}

/// Accessors registered in-process, keyed by library and symbol.
///
/// Used when type support is linked statically, and in tests.
#[derive(Default)]
pub struct StaticSymbols {
    symbols: RwLock<HashMap<String, HashMap<String, TypeSupportFn>>>,
}

impl StaticSymbols {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `accessor` as `symbol` in `library`.
    pub fn register(&self, library: impl Into<String>, symbol: impl Into<String>, accessor: TypeSupportFn) {
        self.symbols
            .write()
            .entry(library.into())
            .or_default()
            .insert(symbol.into(), accessor);
    }

    /// Register both accessors of a service under its conventional names.
    pub fn register_service(
        &self,
        names: &TypeSupportNames,
        request: TypeSupportFn,
        response: TypeSupportFn,
    ) {
        let library = names.library_file_name();
        self.register(library.clone(), names.symbol(MessageRole::Request), request);
        self.register(library, names.symbol(MessageRole::Response), response);
    }
}

impl SymbolSource for StaticSymbols {
    fn lookup(&self, library: &str, symbol: &str) -> Result<TypeSupportFn, ResolutionError> {
        let symbols = self.symbols.read();
        let table = symbols
            .get(library)
            .ok_or_else(|| ResolutionError::LibraryLoad {
                library: library.to_owned(),
                reason: "library is not registered".to_owned(),
            })?;
        table
            .get(symbol)
            .copied()
            .ok_or_else(|| ResolutionError::SymbolNotFound {
                library: library.to_owned(),
                symbol: symbol.to_owned(),
                reason: "symbol is not registered".to_owned(),
            })
    }
}

impl fmt::Debug for StaticSymbols {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticSymbols")
            .field("libraries", &self.symbols.read().keys().collect::<Vec<_>>())
            .finish()
    }
}
