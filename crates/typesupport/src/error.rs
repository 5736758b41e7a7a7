//! Resolution error types.

/// Errors from resolving a service's message type support.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    /// A package or type name cannot form a library or symbol name.
    #[error("invalid {kind} name '{name}': {reason}")]
    InvalidName {
        /// Which name was rejected (`package` or `service type`).
        kind: &'static str,
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The type support library could not be loaded.
    #[error("failed to load type support library '{library}': {reason}")]
    LibraryLoad {
        /// Library file name or path.
        library: String,
        /// The underlying error message.
        reason: String,
    },

    /// An accessor symbol is missing from the library.
    #[error("symbol '{symbol}' not found in '{library}': {reason}")]
    SymbolNotFound {
        /// Library file name or path.
        library: String,
        /// The missing symbol.
        symbol: String,
        /// The underlying error message.
        reason: String,
    },

    /// An accessor returned a null descriptor.
    #[error("symbol '{symbol}' returned a null type support")]
    NullTypeSupport {
        /// The accessor symbol.
        symbol: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_load_display() {
        let err = ResolutionError::LibraryLoad {
            library: "libdemo__rosidl_typesupport_c.so".into(),
            reason: "no such file".into(),
        };
        assert_eq!(
            err.to_string(),
            "failed to load type support library 'libdemo__rosidl_typesupport_c.so': no such file"
        );
    }

    #[test]
    fn null_type_support_display() {
        let err = ResolutionError::NullTypeSupport {
            symbol: "get_handle".into(),
        };
        assert_eq!(
            err.to_string(),
            "symbol 'get_handle' returned a null type support"
        );
    }
}
