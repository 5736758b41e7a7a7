//! # Introspect Type Support
//!
//! Resolves the request and response message type descriptors of a service
//! whose shapes are only known at runtime.
//!
//! Given a service's package `P` and type name `T`, the descriptors live in
//! the shared library `lib<P>__rosidl_typesupport_c` and are returned by
//! two exported accessor functions, one for `T_Request` and one for
//! `T_Response`. [`TypeResolver`] derives those names, looks the accessors
//! up through a [`SymbolSource`], and hands back safe
//! [`MessageTypeSupport`](introspect_core::MessageTypeSupport) handles.
//!
//! ## Symbol sources
//!
//! - [`TypeSupportLoader`] -- loads libraries from disk (`dynamic-loading` feature, on by default)
//! - [`StaticSymbols`] -- accessors registered in-process, for statically linked type support
//!
//! Libraries loaded by [`TypeSupportLoader`] are never unloaded: the
//! descriptors they export must outlive every publisher built from them.

// `deny` instead of `forbid` so the `loader` and `resolver` modules can call into foreign code.
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
#[cfg(feature = "dynamic-loading")]
mod loader;
mod names;
mod resolver;

pub use error::ResolutionError;
#[cfg(feature = "dynamic-loading")]
pub use loader::TypeSupportLoader;
pub use names::{MessageRole, TYPESUPPORT_IDENTIFIER, TypeSupportNames, lib_ext};
pub use resolver::{
    ResolvedServiceTypes, StaticSymbols, SymbolSource, TypeResolver, TypeSupportFn,
    resolve_message_types,
};
