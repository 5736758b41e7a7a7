// `deny` instead of `forbid` so `type_support` can mark foreign handles `Send + Sync`.
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! # Introspect Core
//!
//! Shared vocabulary for service introspection events.
//!
//! This crate provides:
//! - [`ServiceEventType`], [`ServiceEventInfo`], [`Stamp`] -- the event wire schema
//! - [`ServiceEvent`] -- a typed event message for Rust-native services
//! - [`MessageTypeSupport`] and the [`ServiceTypeSupport`] trait -- runtime type descriptions
//! - [`Clock`] -- the time source contract, with [`SystemClock`] and [`ManualClock`]
//! - [`Node`] and [`Publisher`] -- the transport contract consumed by event publishers
//!
//! With the `testing` feature, the [`testing`] module provides a recording
//! transport for exercising publishers without a middleware.

pub mod clock;
pub mod event;
pub mod transport;
pub mod type_support;

#[cfg(feature = "testing")]
pub mod testing;

pub use clock::{Clock, ClockError, ManualClock, SystemClock};
pub use event::{
    ClientGid, InvalidEventType, ServiceEvent, ServiceEventInfo, ServiceEventType, Stamp,
};
pub use transport::{
    Durability, Node, Publisher, PublisherOptions, QosProfile, Reliability, TransportError,
};
pub use type_support::{
    EventMessage, ForeignTypeSupport, MessagePayload, MessageTypeSupport, RawMessageTypeSupport,
    ServiceTypeSupport, TypedServiceSupport,
};
