//! # Introspect Events
//!
//! Publishes an event for every request and response a service endpoint
//! sends or receives, on a dedicated `<service>/_service_event` topic, so
//! external tools can observe RPC traffic without taking part in it.
//!
//! - [`ServiceEventPublisher`] -- the event channel: lifecycle, toggles and publish
//! - [`IntrospectableEndpoint`] with [`configure_events`] / [`configure_content`] -- runtime control
//! - [`IntrospectionConfig`] -- the four administrative toggles
//! - [`IntrospectedEndpoint`] -- an owning endpoint that serializes access to its channel
//!
//! ## Quick start
//!
//! ```
//! use std::sync::Arc;
//!
//! use introspect_core::{ServiceEventType, SystemClock};
//! use introspect_core::testing::{InstrumentedTypeSupport, RecordingNode};
//! use introspect_events::{EndpointRole, IntrospectedEndpoint, IntrospectionConfig};
//!
//! let node = RecordingNode::<String, String>::new("echo_server");
//! let support = InstrumentedTypeSupport::<String, String>::new("demo_pkg", "Echo").leak();
//! let mut config = IntrospectionConfig::default();
//! config.publish_service_events = true;
//!
//! let endpoint = IntrospectedEndpoint::new(
//!     EndpointRole::Service,
//!     support,
//!     "/echo",
//!     &node,
//!     Arc::new(SystemClock::new()),
//!     &config,
//! )?;
//! endpoint.record(ServiceEventType::RequestReceived, Some(&String::from("hi")), 1, &[7; 16]);
//!
//! assert_eq!(node.published()[0].topic_name, "/echo/_service_event");
//! endpoint.shutdown(&node)?;
//! # Ok::<(), introspect_events::IntrospectionError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod controller;
pub mod endpoint;
pub mod error;
pub mod publisher;

pub use config::IntrospectionConfig;
pub use controller::{IntrospectableEndpoint, apply_config, configure_content, configure_events};
pub use endpoint::{EndpointRole, IntrospectedEndpoint};
pub use error::{ConfigError, IntrospectionError, Result};
pub use publisher::{MAX_TOPIC_NAME_LEN, SERVICE_EVENT_TOPIC_SUFFIX, ServiceEventPublisher};
