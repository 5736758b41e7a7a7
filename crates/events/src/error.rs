//! Error types for service event publishing.

use introspect_core::{ClockError, InvalidEventType, TransportError};
use introspect_typesupport::ResolutionError;
use thiserror::Error;

/// Result type for introspection operations.
pub type Result<T, E = IntrospectionError> = std::result::Result<T, E>;

/// Errors from initializing, toggling or publishing on an event channel.
#[derive(Error, Debug)]
pub enum IntrospectionError {
    /// An argument was rejected before any work was done.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// `init` was called on a channel that is already initialized.
    #[error("service event publisher is already initialized")]
    AlreadyInitialized,

    /// The channel has not been initialized (or was finalized).
    #[error("service event publisher is not initialized")]
    NotInitialized,

    /// The topic name could not be allocated.
    #[error("failed to allocate {bytes} bytes for the event topic name")]
    BadAlloc {
        /// Bytes requested.
        bytes: usize,
    },

    /// The derived topic name exceeds the transport's limit.
    #[error("event topic for service '{service_name}' would be {length} bytes, limit is {max}")]
    NameTooLong {
        /// The service name that was given.
        service_name: String,
        /// Length of the derived topic name.
        length: usize,
        /// Maximum topic name length.
        max: usize,
    },

    /// The service's message types could not be resolved.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// The clock could not be read.
    #[error("failed to read the clock: {0}")]
    Clock(#[from] ClockError),

    /// A raw event type value is outside the known range.
    #[error(transparent)]
    InvalidEventType(#[from] InvalidEventType),

    /// The type support could not build an event message.
    #[error("failed to construct event message for topic '{topic}'")]
    Construction {
        /// Topic the message was meant for.
        topic: String,
    },

    /// The transport rejected an operation.
    #[error("{operation} failed on topic '{topic}'")]
    Transport {
        /// The transport operation (`create_publisher`, `destroy_publisher` or `publish`).
        operation: &'static str,
        /// The event topic.
        topic: String,
        /// The transport's error.
        #[source]
        source: TransportError,
    },
}

impl IntrospectionError {
    pub(crate) fn transport(operation: &'static str, topic: &str, source: TransportError) -> Self {
        Self::Transport {
            operation,
            topic: topic.to_owned(),
            source,
        }
    }

    /// Whether the failure came from the transport.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

/// Errors from reading or updating [`IntrospectionConfig`](crate::IntrospectionConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The parameter name is not one of the introspection toggles.
    #[error("unknown introspection parameter '{0}'")]
    UnknownParameter(String),

    /// The configuration document is malformed.
    #[error("invalid introspection configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
