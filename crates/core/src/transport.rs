//! Transport contract consumed by event publishers.
//!
//! The middleware that actually moves messages is an external collaborator.
//! Event publishers only need three things from it: create a publisher on a
//! topic, destroy it again, and publish a message through it.

use std::any::Any;

use serde::{Deserialize, Serialize};

use crate::type_support::MessageTypeSupport;

/// Error reported by the transport.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TransportError {
    /// Create an error with a message only.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Create an error wrapping an underlying cause.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// History reliability of a publisher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reliability {
    /// Retransmit until acknowledged.
    #[default]
    Reliable,
    /// Send once.
    BestEffort,
}

/// Whether late subscribers receive previously published messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Durability {
    /// Only live subscribers receive messages.
    #[default]
    Volatile,
    /// The publisher keeps history for late subscribers.
    TransientLocal,
}

/// Quality-of-service settings for an event publisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct QosProfile {
    /// Number of messages kept in history (keep-last).
    pub depth: usize,
    /// Reliability policy.
    pub reliability: Reliability,
    /// Durability policy.
    pub durability: Durability,
}

impl Default for QosProfile {
    fn default() -> Self {
        Self {
            depth: 10,
            reliability: Reliability::Reliable,
            durability: Durability::Volatile,
        }
    }
}

/// Options used whenever an event publisher is created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherOptions {
    /// Quality of service.
    pub qos: QosProfile,
}

impl PublisherOptions {
    /// Options with the given QoS profile.
    #[must_use]
    pub fn with_qos(qos: QosProfile) -> Self {
        Self { qos }
    }
}

/// A live publisher bound to one topic and one message type.
pub trait Publisher: Send {
    /// Topic the publisher is bound to.
    fn topic_name(&self) -> &str;

    /// Publish one message.
    ///
    /// The message is only borrowed; ownership stays with the caller.
    fn publish(&self, message: &(dyn Any + Send + Sync)) -> Result<(), TransportError>;
}

/// The participant that owns publishers.
pub trait Node: Send + Sync {
    /// Node name, for logging.
    fn name(&self) -> &str;

    /// Create a publisher for `type_support` on `topic_name`.
    fn create_publisher(
        &self,
        type_support: &MessageTypeSupport,
        topic_name: &str,
        options: &PublisherOptions,
    ) -> Result<Box<dyn Publisher>, TransportError>;

    /// Destroy a publisher previously created by this node.
    ///
    /// The publisher is consumed either way; an error only reports that the
    /// transport could not clean up after it.
    fn destroy_publisher(&self, publisher: Box<dyn Publisher>) -> Result<(), TransportError> {
        drop(publisher);
        Ok(())
    }
}
