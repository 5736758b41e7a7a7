//! Administrative introspection toggles.
//!
//! Four boolean parameters control introspection per endpoint role:
//! whether events are published at all, and whether they carry request and
//! response bodies. Events are off and content is on unless configured
//! otherwise.

use introspect_core::QosProfile;
use serde::{Deserialize, Serialize};

use crate::endpoint::EndpointRole;
use crate::error::ConfigError;

/// Publish events for client endpoints.
pub const PUBLISH_CLIENT_EVENTS: &str = "publish_client_events";
/// Publish events for service endpoints.
pub const PUBLISH_SERVICE_EVENTS: &str = "publish_service_events";
/// Include bodies in client events.
pub const PUBLISH_CLIENT_CONTENT: &str = "publish_client_content";
/// Include bodies in service events.
pub const PUBLISH_SERVICE_CONTENT: &str = "publish_service_content";

/// Every parameter name accepted by [`IntrospectionConfig::set_parameter`].
pub const PARAMETER_NAMES: [&str; 4] = [
    PUBLISH_CLIENT_EVENTS,
    PUBLISH_SERVICE_EVENTS,
    PUBLISH_CLIENT_CONTENT,
    PUBLISH_SERVICE_CONTENT,
];

/// Introspection settings for the endpoints of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntrospectionConfig {
    /// Publish events for client endpoints.
    pub publish_client_events: bool,
    /// Publish events for service endpoints.
    pub publish_service_events: bool,
    /// Include bodies in client events.
    pub publish_client_content: bool,
    /// Include bodies in service events.
    pub publish_service_content: bool,
    /// Quality of service for event publishers.
    pub qos: QosProfile,
}

impl Default for IntrospectionConfig {
    fn default() -> Self {
        Self {
            publish_client_events: false,
            publish_service_events: false,
            publish_client_content: true,
            publish_service_content: true,
            qos: QosProfile::default(),
        }
    }
}

impl IntrospectionConfig {
    /// Parse a JSON document. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Update one toggle by parameter name.
    pub fn set_parameter(&mut self, name: &str, value: bool) -> Result<(), ConfigError> {
        *self.toggle_mut(name)? = value;
        Ok(())
    }

    /// Read one toggle by parameter name.
    pub fn parameter(&self, name: &str) -> Result<bool, ConfigError> {
        match name {
            PUBLISH_CLIENT_EVENTS => Ok(self.publish_client_events),
            PUBLISH_SERVICE_EVENTS => Ok(self.publish_service_events),
            PUBLISH_CLIENT_CONTENT => Ok(self.publish_client_content),
            PUBLISH_SERVICE_CONTENT => Ok(self.publish_service_content),
            _ => Err(ConfigError::UnknownParameter(name.to_owned())),
        }
    }

    /// Whether endpoints with `role` publish events.
    pub fn events_enabled_for(&self, role: EndpointRole) -> bool {
        match role {
            EndpointRole::Client => self.publish_client_events,
            EndpointRole::Service => self.publish_service_events,
        }
    }

    /// Whether events of endpoints with `role` carry bodies.
    pub fn content_enabled_for(&self, role: EndpointRole) -> bool {
        match role {
            EndpointRole::Client => self.publish_client_content,
            EndpointRole::Service => self.publish_service_content,
        }
    }

    fn toggle_mut(&mut self, name: &str) -> Result<&mut bool, ConfigError> {
        match name {
            PUBLISH_CLIENT_EVENTS => Ok(&mut self.publish_client_events),
            PUBLISH_SERVICE_EVENTS => Ok(&mut self.publish_service_events),
            PUBLISH_CLIENT_CONTENT => Ok(&mut self.publish_client_content),
            PUBLISH_SERVICE_CONTENT => Ok(&mut self.publish_service_content),
            _ => Err(ConfigError::UnknownParameter(name.to_owned())),
        }
    }
}
