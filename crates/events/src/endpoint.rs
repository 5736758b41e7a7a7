//! An owning endpoint for an event channel.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use introspect_core::{
    ClientGid, Clock, MessagePayload, Node, PublisherOptions, ServiceEventType, ServiceTypeSupport,
};
use introspect_typesupport::{ResolvedServiceTypes, TypeResolver};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::IntrospectionConfig;
use crate::controller::{self, IntrospectableEndpoint};
use crate::error::Result;
use crate::publisher::ServiceEventPublisher;

/// Which side of a call an endpoint is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointRole {
    /// Sends requests, receives responses.
    Client,
    /// Receives requests, sends responses.
    Service,
}

impl fmt::Display for EndpointRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client => f.write_str("client"),
            Self::Service => f.write_str("service"),
        }
    }
}

/// A client or service endpoint with its event channel.
///
/// One mutex covers the whole channel, so a publish and a concurrent
/// enable/disable never interleave.
pub struct IntrospectedEndpoint {
    role: EndpointRole,
    service_name: String,
    channel: Mutex<ServiceEventPublisher>,
    next_sequence: AtomicI64,
    message_types: Option<ResolvedServiceTypes>,
}

impl IntrospectedEndpoint {
    /// Initialize the channel for `service_name` and apply `config`.
    pub fn new(
        role: EndpointRole,
        type_support: &'static dyn ServiceTypeSupport,
        service_name: &str,
        node: &dyn Node,
        clock: Arc<dyn Clock>,
        config: &IntrospectionConfig,
    ) -> Result<Self> {
        let channel = ServiceEventPublisher::new(
            type_support,
            service_name,
            node,
            clock,
            PublisherOptions::with_qos(config.qos),
        )?;
        let endpoint = Self {
            role,
            service_name: service_name.to_owned(),
            channel: Mutex::new(channel),
            next_sequence: AtomicI64::new(1),
            message_types: None,
        };

        if let Err(e) = controller::apply_config(&endpoint, node, config) {
            if let Err(cleanup) = endpoint.shutdown(node) {
                tracing::warn!(
                    service = %endpoint.service_name,
                    error = %cleanup,
                    "failed to finalize event channel after configuration error"
                );
            }
            return Err(e);
        }
        tracing::debug!(
            role = %role,
            service = %endpoint.service_name,
            events = config.events_enabled_for(role),
            content = config.content_enabled_for(role),
            "introspected endpoint created"
        );
        Ok(endpoint)
    }

    /// Resolve the service's request and response types, then create the
    /// endpoint as [`new`](Self::new) does.
    ///
    /// If resolution fails no channel is created.
    pub fn resolved(
        resolver: &TypeResolver,
        role: EndpointRole,
        type_support: &'static dyn ServiceTypeSupport,
        service_name: &str,
        node: &dyn Node,
        clock: Arc<dyn Clock>,
        config: &IntrospectionConfig,
    ) -> Result<Self> {
        let message_types = resolver.resolve(type_support)?;
        let mut endpoint = Self::new(role, type_support, service_name, node, clock, config)?;
        endpoint.message_types = Some(message_types);
        Ok(endpoint)
    }

    /// Client or service.
    pub fn role(&self) -> EndpointRole {
        self.role
    }

    /// Name of the service this endpoint serves or calls.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Request and response types, if they were resolved at construction.
    pub fn message_types(&self) -> Option<&ResolvedServiceTypes> {
        self.message_types.as_ref()
    }

    /// The next request sequence number. The first is 1.
    pub fn next_sequence_number(&self) -> i64 {
        self.next_sequence.fetch_add(1, Ordering::Relaxed)
    }

    /// Publish an event, logging instead of returning any failure.
    pub fn record(
        &self,
        event_type: ServiceEventType,
        payload: Option<MessagePayload<'_>>,
        sequence_number: i64,
        client_gid: &ClientGid,
    ) {
        if let Err(e) = self.try_record(event_type, payload, sequence_number, client_gid) {
            tracing::warn!(
                service = %self.service_name,
                event_type = ?event_type,
                sequence_number,
                error = %e,
                "failed to publish service event"
            );
        }
    }

    /// Publish an event.
    pub fn try_record(
        &self,
        event_type: ServiceEventType,
        payload: Option<MessagePayload<'_>>,
        sequence_number: i64,
        client_gid: &ClientGid,
    ) -> Result<()> {
        self.channel
            .lock()
            .publish(event_type, payload, sequence_number, client_gid)
    }

    /// Whether events are currently published.
    pub fn is_introspection_enabled(&self) -> bool {
        self.channel.lock().is_enabled()
    }

    /// Whether events carry request and response bodies.
    pub fn is_content_enabled(&self) -> bool {
        self.channel.lock().is_content_enabled()
    }

    /// The event topic, while the channel is initialized.
    pub fn event_topic(&self) -> Option<String> {
        self.channel.lock().topic_name().map(str::to_owned)
    }

    /// Finalize the channel. Later calls do nothing.
    pub fn shutdown(&self, node: &dyn Node) -> Result<()> {
        self.channel.lock().fini(node)
    }
}

impl IntrospectableEndpoint for IntrospectedEndpoint {
    fn role(&self) -> EndpointRole {
        self.role
    }

    fn with_event_publisher<R>(&self, f: impl FnOnce(&mut ServiceEventPublisher) -> R) -> R {
        f(&mut self.channel.lock())
    }
}

impl fmt::Debug for IntrospectedEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntrospectedEndpoint")
            .field("role", &self.role)
            .field("service_name", &self.service_name)
            .field("channel", &*self.channel.lock())
            .field("next_sequence", &self.next_sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use introspect_core::testing::{InstrumentedTypeSupport, RecordingNode};
    use introspect_core::{ManualClock, SystemClock};
    use pretty_assertions::assert_eq;

    use super::*;

    fn endpoint(
        role: EndpointRole,
        node: &RecordingNode<String, String>,
        config: &IntrospectionConfig,
    ) -> Result<IntrospectedEndpoint> {
        let support = InstrumentedTypeSupport::<String, String>::new("demo_pkg", "Echo").leak();
        IntrospectedEndpoint::new(role, support, "/echo", node, Arc::new(SystemClock::new()), config)
    }

    #[test]
    fn default_config_starts_disabled() {
        let node = RecordingNode::new("n");
        let endpoint = endpoint(EndpointRole::Client, &node, &IntrospectionConfig::default()).unwrap();

        assert!(!endpoint.is_introspection_enabled());
        assert!(endpoint.is_content_enabled());
        assert_eq!(endpoint.event_topic().as_deref(), Some("/echo/_service_event"));
        assert_eq!(node.live_publishers(), 0);
    }

    #[test]
    fn sequence_numbers_start_at_one() {
        let node = RecordingNode::new("n");
        let endpoint = endpoint(EndpointRole::Client, &node, &IntrospectionConfig::default()).unwrap();
        assert_eq!(endpoint.next_sequence_number(), 1);
        assert_eq!(endpoint.next_sequence_number(), 2);
    }

    #[test]
    fn record_swallows_failures() {
        let node = RecordingNode::new("n");
        let config = IntrospectionConfig {
            publish_service_events: true,
            ..IntrospectionConfig::default()
        };
        let endpoint = endpoint(EndpointRole::Service, &node, &config).unwrap();
        node.set_fail_publish(true);

        endpoint.record(ServiceEventType::RequestReceived, None, 1, &[0; 16]);
        assert_eq!(node.publish_attempts(), 1);
        assert!(endpoint.try_record(ServiceEventType::ResponseSent, None, 1, &[0; 16]).is_err());
    }

    #[test]
    fn clock_failure_is_swallowed_by_record() {
        let node = RecordingNode::<String, String>::new("n");
        let support = InstrumentedTypeSupport::<String, String>::new("demo_pkg", "Echo").leak();
        let config = IntrospectionConfig {
            publish_client_events: true,
            ..IntrospectionConfig::default()
        };
        let endpoint = IntrospectedEndpoint::new(
            EndpointRole::Client,
            support,
            "/echo",
            &node,
            Arc::new(ManualClock::new()),
            &config,
        )
        .unwrap();

        endpoint.record(ServiceEventType::RequestSent, None, 1, &[0; 16]);
        assert_eq!(node.publish_attempts(), 0);
    }

    #[test]
    fn failed_config_application_finalizes_channel() {
        let node = RecordingNode::new("n");
        node.set_fail_destroy(true);

        let err = endpoint(EndpointRole::Client, &node, &IntrospectionConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            crate::IntrospectionError::Transport { operation: "destroy_publisher", .. }
        ));
        assert_eq!(node.live_publishers(), 0);
        assert_eq!(node.destroyed_count(), 1);
    }

    #[cfg(feature = "dynamic-loading")]
    #[test]
    fn dynamic_resolver_reports_missing_library() {
        let node = RecordingNode::<String, String>::new("n");
        let support =
            InstrumentedTypeSupport::<String, String>::new("introspect_not_installed", "Echo").leak();

        let err = IntrospectedEndpoint::resolved(
            &TypeResolver::default(),
            EndpointRole::Service,
            support,
            "/echo",
            &node,
            Arc::new(SystemClock::new()),
            &IntrospectionConfig::default(),
        )
        .unwrap_err();

        assert!(matches!(err, crate::IntrospectionError::Resolution(_)), "{err:?}");
        assert_eq!(node.created_count(), 0);
    }

    #[test]
    fn shutdown_is_idempotent() {
        let node = RecordingNode::new("n");
        let config = IntrospectionConfig {
            publish_client_events: true,
            ..IntrospectionConfig::default()
        };
        let endpoint = endpoint(EndpointRole::Client, &node, &config).unwrap();

        endpoint.shutdown(&node).unwrap();
        endpoint.shutdown(&node).unwrap();
        assert_eq!(endpoint.event_topic(), None);
        assert_eq!(node.destroyed_count(), 1);
    }
}
