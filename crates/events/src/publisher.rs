//! The service event channel.
//!
//! A [`ServiceEventPublisher`] owns the transport publisher for one
//! service's event topic. It is either closed (never initialized, or
//! finalized) or initialized; an initialized channel is enabled exactly
//! when it holds a transport publisher.
//!
//! The channel holds no lock of its own. Whoever owns it serializes
//! `init`/`fini`, `enable`/`disable` and `publish`, as
//! [`IntrospectedEndpoint`](crate::IntrospectedEndpoint) does.

use std::fmt;
use std::sync::Arc;

use introspect_core::{
    ClientGid, Clock, EventMessage, MessagePayload, Node, Publisher, PublisherOptions,
    ServiceEventInfo, ServiceEventType, ServiceTypeSupport, Stamp,
};

use crate::error::{IntrospectionError, Result};

/// Appended to the service name to form the event topic.
pub const SERVICE_EVENT_TOPIC_SUFFIX: &str = "/_service_event";

/// Longest topic name the transport accepts, in bytes.
pub const MAX_TOPIC_NAME_LEN: usize = 255;

struct ChannelState {
    clock: Arc<dyn Clock>,
    publisher: Option<Box<dyn Publisher>>,
    type_support: &'static dyn ServiceTypeSupport,
    topic_name: String,
    content_enabled: bool,
    options: PublisherOptions,
}

/// Event channel for one service endpoint.
#[derive(Default)]
pub struct ServiceEventPublisher {
    state: Option<ChannelState>,
}

impl ServiceEventPublisher {
    /// A closed channel: no topic, no publisher. Ready for [`init`](Self::init).
    pub const fn closed() -> Self {
        Self { state: None }
    }

    /// Create and initialize a channel in one step.
    pub fn new(
        type_support: &'static dyn ServiceTypeSupport,
        service_name: &str,
        node: &dyn Node,
        clock: Arc<dyn Clock>,
        options: PublisherOptions,
    ) -> Result<Self> {
        let mut channel = Self::closed();
        channel.init(type_support, service_name, node, clock, options)?;
        Ok(channel)
    }

    /// Initialize a closed channel and create its publisher.
    ///
    /// The topic is `service_name` followed by
    /// [`SERVICE_EVENT_TOPIC_SUFFIX`]. Content is enabled. On error the
    /// channel stays closed and no publisher is left behind.
    pub fn init(
        &mut self,
        type_support: &'static dyn ServiceTypeSupport,
        service_name: &str,
        node: &dyn Node,
        clock: Arc<dyn Clock>,
        options: PublisherOptions,
    ) -> Result<()> {
        if self.state.is_some() {
            return Err(IntrospectionError::AlreadyInitialized);
        }
        if service_name.is_empty() {
            return Err(IntrospectionError::InvalidArgument(
                "service name must not be empty",
            ));
        }

        let length = service_name.len() + SERVICE_EVENT_TOPIC_SUFFIX.len();
        if length > MAX_TOPIC_NAME_LEN {
            return Err(IntrospectionError::NameTooLong {
                service_name: service_name.to_owned(),
                length,
                max: MAX_TOPIC_NAME_LEN,
            });
        }

        let mut topic_name = String::new();
        topic_name
            .try_reserve_exact(length)
            .map_err(|_| IntrospectionError::BadAlloc { bytes: length })?;
        topic_name.push_str(service_name);
        topic_name.push_str(SERVICE_EVENT_TOPIC_SUFFIX);

        let publisher = node
            .create_publisher(type_support.event_type_support(), &topic_name, &options)
            .map_err(|e| IntrospectionError::transport("create_publisher", &topic_name, e))?;

        tracing::debug!(
            node = node.name(),
            topic = %topic_name,
            service_type = %type_support.full_name(),
            "service event publisher initialized"
        );

        self.state = Some(ChannelState {
            clock,
            publisher: Some(publisher),
            type_support,
            topic_name,
            content_enabled: true,
            options,
        });
        Ok(())
    }

    /// Disable if enabled and return to the closed state.
    ///
    /// Finalizing a closed channel does nothing. The channel is closed even
    /// if the transport fails to destroy the publisher; that error is
    /// returned.
    pub fn fini(&mut self, node: &dyn Node) -> Result<()> {
        let Some(state) = self.state.take() else {
            return Ok(());
        };

        let result = match state.publisher {
            Some(publisher) => release(node, publisher, &state.topic_name),
            None => Ok(()),
        };
        tracing::debug!(topic = %state.topic_name, "service event publisher finalized");
        result
    }

    /// Create the publisher if there is none.
    pub fn enable(&mut self, node: &dyn Node) -> Result<()> {
        let state = self
            .state
            .as_mut()
            .ok_or(IntrospectionError::NotInitialized)?;
        if state.publisher.is_some() {
            return Ok(());
        }

        let publisher = node
            .create_publisher(
                state.type_support.event_type_support(),
                &state.topic_name,
                &state.options,
            )
            .map_err(|e| IntrospectionError::transport("create_publisher", &state.topic_name, e))?;
        state.publisher = Some(publisher);
        tracing::debug!(topic = %state.topic_name, "service introspection enabled");
        Ok(())
    }

    /// Destroy the publisher if there is one. Topic and type support stay.
    ///
    /// The publisher is released even if the transport reports an error.
    pub fn disable(&mut self, node: &dyn Node) -> Result<()> {
        let Some(state) = self.state.as_mut() else {
            return Ok(());
        };
        let Some(publisher) = state.publisher.take() else {
            return Ok(());
        };

        release(node, publisher, &state.topic_name)?;
        tracing::debug!(topic = %state.topic_name, "service introspection disabled");
        Ok(())
    }

    /// Include or omit request and response bodies from the next publish on.
    ///
    /// Has no effect on a closed channel; `init` always enables content.
    pub fn set_content_enabled(&mut self, enabled: bool) {
        if let Some(state) = self.state.as_mut() {
            state.content_enabled = enabled;
        }
    }

    /// Publish one event.
    ///
    /// Request-class events carry `payload` as the request body and
    /// response-class events as the response body, but only while content
    /// is enabled. A disabled or closed channel returns `Ok(())` without
    /// reading the clock or touching the transport.
    pub fn publish(
        &self,
        event_type: ServiceEventType,
        payload: Option<MessagePayload<'_>>,
        sequence_number: i64,
        client_gid: &ClientGid,
    ) -> Result<()> {
        let Some(state) = self.state.as_ref() else {
            return Ok(());
        };
        let Some(publisher) = state.publisher.as_deref() else {
            return Ok(());
        };

        let stamp = Stamp::from_nanos(state.clock.now()?);
        let info = ServiceEventInfo {
            event_type,
            stamp,
            client_gid: *client_gid,
            sequence_number,
        };

        let payload = payload.filter(|_| state.content_enabled);
        let (request, response) = if event_type.is_request() {
            (payload, None)
        } else {
            (None, payload)
        };

        let message = state
            .type_support
            .create_event_message(&info, request, response, state.content_enabled)
            .ok_or_else(|| IntrospectionError::Construction {
                topic: state.topic_name.clone(),
            })?;
        let message = MessageGuard::new(state.type_support, message);

        publisher
            .publish(message.get())
            .map_err(|e| IntrospectionError::transport("publish", &state.topic_name, e))?;

        tracing::trace!(
            topic = %state.topic_name,
            event_type = ?event_type,
            sequence_number,
            "service event published"
        );
        Ok(())
    }

    /// Publish one event given its raw wire value.
    pub fn publish_raw(
        &self,
        event_type: u8,
        payload: Option<MessagePayload<'_>>,
        sequence_number: i64,
        client_gid: &ClientGid,
    ) -> Result<()> {
        let event_type = ServiceEventType::try_from(event_type)?;
        self.publish(event_type, payload, sequence_number, client_gid)
    }

    /// Whether `init` has succeeded and `fini` has not been called since.
    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// Whether events are currently being published.
    pub fn is_enabled(&self) -> bool {
        self.state
            .as_ref()
            .is_some_and(|state| state.publisher.is_some())
    }

    /// Whether request and response bodies are included in events.
    pub fn is_content_enabled(&self) -> bool {
        self.state.as_ref().is_some_and(|state| state.content_enabled)
    }

    /// The event topic, if initialized.
    pub fn topic_name(&self) -> Option<&str> {
        self.state.as_ref().map(|state| state.topic_name.as_str())
    }

    /// The service's type support, if initialized.
    pub fn type_support(&self) -> Option<&'static dyn ServiceTypeSupport> {
        self.state.as_ref().map(|state| state.type_support)
    }

    /// The publisher options, if initialized.
    pub fn options(&self) -> Option<&PublisherOptions> {
        self.state.as_ref().map(|state| &state.options)
    }
}

fn release(node: &dyn Node, publisher: Box<dyn Publisher>, topic_name: &str) -> Result<()> {
    node.destroy_publisher(publisher).map_err(|e| {
        tracing::warn!(topic = %topic_name, error = %e, "failed to destroy service event publisher");
        IntrospectionError::transport("destroy_publisher", topic_name, e)
    })
}

impl Drop for ServiceEventPublisher {
    fn drop(&mut self) {
        if let Some(state) = &self.state {
            tracing::debug!(
                topic = %state.topic_name,
                enabled = state.publisher.is_some(),
                "service event publisher dropped without fini"
            );
        }
    }
}

impl fmt::Debug for ServiceEventPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            None => f.debug_struct("ServiceEventPublisher").field("state", &"closed").finish(),
            Some(state) => f
                .debug_struct("ServiceEventPublisher")
                .field("topic_name", &state.topic_name)
                .field("enabled", &state.publisher.is_some())
                .field("content_enabled", &state.content_enabled)
                .field("clock", &state.clock.name())
                .field("type_support", &state.type_support)
                .field("options", &state.options)
                .finish(),
        }
    }
}

/// Hands a constructed message back to its type support when dropped.
struct MessageGuard {
    type_support: &'static dyn ServiceTypeSupport,
    message: Option<EventMessage>,
}

impl MessageGuard {
    fn new(type_support: &'static dyn ServiceTypeSupport, message: EventMessage) -> Self {
        Self {
            type_support,
            message: Some(message),
        }
    }

    fn get(&self) -> MessagePayload<'_> {
        match &self.message {
            Some(message) => &**message,
            None => &(),
        }
    }
}

impl Drop for MessageGuard {
    fn drop(&mut self) {
        if let Some(message) = self.message.take() {
            self.type_support.destroy_event_message(message);
        }
    }
}
