//! Runtime control of an endpoint's event channel.
//!
//! These functions never lock anything themselves: they reach the channel
//! through [`IntrospectableEndpoint::with_event_publisher`], which applies
//! the endpoint's own synchronization.

use introspect_core::Node;

use crate::config::IntrospectionConfig;
use crate::endpoint::EndpointRole;
use crate::error::Result;
use crate::publisher::ServiceEventPublisher;

/// A client or service that owns an event channel.
pub trait IntrospectableEndpoint {
    /// Whether this endpoint is a client or a service.
    fn role(&self) -> EndpointRole;

    /// Run `f` with exclusive access to the endpoint's channel.
    fn with_event_publisher<R>(&self, f: impl FnOnce(&mut ServiceEventPublisher) -> R) -> R;
}

/// Turn event publishing on or off.
pub fn configure_events<E>(endpoint: &E, node: &dyn Node, enable: bool) -> Result<()>
where
    E: IntrospectableEndpoint + ?Sized,
{
    endpoint.with_event_publisher(|channel| {
        if enable {
            channel.enable(node)
        } else {
            channel.disable(node)
        }
    })
}

/// Include or omit request and response bodies in events.
pub fn configure_content<E>(endpoint: &E, enable: bool)
where
    E: IntrospectableEndpoint + ?Sized,
{
    endpoint.with_event_publisher(|channel| channel.set_content_enabled(enable));
}

/// Apply the toggles for the endpoint's role from `config`.
pub fn apply_config<E>(endpoint: &E, node: &dyn Node, config: &IntrospectionConfig) -> Result<()>
where
    E: IntrospectableEndpoint + ?Sized,
{
    let role = endpoint.role();
    configure_content(endpoint, config.content_enabled_for(role));
    configure_events(endpoint, node, config.events_enabled_for(role))
}
