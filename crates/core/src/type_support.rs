//! Runtime descriptions of message and service types.
//!
//! A service's request and response shapes are not always known at compile
//! time. [`MessageTypeSupport`] is an opaque handle to one message type, and
//! [`ServiceTypeSupport`] describes a whole service: its names, its event
//! message type, and how to construct an event message from a call.

#![allow(
    unsafe_code,
    reason = "foreign type descriptors are shared across threads"
)]

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::marker::{PhantomData, PhantomPinned};
use std::ptr::NonNull;

use crate::event::{ServiceEvent, ServiceEventInfo};

/// A constructed event message, owned by whoever built it.
pub type EventMessage = Box<dyn Any + Send + Sync>;

/// A borrowed request or response body.
pub type MessagePayload<'a> = &'a (dyn Any + Send + Sync);

/// Opaque foreign message type descriptor.
///
/// Only ever handled behind a pointer; its layout belongs to the library
/// that exported it.
#[repr(C)]
pub struct RawMessageTypeSupport {
    _data: [u8; 0],
    _marker: PhantomData<(*mut u8, PhantomPinned)>,
}

/// Non-null pointer to a foreign message type descriptor.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ForeignTypeSupport(NonNull<RawMessageTypeSupport>);

// SAFETY: descriptors are immutable statics inside libraries that stay
// loaded for the rest of the process, so the pointer may be shared freely.
unsafe impl Send for ForeignTypeSupport {}
// SAFETY: see `Send`; nothing is ever written through the pointer.
unsafe impl Sync for ForeignTypeSupport {}

impl ForeignTypeSupport {
    /// Wrap a descriptor pointer, rejecting null.
    pub fn new(ptr: *const RawMessageTypeSupport) -> Option<Self> {
        NonNull::new(ptr.cast_mut()).map(Self)
    }

    /// The raw descriptor pointer.
    pub fn as_ptr(self) -> *const RawMessageTypeSupport {
        self.0.as_ptr().cast_const()
    }
}

impl fmt::Debug for ForeignTypeSupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ForeignTypeSupport").field(&self.0).finish()
    }
}

/// Handle to one message type description.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageTypeSupport {
    type_name: Cow<'static, str>,
    foreign: Option<ForeignTypeSupport>,
}

impl MessageTypeSupport {
    /// A type described in-process, identified only by its name.
    pub fn named(type_name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            type_name: type_name.into(),
            foreign: None,
        }
    }

    /// A type described by a descriptor exported from a loaded library.
    pub fn foreign(type_name: impl Into<Cow<'static, str>>, handle: ForeignTypeSupport) -> Self {
        Self {
            type_name: type_name.into(),
            foreign: Some(handle),
        }
    }

    /// Fully qualified type name, e.g. `example_interfaces/srv/AddTwoInts_Request`.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The foreign descriptor, if this type came from a loaded library.
    pub fn foreign_handle(&self) -> Option<ForeignTypeSupport> {
        self.foreign
    }
}

impl fmt::Display for MessageTypeSupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.type_name)
    }
}

/// Process-lifetime description of a service type.
///
/// Event publishers borrow it for `'static` and never mutate it.
pub trait ServiceTypeSupport: Send + Sync {
    /// Package that defines the service, e.g. `example_interfaces`.
    fn package_name(&self) -> &str;

    /// Service type name within the package, e.g. `AddTwoInts`.
    fn service_type_name(&self) -> &str;

    /// Type of the event messages published for this service.
    fn event_type_support(&self) -> &MessageTypeSupport;

    /// Build an event message.
    ///
    /// `request` and `response` are mutually exclusive. When
    /// `enable_content` is false the bodies must be left out of the message.
    /// Returns `None` if no message could be built.
    fn create_event_message(
        &self,
        info: &ServiceEventInfo,
        request: Option<MessagePayload<'_>>,
        response: Option<MessagePayload<'_>>,
        enable_content: bool,
    ) -> Option<EventMessage>;

    /// Release a message built by [`ServiceTypeSupport::create_event_message`].
    fn destroy_event_message(&self, message: EventMessage) {
        drop(message);
    }

    /// Fully qualified service name, `package/srv/Type`.
    fn full_name(&self) -> String {
        format!("{}/srv/{}", self.package_name(), self.service_type_name())
    }
}

impl fmt::Debug for dyn ServiceTypeSupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceTypeSupport")
            .field("name", &self.full_name())
            .field("event_type", self.event_type_support())
            .finish()
    }
}

/// Type support for a service whose request and response are Rust types.
///
/// Event messages are [`ServiceEvent<Req, Resp>`] values; bodies are cloned
/// out of the borrowed payload.
///
/// ```
/// use introspect_core::{ServiceEventInfo, ServiceEventType, ServiceTypeSupport, Stamp, TypedServiceSupport};
///
/// let support = TypedServiceSupport::<i64, i64>::new("example_interfaces", "Square");
/// assert_eq!(support.full_name(), "example_interfaces/srv/Square");
/// assert_eq!(support.event_type_support().type_name(), "example_interfaces/srv/Square_Event");
///
/// let info = ServiceEventInfo {
///     event_type: ServiceEventType::RequestReceived,
///     stamp: Stamp::default(),
///     client_gid: [0; 16],
///     sequence_number: 1,
/// };
/// let message = support.create_event_message(&info, Some(&4_i64), None, true).unwrap();
/// assert!(message.downcast_ref::<introspect_core::ServiceEvent<i64, i64>>().is_some());
/// ```
pub struct TypedServiceSupport<Req, Resp> {
    package_name: Cow<'static, str>,
    service_type_name: Cow<'static, str>,
    event_type: MessageTypeSupport,
    _types: PhantomData<fn() -> (Req, Resp)>,
}

impl<Req, Resp> TypedServiceSupport<Req, Resp> {
    /// Describe service `service_type_name` in `package_name`.
    pub fn new(
        package_name: impl Into<Cow<'static, str>>,
        service_type_name: impl Into<Cow<'static, str>>,
    ) -> Self {
        let package_name = package_name.into();
        let service_type_name = service_type_name.into();
        let event_type =
            MessageTypeSupport::named(format!("{package_name}/srv/{service_type_name}_Event"));
        Self {
            package_name,
            service_type_name,
            event_type,
            _types: PhantomData,
        }
    }
}

impl<Req, Resp> fmt::Debug for TypedServiceSupport<Req, Resp> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedServiceSupport")
            .field("package_name", &self.package_name)
            .field("service_type_name", &self.service_type_name)
            .finish()
    }
}

impl<Req, Resp> ServiceTypeSupport for TypedServiceSupport<Req, Resp>
where
    Req: Clone + Send + Sync + 'static,
    Resp: Clone + Send + Sync + 'static,
{
    fn package_name(&self) -> &str {
        &self.package_name
    }

    fn service_type_name(&self) -> &str {
        &self.service_type_name
    }

    fn event_type_support(&self) -> &MessageTypeSupport {
        &self.event_type
    }

    fn create_event_message(
        &self,
        info: &ServiceEventInfo,
        request: Option<MessagePayload<'_>>,
        response: Option<MessagePayload<'_>>,
        enable_content: bool,
    ) -> Option<EventMessage> {
        // A payload of the wrong type yields no message rather than a silent drop.
        let request = match (enable_content, request) {
            (true, Some(payload)) => Some(payload.downcast_ref::<Req>()?.clone()),
            _ => None,
        };
        let response = match (enable_content, response) {
            (true, Some(payload)) => Some(payload.downcast_ref::<Resp>()?.clone()),
            _ => None,
        };
        Some(Box::new(ServiceEvent {
            info: *info,
            request,
            response,
        }))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::event::{ServiceEventType, Stamp};

    fn info(event_type: ServiceEventType) -> ServiceEventInfo {
        ServiceEventInfo {
            event_type,
            stamp: Stamp { sec: 1, nanosec: 2 },
            client_gid: [9; 16],
            sequence_number: 42,
        }
    }

    fn support() -> TypedServiceSupport<String, u32> {
        TypedServiceSupport::new("demo_pkg", "Lookup")
    }

    #[test]
    fn foreign_handle_rejects_null() {
        assert!(ForeignTypeSupport::new(std::ptr::null()).is_none());
    }

    #[test]
    fn names_are_fully_qualified() {
        let support = support();
        assert_eq!(support.full_name(), "demo_pkg/srv/Lookup");
        assert_eq!(
            support.event_type_support().to_string(),
            "demo_pkg/srv/Lookup_Event"
        );
        assert!(support.event_type_support().foreign_handle().is_none());
    }

    #[test]
    fn request_body_is_copied_when_content_enabled() {
        let payload = String::from("key");
        let message = support()
            .create_event_message(
                &info(ServiceEventType::RequestSent),
                Some(&payload),
                None,
                true,
            )
            .unwrap();
        let event = message.downcast::<ServiceEvent<String, u32>>().unwrap();
        assert_eq!(event.request.as_deref(), Some("key"));
        assert_eq!(event.response, None);
        assert_eq!(event.info.sequence_number, 42);
    }

    #[test]
    fn bodies_are_dropped_when_content_disabled() {
        let message = support()
            .create_event_message(&info(ServiceEventType::ResponseSent), None, Some(&7_u32), false)
            .unwrap();
        let event = message.downcast::<ServiceEvent<String, u32>>().unwrap();
        assert!(!event.has_content());
    }

    #[test]
    fn mismatched_payload_builds_nothing() {
        let message = support().create_event_message(
            &info(ServiceEventType::ResponseReceived),
            None,
            Some(&"not a u32"),
            true,
        );
        assert!(message.is_none());
    }

    #[test]
    fn trait_object_debug_shows_name() {
        let support: &dyn ServiceTypeSupport = &support();
        assert!(format!("{support:?}").contains("demo_pkg/srv/Lookup"));
    }
}
