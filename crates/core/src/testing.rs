//! Test doubles for the transport and type-support contracts.
//!
//! [`RecordingNode`] stands in for a middleware participant: it records
//! every publisher it creates or destroys and every event published through
//! them, and can be told to fail each operation. [`InstrumentedTypeSupport`]
//! counts constructed and destroyed event messages.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::event::{ServiceEvent, ServiceEventInfo};
use crate::transport::{Node, Publisher, PublisherOptions, TransportError};
use crate::type_support::{
    EventMessage, MessagePayload, MessageTypeSupport, ServiceTypeSupport, TypedServiceSupport,
};

/// A `create_publisher` call seen by a [`RecordingNode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPublisher {
    /// Topic requested.
    pub topic_name: String,
    /// Message type requested.
    pub type_name: String,
    /// Options requested.
    pub options: PublisherOptions,
}

/// An event published through a [`RecordingNode`]'s publisher.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedEvent<Req, Resp> {
    /// Topic it was published on.
    pub topic_name: String,
    /// The event itself.
    pub event: ServiceEvent<Req, Resp>,
}

#[derive(Debug)]
struct Shared<Req, Resp> {
    created: Mutex<Vec<CreatedPublisher>>,
    published: Mutex<Vec<PublishedEvent<Req, Resp>>>,
    destroyed: AtomicUsize,
    live: AtomicUsize,
    publish_attempts: AtomicUsize,
    fail_publish: AtomicBool,
}

/// In-memory node that records everything and publishes nowhere.
#[derive(Debug)]
pub struct RecordingNode<Req, Resp> {
    name: String,
    shared: Arc<Shared<Req, Resp>>,
    fail_create: AtomicBool,
    fail_destroy: AtomicBool,
}

impl<Req, Resp> RecordingNode<Req, Resp>
where
    Req: Clone + Send + Sync + 'static,
    Resp: Clone + Send + Sync + 'static,
{
    /// Create a node called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shared: Arc::new(Shared {
                created: Mutex::new(Vec::new()),
                published: Mutex::new(Vec::new()),
                destroyed: AtomicUsize::new(0),
                live: AtomicUsize::new(0),
                publish_attempts: AtomicUsize::new(0),
                fail_publish: AtomicBool::new(false),
            }),
            fail_create: AtomicBool::new(false),
            fail_destroy: AtomicBool::new(false),
        }
    }

    /// Make `create_publisher` fail.
    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Make `destroy_publisher` report an error (the publisher is still released).
    pub fn set_fail_destroy(&self, fail: bool) {
        self.fail_destroy.store(fail, Ordering::SeqCst);
    }

    /// Make every publisher's `publish` fail.
    pub fn set_fail_publish(&self, fail: bool) {
        self.shared.fail_publish.store(fail, Ordering::SeqCst);
    }

    /// Every successful `create_publisher` call, in order.
    pub fn created(&self) -> Vec<CreatedPublisher> {
        self.shared.created.lock().clone()
    }

    /// Number of publishers created.
    pub fn created_count(&self) -> usize {
        self.shared.created.lock().len()
    }

    /// Number of publishers passed to `destroy_publisher`.
    pub fn destroyed_count(&self) -> usize {
        self.shared.destroyed.load(Ordering::SeqCst)
    }

    /// Number of publishers currently alive.
    pub fn live_publishers(&self) -> usize {
        self.shared.live.load(Ordering::SeqCst)
    }

    /// Number of `publish` calls, successful or not.
    pub fn publish_attempts(&self) -> usize {
        self.shared.publish_attempts.load(Ordering::SeqCst)
    }

    /// Events published successfully, in order.
    pub fn published(&self) -> Vec<PublishedEvent<Req, Resp>> {
        self.shared.published.lock().clone()
    }
}

impl<Req, Resp> Node for RecordingNode<Req, Resp>
where
    Req: Clone + Send + Sync + 'static,
    Resp: Clone + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn create_publisher(
        &self,
        type_support: &MessageTypeSupport,
        topic_name: &str,
        options: &PublisherOptions,
    ) -> Result<Box<dyn Publisher>, TransportError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(TransportError::new(format!(
                "cannot create publisher on '{topic_name}'"
            )));
        }
        self.shared.created.lock().push(CreatedPublisher {
            topic_name: topic_name.to_owned(),
            type_name: type_support.type_name().to_owned(),
            options: *options,
        });
        self.shared.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(RecordingPublisher {
            topic_name: topic_name.to_owned(),
            shared: Arc::clone(&self.shared),
        }))
    }

    fn destroy_publisher(&self, publisher: Box<dyn Publisher>) -> Result<(), TransportError> {
        self.shared.destroyed.fetch_add(1, Ordering::SeqCst);
        let topic_name = publisher.topic_name().to_owned();
        drop(publisher);
        if self.fail_destroy.load(Ordering::SeqCst) {
            return Err(TransportError::new(format!(
                "cannot destroy publisher on '{topic_name}'"
            )));
        }
        Ok(())
    }
}

struct RecordingPublisher<Req, Resp> {
    topic_name: String,
    shared: Arc<Shared<Req, Resp>>,
}

impl<Req, Resp> Publisher for RecordingPublisher<Req, Resp>
where
    Req: Clone + Send + Sync + 'static,
    Resp: Clone + Send + Sync + 'static,
{
    fn topic_name(&self) -> &str {
        &self.topic_name
    }

    fn publish(&self, message: &(dyn Any + Send + Sync)) -> Result<(), TransportError> {
        self.shared.publish_attempts.fetch_add(1, Ordering::SeqCst);
        if self.shared.fail_publish.load(Ordering::SeqCst) {
            return Err(TransportError::new("publish rejected"));
        }
        let event = message
            .downcast_ref::<ServiceEvent<Req, Resp>>()
            .ok_or_else(|| TransportError::new("unexpected message type"))?;
        self.shared.published.lock().push(PublishedEvent {
            topic_name: self.topic_name.clone(),
            event: event.clone(),
        });
        Ok(())
    }
}

impl<Req, Resp> Drop for RecordingPublisher<Req, Resp> {
    fn drop(&mut self) {
        self.shared.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Typed service support that counts the messages it builds and releases.
#[derive(Debug)]
pub struct InstrumentedTypeSupport<Req, Resp> {
    inner: TypedServiceSupport<Req, Resp>,
    constructed: AtomicUsize,
    destroyed: AtomicUsize,
    fail_construction: AtomicBool,
}

impl<Req, Resp> InstrumentedTypeSupport<Req, Resp>
where
    Req: Clone + Send + Sync + 'static,
    Resp: Clone + Send + Sync + 'static,
{
    /// Describe `package_name/srv/service_type_name`.
    pub fn new(package_name: &'static str, service_type_name: &'static str) -> Self {
        Self {
            inner: TypedServiceSupport::new(package_name, service_type_name),
            constructed: AtomicUsize::new(0),
            destroyed: AtomicUsize::new(0),
            fail_construction: AtomicBool::new(false),
        }
    }

    /// Give the support a process lifetime, as event publishers require.
    pub fn leak(self) -> &'static Self {
        Box::leak(Box::new(self))
    }

    /// Make `create_event_message` return `None`.
    pub fn set_fail_construction(&self, fail: bool) {
        self.fail_construction.store(fail, Ordering::SeqCst);
    }

    /// Messages built so far.
    pub fn constructed(&self) -> usize {
        self.constructed.load(Ordering::SeqCst)
    }

    /// Messages released so far.
    pub fn destroyed(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }
}

impl<Req, Resp> ServiceTypeSupport for InstrumentedTypeSupport<Req, Resp>
where
    Req: Clone + Send + Sync + 'static,
    Resp: Clone + Send + Sync + 'static,
{
    fn package_name(&self) -> &str {
        self.inner.package_name()
    }

    fn service_type_name(&self) -> &str {
        self.inner.service_type_name()
    }

    fn event_type_support(&self) -> &MessageTypeSupport {
        self.inner.event_type_support()
    }

    fn create_event_message(
        &self,
        info: &ServiceEventInfo,
        request: Option<MessagePayload<'_>>,
        response: Option<MessagePayload<'_>>,
        enable_content: bool,
    ) -> Option<EventMessage> {
        if self.fail_construction.load(Ordering::SeqCst) {
            return None;
        }
        let message = self
            .inner
            .create_event_message(info, request, response, enable_content)?;
        self.constructed.fetch_add(1, Ordering::SeqCst);
        Some(message)
    }

    fn destroy_event_message(&self, message: EventMessage) {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
        drop(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ServiceEventType, Stamp};

    #[test]
    fn live_count_follows_publisher_lifetime() {
        let node = RecordingNode::<String, String>::new("test_node");
        let support = MessageTypeSupport::named("pkg/srv/Echo_Event");
        let publisher = node
            .create_publisher(&support, "/echo/_service_event", &PublisherOptions::default())
            .unwrap();
        assert_eq!(node.live_publishers(), 1);

        node.destroy_publisher(publisher).unwrap();
        assert_eq!(node.live_publishers(), 0);
        assert_eq!(node.destroyed_count(), 1);
    }

    #[test]
    fn failing_destroy_still_releases() {
        let node = RecordingNode::<String, String>::new("test_node");
        node.set_fail_destroy(true);
        let support = MessageTypeSupport::named("pkg/srv/Echo_Event");
        let publisher = node
            .create_publisher(&support, "/echo/_service_event", &PublisherOptions::default())
            .unwrap();

        assert!(node.destroy_publisher(publisher).is_err());
        assert_eq!(node.live_publishers(), 0);
    }

    #[test]
    fn publisher_records_typed_events() {
        let node = RecordingNode::<String, String>::new("test_node");
        let support = InstrumentedTypeSupport::<String, String>::new("pkg", "Echo");
        let publisher = node
            .create_publisher(
                support.event_type_support(),
                "/echo/_service_event",
                &PublisherOptions::default(),
            )
            .unwrap();
        let info = ServiceEventInfo {
            event_type: ServiceEventType::RequestSent,
            stamp: Stamp::default(),
            client_gid: [1; 16],
            sequence_number: 1,
        };
        let message = support
            .create_event_message(&info, Some(&String::from("hi")), None, true)
            .unwrap();
        publisher.publish(&*message).unwrap();
        support.destroy_event_message(message);

        let published = node.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].event.request.as_deref(), Some("hi"));
        assert_eq!(support.constructed(), 1);
        assert_eq!(support.destroyed(), 1);
    }
}
