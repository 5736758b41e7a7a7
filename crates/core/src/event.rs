//! Service event wire schema.
//!
//! Every introspection event carries a [`ServiceEventInfo`] describing what
//! happened (request or response, sent or received), when it happened, and
//! which call it belongs to. A [`ServiceEvent`] adds the optional request or
//! response body.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Globally unique identifier of the client side of a call.
///
/// Together with the sequence number it correlates a request with its
/// response in the event stream.
pub type ClientGid = [u8; 16];

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Kind of occurrence an event describes.
///
/// The discriminants are the values carried on the wire, and serde uses
/// them too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum ServiceEventType {
    /// A client sent a request.
    RequestSent = 0,
    /// A service received a request.
    RequestReceived = 1,
    /// A service sent a response.
    ResponseSent = 2,
    /// A client received a response.
    ResponseReceived = 3,
}

impl ServiceEventType {
    /// All event types in wire order.
    pub const ALL: [Self; 4] = [
        Self::RequestSent,
        Self::RequestReceived,
        Self::ResponseSent,
        Self::ResponseReceived,
    ];

    /// Whether the payload of this event is a request body.
    #[must_use]
    pub fn is_request(self) -> bool {
        match self {
            Self::RequestSent | Self::RequestReceived => true,
            Self::ResponseSent | Self::ResponseReceived => false,
        }
    }

    /// Whether the payload of this event is a response body.
    #[must_use]
    pub fn is_response(self) -> bool {
        !self.is_request()
    }

    /// Wire value of this event type.
    #[must_use]
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl From<ServiceEventType> for u8 {
    fn from(kind: ServiceEventType) -> Self {
        kind.as_u8()
    }
}

/// A raw event type value outside the four known kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid service event type: {0}")]
pub struct InvalidEventType(pub u8);

impl TryFrom<u8> for ServiceEventType {
    type Error = InvalidEventType;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::RequestSent),
            1 => Ok(Self::RequestReceived),
            2 => Ok(Self::ResponseSent),
            3 => Ok(Self::ResponseReceived),
            other => Err(InvalidEventType(other)),
        }
    }
}

/// Point in time split into whole seconds and residual nanoseconds.
///
/// `nanosec` is always in `[0, 1_000_000_000)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Stamp {
    /// Whole seconds since the clock's epoch.
    pub sec: i64,
    /// Nanoseconds past `sec`.
    pub nanosec: u32,
}

impl Stamp {
    /// Split a nanosecond timestamp.
    ///
    /// Uses euclidean division so times before the epoch still yield a
    /// non-negative `nanosec`.
    #[must_use]
    pub fn from_nanos(nanos: i64) -> Self {
        Self {
            sec: nanos.div_euclid(NANOS_PER_SEC),
            nanosec: nanos.rem_euclid(NANOS_PER_SEC) as u32,
        }
    }

    /// Total nanoseconds, saturating at the `i64` range.
    #[must_use]
    pub fn as_nanos(&self) -> i64 {
        self.sec
            .saturating_mul(NANOS_PER_SEC)
            .saturating_add(i64::from(self.nanosec))
    }
}

/// Metadata common to every service event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEventInfo {
    /// What happened.
    pub event_type: ServiceEventType,
    /// When it was observed.
    pub stamp: Stamp,
    /// Client identifier of the call.
    pub client_gid: ClientGid,
    /// Client-assigned ordinal of the call.
    pub sequence_number: i64,
}

/// Event message for a service with request type `Req` and response type `Resp`.
///
/// At most one of `request` and `response` is present, and only when the
/// publisher had content enabled. On the wire each body is a sequence of
/// zero or one elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "Req: Serialize, Resp: Serialize",
    deserialize = "Req: Deserialize<'de>, Resp: Deserialize<'de>"
))]
pub struct ServiceEvent<Req, Resp> {
    /// Event metadata.
    pub info: ServiceEventInfo,
    /// Request body, for request events with content enabled.
    #[serde(with = "zero_or_one")]
    pub request: Option<Req>,
    /// Response body, for response events with content enabled.
    #[serde(with = "zero_or_one")]
    pub response: Option<Resp>,
}

impl<Req, Resp> ServiceEvent<Req, Resp> {
    /// Whether the event carries a body.
    pub fn has_content(&self) -> bool {
        self.request.is_some() || self.response.is_some()
    }
}

/// `Option<T>` as a sequence of at most one element.
mod zero_or_one {
    use serde::de::Error as _;

    use super::{Deserialize, Deserializer, Serialize, Serializer};

    #[allow(clippy::ref_option, reason = "signature expected by `serde(with)`")]
    pub(super) fn serialize<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        value.as_slice().serialize(serializer)
    }

    pub(super) fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        let mut items = Vec::<T>::deserialize(deserializer)?;
        if items.len() > 1 {
            return Err(D::Error::invalid_length(items.len(), &"zero or one element"));
        }
        Ok(items.pop())
    }
}
