//! Message envelope shared by business traffic and self-test traffic.
//!
//! Every message carries a [`MessageHeader`] naming its logical source and
//! destination [`Member`], an [`EventKind`] tag and a timestamp, plus a
//! key-value payload. Messages are immutable once built: fields are private
//! and the builder methods consume `self`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Key-value payload carried by a [`Message`].
pub type Payload = BTreeMap<String, serde_json::Value>;

/// Logical message endpoint.
///
/// `Main`, `Server` and `Ir` each own one channel. `Backend` is an external
/// network peer reachable only through the server worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Member {
    /// The supervising process.
    Main,
    /// The backend connection worker.
    Server,
    /// The infrared camera worker.
    Ir,
    /// The remote backend, reached through `Server`.
    Backend,
}

impl Member {
    /// Every member in declaration order.
    pub fn all() -> impl Iterator<Item = Self> {
        [Self::Main, Self::Server, Self::Ir, Self::Backend].into_iter()
    }

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Server => "server",
            Self::Ir => "ir",
            Self::Backend => "backend",
        }
    }

    /// The member whose channel carries traffic addressed to `self`.
    #[must_use]
    pub const fn route(self) -> Member {
        match self {
            Self::Backend => Self::Server,
            other => other,
        }
    }

    /// Whether this member owns a channel of its own.
    #[must_use]
    pub const fn owns_channel(self) -> bool {
        !matches!(self, Self::Backend)
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declares a closed tag enum with a stable wire string per variant.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $wire)] $variant ),+
        }

        impl $name {
            /// Every tag in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Stable wire string of the tag.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }

            /// Parse a wire string back into a tag.
            #[must_use]
            pub fn from_wire(wire: &str) -> Option<Self> {
                match wire {
                    $($wire => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum! {
    /// Self-test probe and acknowledgment tags.
    SelfTestEvent {
        /// Probe the supervisor's own inbound channel.
        ReqFromMainToMain => "REQ_FROM_MAIN_TO_MAIN",
        /// Probe the server worker.
        ReqFromMainToServer => "REQ_FROM_MAIN_TO_SERVER",
        /// Probe the IR worker.
        ReqFromMainToIr => "REQ_FROM_MAIN_TO_IR",
        /// Server worker answer to its probe.
        AckFromServerToMain => "ACK_FROM_SERVER_TO_MAIN",
        /// IR worker answer to its probe.
        AckFromIrToMain => "ACK_FROM_IR_TO_MAIN",
    }
}

impl SelfTestEvent {
    /// Probe tag addressed to `target`, if the member takes part in self-tests.
    #[must_use]
    pub const fn probe_for(target: Member) -> Option<Self> {
        match target {
            Member::Main => Some(Self::ReqFromMainToMain),
            Member::Server => Some(Self::ReqFromMainToServer),
            Member::Ir => Some(Self::ReqFromMainToIr),
            Member::Backend => None,
        }
    }

    /// Tag that arrives on the MAIN channel once `target` answered its probe.
    ///
    /// The MAIN probe loops back unchanged, so its reply is the probe itself.
    #[must_use]
    pub const fn reply_for(target: Member) -> Option<Self> {
        match target {
            Member::Main => Some(Self::ReqFromMainToMain),
            Member::Server => Some(Self::AckFromServerToMain),
            Member::Ir => Some(Self::AckFromIrToMain),
            Member::Backend => None,
        }
    }

    /// Whether this tag is a probe sent by the supervisor.
    #[must_use]
    pub const fn is_probe(self) -> bool {
        matches!(
            self,
            Self::ReqFromMainToMain | Self::ReqFromMainToServer | Self::ReqFromMainToIr
        )
    }
}

wire_enum! {
    /// Requests arriving from the backend through the server worker.
    BackendRequest {
        /// Socket connected.
        Connect => "connect",
        /// Socket disconnected.
        Disconnect => "disconnect",
        /// Socket connection attempt failed.
        ConnectError => "connect_error",
        /// Reset a latched alarm.
        ResetAlarm => "REQ_RESET_ALARM",
        /// Reset a latched error.
        ResetError => "REQ_RESET_ERROR",
        /// Apply a new configuration.
        SetConfig => "REQ_SET_CONFIG",
        /// Set the temperature threshold.
        SetTemperature => "REQ_SET_TEMPRETURE",
        /// Start a manual recording.
        ManualStartRecord => "REQ_MANUAL_START_RECORD",
        /// Stop a manual recording.
        ManualStopRecord => "REQ_MANUAL_STOP_RECORD",
        /// Fetch a manual recording.
        ManualCallRecord => "REQ_MANUAL_CALL_RECORD",
        /// Request the live temperature stream.
        CallLiveTemperature => "REQ_CALL_LIVE_TEMPRETURE",
        /// Request the temperature history.
        CallHistoryTemperature => "REQ_CALL_HISTORY_TEMPRETURE",
        /// Register an event.
        SetEvent => "REQ_SET_EVENT",
        /// Free-form text message.
        Message => "MESSAGE",
    }
}

wire_enum! {
    /// Replies sent to the backend through the server worker.
    BackendReply {
        /// Alarm reset acknowledged.
        AckResetAlarm => "ACK_RESET_ALARM",
        /// Error reset acknowledged.
        AckResetError => "ACK_RESET_ERROR",
        /// Configuration applied.
        AckSetConfig => "ACK_SET_CONFIG",
        /// Threshold applied.
        AckSetTemperature => "ACK_SET_TEMPRETURE",
        /// Manual recording started.
        AckManualStartRecord => "ACK_MANUAL_START_RECORD",
        /// Manual recording stopped.
        AckManualStopRecord => "ACK_MANUAL_STOP_RECORD",
        /// Recording stopped after its time limit.
        AckTimeoutStopRecord => "ACK_TIMEOUT_STOP_RECORD",
        /// Manual recording delivered.
        AckManualCallRecord => "ACK_MANUAL_CALL_RECORD",
        /// Live temperature delivered.
        AckCallLiveTemperature => "ACK_CALL_LIVE_TEMPRETURE",
        /// Temperature history delivered.
        AckCallHistoryTemperature => "ACK_CALL_HISTORY_TEMPRETURE",
        /// Event registered.
        AckSetEvent => "ACK_SET_EVENT",
        /// Text message received.
        AckMessage => "ACK_MESSAGE",
        /// Connectivity test towards the backend.
        ReqTest => "REQ_TEST",
    }
}

/// Event tag of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "tag", rename_all = "snake_case")]
pub enum EventKind {
    /// Channel self-test traffic.
    SelfTest(SelfTestEvent),
    /// Backend request forwarded by the server worker.
    FromBackend(BackendRequest),
    /// Reply to be forwarded to the backend.
    ToBackend(BackendReply),
}

impl EventKind {
    /// Wire string of the inner tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SelfTest(tag) => tag.as_str(),
            Self::FromBackend(tag) => tag.as_str(),
            Self::ToBackend(tag) => tag.as_str(),
        }
    }

    /// The self-test tag, if this is self-test traffic.
    #[must_use]
    pub const fn as_self_test(self) -> Option<SelfTestEvent> {
        match self {
            Self::SelfTest(tag) => Some(tag),
            _ => None,
        }
    }

    /// Whether this is self-test traffic.
    #[must_use]
    pub const fn is_self_test(self) -> bool {
        matches!(self, Self::SelfTest(_))
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<SelfTestEvent> for EventKind {
    fn from(tag: SelfTestEvent) -> Self {
        Self::SelfTest(tag)
    }
}

impl From<BackendRequest> for EventKind {
    fn from(tag: BackendRequest) -> Self {
        Self::FromBackend(tag)
    }
}

impl From<BackendReply> for EventKind {
    fn from(tag: BackendReply) -> Self {
        Self::ToBackend(tag)
    }
}

/// Seconds since the UNIX epoch, `0.0` if the clock is before the epoch.
#[must_use]
pub fn unix_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |d| d.as_secs_f64())
}

/// Routing and identification header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageHeader {
    /// Sending member.
    pub source: Member,
    /// Receiving member; decides the channel the message is routed to.
    pub dest: Member,
    /// Event tag.
    pub event: EventKind,
    /// Correlation id, empty when unused.
    pub id: String,
    /// Originating user, empty when unused.
    pub user: String,
    /// Creation time in seconds since the UNIX epoch.
    pub timestamp: f64,
}

impl MessageHeader {
    /// Create a header stamped with the current time.
    #[must_use]
    pub fn new(source: Member, dest: Member, event: impl Into<EventKind>) -> Self {
        Self {
            source,
            dest,
            event: event.into(),
            id: String::new(),
            user: String::new(),
            timestamp: unix_timestamp(),
        }
    }

    /// Set the correlation id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the originating user.
    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Override the timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Header plus payload. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    header: MessageHeader,
    #[serde(default)]
    payload: Payload,
}

impl Message {
    /// Create a message with an empty payload.
    #[must_use]
    pub fn new(header: MessageHeader) -> Self {
        Self {
            header,
            payload: Payload::new(),
        }
    }

    /// Create a message with the given payload.
    #[must_use]
    pub fn with_payload(header: MessageHeader, payload: Payload) -> Self {
        Self { header, payload }
    }

    /// Create a self-test message.
    #[must_use]
    pub fn self_test(source: Member, dest: Member, tag: SelfTestEvent) -> Self {
        Self::new(MessageHeader::new(source, dest, tag))
    }

    /// Self-test probe from MAIN to `target`.
    ///
    /// Returns `None` for members that do not own a channel.
    #[must_use]
    pub fn probe(target: Member) -> Option<Self> {
        SelfTestEvent::probe_for(target).map(|tag| Self::self_test(Member::Main, target, tag))
    }

    /// Acknowledgment sent by worker `from` after it received its probe.
    ///
    /// Returns `None` for members that do not answer probes.
    #[must_use]
    pub fn ack(from: Member) -> Option<Self> {
        match from {
            Member::Server | Member::Ir => SelfTestEvent::reply_for(from)
                .map(|tag| Self::self_test(from, Member::Main, tag)),
            Member::Main | Member::Backend => None,
        }
    }

    /// Acknowledgment answering this self-test request, echoing its
    /// correlation id.
    ///
    /// Returns `None` unless this is a request addressed to its own worker.
    #[must_use]
    pub fn acknowledge(&self) -> Option<Self> {
        let tag = self.header.event.as_self_test()?;
        if SelfTestEvent::probe_for(self.header.dest) != Some(tag) {
            return None;
        }
        let mut ack = Self::ack(self.header.dest)?;
        ack.header.id.clone_from(&self.header.id);
        Some(ack)
    }

    /// Add one payload entry.
    #[must_use]
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// The header.
    #[must_use]
    pub fn header(&self) -> &MessageHeader {
        &self.header
    }

    /// The payload.
    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// One payload entry.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.payload.get(key)
    }

    /// Sending member.
    #[must_use]
    pub fn source(&self) -> Member {
        self.header.source
    }

    /// Receiving member.
    #[must_use]
    pub fn dest(&self) -> Member {
        self.header.dest
    }

    /// Event tag.
    #[must_use]
    pub fn event(&self) -> EventKind {
        self.header.event
    }

    /// Whether this is self-test traffic.
    #[must_use]
    pub fn is_self_test(&self) -> bool {
        self.header.event.is_self_test()
    }

    /// Split into header and payload.
    #[must_use]
    pub fn into_parts(self) -> (MessageHeader, Payload) {
        (self.header, self.payload)
    }
}
