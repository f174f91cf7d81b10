//! Error types for channel operations.

use crate::message::Message;

/// Result type for channel operations.
pub type ChannelResult<T> = std::result::Result<T, ChannelError>;

/// Channel failure that does not hand a message back.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// The channel was closed.
    #[error("channel '{0}' is closed")]
    Closed(String),
    /// No channel is registered for the destination member.
    #[error("no channel for member '{0}'")]
    NoRoute(String),
    /// A channel needs room for at least one message.
    #[error("channel '{0}' needs a capacity of at least 1")]
    InvalidCapacity(String),
}

impl ChannelError {
    /// Create a closed error for the named channel.
    #[must_use]
    pub fn closed(channel: impl Into<String>) -> Self {
        Self::Closed(channel.into())
    }

    /// Whether the channel was closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed(_))
    }
}

/// Why a [`put`](crate::Channel::put) was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PutErrorKind {
    /// The channel held `capacity` messages.
    Full,
    /// The channel was closed.
    Closed,
}

impl PutErrorKind {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Closed => "closed",
        }
    }
}

/// A rejected message, handed back to the sender.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("put on channel '{channel}' rejected: {}", kind.as_str())]
pub struct PutError {
    channel: String,
    kind: PutErrorKind,
    message: Box<Message>,
}

impl PutError {
    pub(crate) fn new(channel: &str, kind: PutErrorKind, message: Message) -> Self {
        Self {
            channel: channel.to_owned(),
            kind,
            message: Box::new(message),
        }
    }

    /// Name of the rejecting channel.
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Rejection reason.
    #[must_use]
    pub fn kind(&self) -> PutErrorKind {
        self.kind
    }

    /// Whether the channel was full.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.kind == PutErrorKind::Full
    }

    /// Whether the channel was closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.kind == PutErrorKind::Closed
    }

    /// The message that was not enqueued.
    #[must_use]
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Take back the message that was not enqueued.
    #[must_use]
    pub fn into_message(self) -> Message {
        *self.message
    }
}
