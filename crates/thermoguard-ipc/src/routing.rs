//! Routing table from logical members to their channels.

use crate::channel::{Channel, DEFAULT_CHANNEL_CAPACITY};
use crate::error::{ChannelError, ChannelResult, PutError};
use crate::message::{Member, Message};

/// The three channels of a running system.
#[derive(Debug, Clone)]
pub struct SystemChannels {
    /// Inbound channel of the supervisor.
    pub main: Channel,
    /// Inbound channel of the server worker.
    pub server: Channel,
    /// Inbound channel of the IR worker.
    pub ir: Channel,
}

impl SystemChannels {
    /// Create the three channels with the given capacity.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::InvalidCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize) -> ChannelResult<Self> {
        Ok(Self {
            main: Channel::new(Member::Main.as_str(), Member::Main, capacity)?,
            server: Channel::new(Member::Server.as_str(), Member::Server, capacity)?,
            ir: Channel::new(Member::Ir.as_str(), Member::Ir, capacity)?,
        })
    }

    /// Create the three channels with the default capacity.
    ///
    /// # Errors
    ///
    /// Never fails in practice; see [`SystemChannels::new`].
    pub fn with_default_capacity() -> ChannelResult<Self> {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Channel carrying traffic addressed to `member`.
    #[must_use]
    pub fn channel_for(&self, member: Member) -> &Channel {
        match member.route() {
            Member::Main => &self.main,
            Member::Ir => &self.ir,
            Member::Server | Member::Backend => &self.server,
        }
    }

    /// Put `msg` on the channel routed from its destination.
    ///
    /// # Errors
    ///
    /// Propagates the [`PutError`] of the target channel.
    pub fn deliver(&self, msg: Message) -> Result<(), PutError> {
        self.channel_for(msg.dest()).put(msg)
    }

    /// Every channel in teardown order.
    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        [&self.main, &self.server, &self.ir].into_iter()
    }

    /// Close every channel. Returns how many closes this call performed.
    pub fn close_all(&self) -> usize {
        self.iter().filter(|c| c.close()).count()
    }

    /// Drain every channel. Returns the total number of discarded messages.
    pub fn join_all(&self) -> usize {
        self.iter().map(Channel::join).sum()
    }

    /// Look up a channel by its diagnostic name.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::NoRoute`] for an unknown name.
    pub fn by_name(&self, name: &str) -> ChannelResult<&Channel> {
        self.iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| ChannelError::NoRoute(name.to_owned()))
    }
}
