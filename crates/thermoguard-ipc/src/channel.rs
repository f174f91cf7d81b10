//! Bounded, non-blocking message channels.
//!
//! A [`Channel`] is a fixed-capacity FIFO backed by a lock-free
//! `crossbeam` array queue. Neither [`Channel::put`] nor [`Channel::get`]
//! ever blocks: a full or closed channel rejects immediately and the caller
//! decides what a rejection means.
//!
//! # Overflow Behavior
//!
//! A rejected put hands the message back inside [`PutError`] and is logged at
//! error level. The channel keeps running; only the sender learns about the
//! loss.
//!
//! # Teardown
//!
//! [`Channel::close`] stops all further traffic and happens exactly once.
//! [`Channel::join`] drains whatever is still queued and reports how many
//! messages were discarded.

use crate::error::{ChannelError, ChannelResult, PutError, PutErrorKind};
use crate::message::{Member, Message};
use crossbeam::queue::ArrayQueue;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Default number of messages a channel holds.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 128;

/// Snapshot of a channel's traffic counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelStats {
    /// Messages enqueued.
    pub accepted: u64,
    /// Messages dequeued by a reader.
    pub delivered: u64,
    /// Puts rejected because the channel was full.
    pub rejected_full: u64,
    /// Puts rejected because the channel was closed.
    pub rejected_closed: u64,
    /// Messages dropped by `join`.
    pub discarded: u64,
}

#[derive(Debug)]
struct ChannelInner {
    name: String,
    owner: Member,
    queue: ArrayQueue<Message>,
    closed: AtomicBool,
    accepted: AtomicU64,
    delivered: AtomicU64,
    rejected_full: AtomicU64,
    rejected_closed: AtomicU64,
    discarded: AtomicU64,
}

/// Shared bounded FIFO of [`Message`]s.
///
/// Cloning yields another handle to the same queue.
#[derive(Debug, Clone)]
pub struct Channel {
    inner: Arc<ChannelInner>,
}

impl Channel {
    /// Create an open, empty channel.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::InvalidCapacity`] if `capacity` is zero.
    pub fn new(name: impl Into<String>, owner: Member, capacity: usize) -> ChannelResult<Self> {
        let name = name.into();
        if capacity == 0 {
            return Err(ChannelError::InvalidCapacity(name));
        }
        Ok(Self {
            inner: Arc::new(ChannelInner {
                name,
                owner,
                queue: ArrayQueue::new(capacity),
                closed: AtomicBool::new(false),
                accepted: AtomicU64::new(0),
                delivered: AtomicU64::new(0),
                rejected_full: AtomicU64::new(0),
                rejected_closed: AtomicU64::new(0),
                discarded: AtomicU64::new(0),
            }),
        })
    }

    /// Create the channel owned by `owner` with the default capacity.
    ///
    /// # Errors
    ///
    /// Never fails in practice; see [`Channel::new`].
    pub fn for_member(owner: Member) -> ChannelResult<Self> {
        Self::new(owner.as_str(), owner, DEFAULT_CHANNEL_CAPACITY)
    }

    /// Diagnostic name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Owning member.
    #[must_use]
    pub fn owner(&self) -> Member {
        self.inner.owner
    }

    /// Enqueue a message without blocking.
    ///
    /// # Errors
    ///
    /// Returns the message inside a [`PutError`] if the channel is full or
    /// closed.
    pub fn put(&self, msg: Message) -> Result<(), PutError> {
        let inner = &self.inner;
        if inner.closed.load(Ordering::Acquire) {
            inner.rejected_closed.fetch_add(1, Ordering::Relaxed);
            tracing::error!(
                channel = %inner.name,
                event = %msg.event(),
                "put rejected: channel closed"
            );
            return Err(PutError::new(&inner.name, PutErrorKind::Closed, msg));
        }

        match inner.queue.push(msg) {
            Ok(()) => {
                inner.accepted.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(msg) => {
                inner.rejected_full.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    channel = %inner.name,
                    capacity = inner.queue.capacity(),
                    event = %msg.event(),
                    "put rejected: channel full"
                );
                Err(PutError::new(&inner.name, PutErrorKind::Full, msg))
            }
        }
    }

    /// Dequeue the oldest message without blocking.
    ///
    /// Returns `Ok(None)` when the channel is empty.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Closed`] once the channel was closed.
    pub fn get(&self) -> ChannelResult<Option<Message>> {
        let inner = &self.inner;
        if inner.closed.load(Ordering::Acquire) {
            return Err(ChannelError::closed(inner.name.as_str()));
        }
        let msg = inner.queue.pop();
        if msg.is_some() {
            inner.delivered.fetch_add(1, Ordering::Relaxed);
        }
        Ok(msg)
    }

    /// Close the channel to all further traffic.
    ///
    /// Returns `true` only for the call that performed the close.
    pub fn close(&self) -> bool {
        let performed = self
            .inner
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if performed {
            tracing::debug!(channel = %self.inner.name, pending = self.inner.queue.len(), "channel closed");
        }
        performed
    }

    /// Drain the channel after close and return how many messages were discarded.
    ///
    /// Closes the channel first if nobody did.
    pub fn join(&self) -> usize {
        self.close();
        let mut discarded: usize = 0;
        while self.inner.queue.pop().is_some() {
            discarded = discarded.saturating_add(1);
        }
        if discarded > 0 {
            self.inner
                .discarded
                .fetch_add(u64::try_from(discarded).unwrap_or(u64::MAX), Ordering::Relaxed);
            tracing::warn!(channel = %self.inner.name, discarded, "discarded queued messages at teardown");
        }
        discarded
    }

    /// Messages currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.queue.len()
    }

    /// Whether no message is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.queue.is_empty()
    }

    /// Maximum number of queued messages.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.queue.capacity()
    }

    /// Whether the channel was closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Snapshot of the traffic counters.
    #[must_use]
    pub fn stats(&self) -> ChannelStats {
        let inner = &self.inner;
        ChannelStats {
            accepted: inner.accepted.load(Ordering::Relaxed),
            delivered: inner.delivered.load(Ordering::Relaxed),
            rejected_full: inner.rejected_full.load(Ordering::Relaxed),
            rejected_closed: inner.rejected_closed.load(Ordering::Relaxed),
            discarded: inner.discarded.load(Ordering::Relaxed),
        }
    }

    /// Read-only view for the owning worker.
    #[must_use]
    pub fn reader(&self) -> ChannelReader {
        ChannelReader {
            channel: self.clone(),
        }
    }

    /// Write-only view for a sender.
    #[must_use]
    pub fn writer(&self) -> ChannelWriter {
        ChannelWriter {
            channel: self.clone(),
        }
    }

    /// Whether both handles refer to the same queue.
    #[must_use]
    pub fn same_as(&self, other: &Channel) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Receiving end of a [`Channel`].
#[derive(Debug, Clone)]
pub struct ChannelReader {
    channel: Channel,
}

impl ChannelReader {
    /// See [`Channel::get`].
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Closed`] once the channel was closed.
    pub fn get(&self) -> ChannelResult<Option<Message>> {
        self.channel.get()
    }

    /// Diagnostic name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.channel.name()
    }

    /// Whether the channel was closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.channel.is_closed()
    }

    /// Snapshot of the traffic counters.
    #[must_use]
    pub fn stats(&self) -> ChannelStats {
        self.channel.stats()
    }
}

/// Sending end of a [`Channel`].
#[derive(Debug, Clone)]
pub struct ChannelWriter {
    channel: Channel,
}

impl ChannelWriter {
    /// See [`Channel::put`].
    ///
    /// # Errors
    ///
    /// Returns the message inside a [`PutError`] if the channel is full or
    /// closed.
    pub fn put(&self, msg: Message) -> Result<(), PutError> {
        self.channel.put(msg)
    }

    /// Diagnostic name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.channel.name()
    }

    /// Owning member of the target channel.
    #[must_use]
    pub fn owner(&self) -> Member {
        self.channel.owner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::SelfTestEvent;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn msg(tag: SelfTestEvent) -> Message {
        Message::self_test(Member::Main, Member::Main, tag)
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = Channel::new("zero", Member::Main, 0);
        assert!(matches!(result, Err(ChannelError::InvalidCapacity(_))));
    }

    #[test]
    fn test_close_happens_once() -> TestResult {
        let channel = Channel::for_member(Member::Server)?;
        assert!(channel.close());
        assert!(!channel.close());
        assert!(channel.is_closed());
        Ok(())
    }

    #[test]
    fn test_put_after_close_returns_message() -> TestResult {
        let channel = Channel::for_member(Member::Ir)?;
        channel.close();

        let err = channel
            .put(msg(SelfTestEvent::ReqFromMainToIr))
            .err()
            .ok_or("put on closed channel must fail")?;
        assert!(err.is_closed());
        assert_eq!(err.channel(), "ir");
        assert_eq!(
            err.into_message().event().as_self_test(),
            Some(SelfTestEvent::ReqFromMainToIr)
        );
        assert_eq!(channel.stats().rejected_closed, 1);
        Ok(())
    }

    #[test]
    fn test_get_after_close_fails() -> TestResult {
        let channel = Channel::for_member(Member::Main)?;
        channel.put(msg(SelfTestEvent::ReqFromMainToMain))?;
        channel.close();

        let err = channel.get().err().ok_or("get on closed channel must fail")?;
        assert!(err.is_closed());
        Ok(())
    }

    #[test]
    fn test_join_discards_pending() -> TestResult {
        let channel = Channel::new("main", Member::Main, 4)?;
        channel.put(msg(SelfTestEvent::ReqFromMainToMain))?;
        channel.put(msg(SelfTestEvent::AckFromIrToMain))?;

        assert_eq!(channel.join(), 2);
        assert!(channel.is_closed());
        assert!(channel.is_empty());
        assert_eq!(channel.stats().discarded, 2);
        assert_eq!(channel.join(), 0);
        Ok(())
    }

    #[test]
    fn test_views_share_queue() -> TestResult {
        let channel = Channel::new("server", Member::Server, 2)?;
        let writer = channel.writer();
        let reader = channel.reader();

        writer.put(msg(SelfTestEvent::ReqFromMainToServer))?;
        assert_eq!(channel.len(), 1);
        assert!(reader.get()?.is_some());
        assert!(reader.get()?.is_none());
        assert_eq!(writer.owner(), Member::Server);
        assert_eq!(reader.stats().delivered, 1);
        Ok(())
    }
}
