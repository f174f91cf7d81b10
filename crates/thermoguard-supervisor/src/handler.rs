//! Business-logic boundary for non-self-test traffic.

use std::fmt;
use thermoguard_ipc::{Member, Message, PutError, SystemChannels};

/// Sending side available to a [`MessageHandler`].
#[derive(Debug, Clone)]
pub struct Outbox {
    source: Member,
    channels: SystemChannels,
}

impl Outbox {
    /// Create an outbox sending on behalf of `source`.
    #[must_use]
    pub fn new(source: Member, channels: SystemChannels) -> Self {
        Self { source, channels }
    }

    /// Member the outbox sends as.
    #[must_use]
    pub fn source(&self) -> Member {
        self.source
    }

    /// Route `msg` to the channel of its destination.
    ///
    /// # Errors
    ///
    /// Returns the message inside a [`PutError`] if the target channel is
    /// full or closed.
    pub fn send(&self, msg: Message) -> Result<(), PutError> {
        self.channels.deliver(msg)
    }
}

/// Handles messages that are not self-test traffic.
///
/// Errors are logged by the caller and never stop the loop that delivered
/// the message.
pub trait MessageHandler: Send {
    /// Handle one message.
    ///
    /// # Errors
    ///
    /// Returns any error raised by the business logic.
    fn handle(&mut self, msg: &Message, outbox: &Outbox) -> anyhow::Result<()>;
}

impl<F> MessageHandler for F
where
    F: FnMut(&Message, &Outbox) -> anyhow::Result<()> + Send,
{
    fn handle(&mut self, msg: &Message, outbox: &Outbox) -> anyhow::Result<()> {
        self(msg, outbox)
    }
}

/// Handler that only logs what it receives.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHandler;

impl MessageHandler for LoggingHandler {
    fn handle(&mut self, msg: &Message, outbox: &Outbox) -> anyhow::Result<()> {
        tracing::debug!(
            receiver = %outbox.source(),
            source = %msg.source(),
            event = %msg.event(),
            id = %msg.header().id,
            "message received"
        );
        Ok(())
    }
}

/// Boxed handler with a readable `Debug`.
pub(crate) struct BoxedHandler(pub(crate) Box<dyn MessageHandler>);

impl fmt::Debug for BoxedHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MessageHandler")
    }
}

impl BoxedHandler {
    /// Run the handler and log its error, if any.
    pub(crate) fn dispatch(&mut self, msg: &Message, outbox: &Outbox) {
        if let Err(e) = self.0.handle(msg, outbox) {
            tracing::error!(
                receiver = %outbox.source(),
                event = %msg.event(),
                error = %format!("{e:#}"),
                "message handler failed"
            );
        }
    }
}
