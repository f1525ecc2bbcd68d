use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use scone_wire::Value;
use tokio::sync::mpsc;

use crate::error::{ChannelError, TransportError};
use crate::inner::ChanProInner;

/// Bound on a channel's inbound queue. `send`/dispatch suspend once it
/// fills, matching spec §5 "Channel queues are bounded ... `send`
/// suspends when full."
pub(crate) const CHANNEL_QUEUE_CAPACITY: usize = 64;

/// An event delivered to a channel's inbound queue. Modeling "closed"
/// as just another queued event (rather than a separately-raced flag)
/// means a close that arrives after buffered payloads is observed only
/// once those payloads have been drained by `recv`, which is exactly
/// spec §4.1's "`EndOfChannel` iff the channel is closed and queue
/// empty."
pub(crate) enum ChannelEvent {
    Payload(Value),
    Closed(Option<String>),
}

/// A single multiplexed channel. Allocated via
/// [`crate::ChanPro::new_channel`] or
/// [`crate::ChanPro::open_command_channel`].
pub struct Channel {
    id: u32,
    desc: String,
    inbound: tokio::sync::Mutex<mpsc::Receiver<ChannelEvent>>,
    self_tx: mpsc::Sender<ChannelEvent>,
    chanpro: Arc<ChanProInner>,
    /// Set once this side has sent (or observed) a close for this
    /// channel. `close()` is idempotent; this guards the second call.
    closed_locally: AtomicBool,
}

impl Channel {
    pub(crate) fn new(
        id: u32,
        desc: String,
        chanpro: Arc<ChanProInner>,
    ) -> (Self, mpsc::Sender<ChannelEvent>) {
        let (tx, rx) = mpsc::channel(CHANNEL_QUEUE_CAPACITY);
        let channel = Channel {
            id,
            desc,
            inbound: tokio::sync::Mutex::new(rx),
            self_tx: tx.clone(),
            chanpro,
            closed_locally: AtomicBool::new(false),
        };
        (channel, tx)
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn description(&self) -> &str {
        &self.desc
    }

    /// Enqueue `payload` for transmission. May suspend if the
    /// underlying writer is under backpressure (spec §4.1 `send`).
    pub async fn send(&self, payload: Value) -> Result<(), ChannelError> {
        self.chanpro
            .send_data(self.id, payload)
            .await
            .map_err(ChannelError::Transport)
    }

    /// Dequeue one payload, or `Err(EndOfChannel)` once the channel is
    /// closed and its queue is empty (spec §4.1 `recv`).
    pub async fn recv(&self) -> Result<Value, ChannelError> {
        let mut inbound = self.inbound.lock().await;
        match inbound.recv().await {
            Some(ChannelEvent::Payload(v)) => Ok(v),
            Some(ChannelEvent::Closed(_)) | None => Err(ChannelError::EndOfChannel),
        }
    }

    /// Transmit a close frame. Idempotent; wakes any pending `recv`
    /// (spec §4.1 `close`).
    pub fn close(&self, reason: Option<String>) {
        if self
            .closed_locally
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        self.chanpro.send_close(self.id, reason.clone());
        // Self-signal so a concurrently-pending `recv` observes
        // end-of-channel even though the peer may never send its own
        // close frame back (e.g. we are the one tearing the channel
        // down locally).
        let _ = self.self_tx.try_send(ChannelEvent::Closed(reason));
        self.chanpro.deregister(self.id);
    }

    /// `recv` one payload, then expect exactly one subsequent close.
    /// Fails `ProtocolViolation` if another payload arrives instead
    /// (spec §4.1 `consume`).
    pub async fn consume(&self) -> Result<Value, ChannelError> {
        let mut inbound = self.inbound.lock().await;
        let payload = match inbound.recv().await {
            Some(ChannelEvent::Payload(v)) => v,
            Some(ChannelEvent::Closed(_)) | None => {
                return Err(ChannelError::ProtocolViolation(
                    "channel closed before any payload was received".into(),
                ));
            }
        };
        match inbound.recv().await {
            Some(ChannelEvent::Closed(_)) | None => Ok(payload),
            Some(ChannelEvent::Payload(_)) => Err(ChannelError::ProtocolViolation(
                "a second payload arrived where a close was expected".into(),
            )),
        }
    }

    /// Discard any payloads and wait for the channel to close (spec
    /// §4.1 `wait_close`). Unlike [`Self::consume`], a utensil that
    /// closes its channel without ever sending a payload is the
    /// success case here, not a protocol violation.
    pub async fn wait_close(&self) -> Result<(), ChannelError> {
        let mut inbound = self.inbound.lock().await;
        loop {
            match inbound.recv().await {
                Some(ChannelEvent::Payload(_)) => continue,
                Some(ChannelEvent::Closed(_)) | None => return Ok(()),
            }
        }
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.chanpro.deregister(self.id);
    }
}

pub(crate) fn transport_failure_event(e: &TransportError) -> ChannelEvent {
    ChannelEvent::Closed(Some(e.to_string()))
}
