use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use scone_wire::{decode_frame_body, encode_length_prefixed, Frame, FrameBody, Value};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::channel::{transport_failure_event, ChannelEvent};
use crate::error::TransportError;

const OUTBOUND_QUEUE_CAPACITY: usize = 256;

struct ChannelEntry {
    tx: mpsc::Sender<ChannelEvent>,
}

pub(crate) struct ChanProInner {
    channels: Mutex<HashMap<u32, ChannelEntry>>,
    default_route: Mutex<Option<u32>>,
    outbound_tx: mpsc::Sender<Frame>,
    next_id: AtomicU32,
    closed: AtomicBool,
}

impl ChanProInner {
    fn new(outbound_tx: mpsc::Sender<Frame>) -> Self {
        ChanProInner {
            channels: Mutex::new(HashMap::new()),
            default_route: Mutex::new(None),
            outbound_tx,
            // 0 is the control channel; command channels start at 1.
            next_id: AtomicU32::new(1),
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn allocate_id(&self) -> u32 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn register(&self, id: u32, tx: mpsc::Sender<ChannelEvent>) -> bool {
        let mut channels = self.channels.lock();
        if channels.contains_key(&id) {
            return false;
        }
        channels.insert(id, ChannelEntry { tx });
        true
    }

    pub(crate) fn deregister(&self, id: u32) {
        self.channels.lock().remove(&id);
    }

    pub(crate) fn set_default_route(&self, id: Option<u32>) {
        *self.default_route.lock() = id;
    }

    pub(crate) async fn send_data(&self, channel: u32, payload: Value) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        self.outbound_tx
            .send(Frame::data(channel, payload))
            .await
            .map_err(|_| TransportError::Closed)
    }

    pub(crate) fn send_close(&self, channel: u32, reason: Option<String>) {
        // Best-effort: if the writer already shut down there is nothing
        // left to notify.
        let _ = self.outbound_tx.try_send(Frame::close(channel, reason));
    }

    /// Mark the whole transport dead and fail every open channel, per
    /// spec §7: "TransportError ... fatal; all in-flight channels
    /// receive EndOfChannel."
    pub(crate) fn fail_all(&self, err: TransportError) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let channels = std::mem::take(&mut *self.channels.lock());
        for (_, entry) in channels {
            let _ = entry.tx.try_send(transport_failure_event(&err));
        }
    }

    /// Deliver one incoming frame to its channel's inbound queue. Called
    /// sequentially from the single reader task (spec §5: "the ChanPro
    /// listener is a single task per connection"), so awaiting here
    /// (rather than spawning a task per frame) is what preserves
    /// per-channel send ordering under backpressure.
    async fn route_incoming(&self, frame: Frame) {
        let target = {
            let channels = self.channels.lock();
            channels.get(&frame.channel).map(|e| e.tx.clone())
        };
        if let Some(tx) = target {
            let event = match frame.body {
                FrameBody::Data(v) => ChannelEvent::Payload(v),
                FrameBody::Close { reason } => {
                    self.deregister(frame.channel);
                    ChannelEvent::Closed(reason)
                }
            };
            let _ = tx.send(event).await;
            return;
        }

        // Spec §4.1: route to the default-route channel wrapped as
        // `{lost: <original>}`, or log and drop if none is configured.
        let default_route = *self.default_route.lock();
        match default_route {
            Some(route_id) => {
                let wrapped = Value::map([("lost", frame_to_value(&frame))]);
                let target = {
                    let channels = self.channels.lock();
                    channels.get(&route_id).map(|e| e.tx.clone())
                };
                if let Some(tx) = target {
                    let _ = tx.send(ChannelEvent::Payload(wrapped)).await;
                } else {
                    tracing::warn!(channel = frame.channel, "default route channel not registered, dropping frame");
                }
            }
            None => {
                tracing::warn!(channel = frame.channel, "frame for unknown channel dropped, no default route");
            }
        }
    }
}

fn frame_to_value(frame: &Frame) -> Value {
    match &frame.body {
        FrameBody::Data(v) => Value::map([
            ("c", Value::Uint(frame.channel as u64)),
            ("p", v.clone()),
        ]),
        FrameBody::Close { reason } => Value::map([
            ("c", Value::Uint(frame.channel as u64)),
            ("close", Value::Bool(true)),
            ("reason", reason.clone().map(Value::Str).unwrap_or(Value::Null)),
        ]),
    }
}

pub(crate) fn spawn_pair<R, W>(reader: R, writer: W) -> Arc<ChanProInner>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
    let inner = Arc::new(ChanProInner::new(outbound_tx));

    tokio::spawn(write_loop(writer, outbound_rx, inner.clone()));
    tokio::spawn(read_loop(reader, inner.clone()));

    inner
}

async fn write_loop(mut writer: impl AsyncWrite + Unpin, mut rx: mpsc::Receiver<Frame>, inner: Arc<ChanProInner>) {
    while let Some(frame) = rx.recv().await {
        let bytes = match encode_length_prefixed(&frame) {
            Ok(b) => b,
            Err(e) => {
                tracing::error!(error = %e, "failed to encode outgoing frame");
                continue;
            }
        };
        if let Err(e) = writer.write_all(&bytes).await {
            inner.fail_all(TransportError::Io(e));
            return;
        }
        if let Err(e) = writer.flush().await {
            inner.fail_all(TransportError::Io(e));
            return;
        }
    }
}

async fn read_loop(mut reader: impl AsyncRead + Unpin, inner: Arc<ChanProInner>) {
    loop {
        let mut len_buf = [0u8; 4];
        if let Err(e) = reader.read_exact(&mut len_buf).await {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                inner.fail_all(TransportError::Closed);
            } else {
                inner.fail_all(TransportError::Io(e));
            }
            return;
        }
        let len = u32::from_be_bytes(len_buf) as usize;
        let mut body = vec![0u8; len];
        if let Err(e) = reader.read_exact(&mut body).await {
            inner.fail_all(TransportError::Io(e));
            return;
        }

        match decode_frame_body(&body) {
            Ok(Some(frame)) => inner.route_incoming(frame).await,
            Ok(None) => {
                tracing::warn!("dropping frame missing channel id (c)");
            }
            Err(e) => {
                tracing::error!(error = %e, "malformed frame, terminating transport");
                inner.fail_all(TransportError::Frame(e));
                return;
            }
        }

        if inner.is_closed() {
            return;
        }
    }
}
