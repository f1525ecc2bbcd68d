//! ChanPro: the length-prefixed, multiplexed message transport that
//! carries head/sous traffic over a single byte stream (an SSH child's
//! stdin/stdout), per spec §4.1.
//!
//! A [`ChanPro`] owns the read/write loops for one connection. Callers
//! get at individual multiplexed streams through [`Channel`] handles
//! allocated with [`ChanPro::new_channel`], [`ChanPro::allocate_channel`]
//! or [`ChanPro::open_command_channel`].

mod channel;
mod error;
mod inner;

pub use channel::Channel;
pub use error::{ChannelError, CoreError, TransportError};
pub use scone_wire::{Value, CONTROL_CHANNEL};

use std::sync::Arc;

use inner::ChanProInner;
use scone_wire::Value as WireValue;
use tokio::io::{AsyncRead, AsyncWrite};

/// A live multiplexed connection. Cheap to clone-share: internally it's
/// just an `Arc` around the dispatcher state.
#[derive(Clone)]
pub struct ChanPro {
    inner: Arc<ChanProInner>,
}

impl ChanPro {
    /// Start the read/write loops over `reader`/`writer` and hand back a
    /// handle to the running connection. Spec §5: "the ChanPro listener
    /// is a single task per connection" — one reader task and one writer
    /// task are spawned onto the current runtime.
    pub fn spawn<R, W>(reader: R, writer: W) -> ChanPro
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        ChanPro {
            inner: inner::spawn_pair(reader, writer),
        }
    }

    /// True once the transport has failed or been closed; every
    /// outstanding [`Channel`] has received (or will receive) an
    /// `EndOfChannel`/transport-failure event.
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Register a channel at a caller-chosen id. Fails with
    /// [`CoreError::AlreadyInUse`] if that id is already registered
    /// (spec §4.1 `new_channel`).
    pub fn new_channel(&self, id: u32, desc: impl Into<String>) -> Result<Channel, CoreError> {
        let (channel, tx) = Channel::new(id, desc.into(), self.inner.clone());
        if !self.inner.register(id, tx) {
            return Err(CoreError::AlreadyInUse(id));
        }
        Ok(channel)
    }

    /// Register a channel at the reserved control channel id (0). Used
    /// by a sous process to listen for incoming `{nc, cmd, pay}`
    /// requests (spec §4.1).
    pub fn open_control(&self) -> Result<Channel, CoreError> {
        self.new_channel(CONTROL_CHANNEL, "control")
    }

    /// Allocate a fresh channel id and register it. Ids are handed out
    /// monotonically starting at 1, so this can never collide with a
    /// concurrently-running `allocate_channel`/`new_channel` call.
    pub fn allocate_channel(&self, desc: impl Into<String>) -> Channel {
        let desc = desc.into();
        loop {
            let id = self.inner.allocate_id();
            if let Ok(channel) = self.new_channel(id, desc.clone()) {
                return channel;
            }
        }
    }

    /// Open a new command channel: allocate a channel id, send
    /// `{nc: <id>, cmd: <cmd>, pay: <payload>}` on the control channel
    /// (spec §4.1: "To start a command channel the head sends on
    /// channel 0"), and return the freshly-registered channel so the
    /// caller can exchange further traffic with the invoked utensil.
    pub async fn open_command_channel(
        &self,
        cmd: impl Into<String>,
        payload: WireValue,
    ) -> Result<Channel, CoreError> {
        let cmd = cmd.into();
        let channel = self.allocate_channel(format!("cmd:{cmd}"));
        let request = WireValue::map([
            ("nc", WireValue::Uint(channel.id() as u64)),
            ("cmd", WireValue::Str(cmd)),
            ("pay", payload),
        ]);
        self.inner
            .send_data(CONTROL_CHANNEL, request)
            .await
            .map_err(CoreError::Transport)?;
        Ok(channel)
    }

    /// Route frames for an unregistered channel to `id` instead of
    /// dropping them, wrapped as `{lost: <frame>}` (spec §4.1).
    pub fn set_default_route(&self, id: Option<u32>) {
        self.inner.set_default_route(id);
    }

    /// Tear the whole connection down; every open [`Channel`] observes
    /// `EndOfChannel`.
    pub fn close(&self) {
        self.inner.fail_all(TransportError::Closed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scone_wire::Value;

    async fn pair() -> (ChanPro, ChanPro) {
        let (head_r, sous_w) = tokio::io::duplex(64 * 1024);
        let (sous_r, head_w) = tokio::io::duplex(64 * 1024);
        let head = ChanPro::spawn(head_r, head_w);
        let sous = ChanPro::spawn(sous_r, sous_w);
        (head, sous)
    }

    #[tokio::test]
    async fn round_trip_on_matching_channel_ids() {
        let (head, sous) = pair().await;
        let head_chan = head.new_channel(5, "test").unwrap();
        let sous_chan = sous.new_channel(5, "test").unwrap();

        head_chan.send(Value::from("ping")).await.unwrap();
        let got = sous_chan.recv().await.unwrap();
        assert_eq!(got.as_str(), Some("ping"));

        sous_chan.send(Value::from("pong")).await.unwrap();
        let got = head_chan.recv().await.unwrap();
        assert_eq!(got.as_str(), Some("pong"));
    }

    #[tokio::test]
    async fn close_delivers_end_of_channel_after_queued_payloads() {
        let (head, sous) = pair().await;
        let head_chan = head.new_channel(1, "test").unwrap();
        let sous_chan = sous.new_channel(1, "test").unwrap();

        head_chan.send(Value::from(1i64)).await.unwrap();
        head_chan.close(Some("done".into()));

        let first = sous_chan.recv().await.unwrap();
        assert_eq!(first, Value::Int(1));
        let second = sous_chan.recv().await;
        assert!(matches!(second, Err(ChannelError::EndOfChannel)));
    }

    #[tokio::test]
    async fn consume_rejects_a_second_payload() {
        let (head, sous) = pair().await;
        let head_chan = head.new_channel(2, "test").unwrap();
        let sous_chan = sous.new_channel(2, "test").unwrap();

        head_chan.send(Value::from(1i64)).await.unwrap();
        head_chan.send(Value::from(2i64)).await.unwrap();

        let err = sous_chan.consume().await.unwrap_err();
        assert!(matches!(err, ChannelError::ProtocolViolation(_)));
    }

    #[tokio::test]
    async fn wait_close_succeeds_on_a_channel_that_closes_with_no_payload() {
        let (head, sous) = pair().await;
        let head_chan = head.new_channel(3, "test").unwrap();
        let sous_chan = sous.new_channel(3, "test").unwrap();

        head_chan.close(None);
        sous_chan.wait_close().await.unwrap();
    }

    #[tokio::test]
    async fn wait_close_discards_payloads_before_the_close() {
        let (head, sous) = pair().await;
        let head_chan = head.new_channel(4, "test").unwrap();
        let sous_chan = sous.new_channel(4, "test").unwrap();

        head_chan.send(Value::from("progress")).await.unwrap();
        head_chan.close(None);
        sous_chan.wait_close().await.unwrap();
    }

    #[tokio::test]
    async fn frames_for_unknown_channel_are_wrapped_to_default_route() {
        let (head, sous) = pair().await;
        // sous registers a default-route channel before the head sends
        // on a channel id it never opened.
        let lost_chan = sous.new_channel(99, "lost-and-found").unwrap();
        sous.set_default_route(Some(99));

        let head_chan = head.new_channel(7, "orphan").unwrap();
        head_chan.send(Value::from("hello")).await.unwrap();

        let wrapped = lost_chan.recv().await.unwrap();
        let inner = wrapped.get("lost").expect("lost envelope");
        let payload = inner.get("p").expect("original payload");
        assert_eq!(payload.as_str(), Some("hello"));
    }

    #[tokio::test]
    async fn concurrent_channels_preserve_independent_ordering() {
        let (head, sous) = pair().await;
        let head_a = head.new_channel(1, "a").unwrap();
        let head_b = head.new_channel(2, "b").unwrap();
        let sous_a = sous.new_channel(1, "a").unwrap();
        let sous_b = sous.new_channel(2, "b").unwrap();

        for i in 0..5i64 {
            head_a.send(Value::Int(i)).await.unwrap();
            head_b.send(Value::Int(100 + i)).await.unwrap();
        }

        for i in 0..5i64 {
            assert_eq!(sous_a.recv().await.unwrap(), Value::Int(i));
            assert_eq!(sous_b.recv().await.unwrap(), Value::Int(100 + i));
        }
    }

    #[tokio::test]
    async fn open_command_channel_delivers_nc_cmd_pay_on_control_channel() {
        let (head, sous) = pair().await;
        let sous_control = sous.open_control().unwrap();

        let cmd_chan = head
            .open_command_channel("install_package", Value::map([("name", Value::from("curl"))]))
            .await
            .unwrap();

        let request = sous_control.recv().await.unwrap();
        assert_eq!(request.get("cmd").and_then(Value::as_str), Some("install_package"));
        let nc = request.get("nc").expect("nc field");
        assert!(matches!(nc, Value::Uint(_)));

        // The sous side registers the announced channel id and the two
        // peers can now talk over it.
        let Value::Uint(new_id) = nc else { unreachable!() };
        let sous_cmd_chan = sous.new_channel(*new_id as u32, "install_package").unwrap();
        cmd_chan.send(Value::from("go")).await.unwrap();
        assert_eq!(sous_cmd_chan.recv().await.unwrap().as_str(), Some("go"));
    }
}
