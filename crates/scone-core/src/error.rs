use std::fmt;

/// Transport-level failure: framing broke, or the underlying stream
/// closed unexpectedly. Fatal — spec §7: "all in-flight channels
/// receive EndOfChannel; scheduler shuts down."
#[derive(Debug)]
pub enum TransportError {
    Io(std::io::Error),
    Frame(scone_wire::FrameCodecError),
    /// The transport was closed locally or the peer hung up cleanly.
    Closed,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Io(e) => write!(f, "transport io error: {e}"),
            TransportError::Frame(e) => write!(f, "transport framing error: {e}"),
            TransportError::Closed => write!(f, "transport closed"),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        TransportError::Io(e)
    }
}

impl From<scone_wire::FrameCodecError> for TransportError {
    fn from(e: scone_wire::FrameCodecError) -> Self {
        TransportError::Frame(e)
    }
}

/// Errors raised by operations on a [`crate::Channel`].
#[derive(Debug)]
pub enum ChannelError {
    /// The channel is closed and its queue is empty (spec §4.1 `recv`).
    EndOfChannel,
    /// `consume()` observed a payload where a close was expected, or
    /// vice versa (spec §4.1 `consume`).
    ProtocolViolation(String),
    /// The whole transport died while this channel was waiting.
    Transport(TransportError),
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::EndOfChannel => write!(f, "end of channel"),
            ChannelError::ProtocolViolation(msg) => write!(f, "protocol violation: {msg}"),
            ChannelError::Transport(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ChannelError {}

/// Errors raised allocating or registering a channel.
#[derive(Debug)]
pub enum CoreError {
    /// `new_channel` was called with an id that is already registered
    /// (spec §4.1 `new_channel`).
    AlreadyInUse(u32),
    Transport(TransportError),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::AlreadyInUse(id) => write!(f, "channel {id} is already in use"),
            CoreError::Transport(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CoreError {}

impl From<TransportError> for CoreError {
    fn from(e: TransportError) -> Self {
        CoreError::Transport(e)
    }
}
