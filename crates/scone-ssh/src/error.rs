use std::fmt;

/// Failures establishing or maintaining an SSH-launched sous connection
/// (spec §4.2).
#[derive(Debug)]
pub enum SshError {
    Spawn(std::io::Error),
    /// The child's stdin/stdout could not be captured as pipes.
    MissingStdio,
    /// The handshake's first frame on the control channel was not
    /// `{hello: "sous"}` (spec §4.2: "a head MUST NOT proceed ... if the
    /// sous's hello is missing or does not match").
    HandshakeMismatch(String),
    Core(scone_core::CoreError),
    Channel(scone_core::ChannelError),
    DebugTee(std::io::Error),
}

impl fmt::Display for SshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SshError::Spawn(e) => write!(f, "failed to spawn ssh child: {e}"),
            SshError::MissingStdio => write!(f, "ssh child did not expose piped stdin/stdout"),
            SshError::HandshakeMismatch(got) => {
                write!(f, "sous handshake mismatch, expected hello=sous, got {got}")
            }
            SshError::Core(e) => write!(f, "{e}"),
            SshError::Channel(e) => write!(f, "{e}"),
            SshError::DebugTee(e) => write!(f, "failed to open debug tee file: {e}"),
        }
    }
}

impl std::error::Error for SshError {}

impl From<scone_core::CoreError> for SshError {
    fn from(e: scone_core::CoreError) -> Self {
        SshError::Core(e)
    }
}

impl From<scone_core::ChannelError> for SshError {
    fn from(e: scone_core::ChannelError) -> Self {
        SshError::Channel(e)
    }
}
