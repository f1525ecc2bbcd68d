use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::Stdio;

use scone_core::{ChanPro, Channel, Value};
use tokio::io::AsyncReadExt;
use tokio::process::{ChildStderr, Command};

use crate::config::SousConfig;
use crate::error::SshError;
use crate::tee::{TeeReader, TeeWriter};

/// A live connection to one sous, plus the control channel its handshake
/// was performed on (spec §4.2).
pub struct SousConnection {
    pub chanpro: ChanPro,
    control: Channel,
}

impl SousConnection {
    /// The channel 0 control channel, used to open further command
    /// channels (spec §4.1 "the head sends on channel 0").
    pub fn control(&self) -> &Channel {
        &self.control
    }
}

/// Spawn `ssh <host> <command>` (wrapped in `sudo -u` if `requested_user`
/// differs from the login user), bind ChanPro to its stdio, and perform
/// the head/sous hello handshake.
pub async fn open_ssh_sous(config: &SousConfig, requested_user: &str) -> Result<SousConnection, SshError> {
    let effective_command = if requested_user != config.ssh_user {
        format!("sudo -u {} {}", requested_user, config.souscmd)
    } else {
        config.souscmd.clone()
    };

    let mut cmd = Command::new("ssh");
    if let Some(identity) = &config.identity_file {
        cmd.arg("-i").arg(identity);
    }
    cmd.arg(format!("{}@{}", config.ssh_user, config.host));
    cmd.arg(effective_command);
    cmd.stdin(Stdio::piped());
    cmd.stdout(Stdio::piped());
    if config.debug_tee_dir.is_some() {
        cmd.stderr(Stdio::piped());
    } else {
        cmd.stderr(Stdio::inherit());
    }
    cmd.kill_on_drop(true);

    tracing::debug!(host = %config.host, user = requested_user, "spawning ssh sous");
    let mut child = cmd.spawn().map_err(SshError::Spawn)?;
    let stdout = child.stdout.take().ok_or(SshError::MissingStdio)?;
    let stdin = child.stdin.take().ok_or(SshError::MissingStdio)?;
    let stderr = child.stderr.take();
    // The child is detached from `cmd` once spawned; `kill_on_drop` keeps
    // it tied to the connection's lifetime via the ChanPro tasks holding
    // the pipes open, but we still need to keep `child` itself alive.
    tokio::spawn(async move {
        let _ = child.wait().await;
    });

    let chanpro = if let Some(dir) = &config.debug_tee_dir {
        let (stdin_tee, stdout_tee, stderr_tee) = open_tee_files(dir, &config.host, requested_user)?;
        let stderr = stderr.ok_or(SshError::MissingStdio)?;
        tokio::spawn(drain_stderr_tee(stderr, stderr_tee));
        ChanPro::spawn(TeeReader::new(stdout, stdout_tee), TeeWriter::new(stdin, stdin_tee))
    } else {
        ChanPro::spawn(stdout, stdin)
    };

    let control = chanpro.open_control()?;
    control.send(Value::map([("hello", Value::from("head"))])).await?;

    tracing::debug!(host = %config.host, user = requested_user, "awaiting sous hello");
    let hello = control.recv().await?;
    let hello_kind = hello.get("hello").and_then(Value::as_str);
    if hello_kind != Some("sous") {
        return Err(SshError::HandshakeMismatch(format!("{hello:?}")));
    }

    Ok(SousConnection { chanpro, control })
}

fn open_tee_files(
    dir: &str,
    host: &str,
    user: &str,
) -> Result<(std::fs::File, std::fs::File, std::fs::File), SshError> {
    let base = PathBuf::from(dir);
    let stdin_path = base.join(format!("{host}.{user}.stdin"));
    let stdout_path = base.join(format!("{host}.{user}.stdout"));
    let stderr_path = base.join(format!("{host}.{user}.stderr"));
    let open = |path: PathBuf| -> Result<std::fs::File, SshError> {
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(SshError::DebugTee)
    };
    Ok((open(stdin_path)?, open(stdout_path)?, open(stderr_path)?))
}

/// Drain a child's stderr pipe through a [`TeeReader`] into `sink`,
/// also forwarding it to our own stderr so it stays visible the way
/// `Stdio::inherit()` would in the non-tee path.
async fn drain_stderr_tee(stderr: ChildStderr, sink: std::fs::File) {
    let mut tee = TeeReader::new(stderr, sink);
    let mut buf = [0u8; 4096];
    loop {
        match tee.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => {
                use std::io::Write as _;
                let _ = std::io::stderr().write_all(&buf[..n]);
            }
        }
    }
}
