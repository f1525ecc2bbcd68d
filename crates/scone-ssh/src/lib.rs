//! SSH transport adapter (spec §4.2): spawns a remote sous over `ssh`,
//! optionally wrapped in `sudo -u`, binds its stdio to a [`ChanPro`],
//! performs the head/sous hello handshake, and caches connections per
//! `(host, user)` so a Kitchen run opens each session once.

mod config;
mod connect;
mod error;
mod pool;
mod tee;

pub use config::SousConfig;
pub use connect::{open_ssh_sous, SousConnection};
pub use error::SshError;
pub use pool::SousPool;
