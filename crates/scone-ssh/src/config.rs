/// Per-host connection settings (spec §4.2: "Spawn remote sous, optional
/// `sudo -u`, bind ChanPro").
#[derive(Clone, Debug)]
pub struct SousConfig {
    pub host: String,
    /// User the SSH login itself authenticates as.
    pub ssh_user: String,
    /// Shell command that starts the sous RPC server on the remote end.
    pub souscmd: String,
    pub identity_file: Option<String>,
    /// When set, stdin/stdout/stderr of the sous child are teed into
    /// `<dir>/<host>.<user>.{stdin,stdout,stderr}`.
    pub debug_tee_dir: Option<String>,
}
