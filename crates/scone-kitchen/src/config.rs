use std::collections::BTreeMap;

use scone_ssh::SousConfig;

/// A head's full configuration (SPEC_FULL §3): every sous this run can
/// reach, where its dependency cache lives, and the worker pool size.
/// Spec §6 calls the underlying mapping "consumed, not defined by
/// core" — menu/TOML parsing stays out of scope; this is the Rust
/// shape a caller populates however it likes.
#[derive(Clone, Debug)]
pub struct HeadConfig {
    pub sous: BTreeMap<String, SousConfig>,
    pub cache_path: String,
    /// Fixed worker pool size (spec §4.6 "default 8").
    pub pool_size: usize,
}

impl HeadConfig {
    pub fn new(cache_path: impl Into<String>) -> Self {
        HeadConfig {
            sous: BTreeMap::new(),
            cache_path: cache_path.into(),
            pool_size: DEFAULT_POOL_SIZE,
        }
    }

    pub fn with_sous(mut self, name: impl Into<String>, config: SousConfig) -> Self {
        self.sous.insert(name.into(), config);
        self
    }
}

pub const DEFAULT_POOL_SIZE: usize = 8;
