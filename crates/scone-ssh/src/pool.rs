use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;

use crate::config::SousConfig;
use crate::connect::{open_ssh_sous, SousConnection};
use crate::error::SshError;

type Key = (String, String);

/// Caches SSH sous connections per `(host, requested_user)` so a Kitchen
/// dispatching many recipes against the same sous only pays for one SSH
/// session (spec §4.2 / §5 "Connections ... are cached and reused").
pub struct SousPool {
    slots: Mutex<HashMap<Key, Arc<AsyncMutex<Option<Arc<SousConnection>>>>>>,
}

impl SousPool {
    pub fn new() -> Self {
        SousPool {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached connection for `(config.host, requested_user)`,
    /// opening one if none exists yet. Concurrent callers for the same
    /// key serialize on that key's slot only; different keys connect
    /// concurrently.
    pub async fn get_or_connect(
        &self,
        config: &SousConfig,
        requested_user: &str,
    ) -> Result<Arc<SousConnection>, SshError> {
        let key = (config.host.clone(), requested_user.to_string());
        let slot = {
            let mut slots = self.slots.lock();
            slots
                .entry(key)
                .or_insert_with(|| Arc::new(AsyncMutex::new(None)))
                .clone()
        };

        let mut guard = slot.lock().await;
        if let Some(conn) = guard.as_ref() {
            if !conn.chanpro.is_closed() {
                return Ok(conn.clone());
            }
        }

        let conn = Arc::new(open_ssh_sous(config, requested_user).await?);
        *guard = Some(conn.clone());
        Ok(conn)
    }
}

impl Default for SousPool {
    fn default() -> Self {
        Self::new()
    }
}
