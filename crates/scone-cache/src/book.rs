use std::collections::BTreeMap;

use scone_dag::Resource;
use scone_wire::Value;
use serde::{Deserialize, Serialize};

/// Per-recipe fingerprint persisted between runs (spec §3). `provided`
/// and `watching` map a resource to the monotonic run timestamp at
/// which it was last known to change; `cache_data` holds dynamic
/// fingerprints (content hashes, variable snapshots) a recipe wants
/// compared on its next run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencyBook {
    pub provided: Vec<(Resource, i64)>,
    pub watching: Vec<(Resource, i64)>,
    pub last_changed: i64,
    pub cache_data: BTreeMap<String, Value>,
    pub ignored: bool,
}

impl DependencyBook {
    pub fn new() -> Self {
        DependencyBook::default()
    }

    pub fn watched_time(&self, res: &Resource) -> Option<i64> {
        self.watching.iter().find(|(r, _)| r == res).map(|(_, t)| *t)
    }
}
