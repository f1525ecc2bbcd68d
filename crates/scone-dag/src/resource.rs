use scone_wire::Value;
use serde::{Deserialize, Serialize};

/// Content-free coordination currency between recipes (spec §3). Two
/// resources compare equal iff every key component compares equal;
/// `extra` is canonicalized before comparison so insertion order never
/// matters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Resource {
    pub kind: String,
    pub id: String,
    /// `None` denotes a head-local resource.
    pub host: Option<String>,
    pub extra: Vec<(String, Value)>,
}

impl Resource {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Resource {
            kind: kind.into(),
            id: id.into(),
            host: None,
            extra: Vec::new(),
        }
    }

    pub fn on_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.push((key.into(), value));
        self
    }

    fn canonical_extra(&self) -> Vec<(String, Value)> {
        let mut sorted = self.extra.clone();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        sorted
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.id == other.id
            && self.host == other.host
            && self.canonical_extra() == other.canonical_extra()
    }
}

impl Eq for Resource {}

impl std::hash::Hash for Resource {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.id.hash(state);
        self.host.hash(state);
        for (k, v) in self.canonical_extra() {
            k.hash(state);
            format!("{v:?}").hash(state);
        }
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.host {
            Some(host) => write!(f, "{}:{}@{host}", self.kind, self.id),
            None => write!(f, "{}:{}", self.kind, self.id),
        }
    }
}

/// The `("os-user", user, sous)` resource every recipe needs by default
/// (spec §4.4).
pub fn os_user_resource(user: &str, sous: &str) -> Resource {
    Resource::new("os-user", user).on_host(sous)
}
