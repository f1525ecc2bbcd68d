use scone_wire::Value;

use crate::tracker::DependencyTracker;
use crate::variables::Variables;

/// What accessing a dotted path yields: another level to descend into,
/// or the leaf value (spec §4.7 "field access returns either a
/// sub-proxy ... or the scalar value").
pub enum VarAccess<'a> {
    Proxy(VarProxy<'a>),
    Value(Value),
}

/// The only variable surface recipes and templates use, so every read
/// is tracked automatically against the owning recipe's
/// [`DependencyTracker`] (spec §4.7).
pub struct VarProxy<'a> {
    prefix: Option<String>,
    vars: &'a Variables,
    tracker: &'a DependencyTracker,
}

impl<'a> VarProxy<'a> {
    pub fn root(vars: &'a Variables, tracker: &'a DependencyTracker) -> Self {
        VarProxy { prefix: None, vars, tracker }
    }

    fn child_path(&self, name: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}.{name}"),
            None => name.to_string(),
        }
    }

    /// Access `name` under this proxy's current path: a further
    /// sub-proxy if the value is a mapping, otherwise the recorded
    /// scalar/list.
    pub fn get(&self, name: &str) -> Option<VarAccess<'a>> {
        let path = self.child_path(name);
        let value = self.vars.get_dotted(&path)?;
        if matches!(value, Value::Map(_)) {
            Some(VarAccess::Proxy(VarProxy {
                prefix: Some(path),
                vars: self.vars,
                tracker: self.tracker,
            }))
        } else {
            self.tracker.register_variable(&path, &value);
            Some(VarAccess::Value(value))
        }
    }

    /// The raw value at this proxy's current path, also tracked.
    pub fn raw(&self) -> Value {
        let path = self.prefix.clone().unwrap_or_default();
        let value = self.vars.get_dotted(&path).unwrap_or(Value::Null);
        self.tracker.register_variable(&path, &value);
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scone_dag::Dag;
    use std::sync::Arc;

    #[test]
    fn descending_into_a_map_returns_a_sub_proxy() {
        let vars = Variables::new(Value::map([(
            "web",
            Value::map([("port", Value::from(8080i64))]),
        )]));
        let dag = Arc::new(Dag::new());
        let tracker = DependencyTracker::new(dag, "web1", 1);
        let root = VarProxy::root(&vars, &tracker);

        let web = match root.get("web") {
            Some(VarAccess::Proxy(p)) => p,
            _ => panic!("expected a sub-proxy"),
        };
        let port = match web.get("port") {
            Some(VarAccess::Value(v)) => v,
            _ => panic!("expected a scalar"),
        };
        assert_eq!(port, Value::Int(8080));

        let book = tracker.into_book().unwrap();
        assert!(book.cache_data.contains_key("var:web.port"));
    }

    #[test]
    fn missing_path_returns_none() {
        let vars = Variables::new(Value::map([("a", Value::from(1i64))]));
        let dag = Arc::new(Dag::new());
        let tracker = DependencyTracker::new(dag, "web1", 1);
        let root = VarProxy::root(&vars, &tracker);
        assert!(root.get("missing").is_none());
    }
}
