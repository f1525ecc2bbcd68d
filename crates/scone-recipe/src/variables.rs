use scone_wire::Value;

/// A read-only nested variable tree recipes and the variable-access
/// proxy read from (spec §4.7). Menu parsing and template rendering
/// that populate it are out of this crate's scope; callers build one
/// from whatever source they like and hand it to a recipe's
/// constructor.
#[derive(Clone, Debug)]
pub struct Variables {
    root: Value,
}

impl Variables {
    pub fn new(root: Value) -> Self {
        Variables { root }
    }

    pub fn toplevel(&self) -> &[(String, Value)] {
        self.root.as_map().unwrap_or(&[])
    }

    /// Resolve a `.`-separated path through nested maps.
    pub fn get_dotted(&self, path: &str) -> Option<Value> {
        if path.is_empty() {
            return Some(self.root.clone());
        }
        let mut current = &self.root;
        for segment in path.split('.') {
            current = current.get(segment)?;
        }
        Some(current.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_dotted_walks_nested_maps() {
        let vars = Variables::new(Value::map([(
            "web",
            Value::map([("port", Value::from(8080i64))]),
        )]));
        assert_eq!(vars.get_dotted("web.port"), Some(Value::Int(8080)));
        assert_eq!(vars.get_dotted("web.missing"), None);
    }

    #[test]
    fn empty_path_returns_whole_tree() {
        let root = Value::map([("a", Value::from(1i64))]);
        let vars = Variables::new(root.clone());
        assert_eq!(vars.get_dotted(""), Some(root));
    }
}
