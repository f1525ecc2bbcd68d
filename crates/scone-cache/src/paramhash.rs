use scone_wire::{canonical_encode, Value};

/// Stable hash of a recipe's canonicalised `{args, sous, user}` (spec
/// §4.5). Used together with `recipe_kind` as the cache's primary key.
pub fn paramhash(args: &Value, sous: &str, user: &str) -> String {
    let keyed = Value::map([
        ("args", args.clone()),
        ("sous", Value::from(sous)),
        ("user", Value::from(user)),
    ]);
    let bytes = canonical_encode(&keyed);
    blake3::hash(&bytes).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paramhash_is_stable_under_arg_key_permutation() {
        let a = Value::map([("pkg", Value::from("curl")), ("version", Value::from("8.0"))]);
        let b = Value::map([("version", Value::from("8.0")), ("pkg", Value::from("curl"))]);
        assert_eq!(paramhash(&a, "web1", "root"), paramhash(&b, "web1", "root"));
    }

    #[test]
    fn paramhash_changes_with_user() {
        let args = Value::map([("pkg", Value::from("curl"))]);
        assert_ne!(paramhash(&args, "web1", "root"), paramhash(&args, "web1", "deploy"));
    }
}
