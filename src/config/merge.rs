//! Deep merge of decoded configuration trees.
//!
//! Implements field-by-field merging where later trees override earlier ones.
//! Arrays are replaced entirely, not concatenated.

use serde_json::{Map, Value};

/// Deep merge two JSON values, with `overlay` taking precedence over `base`.
///
/// - Objects are merged recursively: keys in overlay override keys in base
/// - Keys present only in base are kept
/// - Arrays, strings, numbers, booleans and nulls in overlay replace base entirely
///
/// # Example
/// ```
/// use serde_json::json;
/// use simple_config::config::deep_merge;
///
/// let base = json!({
///     "server": { "port": 8080, "host": "localhost" },
///     "features": ["a", "b"]
/// });
/// let overlay = json!({
///     "server": { "port": 9000 },
///     "features": ["c"]
/// });
/// let result = deep_merge(base, overlay);
/// assert_eq!(
///     result,
///     json!({ "server": { "port": 9000, "host": "localhost" }, "features": ["c"] })
/// );
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            Value::Object(merge_maps(base_map, overlay_map))
        }
        (_, overlay) => overlay,
    }
}

fn merge_maps(mut base: Map<String, Value>, overlay: Map<String, Value>) -> Map<String, Value> {
    for (key, overlay_value) in overlay {
        let merged_value = match base.remove(&key) {
            Some(base_value) => deep_merge(base_value, overlay_value),
            None => overlay_value,
        };
        base.insert(key, merged_value);
    }
    base
}

/// Merge per-file trees in order, with later trees taking precedence.
///
/// `None` entries stand for search paths without a file and contribute
/// nothing. The fold starts from an empty mapping, so the result is always an
/// object even when every entry is `None`.
pub fn deep_merge_all(trees: impl IntoIterator<Item = Option<Map<String, Value>>>) -> Value {
    let merged = trees
        .into_iter()
        .flatten()
        .fold(Map::new(), merge_maps);
    Value::Object(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree(value: Value) -> Option<Map<String, Value>> {
        match value {
            Value::Object(map) => Some(map),
            _ => panic!("test tree must be an object"),
        }
    }

    #[test]
    fn test_later_file_overrides_shared_keys() {
        let result = deep_merge_all(vec![
            tree(json!({"name": "system", "workers": 4})),
            tree(json!({"workers": 16, "color": false})),
        ]);
        assert_eq!(result, json!({"name": "system", "workers": 16, "color": false}));
    }

    #[test]
    fn test_sections_merge_across_files() {
        let result = deep_merge_all(vec![
            tree(json!({"db": {"url": "postgres://system", "pool": {"min": 1, "max": 8}}})),
            None,
            tree(json!({"db": {"pool": {"max": 32}}})),
            tree(json!({"db": {"timeout_ms": 500}})),
        ]);
        assert_eq!(
            result,
            json!({"db": {"url": "postgres://system", "pool": {"min": 1, "max": 32}, "timeout_ms": 500}})
        );
    }

    #[test]
    fn test_later_list_replaces_whole_list() {
        let result = deep_merge_all(vec![
            tree(json!({"peers": ["a", "b", "c"]})),
            tree(json!({"peers": ["d"]})),
        ]);
        assert_eq!(result, json!({"peers": ["d"]}));
    }

    #[test]
    fn test_explicit_null_replaces_base() {
        let base = json!({"a": 1, "b": {"c": 2}});
        let overlay = json!({"a": null, "b": {"c": null}});
        let result = deep_merge(base, overlay);
        assert_eq!(result, json!({"a": null, "b": {"c": null}}));
    }

    #[test]
    fn test_merge_all() {
        let trees = vec![
            tree(json!({"a": 1})),
            tree(json!({"b": 2})),
            tree(json!({"a": 3, "c": 4})),
        ];
        let result = deep_merge_all(trees);
        assert_eq!(result, json!({"a": 3, "b": 2, "c": 4}));
    }

    #[test]
    fn test_merge_all_skips_absent_files() {
        let trees = vec![
            tree(json!({"a": 1, "b": {"x": 1}})),
            None,
            tree(json!({"b": {"y": 2}})),
            None,
        ];
        let result = deep_merge_all(trees);
        assert_eq!(result, json!({"a": 1, "b": {"x": 1, "y": 2}}));
    }

    #[test]
    fn test_merge_all_empty_is_empty_object() {
        assert_eq!(deep_merge_all(Vec::<Option<Map<String, Value>>>::new()), json!({}));
        assert_eq!(deep_merge_all(vec![None, None]), json!({}));
    }

    #[test]
    fn test_merge_is_independent_of_key_order() {
        let first = deep_merge_all(vec![
            tree(json!({"x": 1, "y": {"a": 1, "b": 2}})),
            tree(json!({"y": {"b": 3}, "x": 2})),
        ]);
        let second = deep_merge_all(vec![
            tree(json!({"y": {"b": 2, "a": 1}, "x": 1})),
            tree(json!({"x": 2, "y": {"b": 3}})),
        ]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_kind_changes_take_the_later_value() {
        let scalar_then_section = deep_merge_all(vec![
            tree(json!({"cache": "off"})),
            tree(json!({"cache": {"size": 64}})),
        ]);
        assert_eq!(scalar_then_section, json!({"cache": {"size": 64}}));

        let section_then_scalar = deep_merge_all(vec![
            tree(json!({"cache": {"size": 64}})),
            tree(json!({"cache": "off"})),
        ]);
        assert_eq!(section_then_scalar, json!({"cache": "off"}));
    }

    #[test]
    fn test_caller_values_underlay_file_tree() {
        let current = json!({"host": "caller", "port": 8080, "tls": {"enabled": false}});
        let files = deep_merge_all(vec![tree(json!({"host": "file", "tls": {"cert": "a.pem"}}))]);
        assert_eq!(
            deep_merge(current, files),
            json!({"host": "file", "port": 8080, "tls": {"enabled": false, "cert": "a.pem"}})
        );
    }
}
