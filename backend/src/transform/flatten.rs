//! Flatten nested JSON objects into dotted-path maps.
//!
//! ```text
//! {"a": {"b": 1, "c": [1, 2]}, "d": {}}  →  {"a.b": 1, "a.c": [1, 2], "d": {}}
//! ```
//!
//! Only non-empty objects are descended into; arrays, scalars and empty
//! objects are kept as leaves.

use serde_json::{Map, Value};

const DELIMITER: &str = ".";

/// Flatten `value`. Non-object inputs yield an empty map.
///
/// `max_depth` limits how many object levels are merged into one key
/// (`Some(1)` keeps top-level keys only); `None` means unlimited.
pub fn flatten(value: &Value, max_depth: Option<usize>) -> Map<String, Value> {
    let mut output = Map::new();
    if let Value::Object(object) = value {
        step(object, None, 1, max_depth, &mut output);
    }
    output
}

fn step(
    object: &Map<String, Value>,
    prefix: Option<&str>,
    depth: usize,
    max_depth: Option<usize>,
    output: &mut Map<String, Value>,
) {
    for (key, value) in object {
        let path = match prefix {
            Some(prefix) => format!("{}{}{}", prefix, DELIMITER, key),
            None => key.clone(),
        };

        match value {
            Value::Object(child) if !child.is_empty() && max_depth.map_or(true, |max| depth < max) => {
                step(child, Some(&path), depth + 1, max_depth, output);
            }
            _ => {
                output.insert(path, value.clone());
            }
        }
    }
}
