//! Computed-column scripts.
//!
//! A script is an expression template with `{name}` placeholders:
//!
//! ```text
//! "{bytes} / 1024"          → 2048 / 1024          → 2
//! "{status} == 'up' ? 1 : 0" → "up" == 'up' ? 1 : 0 → 1
//! ```
//!
//! Placeholders are replaced with the merged row's values, then the text is
//! tokenized ([`lexer`]), parsed ([`parser`]) and evaluated ([`interpreter`]).
//! Results are memoized by substituted text ([`cache`]).
//!
//! Scripts come from panel configuration and are trusted. Substituted string
//! values are wrapped in double quotes without escaping, so a value that
//! itself contains `"` produces a malformed expression.

pub mod cache;
pub mod interpreter;
pub mod lexer;
pub mod parser;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};

use crate::error::{ExpressionResult, TransformError, TransformResult};
use crate::models::ColumnDescriptor;

pub use cache::{ScriptCache, SCRIPT_CACHE};
pub use interpreter::Scalar;
pub use parser::{parse, Expr};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(.+?)\}").expect("placeholder pattern is valid"));

/// Names referenced by `{...}` placeholders, in order of appearance.
pub fn placeholders(script: &str) -> Vec<&str> {
    PLACEHOLDER
        .captures_iter(script)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}

/// Replace every placeholder with a literal for the row's value.
///
/// Absent and falsy values become `0`; strings are double-quoted; anything
/// else is written in its JSON form.
pub fn substitute(script: &str, row: &Map<String, Value>, columns: &[ColumnDescriptor]) -> String {
    PLACEHOLDER
        .replace_all(script, |caps: &Captures<'_>| {
            literal_for(resolve(&caps[1], row, columns))
        })
        .into_owned()
}

/// Look a placeholder name up in the row, then by column `value` key.
fn resolve<'a>(
    name: &str,
    row: &'a Map<String, Value>,
    columns: &[ColumnDescriptor],
) -> Option<&'a Value> {
    row.get(name).or_else(|| {
        columns
            .iter()
            .find(|c| c.value.as_deref() == Some(name))
            .and_then(|c| row.get(&c.text))
    })
}

fn literal_for(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) if !s.is_empty() => format!("\"{}\"", s),
        Some(v) if is_truthy(v) => v.to_string(),
        _ => "0".to_string(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Parse and evaluate an already-substituted expression.
pub fn eval_expression(text: &str) -> ExpressionResult<Value> {
    let expr = parse(text)?;
    Ok(interpreter::evaluate(&expr)?.into_json())
}

/// Evaluate a script against a merged row using the process-wide cache.
pub fn evaluate_row_script(
    script: &str,
    row: &Map<String, Value>,
    columns: &[ColumnDescriptor],
) -> TransformResult<Value> {
    evaluate_row_script_with(&SCRIPT_CACHE, script, row, columns)
}

/// Evaluate a script against a merged row using `cache`.
pub fn evaluate_row_script_with(
    cache: &ScriptCache,
    script: &str,
    row: &Map<String, Value>,
    columns: &[ColumnDescriptor],
) -> TransformResult<Value> {
    let text = substitute(script, row, columns);
    cache
        .get_or_try_insert_with(&text, || eval_expression(&text))
        .map_err(|source| TransformError::Evaluation {
            script: text.clone(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders("{a} + {b c}"), vec!["a", "b c"]);
        assert!(placeholders("1 + 2").is_empty());
    }

    #[test]
    fn test_substitute_numbers_and_strings() {
        let r = row(json!({"a": 2, "b": "x", "c": 1.5, "d": true}));
        assert_eq!(substitute("{a} + {b} + {c} + {d}", &r, &[]), r#"2 + "x" + 1.5 + true"#);
    }

    #[test]
    fn test_substitute_falsy_defaults_to_zero() {
        let r = row(json!({"zero": 0, "empty": "", "none": null, "no": false}));
        assert_eq!(
            substitute("{zero}|{empty}|{none}|{no}|{missing}", &r, &[]),
            "0|0|0|0|0"
        );
    }

    #[test]
    fn test_substitute_by_value_key() {
        let r = row(json!({"Bytes In": 10}));
        let columns = vec![ColumnDescriptor::new("Bytes In").with_value("bytes_in")];
        assert_eq!(substitute("{bytes_in} * 2", &r, &columns), "10 * 2");
    }

    #[test]
    fn test_evaluate_numbers() {
        let cache = ScriptCache::new(16);
        let r = row(json!({"a": 2, "b": 3}));
        let value = evaluate_row_script_with(&cache, "{a}+{b}", &r, &[]).unwrap();
        assert_eq!(value, json!(5));
    }

    #[test]
    fn test_evaluate_string_operand_concatenates() {
        let cache = ScriptCache::new(16);
        let r = row(json!({"a": "2", "b": 3}));
        let value = evaluate_row_script_with(&cache, "{a}+{b}", &r, &[]).unwrap();
        assert_eq!(value, json!("23"));
    }

    #[test]
    fn test_memoized_by_substituted_text() {
        let cache = ScriptCache::new(16);
        let first = row(json!({"a": 1, "b": 4}));
        let second = row(json!({"a": 1, "b": 4, "unrelated": "x"}));
        let v1 = evaluate_row_script_with(&cache, "{a}+{b}", &first, &[]).unwrap();
        let v2 = evaluate_row_script_with(&cache, "{a} + {b}", &second, &[]).unwrap();
        let v3 = evaluate_row_script_with(&cache, "{a}+{b}", &second, &[]).unwrap();
        assert_eq!(v1, json!(5));
        assert_eq!(v2, v1);
        assert_eq!(v3, v1);
        // "1+4" and "1 + 4" are distinct keys.
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_malformed_script_is_evaluation_error() {
        let cache = ScriptCache::new(16);
        let r = row(json!({"a": 1}));
        let err = evaluate_row_script_with(&cache, "{a} +", &r, &[]).unwrap_err();
        match err {
            TransformError::Evaluation { script, .. } => assert_eq!(script, "1 +"),
            other => panic!("Expected evaluation error, got {:?}", other),
        }
    }

    #[test]
    fn test_embedded_quote_breaks_expression() {
        let cache = ScriptCache::new(16);
        let r = row(json!({"a": "say \"hi\""}));
        assert!(evaluate_row_script_with(&cache, "{a}", &r, &[]).is_err());
    }
}
