//! Helpers for pulling structured JSON out of free-form provider text.
//!
//! Provider output is untrusted: the JSON may be wrapped in prose or code
//! fences and its fields may carry any type. The span finders below return
//! the widest bracketed slice (first opening bracket to last closing one),
//! and the coercion helpers turn loose JSON values into typed fields without
//! trusting declared types.

use serde_json::Value;

/// Slice from the first `{` to the last `}`, if any
pub fn find_json_object(text: &str) -> Option<&str> {
    find_span(text, '{', '}')
}

/// Slice from the first `[` to the last `]`, if any
pub fn find_json_array(text: &str) -> Option<&str> {
    find_span(text, '[', ']')
}

fn find_span(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

/// JSON truthiness: null, false, 0, NaN and "" are false
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Render any JSON value as display text; strings are taken verbatim
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(stringify).collect::<Vec<_>>().join(","),
        Value::Object(_) => "[object Object]".to_string(),
        other => other.to_string(),
    }
}

/// Stringify each element of a JSON list, keeping at most `limit`
pub fn string_list(value: &Value, limit: usize) -> Option<Vec<String>> {
    value
        .as_array()
        .map(|items| items.iter().take(limit).map(stringify).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_find_json_object_in_code_fence() {
        let text = "Here you go:\n```json\n{\"a\": {\"b\": 1}}\n```\nThanks";
        assert_eq!(find_json_object(text), Some("{\"a\": {\"b\": 1}}"));
    }

    #[test]
    fn test_find_span_requires_both_brackets_in_order() {
        assert_eq!(find_json_object("no json here"), None);
        assert_eq!(find_json_object("} backwards {"), None);
        assert_eq!(find_json_array("only [ open"), None);
        assert_eq!(find_json_array("x [1, 2] y"), Some("[1, 2]"));
    }

    #[test]
    fn test_is_truthy() {
        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!("yes")));
        assert!(is_truthy(&json!(1)));
        assert!(is_truthy(&json!([])));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
    }

    #[test]
    fn test_string_list_stringifies_and_truncates() {
        let value = json!(["a.com", 42, true, "b.com", "c.com"]);
        assert_eq!(
            string_list(&value, 4),
            Some(vec!["a.com".into(), "42".into(), "true".into(), "b.com".into()])
        );
        assert_eq!(string_list(&json!("not a list"), 5), None);
    }
}
