//! # Canonical JSON
//!
//! Deterministic serialization of a JSON value, so the same document always
//! hashes to the same bytes no matter how it was built or parsed:
//!
//! - object members sorted by key (UTF-16 code unit order),
//! - no insignificant whitespace,
//! - strings escaped the way `serde_json` escapes them,
//! - numbers in `serde_json`'s shortest round-trip form.
//!
//! Ordering is explicit here rather than inherited from `serde_json::Map`,
//! which changes behaviour when `preserve_order` is enabled anywhere in the
//! dependency graph.

use serde::Serialize;
use serde_json::Value;

use crate::error::BtcoResult;

/// Canonical string form of `value`.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

/// Canonical UTF-8 bytes of `value`.
pub fn canonical_bytes(value: &Value) -> Vec<u8> {
    canonical_json(value).into_bytes()
}

/// Serialize any `Serialize` type to canonical bytes.
pub fn canonicalize<T: Serialize + ?Sized>(value: &T) -> BtcoResult<Vec<u8>> {
    Ok(canonical_bytes(&serde_json::to_value(value)?))
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.encode_utf16().cmp(b.encode_utf16()));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_value(item, out);
            }
            out.push('}');
        }
    }
}

fn write_string(s: &str, out: &mut String) {
    // Serializing a &str to JSON cannot fail.
    match serde_json::to_string(s) {
        Ok(escaped) => out.push_str(&escaped),
        Err(_) => out.push_str("\"\""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_sorted_recursively_without_whitespace() {
        let value = json!({"b": 1, "a": {"z": true, "y": null}, "c": [3, {"k": "v", "j": 2}]});
        assert_eq!(
            canonical_json(&value),
            r#"{"a":{"y":null,"z":true},"b":1,"c":[3,{"j":2,"k":"v"}]}"#
        );
    }

    #[test]
    fn member_order_does_not_change_output() {
        let a: Value = serde_json::from_str(r#"{"id":"x","@context":["c"],"n":1.5}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{ "n" : 1.5, "@context" : [ "c" ], "id" : "x" }"#).unwrap();
        assert_eq!(canonical_bytes(&a), canonical_bytes(&b));
    }

    #[test]
    fn array_order_is_significant() {
        assert_ne!(canonical_json(&json!([1, 2])), canonical_json(&json!([2, 1])));
    }

    #[test]
    fn strings_are_escaped() {
        assert_eq!(canonical_json(&json!("a\"b\n")), r#""a\"b\n""#);
        assert_eq!(canonical_json(&json!({"🔥": 1})), "{\"🔥\":1}");
    }
}
