//! Canonical serialization of event content.
//!
//! Semantically identical content must always serialize to the same bytes,
//! regardless of field insertion order, platform, or locale — the content
//! hash is computed over this output, so any nondeterminism here breaks
//! chain verification.
//!
//! Rules:
//! - object keys sorted lexicographically (byte order) at every nesting
//!   level; arrays keep their original order; no inserted whitespace
//! - every string (keys included) is normalized to Unicode NFKC before
//!   serialization, so visually-identical but byte-different strings hash
//!   identically
//! - NaN and ±Infinity have no canonical JSON representation and are
//!   rejected; finite numbers use serde_json's shortest representation
//! - minimal string escaping: only `"`, `\`, and U+0000..U+001F, with the
//!   short escapes where JSON defines them
//! - nesting deeper than `MAX_DEPTH` levels is rejected

use std::fmt::Write as _;

use serde_json::{Map, Number, Value};
use unicode_normalization::UnicodeNormalization;

use custodia_contracts::error::{CustodiaError, CustodiaResult};

/// Maximum nesting depth accepted by the codec.
pub const MAX_DEPTH: usize = 128;

/// Serialize `value` to its canonical byte string.
pub fn canonical_bytes(value: &Value) -> CustodiaResult<Vec<u8>> {
    Ok(canonical_string(value)?.into_bytes())
}

/// Serialize `value` to its canonical string form.
///
/// Exposed (alongside [`canonical_bytes`]) so auditors can independently
/// re-derive the hashed bytes for any event.
pub fn canonical_string(value: &Value) -> CustodiaResult<String> {
    let normalized = normalize(value, 0)?;
    let mut output = String::new();
    emit_value(&normalized, &mut output);
    Ok(output)
}

/// Recursively NFKC-normalize all strings and validate numbers and depth.
///
/// Normalization happens before emission so key sorting operates on the
/// canonical key bytes, not on whatever the producer happened to type.
fn normalize(value: &Value, depth: usize) -> CustodiaResult<Value> {
    if depth > MAX_DEPTH {
        return Err(CustodiaError::Validation {
            reason: format!("payload nested deeper than {} levels", MAX_DEPTH),
        });
    }

    match value {
        Value::Null | Value::Bool(_) => Ok(value.clone()),
        Value::Number(n) => {
            check_finite(n)?;
            Ok(value.clone())
        }
        Value::String(s) => Ok(Value::String(nfkc(s))),
        Value::Array(items) => {
            let normalized: CustodiaResult<Vec<Value>> =
                items.iter().map(|v| normalize(v, depth + 1)).collect();
            Ok(Value::Array(normalized?))
        }
        Value::Object(entries) => {
            let mut normalized = Map::new();
            for (key, val) in entries {
                let canonical_key = nfkc(key);
                if normalized.contains_key(&canonical_key) {
                    // Two distinct source keys collapsing to one canonical
                    // key would make the hash depend on map iteration order.
                    return Err(CustodiaError::Validation {
                        reason: format!(
                            "duplicate object key '{}' after NFKC normalization",
                            canonical_key
                        ),
                    });
                }
                normalized.insert(canonical_key, normalize(val, depth + 1)?);
            }
            Ok(Value::Object(normalized))
        }
    }
}

fn nfkc(s: &str) -> String {
    s.nfkc().collect()
}

fn check_finite(n: &Number) -> CustodiaResult<()> {
    if let Some(f) = n.as_f64() {
        if !f.is_finite() {
            return Err(CustodiaError::Validation {
                reason: format!("non-finite number '{}' has no canonical JSON form", n),
            });
        }
    }
    Ok(())
}

// ── Emission ──────────────────────────────────────────────────────────────────

fn emit_value(value: &Value, output: &mut String) {
    match value {
        Value::Null => output.push_str("null"),
        Value::Bool(b) => output.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => emit_number(n, output),
        Value::String(s) => emit_string(s, output),
        Value::Array(items) => emit_array(items, output),
        Value::Object(entries) => emit_object(entries, output),
    }
}

fn emit_number(n: &Number, output: &mut String) {
    // serde_json's Display produces the shortest round-trippable decimal
    // form for both integers and finite floats, which is stable across
    // platforms.
    let _ = write!(output, "{}", n);
}

/// Minimal escaping: only `"`, `\`, and the C0 controls, with short escapes
/// where JSON defines them.
fn emit_string(s: &str, output: &mut String) {
    output.push('"');
    for c in s.chars() {
        match c {
            '"' => output.push_str("\\\""),
            '\\' => output.push_str("\\\\"),
            '\u{0008}' => output.push_str("\\b"),
            '\u{000C}' => output.push_str("\\f"),
            '\n' => output.push_str("\\n"),
            '\r' => output.push_str("\\r"),
            '\t' => output.push_str("\\t"),
            c if ('\u{0000}'..='\u{001F}').contains(&c) => {
                let _ = write!(output, "\\u{:04x}", c as u32);
            }
            c => output.push(c),
        }
    }
    output.push('"');
}

fn emit_array(items: &[Value], output: &mut String) {
    output.push('[');
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            output.push(',');
        }
        emit_value(item, output);
    }
    output.push(']');
}

fn emit_object(entries: &Map<String, Value>, output: &mut String) {
    let mut keys: Vec<&String> = entries.keys().collect();
    keys.sort();

    output.push('{');
    for (i, key) in keys.iter().enumerate() {
        if i > 0 {
            output.push(',');
        }
        emit_string(key, output);
        output.push(':');
        emit_value(&entries[*key], output);
    }
    output.push('}');
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn keys_are_sorted_at_every_level() {
        let value = json!({ "z": { "c": 3, "a": 1 }, "a": [1, 2, { "y": 1, "x": 2 }] });
        let s = canonical_string(&value).unwrap();
        assert_eq!(s, r#"{"a":[1,2,{"x":2,"y":1}],"z":{"a":1,"c":3}}"#);
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let a: Value = serde_json::from_str(r#"{"b":1,"a":2}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"a":2,"b":1}"#).unwrap();

        let ca = canonical_bytes(&a).unwrap();
        let cb = canonical_bytes(&b).unwrap();
        assert_eq!(ca, cb);
        assert_eq!(String::from_utf8(ca).unwrap(), r#"{"a":2,"b":1}"#);
    }

    #[test]
    fn arrays_keep_original_order() {
        let value = json!([3, 1, 2]);
        assert_eq!(canonical_string(&value).unwrap(), "[3,1,2]");
    }

    #[test]
    fn no_whitespace_is_inserted() {
        let value = json!({ "key": "value", "num": 42 });
        assert_eq!(
            canonical_string(&value).unwrap(),
            r#"{"key":"value","num":42}"#
        );
    }

    #[test]
    fn strings_are_nfkc_normalized() {
        // "e" + combining acute accent composes to U+00E9 under NFKC.
        let decomposed = json!({ "name": "Jose\u{0301}" });
        let composed = json!({ "name": "Jos\u{00e9}" });

        assert_eq!(
            canonical_bytes(&decomposed).unwrap(),
            canonical_bytes(&composed).unwrap(),
            "visually identical strings must canonicalize identically"
        );
    }

    #[test]
    fn compatibility_forms_collapse_under_nfkc() {
        // U+FB01 is the "fi" ligature; NFKC expands it to "fi".
        let ligature = json!({ "word": "\u{fb01}le" });
        let plain = json!({ "word": "file" });
        assert_eq!(
            canonical_bytes(&ligature).unwrap(),
            canonical_bytes(&plain).unwrap()
        );
    }

    #[test]
    fn keys_are_normalized_before_sorting() {
        let decomposed_key = json!({ "Jose\u{0301}": 1 });
        let composed_key = json!({ "Jos\u{00e9}": 1 });
        assert_eq!(
            canonical_bytes(&decomposed_key).unwrap(),
            canonical_bytes(&composed_key).unwrap()
        );
    }

    #[test]
    fn keys_colliding_after_normalization_are_rejected() {
        // Distinct source keys that normalize to the same canonical key.
        let mut entries = Map::new();
        entries.insert("Jose\u{0301}".to_string(), json!(1));
        entries.insert("Jos\u{00e9}".to_string(), json!(2));
        let value = Value::Object(entries);

        let err = canonical_bytes(&value).unwrap_err();
        assert!(err.to_string().contains("duplicate object key"));
    }

    #[test]
    fn finite_floats_are_accepted() {
        let value = json!({ "score": 0.25, "count": 7 });
        assert_eq!(
            canonical_string(&value).unwrap(),
            r#"{"count":7,"score":0.25}"#
        );
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let mut value = json!(0);
        for _ in 0..(MAX_DEPTH + 10) {
            value = json!({ "n": value });
        }
        let err = canonical_bytes(&value).unwrap_err();
        assert!(err.to_string().contains("nested deeper"));
    }

    #[test]
    fn nesting_at_limit_is_accepted() {
        let mut value = json!(0);
        for _ in 0..MAX_DEPTH {
            value = json!({ "n": value });
        }
        assert!(canonical_bytes(&value).is_ok());
    }

    #[test]
    fn control_characters_use_short_escapes() {
        let value = json!({ "text": "line1\nline2\ttab" });
        assert_eq!(
            canonical_string(&value).unwrap(),
            r#"{"text":"line1\nline2\ttab"}"#
        );
    }

    #[test]
    fn nul_uses_unicode_escape() {
        let value = json!({ "text": "\u{0000}" });
        assert_eq!(canonical_string(&value).unwrap(), r#"{"text":"\u0000"}"#);
    }

    #[test]
    fn canonicalization_is_idempotent() {
        let value = json!({ "nested": { "b": 2, "a": 1 }, "top": "value" });
        let once = canonical_string(&value).unwrap();
        let reparsed: Value = serde_json::from_str(&once).unwrap();
        let twice = canonical_string(&reparsed).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_containers() {
        assert_eq!(canonical_string(&json!({})).unwrap(), "{}");
        assert_eq!(canonical_string(&json!([])).unwrap(), "[]");
        assert_eq!(canonical_string(&json!(null)).unwrap(), "null");
    }
}
