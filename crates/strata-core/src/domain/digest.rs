//! Canonical JSON encoding and content digests for frozen state.
//!
//! Canonical form: object keys sorted by UTF-16 code units, integer-valued
//! floats written as integers, no insignificant whitespace. NaN and infinite
//! numbers are rejected.

use sha2::{Digest, Sha256};

use crate::domain::error::SnapshotError;

fn utf16_key(s: &str) -> Vec<u16> {
    s.encode_utf16().collect()
}

fn write_number(n: &serde_json::Number, out: &mut String) -> Result<(), SnapshotError> {
    if n.is_i64() || n.is_u64() {
        out.push_str(&n.to_string());
        return Ok(());
    }
    let f = n
        .as_f64()
        .ok_or_else(|| SnapshotError::NonCanonical(format!("unrepresentable number {}", n)))?;
    if !f.is_finite() {
        return Err(SnapshotError::NonCanonical(
            "NaN/Infinity not permitted in frozen state".to_string(),
        ));
    }
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        out.push_str(&(f as i64).to_string());
    } else {
        out.push_str(&n.to_string());
    }
    Ok(())
}

fn write_canonical(value: &serde_json::Value, out: &mut String) -> Result<(), SnapshotError> {
    match value {
        serde_json::Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by_cached_key(|(k, _)| utf16_key(k));
            out.push('{');
            for (i, (key, v)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key)?);
                out.push(':');
                write_canonical(v, out)?;
            }
            out.push('}');
        }
        serde_json::Value::Array(items) => {
            out.push('[');
            for (i, v) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(v, out)?;
            }
            out.push(']');
        }
        serde_json::Value::Number(n) => write_number(n, out)?,
        other => out.push_str(&serde_json::to_string(other)?),
    }
    Ok(())
}

/// Encode `value` in canonical form.
pub fn canonical_json(value: &serde_json::Value) -> Result<String, SnapshotError> {
    let mut out = String::new();
    write_canonical(value, &mut out)?;
    Ok(out)
}

/// SHA-256 hex digest of raw content bytes.
pub fn content_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_sorted_at_every_level() {
        let a = serde_json::json!({"b": 1, "a": {"z": true, "y": null}});
        let b = serde_json::json!({"a": {"y": null, "z": true}, "b": 1});
        assert_eq!(canonical_json(&a).unwrap(), canonical_json(&b).unwrap());
        assert_eq!(canonical_json(&a).unwrap(), r#"{"a":{"y":null,"z":true},"b":1}"#);
    }

    #[test]
    fn integer_valued_floats_collapse() {
        let value = serde_json::json!({"n": 2.0, "m": -3.0, "f": 1.5});
        assert_eq!(canonical_json(&value).unwrap(), r#"{"f":1.5,"m":-3,"n":2}"#);
    }

    #[test]
    fn array_order_preserved() {
        let a = canonical_json(&serde_json::json!([3, 1, 2])).unwrap();
        let b = canonical_json(&serde_json::json!([1, 2, 3])).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn strings_are_escaped() {
        let value = serde_json::json!({"q": "say \"hi\""});
        assert_eq!(canonical_json(&value).unwrap(), r#"{"q":"say \"hi\""}"#);
    }

    #[test]
    fn digest_is_64_hex_chars_and_deterministic() {
        let d1 = content_digest(b"frozen");
        let d2 = content_digest(b"frozen");
        assert_eq!(d1, d2);
        assert_eq!(d1.len(), 64);
        assert!(d1.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(d1, content_digest(b"thawed"));
    }
}
