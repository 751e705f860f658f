use chrono::{DateTime, Utc};
use rand::Rng;
use serde_json::{Map, Value};

const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const ID_SUFFIX_LEN: usize = 6;

/// Record identifier in the `prefix-xxxxxx` form.
///
/// Six base-36 characters is plenty for a single-team data file, but it is not
/// collision resistant; the stores re-roll on the rare clash.
pub fn uid(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("{}-{}", prefix, suffix)
}

pub fn now_iso() -> DateTime<Utc> {
    Utc::now()
}

/// Copy every top-level key of `patch` over `target`, skipping the keys in
/// `protected`. Non-object patches are ignored.
pub fn shallow_merge(target: &mut Value, patch: &Value, protected: &[&str]) {
    let (Some(target), Some(patch)) = (target.as_object_mut(), patch.as_object()) else {
        return;
    };

    for (key, value) in patch {
        if protected.contains(&key.as_str()) {
            continue;
        }
        target.insert(key.clone(), value.clone());
    }
}

/// Recursive merge used when overlaying saved content on defaults.
///
/// Objects merge key by key, arrays and scalars from `overlay` replace the
/// base value, and `null` in the overlay leaves the base untouched.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        if !value.is_null() {
                            base_map.insert(key, value);
                        }
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

pub fn empty_object() -> Value {
    Value::Object(Map::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn uid_has_prefix_and_six_char_suffix() {
        let id = uid("client");
        let (prefix, suffix) = id.split_once('-').unwrap();
        assert_eq!(prefix, "client");
        assert_eq!(suffix.len(), 6);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn shallow_merge_keeps_protected_keys() {
        let mut record = json!({"id": "client-abc123", "company": "Old", "location": "Jakarta"});
        shallow_merge(
            &mut record,
            &json!({"id": "hijack", "company": "New"}),
            &["id"],
        );
        assert_eq!(record["id"], "client-abc123");
        assert_eq!(record["company"], "New");
        assert_eq!(record["location"], "Jakarta");
    }

    #[test]
    fn shallow_merge_replaces_nested_values_wholesale() {
        let mut record = json!({"roles": [{"name": "Sales"}], "meta": {"a": 1, "b": 2}});
        shallow_merge(&mut record, &json!({"meta": {"a": 3}}), &[]);
        assert_eq!(record["meta"], json!({"a": 3}));
        assert_eq!(record["roles"][0]["name"], "Sales");
    }

    #[test]
    fn deep_merge_recurses_into_objects() {
        let mut base = json!({
            "systemEnvironment": {"platforms": [], "engines": ["Unity"]},
            "termsAndConditions": ["Default"]
        });
        deep_merge(
            &mut base,
            json!({
                "systemEnvironment": {"platforms": ["Android"]},
                "termsAndConditions": null
            }),
        );
        assert_eq!(base["systemEnvironment"]["platforms"], json!(["Android"]));
        assert_eq!(base["systemEnvironment"]["engines"], json!(["Unity"]));
        assert_eq!(base["termsAndConditions"], json!(["Default"]));
    }
}
