//! JSON tree helpers: translation substitution and the uiSchema merge policy

use serde_json::Value;
use std::collections::BTreeMap;

/// Strings starting with this prefix are translation keys
pub const TRANSLATION_KEY_PREFIX: char = '@';

/// Replace every `@key` string leaf that has an entry in `dict`
///
/// Object keys are never translated. Strings without an entry are left as-is.
pub fn translate(value: Value, dict: &BTreeMap<String, String>) -> Value {
    match value {
        Value::String(s) if s.starts_with(TRANSLATION_KEY_PREFIX) => match dict.get(&s) {
            Some(translated) => Value::String(translated.clone()),
            None => Value::String(s),
        },
        Value::Array(items) => Value::Array(items.into_iter().map(|v| translate(v, dict)).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, v)| (key, translate(v, dict)))
                .collect(),
        ),
        other => other,
    }
}

/// Merge `overlay` over `base`
///
/// Objects merge key by key, recursively. Any other value in `overlay`,
/// arrays included, replaces the value in `base`; arrays are never
/// concatenated or merged index-wise.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => *existing = deep_merge(existing.take(), value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
            Value::Object(base)
        }
        (_, overlay) => overlay,
    }
}

/// Whether `value` is an object without keys (or null)
pub fn is_empty_object(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.is_empty(),
        Value::Null => true,
        _ => false,
    }
}
