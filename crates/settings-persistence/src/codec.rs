//! JSON codec configuration shared by load, save and default construction.
//!
//! Decoding always builds a fresh value (nothing is merged into an existing
//! one) and treats explicit `null` fields as absent, so they fall back to the
//! type's defaults instead of clearing them. Encoding is indented and omits
//! null fields.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The canonical empty document every default value is decoded from.
pub const EMPTY_DOCUMENT: &str = "{}";

/// Decodes `bytes` into `T`.
///
/// Returns `Ok(None)` when the document is the literal `null`.
///
/// # Errors
/// Returns the parse error for malformed JSON (including invalid UTF-8) and
/// the data error when the document does not fit `T`.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> serde_json::Result<Option<T>> {
    let mut value: Value = serde_json::from_slice(bytes)?;
    if value.is_null() {
        return Ok(None);
    }
    strip_nulls(&mut value);
    T::deserialize(value).map(Some)
}

/// Decodes the empty document into `T`, yielding its zero value.
pub fn decode_empty<T: DeserializeOwned>() -> serde_json::Result<T> {
    serde_json::from_str(EMPTY_DOCUMENT)
}

/// Encodes `value` as indented JSON with null fields omitted.
pub fn encode<T: Serialize>(value: &T) -> serde_json::Result<String> {
    let mut value = serde_json::to_value(value)?;
    strip_nulls(&mut value);
    serde_json::to_string_pretty(&value)
}

/// Removes `null` members from every object in the tree.
///
/// Array elements are kept as-is so positions don't shift.
fn strip_nulls(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            map.values_mut().for_each(strip_nulls);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_nulls),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    #[serde(default)]
    struct Settings {
        theme: String,
        max_results: u32,
        hotkey: Option<String>,
        plugins: Vec<Plugin>,
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    #[serde(default)]
    struct Plugin {
        id: String,
        disabled: bool,
        action_keyword: Option<String>,
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                theme: "dark".to_string(),
                max_results: 4,
                hotkey: None,
                plugins: Vec::new(),
            }
        }
    }

    impl Default for Plugin {
        fn default() -> Self {
            Self {
                id: String::new(),
                disabled: false,
                action_keyword: Some("*".to_string()),
            }
        }
    }

    #[test]
    fn test_decode_empty_yields_defaults() {
        let settings: Settings = decode_empty().unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_decode_literal_null() {
        let result: Option<Settings> = decode(b"null").unwrap();
        assert!(result.is_none());

        let result: Option<Settings> = decode(b"  null\n").unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_decode_explicit_null_keeps_default() {
        let json = br#"{"theme": null, "max_results": 9}"#;
        let settings: Settings = decode(json).unwrap().unwrap();

        assert_eq!(settings.theme, "dark");
        assert_eq!(settings.max_results, 9);
    }

    #[test]
    fn test_decode_nested_null_keeps_default() {
        let json = br#"{"plugins": [{"id": "calc", "action_keyword": null}]}"#;
        let settings: Settings = decode(json).unwrap().unwrap();

        assert_eq!(settings.plugins.len(), 1);
        assert_eq!(settings.plugins[0].id, "calc");
        assert_eq!(settings.plugins[0].action_keyword, Some("*".to_string()));
    }

    #[test]
    fn test_decode_malformed() {
        assert!(decode::<Settings>(b"{not valid").is_err());
        assert!(decode::<Settings>(&[0xff, 0xfe, 0x7b, 0x7d]).is_err());
    }

    #[test]
    fn test_decode_wrong_shape() {
        assert!(decode::<Settings>(b"[1, 2, 3]").is_err());
        assert!(decode::<Settings>(br#"{"max_results": "many"}"#).is_err());
    }

    #[test]
    fn test_encode_omits_nulls_and_indents() {
        let settings = Settings::default();
        let json = encode(&settings).unwrap();

        assert!(!json.contains("hotkey"));
        assert!(!json.contains("null"));
        assert!(json.contains("\n  \"theme\": \"dark\""));
    }

    #[test]
    fn test_encode_then_decode() {
        let settings = Settings {
            theme: "light".to_string(),
            max_results: 12,
            hotkey: Some("Alt+Space".to_string()),
            plugins: vec![Plugin {
                id: "web".to_string(),
                disabled: true,
                action_keyword: None,
            }],
        };

        let json = encode(&settings).unwrap();
        let decoded: Settings = decode(json.as_bytes()).unwrap().unwrap();

        // A `None` that differs from the default is not preserved, because
        // null fields are omitted on encode.
        assert_eq!(decoded.theme, "light");
        assert_eq!(decoded.hotkey, Some("Alt+Space".to_string()));
        assert_eq!(decoded.plugins[0].action_keyword, Some("*".to_string()));
    }
}
