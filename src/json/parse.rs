//! Purpose: Decode captured response text into JSON values.
//! Exports: `decode`, `decode_detailed`, `Decoded`, `not_json`, `NOT_JSON`.
//! Role: Parser boundary that owns the plain-JSON, JSONP and sentinel fallbacks.
//! Invariants: Decoding never fails; unparseable text yields `{"error": "not json", "content": text}`.
//! Invariants: The JSONP pattern is anchored at the start only and captures up to the last `);`.
//! Notes: Decode fallbacks are traced at debug/trace level and never printed.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Value, json};

pub const NOT_JSON: &str = "not json";

static JSONP_WRAPPER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-zA-Z0-9_]+)\((.*)\);").expect("static JSONP pattern compiles")
});

/// Outcome of decoding one payload, tagged with the path that produced it.
#[derive(Clone, Debug, PartialEq)]
pub enum Decoded {
    Json(Value),
    Jsonp { callback: String, value: Value },
    NotJson(Value),
}

impl Decoded {
    pub fn into_value(self) -> Value {
        match self {
            Decoded::Json(value) | Decoded::Jsonp { value, .. } | Decoded::NotJson(value) => value,
        }
    }

    pub fn is_not_json(&self) -> bool {
        matches!(self, Decoded::NotJson(_))
    }
}

pub fn decode(text: &str) -> Value {
    decode_detailed(text).into_value()
}

pub fn decode_detailed(text: &str) -> Decoded {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => return Decoded::Json(value),
        Err(err) => tracing::trace!(error = %err, "payload is not plain JSON"),
    }

    if let Some(captures) = JSONP_WRAPPER.captures(text) {
        let callback = captures.get(1).map_or("", |m| m.as_str());
        let body = captures.get(2).map_or("", |m| m.as_str());
        match serde_json::from_str::<Value>(body) {
            Ok(value) => {
                return Decoded::Jsonp {
                    callback: callback.to_string(),
                    value,
                };
            }
            Err(err) => {
                tracing::debug!(callback, error = %err, "JSONP body is not valid JSON");
            }
        }
    }

    tracing::debug!(len = text.len(), "payload decoded as not-json sentinel");
    Decoded::NotJson(not_json(text))
}

/// Sentinel record stored in place of payloads that are neither JSON nor JSONP.
pub fn not_json(text: &str) -> Value {
    json!({ "error": NOT_JSON, "content": text })
}

#[cfg(test)]
mod tests {
    use super::{Decoded, decode, decode_detailed, not_json};
    use serde_json::json;

    #[test]
    fn plain_json_is_parsed_directly() {
        assert_eq!(decode(r#"{"a":1,"b":[true,null]}"#), json!({"a": 1, "b": [true, null]}));
        assert_eq!(decode("42"), json!(42));
        assert_eq!(decode(r#""text""#), json!("text"));
    }

    #[test]
    fn jsonp_wrapper_is_stripped() {
        let decoded = decode_detailed(r#"cb({"x":1});"#);
        assert_eq!(
            decoded,
            Decoded::Jsonp {
                callback: "cb".to_string(),
                value: json!({"x": 1}),
            }
        );
    }

    #[test]
    fn jsonp_allows_trailing_text_after_terminator() {
        assert_eq!(decode(r#"jQuery_123([1,2]); // done"#), json!([1, 2]));
    }

    #[test]
    fn jsonp_capture_runs_to_last_terminator() {
        // The greedy capture swallows the first `);`, so the body is not JSON.
        let text = r#"cb({"a":1}); other({"b":2});"#;
        assert_eq!(decode(text), not_json(text));
    }

    #[test]
    fn jsonp_callback_must_be_ascii_word() {
        let text = r#"my.cb({"x":1});"#;
        assert!(decode_detailed(text).is_not_json());
    }

    #[test]
    fn jsonp_with_invalid_body_is_sentinel() {
        let text = "cb({oops});";
        assert_eq!(decode(text), json!({"error": "not json", "content": text}));
    }

    #[test]
    fn plain_text_is_sentinel() {
        assert_eq!(
            decode("not json at all"),
            json!({"error": "not json", "content": "not json at all"})
        );
    }

    #[test]
    fn missing_semicolon_is_not_jsonp() {
        assert!(decode_detailed(r#"cb({"x":1})"#).is_not_json());
    }
}
