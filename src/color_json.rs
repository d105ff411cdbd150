//! Purpose: Render payload dumps as pretty JSON with optional ANSI colorization.
//! Exports: `PayloadStyle`, `render_payload`.
//! Role: Small, pure formatter used by the text report for left/right payload dumps.
//! Invariants: When color is disabled, output equals serde_json::to_string_pretty.
//! Invariants: ANSI escapes appear only when explicitly enabled.
//! Invariants: Ignored fields are dimmed (color only) but never omitted from the dump.
use capdiff::core::compare::IgnoreFields;
use serde_json::{Map, Value};

const INDENT: &str = "  ";

// Conservative 8/16-color palette for broad terminal compatibility.
const COLOR_KEY: &str = "36";
const COLOR_STRING: &str = "32";
const COLOR_NUMBER: &str = "33";
const COLOR_BOOL: &str = "35";
const COLOR_NULL: &str = "39";
const COLOR_PUNCT: &str = "39";
const COLOR_IGNORED: &str = "2";

#[derive(Clone, Copy, Debug)]
pub struct PayloadStyle<'a> {
    pub use_color: bool,
    pub ignore: &'a IgnoreFields,
}

struct Writer<'a> {
    style: PayloadStyle<'a>,
    out: String,
}

pub fn render_payload(value: &Value, style: PayloadStyle<'_>) -> String {
    let mut writer = Writer {
        style,
        out: String::new(),
    };
    writer.value(value, 0, false);
    writer.out
}

impl Writer<'_> {
    fn value(&mut self, value: &Value, indent: usize, dim: bool) {
        match value {
            Value::Null => self.token("null", COLOR_NULL, dim),
            Value::Bool(val) => {
                let text = if *val { "true" } else { "false" };
                self.token(text, COLOR_BOOL, dim);
            }
            Value::Number(num) => self.token(&num.to_string(), COLOR_NUMBER, dim),
            Value::String(text) => {
                let encoded = serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_string());
                self.token(&encoded, COLOR_STRING, dim);
            }
            Value::Array(items) => self.array(items, indent, dim),
            Value::Object(map) => self.object(map, indent, dim),
        }
    }

    fn array(&mut self, items: &[Value], indent: usize, dim: bool) {
        if items.is_empty() {
            self.token("[]", COLOR_PUNCT, dim);
            return;
        }
        self.token("[", COLOR_PUNCT, dim);
        self.out.push('\n');
        for (idx, item) in items.iter().enumerate() {
            self.indent(indent + 1);
            self.value(item, indent + 1, dim);
            if idx + 1 < items.len() {
                self.token(",", COLOR_PUNCT, dim);
            }
            self.out.push('\n');
        }
        self.indent(indent);
        self.token("]", COLOR_PUNCT, dim);
    }

    fn object(&mut self, map: &Map<String, Value>, indent: usize, dim: bool) {
        if map.is_empty() {
            self.token("{}", COLOR_PUNCT, dim);
            return;
        }
        self.token("{", COLOR_PUNCT, dim);
        self.out.push('\n');
        let len = map.len();
        for (idx, (key, value)) in map.iter().enumerate() {
            let dim_entry = dim || self.style.ignore.contains(key);
            self.indent(indent + 1);
            let encoded = serde_json::to_string(key).unwrap_or_else(|_| "\"\"".to_string());
            self.token(&encoded, COLOR_KEY, dim_entry);
            self.token(":", COLOR_PUNCT, dim_entry);
            self.out.push(' ');
            self.value(value, indent + 1, dim_entry);
            if idx + 1 < len {
                self.token(",", COLOR_PUNCT, dim);
            }
            self.out.push('\n');
        }
        self.indent(indent);
        self.token("}", COLOR_PUNCT, dim);
    }

    fn indent(&mut self, level: usize) {
        for _ in 0..level {
            self.out.push_str(INDENT);
        }
    }

    fn token(&mut self, text: &str, color: &str, dim: bool) {
        if !self.style.use_color {
            self.out.push_str(text);
            return;
        }
        let color = if dim { COLOR_IGNORED } else { color };
        self.out.push_str("\u{1b}[");
        self.out.push_str(color);
        self.out.push('m');
        self.out.push_str(text);
        self.out.push_str("\u{1b}[0m");
    }
}

#[cfg(test)]
mod tests {
    use super::{PayloadStyle, render_payload};
    use capdiff::core::compare::IgnoreFields;
    use capdiff::json::parse::decode;
    use serde_json::json;

    #[test]
    fn plain_rendering_matches_pretty() {
        let ignore = IgnoreFields::from_list("ts");
        let value = json!({
            "arr": [1, true, null],
            "nested": { "x": "y", "ts": 5 },
            "empty": {}
        });
        let style = PayloadStyle {
            use_color: false,
            ignore: &ignore,
        };
        let pretty = serde_json::to_string_pretty(&value).expect("pretty");
        assert_eq!(render_payload(&value, style), pretty);
    }

    #[test]
    fn large_integers_keep_their_digits() {
        let ignore = IgnoreFields::new();
        let value = decode(r#"{"id":100000000000000000001,"ratio":0.10}"#);
        let style = PayloadStyle {
            use_color: false,
            ignore: &ignore,
        };
        let rendered = render_payload(&value, style);
        assert!(rendered.contains("\"id\": 100000000000000000001"));
        assert!(rendered.contains("\"ratio\": 0.10"));
    }

    #[test]
    fn colored_rendering_emits_ansi() {
        let ignore = IgnoreFields::new();
        let value = json!({"k":"v","n":1,"b":true,"z":null});
        let colored = render_payload(
            &value,
            PayloadStyle {
                use_color: true,
                ignore: &ignore,
            },
        );
        assert!(colored.contains("\u{1b}[36m\"k\"\u{1b}[0m"));
        assert!(colored.contains("\u{1b}[32m\"v\"\u{1b}[0m"));
        assert!(colored.contains("\u{1b}[33m1\u{1b}[0m"));
        assert!(colored.contains("\u{1b}[35mtrue\u{1b}[0m"));
        assert!(colored.contains("\u{1b}[39mnull\u{1b}[0m"));
    }

    #[test]
    fn ignored_fields_are_dimmed_with_their_values() {
        let ignore = IgnoreFields::from_list("ts");
        let value = json!({"id": 1, "ts": {"at": 7}});
        let colored = render_payload(
            &value,
            PayloadStyle {
                use_color: true,
                ignore: &ignore,
            },
        );
        assert!(colored.contains("\u{1b}[2m\"ts\"\u{1b}[0m"));
        assert!(colored.contains("\u{1b}[2m7\u{1b}[0m"));
        assert!(colored.contains("\u{1b}[33m1\u{1b}[0m"));
    }
}
