//! Purpose: Structural equality of decoded payloads with a global ignore-field set.
//! Exports: `IgnoreFields`, `equal`, `assert_equal`, `Mismatch`, `MismatchKind`, `JsonPath`.
//! Role: Comparator used by the diff orchestrator; boolean mode decides, diagnostic mode explains.
//! Invariants: `equal(a, b, i) == assert_equal(a, b, i).is_ok()` for every input.
//! Invariants: Ignored keys are dropped at every object level; array elements are never skipped.
//! Invariants: Diagnostic mode is depth-first, sorted object keys, ascending array indices.
//! Notes: Integer literals compare digit-exact at any magnitude; a fraction or exponent on
//! either side falls back to `f64`, so `1` equals `1.0`. Booleans are never numbers.
use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Number, Value};

const MAX_RENDERED_CHARS: usize = 200;

/// Field names excluded from comparison wherever they appear as object keys.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct IgnoreFields(BTreeSet<String>);

impl IgnoreFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from a comma-separated list; entries are trimmed and empties dropped.
    pub fn from_list(list: &str) -> Self {
        let mut fields = Self::new();
        fields.extend_from_list(list);
        fields
    }

    pub fn extend_from_list(&mut self, list: &str) {
        for name in list.split(',') {
            self.insert(name);
        }
    }

    pub fn insert(&mut self, name: &str) {
        let name = name.trim();
        if !name.is_empty() {
            self.0.insert(name.to_string());
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for IgnoreFields {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut fields = Self::new();
        for name in iter {
            fields.extend_from_list(name.as_ref());
        }
        fields
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValueKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl ValueKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
        }
    }

    fn label(self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "boolean",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Location of a value inside a payload, rendered as `$.key[0]["odd key"]`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct JsonPath(Vec<PathSegment>);

impl JsonPath {
    fn child(parent: &[PathSegment], segment: PathSegment) -> Self {
        let mut segments = parent.to_vec();
        segments.push(segment);
        Self(segments)
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for segment in &self.0 {
            match segment {
                PathSegment::Key(key) if is_plain_key(key) => write!(f, ".{key}")?,
                PathSegment::Key(key) => {
                    let quoted =
                        serde_json::to_string(key).unwrap_or_else(|_| format!("\"{key}\""));
                    write!(f, "[{quoted}]")?;
                }
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

fn is_plain_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MismatchKind {
    /// Key present on the left, absent on the right.
    MissingKey,
    /// Key present on the right, absent on the left.
    ExtraKey,
    LengthMismatch,
    TypeMismatch,
    ScalarMismatch,
}

impl MismatchKind {
    pub fn label(self) -> &'static str {
        match self {
            MismatchKind::MissingKey => "missing key",
            MismatchKind::ExtraKey => "extra key",
            MismatchKind::LengthMismatch => "length mismatch",
            MismatchKind::TypeMismatch => "type mismatch",
            MismatchKind::ScalarMismatch => "scalar mismatch",
        }
    }
}

/// First divergence found by `assert_equal`. `expected` is the left side.
#[derive(Clone, Debug, PartialEq)]
pub struct Mismatch {
    pub kind: MismatchKind,
    pub path: JsonPath,
    pub expected: Option<Value>,
    pub actual: Option<Value>,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}: ", self.kind.label(), self.path)?;
        match self.kind {
            MismatchKind::LengthMismatch => {
                let expected = array_len(self.expected.as_ref());
                let actual = array_len(self.actual.as_ref());
                write!(f, "expected {expected} elements, found {actual}")
            }
            MismatchKind::TypeMismatch => write!(
                f,
                "expected {} {}, found {} {}",
                kind_label(self.expected.as_ref()),
                render_side(self.expected.as_ref()),
                kind_label(self.actual.as_ref()),
                render_side(self.actual.as_ref()),
            ),
            _ => write!(
                f,
                "expected {}, found {}",
                render_side(self.expected.as_ref()),
                render_side(self.actual.as_ref()),
            ),
        }
    }
}

impl std::error::Error for Mismatch {}

fn array_len(value: Option<&Value>) -> usize {
    value.and_then(Value::as_array).map_or(0, Vec::len)
}

fn kind_label(value: Option<&Value>) -> &'static str {
    value.map_or("nothing", |value| ValueKind::of(value).label())
}

fn render_side(value: Option<&Value>) -> String {
    match value {
        Some(value) => render_compact(value),
        None => "<absent>".to_string(),
    }
}

/// Compact JSON rendering, truncated for one-line explanations.
pub fn render_compact(value: &Value) -> String {
    let text = value.to_string();
    if text.chars().count() <= MAX_RENDERED_CHARS {
        return text;
    }
    let mut truncated: String = text.chars().take(MAX_RENDERED_CHARS).collect();
    truncated.push('…');
    truncated
}

pub fn equal(left: &Value, right: &Value, ignore: &IgnoreFields) -> bool {
    match (left, right) {
        (Value::Object(left), Value::Object(right)) => objects_equal(left, right, ignore),
        (Value::Array(left), Value::Array(right)) => {
            left.len() == right.len()
                && left
                    .iter()
                    .zip(right)
                    .all(|(left, right)| equal(left, right, ignore))
        }
        _ => scalars_equal(left, right),
    }
}

fn objects_equal(left: &Map<String, Value>, right: &Map<String, Value>, ignore: &IgnoreFields) -> bool {
    let kept = |key: &&String| !ignore.contains(key);
    if left.keys().filter(kept).count() != right.keys().filter(kept).count() {
        return false;
    }
    left.iter()
        .filter(|(key, _)| !ignore.contains(key))
        .all(|(key, left)| {
            right
                .get(key)
                .is_some_and(|right| equal(left, right, ignore))
        })
}

fn scalars_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(left), Value::Bool(right)) => left == right,
        (Value::Number(left), Value::Number(right)) => numbers_equal(left, right),
        (Value::String(left), Value::String(right)) => left == right,
        _ => false,
    }
}

fn numbers_equal(left: &Number, right: &Number) -> bool {
    let left_text = left.to_string();
    let right_text = right.to_string();
    if let (Some(left), Some(right)) = (integer_digits(&left_text), integer_digits(&right_text)) {
        return left == right;
    }
    if left_text == right_text {
        return true;
    }
    match (left.as_f64(), right.as_f64()) {
        (Some(left), Some(right)) => left == right,
        _ => false,
    }
}

/// Sign and significant digits of an integer literal; `None` for fractions and exponents.
fn integer_digits(text: &str) -> Option<(bool, &str)> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match digits.trim_start_matches('0') {
        "" => Some((false, "0")),
        significant => Some((negative, significant)),
    }
}

pub fn assert_equal(left: &Value, right: &Value, ignore: &IgnoreFields) -> Result<(), Mismatch> {
    let mut path = Vec::new();
    check(left, right, ignore, &mut path)
}

fn check(
    left: &Value,
    right: &Value,
    ignore: &IgnoreFields,
    path: &mut Vec<PathSegment>,
) -> Result<(), Mismatch> {
    match (left, right) {
        (Value::Object(left_map), Value::Object(right_map)) => {
            let keys: BTreeSet<&String> = left_map
                .keys()
                .chain(right_map.keys())
                .filter(|key| !ignore.contains(key))
                .collect();
            for key in keys {
                match (left_map.get(key), right_map.get(key)) {
                    (Some(left_value), Some(right_value)) => {
                        path.push(PathSegment::Key(key.clone()));
                        check(left_value, right_value, ignore, path)?;
                        path.pop();
                    }
                    (Some(left_value), None) => {
                        return Err(Mismatch {
                            kind: MismatchKind::MissingKey,
                            path: JsonPath::child(path, PathSegment::Key(key.clone())),
                            expected: Some(left_value.clone()),
                            actual: None,
                        });
                    }
                    (None, Some(right_value)) => {
                        return Err(Mismatch {
                            kind: MismatchKind::ExtraKey,
                            path: JsonPath::child(path, PathSegment::Key(key.clone())),
                            expected: None,
                            actual: Some(right_value.clone()),
                        });
                    }
                    (None, None) => {}
                }
            }
            Ok(())
        }
        (Value::Array(left_items), Value::Array(right_items)) => {
            if left_items.len() != right_items.len() {
                return Err(mismatch_here(MismatchKind::LengthMismatch, path, left, right));
            }
            for (index, (left_item, right_item)) in left_items.iter().zip(right_items).enumerate() {
                path.push(PathSegment::Index(index));
                check(left_item, right_item, ignore, path)?;
                path.pop();
            }
            Ok(())
        }
        _ if ValueKind::of(left) != ValueKind::of(right) => {
            Err(mismatch_here(MismatchKind::TypeMismatch, path, left, right))
        }
        _ if scalars_equal(left, right) => Ok(()),
        _ => Err(mismatch_here(MismatchKind::ScalarMismatch, path, left, right)),
    }
}

fn mismatch_here(kind: MismatchKind, path: &[PathSegment], left: &Value, right: &Value) -> Mismatch {
    Mismatch {
        kind,
        path: JsonPath(path.to_vec()),
        expected: Some(left.clone()),
        actual: Some(right.clone()),
    }
}
