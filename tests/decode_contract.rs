//! Purpose: Lock decoder contract expectations with corpus + differential coverage.
//! Exports: Integration tests only (no runtime exports).
//! Role: Catch drift between the payload decoder and a plain serde_json baseline.
//! Invariants: Valid JSON decodes exactly as serde_json parses it.
//! Invariants: `name(body);` decodes like `body`; everything else becomes the sentinel.

use capdiff::json::parse::{decode, not_json};
use serde_json::{Value, json};

fn assert_differential_parity(input: &str) {
    let baseline: Value = serde_json::from_str(input).expect("corpus entry is valid JSON");
    assert_eq!(decode(input), baseline, "decoder drifted for {input}");
}

#[test]
fn corpus_valid_payloads_match_serde() {
    let corpus = [
        r#"{"a":1,"b":"ok"}"#,
        r#"[1,2,3,{"x":true}]"#,
        r#"{"nested":{"arr":[{"k":"v"}]}}"#,
        r#"{"unicode":"☃"}"#,
        r#"  {"padded": null}  "#,
        "0",
        "-1.5e3",
        "null",
    ];

    for case in corpus {
        assert_differential_parity(case);
    }
}

#[test]
fn corpus_duplicate_keys_matches_serde() {
    assert_differential_parity(r#"{"a":1,"a":2}"#);
}

#[test]
fn jsonp_wrapped_corpus_decodes_like_body() {
    let bodies = [r#"{"x":1}"#, "[1,2]", r#""s""#, "true"];
    for body in bodies {
        for callback in ["cb", "jQuery_1234", "_", "0x"] {
            let wrapped = format!("{callback}({body});");
            assert_eq!(decode(&wrapped), decode(body), "{wrapped}");
        }
    }
}

#[test]
fn non_json_corpus_becomes_sentinel() {
    let corpus = [
        "not json at all",
        "<html></html>",
        "{\"a\":",
        "cb({\"x\":1})",
        "(1);",
        "cb(1); cb(2);",
        "NaN",
    ];
    for case in corpus {
        assert_eq!(decode(case), not_json(case), "{case}");
        assert_eq!(decode(case), json!({"error": "not json", "content": case}));
    }
}

#[test]
fn deep_nesting_within_parser_limit_matches_serde() {
    let depth = 100usize;
    let input = format!("{}{}", "[".repeat(depth), "]".repeat(depth));
    assert_differential_parity(&input);
}
