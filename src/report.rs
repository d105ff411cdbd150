//! Purpose: Render a diff outcome as console text or as one JSON document.
//! Exports: `TextContext`, `render_text`, `outcome_json`, `colorize_label`, `AnsiColor`.
//! Role: Output layer for `main.rs`; the library returns data, this module decides wording.
//! Invariants: Exact matches print only `The files are exact matches.`.
//! Invariants: `Match!` closes the text report only when no URL diverged.
//! Invariants: JSON output keys are stable; fields are additive-only.
use capdiff::core::compare::{IgnoreFields, Mismatch};
use capdiff::core::diff::{Comparison, DiffOutcome, Divergence, MismatchReport};
use serde_json::{Map, Value, json};

use crate::color_json::{PayloadStyle, render_payload};

pub const EXACT_MATCH_LINE: &str = "The files are exact matches.";
pub const MATCH_LINE: &str = "Match!";

#[derive(Copy, Clone, Debug)]
pub enum AnsiColor {
    Red,
    Yellow,
    Green,
}

pub fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
        AnsiColor::Green => "32",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

pub struct TextContext<'a> {
    pub left_name: &'a str,
    pub right_name: &'a str,
    pub use_color: bool,
    pub show_payloads: bool,
    pub ignore: &'a IgnoreFields,
}

pub fn render_text(outcome: &DiffOutcome, ctx: &TextContext<'_>) -> String {
    let comparison = match outcome {
        DiffOutcome::ExactMatch => return format!("{EXACT_MATCH_LINE}\n"),
        DiffOutcome::Compared(comparison) => comparison,
    };

    let mut out = String::new();
    for report in &comparison.reports {
        render_report(report, ctx, &mut out);
    }
    for url in &comparison.right_only {
        out.push_str(&format!("Only in {}: {url}\n", ctx.right_name));
    }
    out.push_str(&closing_line(comparison, ctx.use_color));
    out.push('\n');
    out
}

fn render_report(report: &MismatchReport, ctx: &TextContext<'_>, out: &mut String) {
    let url = &report.url;
    match &report.divergence {
        Divergence::Mismatch(mismatch) => {
            let label = colorize_label("Mismatch!", ctx.use_color, AnsiColor::Red);
            out.push_str(&format!("{label} {url}\n"));
            out.push_str(&format!(
                "{} doesn't match {}\n",
                ctx.left_name, ctx.right_name
            ));
            out.push_str(&format!("{mismatch}\n"));
            if ctx.show_payloads {
                let style = PayloadStyle {
                    use_color: ctx.use_color,
                    ignore: ctx.ignore,
                };
                out.push_str(&render_payload(&report.left, style));
                out.push('\n');
                if let Some(right) = &report.right {
                    out.push_str(&render_payload(right, style));
                    out.push('\n');
                }
            }
        }
        Divergence::MissingCounterpart => {
            let label = colorize_label("Missing!", ctx.use_color, AnsiColor::Yellow);
            out.push_str(&format!("{label} {url}\n"));
            out.push_str(&format!("{url} is absent from {}\n", ctx.right_name));
        }
        Divergence::DiagnosticFailed { message } => {
            let label = colorize_label("Mismatch!", ctx.use_color, AnsiColor::Red);
            out.push_str(&format!("{label} {url}\n"));
            out.push_str(&format!("diagnostic failed: {message}\n"));
        }
    }
}

fn closing_line(comparison: &Comparison, use_color: bool) -> String {
    if comparison.has_divergence() {
        format!(
            "{} of {} URLs differ.",
            comparison.reports.len(),
            comparison.compared
        )
    } else {
        colorize_label(MATCH_LINE, use_color, AnsiColor::Green)
    }
}

pub fn outcome_json(outcome: &DiffOutcome) -> Value {
    let comparison = match outcome {
        DiffOutcome::ExactMatch => {
            return json!({
                "result": "exact-match",
                "compared": 0,
                "mismatched": 0,
                "reports": [],
                "right_only": [],
            });
        }
        DiffOutcome::Compared(comparison) => comparison,
    };

    let result = if comparison.has_divergence() {
        "mismatch"
    } else {
        "match"
    };
    let reports: Vec<Value> = comparison.reports.iter().map(report_json).collect();
    json!({
        "result": result,
        "compared": comparison.compared,
        "mismatched": comparison.reports.len(),
        "reports": reports,
        "right_only": comparison.right_only,
    })
}

fn report_json(report: &MismatchReport) -> Value {
    let mut inner = Map::new();
    inner.insert("url".to_string(), json!(report.url));
    match &report.divergence {
        Divergence::Mismatch(mismatch) => {
            inner.insert("status".to_string(), json!("mismatch"));
            inner.insert("mismatch".to_string(), mismatch_json(mismatch));
        }
        Divergence::MissingCounterpart => {
            inner.insert("status".to_string(), json!("missing"));
        }
        Divergence::DiagnosticFailed { message } => {
            inner.insert("status".to_string(), json!("diagnostic-failed"));
            inner.insert("message".to_string(), json!(message));
        }
    }
    inner.insert("left".to_string(), report.left.clone());
    inner.insert(
        "right".to_string(),
        report.right.clone().unwrap_or(Value::Null),
    );
    Value::Object(inner)
}

/// Absent sides are omitted and named by `absent`.
fn mismatch_json(mismatch: &Mismatch) -> Value {
    let mut inner = Map::new();
    let kind = serde_json::to_value(mismatch.kind).unwrap_or(Value::Null);
    inner.insert("kind".to_string(), kind);
    inner.insert("path".to_string(), json!(mismatch.path.to_string()));
    for (side, value) in [("expected", &mismatch.expected), ("actual", &mismatch.actual)] {
        match value {
            Some(value) => {
                inner.insert(side.to_string(), value.clone());
            }
            None => {
                inner.insert("absent".to_string(), json!(side));
            }
        }
    }
    inner.insert("message".to_string(), json!(mismatch.to_string()));
    Value::Object(inner)
}
