//! Purpose: Orchestrate one comparison run between a left and a right capture log.
//! Exports: `diff`, `diff_paths`, `DiffOptions`, `PairingPolicy`, `DiffOutcome`, `Comparison`,
//! `MismatchReport`, `Divergence`.
//! Role: Digest short-circuit, parse both logs, pair records by URL, collect divergences.
//! Invariants: Byte-identical inputs never reach the parser.
//! Invariants: Both payload maps are complete before the first comparison.
//! Invariants: A failing diagnostic run for one URL never stops the remaining URLs.
use std::fs::File;
use std::io::{self, BufReader, Read, Seek};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::core::capture::{self, PayloadMap};
use crate::core::compare::{self, IgnoreFields, Mismatch};
use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum PairingPolicy {
    /// Left URLs without a right counterpart are reported and the run continues.
    #[default]
    Lenient,
    /// Left URLs without a right counterpart fail the run with `ErrorKind::Lookup`.
    Strict,
}

#[derive(Clone, Debug, Default)]
pub struct DiffOptions {
    pub ignore: IgnoreFields,
    pub pairing: PairingPolicy,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Divergence {
    Mismatch(Mismatch),
    MissingCounterpart,
    DiagnosticFailed { message: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct MismatchReport {
    pub url: String,
    pub divergence: Divergence,
    pub left: Value,
    pub right: Option<Value>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Comparison {
    /// Number of left URLs examined.
    pub compared: usize,
    pub reports: Vec<MismatchReport>,
    /// URLs recorded only in the right log; informational.
    pub right_only: Vec<String>,
}

impl Comparison {
    pub fn matched(&self) -> usize {
        self.compared.saturating_sub(self.reports.len())
    }

    pub fn has_divergence(&self) -> bool {
        !self.reports.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DiffOutcome {
    ExactMatch,
    Compared(Comparison),
}

impl DiffOutcome {
    pub fn is_match(&self) -> bool {
        match self {
            DiffOutcome::ExactMatch => true,
            DiffOutcome::Compared(comparison) => !comparison.has_divergence(),
        }
    }
}

pub fn diff_paths(left: &Path, right: &Path, options: &DiffOptions) -> Result<DiffOutcome, Error> {
    let mut left_file = open_capture(left)?;
    let mut right_file = open_capture(right)?;
    diff(&mut left_file, &mut right_file, options)
}

fn open_capture(path: &Path) -> Result<File, Error> {
    File::open(path).map_err(|err| {
        let kind = if err.kind() == io::ErrorKind::NotFound {
            ErrorKind::NotFound
        } else {
            ErrorKind::Io
        };
        Error::new(kind)
            .with_message("failed to open capture log")
            .with_path(path)
            .with_source(err)
    })
}

pub fn diff<L, R>(left: &mut L, right: &mut R, options: &DiffOptions) -> Result<DiffOutcome, Error>
where
    L: Read + Seek,
    R: Read + Seek,
{
    let left_digest = digest(left, "left")?;
    let right_digest = digest(right, "right")?;
    if left_digest == right_digest {
        tracing::debug!("capture logs are byte-identical; skipping parse");
        return Ok(DiffOutcome::ExactMatch);
    }

    let left_payloads = load(left, "left")?;
    let right_payloads = load(right, "right")?;
    compare_payloads(&left_payloads, &right_payloads, options).map(DiffOutcome::Compared)
}

fn digest<S: Read>(source: &mut S, side: &str) -> Result<Vec<u8>, Error> {
    let mut hasher = Sha256::new();
    io::copy(source, &mut hasher).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message(format!("failed to read {side} capture log"))
            .with_source(err)
    })?;
    Ok(hasher.finalize().to_vec())
}

fn load<S: Read + Seek>(source: &mut S, side: &str) -> Result<PayloadMap, Error> {
    source.rewind().map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message(format!("failed to rewind {side} capture log"))
            .with_source(err)
    })?;
    let (payloads, stats) = capture::parse_with_stats(BufReader::new(source))?;
    tracing::debug!(
        side,
        urls = payloads.len(),
        records = stats.records,
        overwritten = stats.overwritten,
        jsonp = stats.jsonp,
        not_json = stats.not_json,
        "parsed capture log"
    );
    if let Some(url) = &stats.dropped_partial {
        tracing::warn!(side, url = %url, "capture log ends with a URL that has no contents");
    }
    Ok(payloads)
}

/// Pairs left entries with right entries by URL and collects every divergence.
pub fn compare_payloads(
    left: &PayloadMap,
    right: &PayloadMap,
    options: &DiffOptions,
) -> Result<Comparison, Error> {
    compare_payloads_with(left, right, options, compare::assert_equal)
}

fn compare_payloads_with<F>(
    left: &PayloadMap,
    right: &PayloadMap,
    options: &DiffOptions,
    check: F,
) -> Result<Comparison, Error>
where
    F: Fn(&Value, &Value, &IgnoreFields) -> Result<(), Mismatch>,
{
    let mut comparison = Comparison::default();

    for (url, payload) in left {
        comparison.compared += 1;
        let Some(counterpart) = right.get(url) else {
            if options.pairing == PairingPolicy::Strict {
                return Err(Error::new(ErrorKind::Lookup)
                    .with_message("URL has no counterpart in the right capture log")
                    .with_url(url.clone())
                    .with_hint("Drop --strict-pairing to report missing URLs and keep comparing."));
            }
            tracing::warn!(url = %url, "URL missing from right capture log");
            comparison.reports.push(MismatchReport {
                url: url.clone(),
                divergence: Divergence::MissingCounterpart,
                left: payload.clone(),
                right: None,
            });
            continue;
        };

        if compare::equal(payload, counterpart, &options.ignore) {
            continue;
        }
        comparison.reports.push(MismatchReport {
            url: url.clone(),
            divergence: explain_with(url, payload, counterpart, &options.ignore, &check),
            left: payload.clone(),
            right: Some(counterpart.clone()),
        });
    }

    comparison.right_only = right
        .keys()
        .filter(|url| !left.contains_key(*url))
        .cloned()
        .collect();

    Ok(comparison)
}

fn explain_with<F>(
    url: &str,
    left: &Value,
    right: &Value,
    ignore: &IgnoreFields,
    check: &F,
) -> Divergence
where
    F: Fn(&Value, &Value, &IgnoreFields) -> Result<(), Mismatch>,
{
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| check(left, right, ignore)));
    match outcome {
        Ok(Err(mismatch)) => Divergence::Mismatch(mismatch),
        Ok(Ok(())) => {
            tracing::error!(url, "diagnostic comparison found no divergence");
            Divergence::DiagnosticFailed {
                message: "diagnostic comparison found no divergence".to_string(),
            }
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(url, message = %message, "diagnostic comparison panicked");
            Divergence::DiagnosticFailed { message }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "diagnostic comparison panicked".to_string()
}
