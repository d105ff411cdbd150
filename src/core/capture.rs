//! Purpose: Parse capture logs (alternating URL / CONTENTS records) into payload maps.
//! Exports: `PayloadMap`, `CaptureScanner`, `CaptureStats`, `LineClass`, `parse`, `parse_with_stats`.
//! Role: Single forward pass over one log; decoding of each record is delegated to `json::parse`.
//! Invariants: Blank and whitespace-only lines never consume a record slot.
//! Invariants: `URL:` drops any pending URL; `CONTENTS:` keeps it.
//! Invariants: Duplicate URLs are last-write-wins; the map is complete before it is returned.
use std::collections::BTreeMap;
use std::io::BufRead;

use bstr::ByteSlice;
use serde_json::Value;

use crate::core::error::{Error, ErrorKind};
use crate::json::parse::{Decoded, decode_detailed};

pub type PayloadMap = BTreeMap<String, Value>;

const URL_MARKER: &str = "URL:";
const CONTENTS_MARKER: &str = "CONTENTS:";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LineClass<'a> {
    Blank,
    UrlMarker,
    ContentsMarker,
    Data(&'a str),
}

/// Classifies one line. The line terminator (`\n` or `\r\n`) is optional.
pub fn classify_line(line: &str) -> LineClass<'_> {
    let line = strip_terminator(line);
    match line {
        URL_MARKER => LineClass::UrlMarker,
        CONTENTS_MARKER => LineClass::ContentsMarker,
        _ => {
            let data = line.trim();
            if data.is_empty() {
                LineClass::Blank
            } else {
                LineClass::Data(data)
            }
        }
    }
}

fn strip_terminator(line: &str) -> &str {
    match line.strip_suffix('\n') {
        Some(rest) => rest.strip_suffix('\r').unwrap_or(rest),
        None => line,
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
enum ScanState {
    #[default]
    AwaitingUrl,
    AwaitingContents {
        url: String,
    },
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CaptureStats {
    pub records: usize,
    pub overwritten: usize,
    pub not_json: usize,
    pub jsonp: usize,
    pub dropped_partial: Option<String>,
}

/// Incremental line consumer behind `parse`; usable directly for in-memory input.
#[derive(Debug, Default)]
pub struct CaptureScanner {
    state: ScanState,
    payloads: PayloadMap,
    stats: CaptureStats,
}

impl CaptureScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_url(&self) -> Option<&str> {
        match &self.state {
            ScanState::AwaitingUrl => None,
            ScanState::AwaitingContents { url } => Some(url),
        }
    }

    pub fn push_line(&mut self, line: &str) {
        match classify_line(line) {
            LineClass::Blank | LineClass::ContentsMarker => {}
            LineClass::UrlMarker => {
                if let Some(url) = self.pending_url() {
                    tracing::debug!(url, "URL marker discarded pending record");
                }
                self.state = ScanState::AwaitingUrl;
            }
            LineClass::Data(data) => match std::mem::take(&mut self.state) {
                ScanState::AwaitingUrl => {
                    self.state = ScanState::AwaitingContents {
                        url: data.to_string(),
                    };
                }
                ScanState::AwaitingContents { url } => self.store(url, data),
            },
        }
    }

    fn store(&mut self, url: String, contents: &str) {
        let decoded = decode_detailed(contents);
        if decoded.is_not_json() {
            self.stats.not_json += 1;
            tracing::debug!(url = %url, "record contents are not JSON");
        } else if matches!(decoded, Decoded::Jsonp { .. }) {
            self.stats.jsonp += 1;
        }
        self.stats.records += 1;
        if self.payloads.insert(url, decoded.into_value()).is_some() {
            self.stats.overwritten += 1;
        }
    }

    pub fn finish(mut self) -> (PayloadMap, CaptureStats) {
        if let ScanState::AwaitingContents { url } = self.state {
            tracing::debug!(url = %url, "capture log ended before record contents");
            self.stats.dropped_partial = Some(url);
        }
        (self.payloads, self.stats)
    }
}

pub fn parse<R: BufRead>(reader: R) -> Result<PayloadMap, Error> {
    parse_with_stats(reader).map(|(payloads, _)| payloads)
}

pub fn parse_with_stats<R: BufRead>(mut reader: R) -> Result<(PayloadMap, CaptureStats), Error> {
    let mut scanner = CaptureScanner::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = reader.read_until(b'\n', &mut buf).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to read capture log")
                .with_source(err)
        })?;
        if read == 0 {
            break;
        }
        scanner.push_line(&buf.to_str_lossy());
    }
    Ok(scanner.finish())
}

#[cfg(test)]
mod tests {
    use super::{CaptureScanner, LineClass, classify_line, parse, parse_with_stats};
    use serde_json::json;
    use std::io::Cursor;

    fn parse_str(text: &str) -> super::PayloadMap {
        parse(Cursor::new(text.as_bytes())).expect("parse")
    }

    #[test]
    fn classify_recognizes_markers_literally() {
        assert_eq!(classify_line("URL:\n"), LineClass::UrlMarker);
        assert_eq!(classify_line("URL:\r\n"), LineClass::UrlMarker);
        assert_eq!(classify_line("CONTENTS:\n"), LineClass::ContentsMarker);
        assert_eq!(classify_line("\n"), LineClass::Blank);
        assert_eq!(classify_line("   \t\n"), LineClass::Blank);
        assert_eq!(classify_line(" URL:\n"), LineClass::Data("URL:"));
        assert_eq!(classify_line("  http://x  \n"), LineClass::Data("http://x"));
    }

    #[test]
    fn parses_single_record() {
        let payloads = parse_str("URL:\nhttp://x\nCONTENTS:\n{\"a\":1}\n");
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads["http://x"], json!({"a": 1}));
    }

    #[test]
    fn blank_lines_never_consume_a_slot() {
        let payloads = parse_str("\nURL:\n\n\nhttp://x\n\nCONTENTS:\n\n  {\"a\":1}  \n\n");
        assert_eq!(payloads["http://x"], json!({"a": 1}));
    }

    #[test]
    fn url_marker_drops_pending_url() {
        let payloads = parse_str("URL:\nhttp://stale\nURL:\nhttp://fresh\nCONTENTS:\n[1]\n");
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads["http://fresh"], json!([1]));
    }

    #[test]
    fn contents_marker_keeps_pending_url() {
        let payloads = parse_str("URL:\nhttp://x\nCONTENTS:\nCONTENTS:\ntrue\n");
        assert_eq!(payloads["http://x"], json!(true));
    }

    #[test]
    fn markers_are_optional_for_alternating_data() {
        let payloads = parse_str("http://a\n1\nhttp://b\n2\n");
        assert_eq!(payloads["http://a"], json!(1));
        assert_eq!(payloads["http://b"], json!(2));
    }

    #[test]
    fn duplicate_urls_are_last_write_wins() {
        let (payloads, stats) = parse_with_stats(Cursor::new(
            "URL:\nhttp://x\nCONTENTS:\n1\nURL:\nhttp://x\nCONTENTS:\n2\n",
        ))
        .expect("parse");
        assert_eq!(payloads["http://x"], json!(2));
        assert_eq!(stats.records, 2);
        assert_eq!(stats.overwritten, 1);
    }

    #[test]
    fn crlf_logs_parse_like_lf_logs() {
        let payloads = parse_str("URL:\r\nhttp://x\r\nCONTENTS:\r\n{\"a\":1}\r\n");
        assert_eq!(payloads["http://x"], json!({"a": 1}));
    }

    #[test]
    fn undecodable_contents_become_sentinel() {
        let (payloads, stats) =
            parse_with_stats(Cursor::new("URL:\nhttp://x\nCONTENTS:\nnot json at all\n"))
                .expect("parse");
        assert_eq!(
            payloads["http://x"],
            json!({"error": "not json", "content": "not json at all"})
        );
        assert_eq!(stats.not_json, 1);
    }

    #[test]
    fn jsonp_contents_are_unwrapped() {
        let (payloads, stats) =
            parse_with_stats(Cursor::new("URL:\nhttp://x\nCONTENTS:\ncb({\"x\":1});\n"))
                .expect("parse");
        assert_eq!(payloads["http://x"], json!({"x": 1}));
        assert_eq!(stats.jsonp, 1);
    }

    #[test]
    fn trailing_partial_record_is_dropped() {
        let (payloads, stats) =
            parse_with_stats(Cursor::new("URL:\nhttp://a\nCONTENTS:\n1\nURL:\nhttp://b\n"))
                .expect("parse");
        assert_eq!(payloads.len(), 1);
        assert_eq!(stats.dropped_partial.as_deref(), Some("http://b"));
    }

    #[test]
    fn invalid_utf8_is_decoded_lossily() {
        let mut bytes = b"URL:\nhttp://x\nCONTENTS:\n".to_vec();
        bytes.extend_from_slice(&[0xff, b'{', b'}', b'\n']);
        let payloads = parse(Cursor::new(bytes)).expect("parse");
        let value = &payloads["http://x"];
        assert_eq!(value["error"], json!("not json"));
        assert_eq!(value["content"], json!("\u{fffd}{}"));
    }

    #[test]
    fn scanner_tracks_pending_url() {
        let mut scanner = CaptureScanner::new();
        scanner.push_line("URL:");
        assert_eq!(scanner.pending_url(), None);
        scanner.push_line("http://x");
        assert_eq!(scanner.pending_url(), Some("http://x"));
        scanner.push_line("CONTENTS:");
        assert_eq!(scanner.pending_url(), Some("http://x"));
        scanner.push_line("{}");
        assert_eq!(scanner.pending_url(), None);
        let (payloads, stats) = scanner.finish();
        assert_eq!(payloads["http://x"], json!({}));
        assert_eq!(stats.dropped_partial, None);
    }
}
