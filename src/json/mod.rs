//! Purpose: JSON decoding boundary for captured response payloads.
//! Exports: `parse` module with the JSON/JSONP decoder and sentinel helpers.
//! Role: Single seam for payload decoding so the capture parser stays format-agnostic.
//! Invariants: Every payload text decodes to a value; failures become the sentinel record.
//! Invariants: Helper APIs stay small and deterministic (no hidden global state).

pub mod parse;
