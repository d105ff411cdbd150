//! Purpose: Library crate backing the `capdiff` CLI and its tests.
//! Exports: `core` (capture parsing, comparison, orchestration, errors), `json` (payload decoding).
//! Role: Holds every comparison rule so the binary only parses args and renders reports.
//! Invariants: Library code never writes to stdout; diagnostics go through `tracing`.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod core;
pub mod json;
