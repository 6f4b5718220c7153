//! The recording pipeline.
//!
//! Producers render and capture frames concurrently, bounded by the page pool; the ordered writer
//! streams the results to the encoder strictly by frame index; the session ties both to the
//! encoder subprocess and the pool teardown.

/// Per-frame production: acquire a page, render, capture, release.
pub mod producer;
/// Per-frame progress reporting.
pub mod progress;
/// Caller-supplied render, preparation, and capture-wrapping hooks.
pub mod script;
/// Top-level recording session.
pub mod session;
/// Strictly ordered frame-to-stream writer.
pub mod writer;
