//! Encoder subprocess control.
//!
//! The argument list is derived deterministically from configuration; the process consumes raw
//! frame images on stdin and muxes them (plus optional audio) into a video container.

/// Deterministic encoder argument construction.
pub mod args;
/// Spawning, streaming into, and joining the encoder subprocess.
pub mod ffmpeg;
