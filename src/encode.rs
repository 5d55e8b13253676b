//! Encoding sessions and video writers.
//!
//! A session drives a [`writer::VideoWriter`] in timeline order; the writer owns codec and
//! container work.

/// `ffmpeg`-backed writer (H.264 via the system `ffmpeg`).
pub mod ffmpeg;
/// Readiness backoff.
pub mod readiness;
/// Session lifecycle and append contract.
pub mod session;
/// Output format and per-session configuration.
pub mod settings;
/// Writer trait and the in-memory writer.
pub mod writer;
