//! Animation encoders.
//!
//! Sinks consume assembled frames in display order.

/// `ffmpeg`-based MP4 sink.
pub mod ffmpeg;
/// Animated GIF sink.
pub mod gif;
/// Sink trait and the in-memory sink.
pub mod sink;
