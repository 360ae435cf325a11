//! Encoding defaults by frame count, and named output presets.

pub mod resolve;
