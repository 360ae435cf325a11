//! Frame materialization: planned prompts in, stored images out.

/// Cooperative cancellation with an optional deadline.
pub mod cancel;
/// Sequential, retrying frame generation.
pub mod materializer;
