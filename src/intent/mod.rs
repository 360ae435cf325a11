//! Motion intent: which kind of movement a prompt describes.

pub mod classify;
