/// Convenience result type used across flipbook.
pub type FlipbookResult<T> = Result<T, FlipbookError>;

/// Top-level error taxonomy used by planner, materializer and assembler APIs.
#[derive(thiserror::Error, Debug)]
pub enum FlipbookError {
    /// Caller supplied an out-of-range or malformed request. Raised before any work begins.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Nothing to encode: zero frames reached the assembler.
    #[error("empty sequence: no frames to assemble")]
    EmptySequence,

    /// One generation attempt against an image backend failed.
    #[error("backend error: {0}")]
    Backend(String),

    /// Persisting or reading a stored frame failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// The animation encoder rejected a frame or failed to finish.
    #[error("encode error: {0}")]
    Encode(String),

    /// The run was cancelled by the caller or ran past its deadline.
    #[error("cancelled")]
    Cancelled,

    /// Environment configuration could not be parsed.
    #[error("config error: {0}")]
    Config(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FlipbookError {
    /// Build a [`FlipbookError::InvalidRequest`] value.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Build a [`FlipbookError::Backend`] value.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Build a [`FlipbookError::Storage`] value.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Build a [`FlipbookError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`FlipbookError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
