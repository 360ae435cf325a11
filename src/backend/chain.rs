use tracing::warn;

use crate::{
    backend::{GenerateRequest, ImageBackend},
    foundation::error::{FlipbookError, FlipbookResult},
};

/// Ordered list of backends tried one after another for every call.
///
/// The first backend that returns an image wins. When all fail, the error lists each backend's
/// failure in order.
pub struct BackendChain {
    name: String,
    backends: Vec<Box<dyn ImageBackend>>,
}

impl BackendChain {
    /// Build a chain. An empty chain fails every call.
    pub fn new(backends: Vec<Box<dyn ImageBackend>>) -> Self {
        let name = backends
            .iter()
            .map(|b| b.name())
            .collect::<Vec<_>>()
            .join(" -> ");
        Self { name, backends }
    }

    /// Number of backends in the chain.
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// Whether the chain has no backends.
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

impl ImageBackend for BackendChain {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate(&self, request: &GenerateRequest<'_>) -> FlipbookResult<Vec<u8>> {
        let mut failures = Vec::with_capacity(self.backends.len());
        for backend in &self.backends {
            match backend.generate(request) {
                Ok(bytes) => return Ok(bytes),
                Err(e) => {
                    warn!(backend = backend.name(), error = %e, "backend failed, trying next");
                    failures.push(format!("{}: {e}", backend.name()));
                }
            }
        }

        if failures.is_empty() {
            return Err(FlipbookError::backend("no backends configured"));
        }
        Err(FlipbookError::backend(format!(
            "all backends failed ({})",
            failures.join("; ")
        )))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/backend/chain.rs"]
mod tests;
