//! Image-generation backends.
//!
//! The planner and assembler never talk to a backend; only the materializer and the still-image
//! operations do, through the [`ImageBackend`] trait.

use std::{path::Path, time::Duration};

use anyhow::Context as _;

use crate::foundation::error::{FlipbookError, FlipbookResult};

/// Fallback chains over several backends.
pub mod chain;
/// Google Gemini image-generation backend (blocking HTTP).
pub mod gemini;
/// Offline backend that renders deterministic gradient images.
pub mod placeholder;

/// An input image attached to a generation request (edit, compose, style transfer).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferenceImage {
    /// MIME type, e.g. `image/png`.
    pub mime_type: String,
    /// Encoded image bytes.
    pub bytes: Vec<u8>,
}

impl ReferenceImage {
    /// Wrap encoded bytes, sniffing the MIME type from their content.
    pub fn from_bytes(bytes: Vec<u8>) -> FlipbookResult<Self> {
        let format = image::guess_format(&bytes).map_err(|e| {
            FlipbookError::invalid_request(format!("reference image format not recognized: {e}"))
        })?;
        Ok(Self {
            mime_type: format.to_mime_type().to_string(),
            bytes,
        })
    }

    /// Load an image file from disk.
    pub fn from_path(path: &Path) -> FlipbookResult<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read reference image '{}'", path.display()))?;
        Self::from_bytes(bytes)
    }
}

/// One generation call.
#[derive(Clone, Copy, Debug)]
pub struct GenerateRequest<'a> {
    /// Full prompt text.
    pub prompt: &'a str,
    /// Input images, in the order the prompt refers to them.
    pub reference_images: &'a [ReferenceImage],
    /// Upper bound for this call; `None` leaves it to the backend's own default.
    pub timeout: Option<Duration>,
}

impl<'a> GenerateRequest<'a> {
    /// Text-only request without a timeout override.
    pub fn text(prompt: &'a str) -> Self {
        Self {
            prompt,
            reference_images: &[],
            timeout: None,
        }
    }
}

/// The external image-generation capability: prompt (plus optional references) in, encoded
/// image bytes out.
///
/// Implementations block until the image is ready or the request fails. One call is one
/// attempt; retry policy belongs to the caller.
pub trait ImageBackend {
    /// Short name used in logs and aggregated errors.
    fn name(&self) -> &str;

    /// Produce one encoded image.
    fn generate(&self, request: &GenerateRequest<'_>) -> FlipbookResult<Vec<u8>>;
}

impl<B: ImageBackend + ?Sized> ImageBackend for Box<B> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn generate(&self, request: &GenerateRequest<'_>) -> FlipbookResult<Vec<u8>> {
        (**self).generate(request)
    }
}
