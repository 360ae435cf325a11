use std::io::Cursor;

use anyhow::Context as _;
use sha2::Digest as _;

use crate::{
    backend::{GenerateRequest, ImageBackend},
    foundation::{core::Canvas, error::FlipbookResult},
};

/// Offline backend: renders a diagonal gradient whose colours are derived from the prompt.
///
/// Same prompt, same image. Useful for dry runs, tests, and as the last link of a
/// [`BackendChain`](crate::BackendChain).
#[derive(Clone, Debug)]
pub struct PlaceholderBackend {
    canvas: Canvas,
}

impl PlaceholderBackend {
    /// Render images of the given size.
    pub fn new(canvas: Canvas) -> Self {
        Self { canvas }
    }
}

impl ImageBackend for PlaceholderBackend {
    fn name(&self) -> &str {
        "placeholder"
    }

    fn generate(&self, request: &GenerateRequest<'_>) -> FlipbookResult<Vec<u8>> {
        placeholder_png(request.prompt, self.canvas)
    }
}

/// Render the placeholder bitmap for `label`.
pub fn render_placeholder(label: &str, canvas: Canvas) -> image::RgbaImage {
    let digest = sha2::Sha256::digest(label.as_bytes());
    let from = [digest[0], digest[1], digest[2]];
    let to = [digest[3], digest[4], digest[5]];

    let w = canvas.width.max(1);
    let h = canvas.height.max(1);
    let span = (w + h).saturating_sub(2).max(1);

    image::RgbaImage::from_fn(w, h, |x, y| {
        let t = x + y;
        let mix = |a: u8, b: u8| -> u8 {
            let a = u32::from(a);
            let b = u32::from(b);
            ((a * (span - t) + b * t + span / 2) / span) as u8
        };
        image::Rgba([mix(from[0], to[0]), mix(from[1], to[1]), mix(from[2], to[2]), 255])
    })
}

/// Render the placeholder for `label` and encode it as PNG.
pub fn placeholder_png(label: &str, canvas: Canvas) -> FlipbookResult<Vec<u8>> {
    let img = render_placeholder(label, canvas);
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .context("encode placeholder png")?;
    Ok(buf)
}

#[cfg(test)]
#[path = "../../tests/unit/backend/placeholder.rs"]
mod tests;
