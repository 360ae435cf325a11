use anyhow::Context as _;
use image::imageops::FilterType;
use tracing::{debug, info};

use crate::{
    encode::sink::{AnimationSink, OutputArtifact, SinkConfig},
    foundation::{
        core::{Canvas, LoopCount},
        error::{FlipbookError, FlipbookResult},
    },
    store::frames::{FrameHandle, FrameStore},
};

/// Encoding parameters shared by every frame of one animation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AssembleOptions {
    /// Output size; every frame is cover-fitted to it.
    pub canvas: Canvas,
    /// Display time of each frame in milliseconds.
    pub delay_ms: u32,
    /// Encoding quality, 1..=100.
    pub quality: u8,
    /// Loop behaviour.
    pub loop_count: LoopCount,
}

impl AssembleOptions {
    fn sink_config(&self) -> SinkConfig {
        SinkConfig {
            canvas: self.canvas,
            delay_ms: self.delay_ms,
            quality: self.quality,
            loop_count: self.loop_count,
        }
    }
}

/// Encode stored frames, in the given order, into one animation.
///
/// Fails with [`FlipbookError::EmptySequence`] before touching the sink when `frames` is empty.
/// Every frame is decoded and cover-fitted to the canvas; frames are neither reordered,
/// deduplicated nor dropped. A frame that cannot be read or decoded aborts assembly.
#[tracing::instrument(skip_all, fields(frames = frames.len(), canvas = %opts.canvas))]
pub fn assemble(
    frames: &[FrameHandle],
    store: &dyn FrameStore,
    opts: &AssembleOptions,
    sink: &mut dyn AnimationSink,
) -> FlipbookResult<OutputArtifact> {
    if frames.is_empty() {
        return Err(FlipbookError::EmptySequence);
    }
    opts.canvas.validate()?;

    sink.begin(&opts.sink_config())?;
    for handle in frames {
        let bytes = store.read(handle)?;
        let bitmap = decode_cover(&bytes, opts.canvas)
            .with_context(|| format!("prepare frame '{handle}'"))?;
        debug!(frame = %handle, "appending frame");
        sink.push_frame(&bitmap)?;
    }
    let artifact = sink.end()?;

    info!(
        frames = artifact.frame_count,
        bytes = artifact.byte_len,
        delay_ms = opts.delay_ms,
        "animation assembled"
    );
    Ok(artifact)
}

/// Decode an encoded image and cover-fit it to `canvas`.
pub fn decode_cover(bytes: &[u8], canvas: Canvas) -> anyhow::Result<image::RgbaImage> {
    let img = image::load_from_memory(bytes).context("decode image from memory")?;
    Ok(cover_fit(&img, canvas))
}

/// Scale `img` preserving aspect ratio until it covers `canvas`, then centre-crop the overflow.
///
/// Never letterboxes: the result is exactly `canvas.width x canvas.height`.
pub fn cover_fit(img: &image::DynamicImage, canvas: Canvas) -> image::RgbaImage {
    if (img.width(), img.height()) == (canvas.width, canvas.height) {
        return img.to_rgba8();
    }
    img.resize_to_fill(canvas.width, canvas.height, FilterType::Lanczos3)
        .to_rgba8()
}

#[cfg(test)]
#[path = "../../tests/unit/assemble/assembler.rs"]
mod tests;
