use std::ops::RangeInclusive;

use crate::{
    foundation::{
        core::{Canvas, LoopCount},
        error::{FlipbookError, FlipbookResult},
    },
    intent::classify::{MotionCategory, MotionChoice},
    settings::resolve::{Preset, resolve_defaults},
};

/// Accepted frame counts.
pub const FRAME_COUNT_RANGE: RangeInclusive<u32> = 2..=20;
/// Accepted per-frame delays in milliseconds.
pub const DELAY_MS_RANGE: RangeInclusive<u32> = 100..=2000;
/// Accepted encoding qualities.
pub const QUALITY_RANGE: RangeInclusive<u8> = 1..=100;

/// A fully specified animation request.
///
/// Build one with [`AnimationRequest::builder`]; `build` validates every field and rejects
/// out-of-range values instead of clamping them.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnimationRequest {
    /// Prompt describing the subject and its motion.
    pub base_prompt: String,
    /// Number of frames to plan and generate.
    pub frame_count: u32,
    /// Explicit motion category, or `Auto` to classify the prompt.
    pub motion: MotionChoice,
    /// Output size.
    pub canvas: Canvas,
    /// Per-frame delay in milliseconds.
    pub delay_ms: u32,
    /// Encoding quality, 1..=100.
    pub quality: u8,
    /// Loop behaviour of the encoded animation.
    pub loop_count: LoopCount,
}

impl AnimationRequest {
    /// Start a request for `base_prompt` with 4 frames, 512x512, auto motion and resolver
    /// defaults for delay and quality.
    pub fn builder(base_prompt: impl Into<String>) -> AnimationRequestBuilder {
        AnimationRequestBuilder {
            base_prompt: base_prompt.into(),
            frame_count: 4,
            motion: MotionChoice::Auto,
            canvas: Canvas {
                width: 512,
                height: 512,
            },
            delay_ms: None,
            quality: None,
            loop_count: LoopCount::Infinite,
        }
    }

    /// Check every bound. Called before any planning or generation work.
    pub fn validate(&self) -> FlipbookResult<()> {
        if self.base_prompt.trim().is_empty() {
            return Err(FlipbookError::invalid_request("prompt must be non-empty"));
        }
        if !FRAME_COUNT_RANGE.contains(&self.frame_count) {
            return Err(FlipbookError::invalid_request(format!(
                "frame count must be in {}..={}, got {}",
                FRAME_COUNT_RANGE.start(),
                FRAME_COUNT_RANGE.end(),
                self.frame_count
            )));
        }
        self.canvas.validate()?;
        if !DELAY_MS_RANGE.contains(&self.delay_ms) {
            return Err(FlipbookError::invalid_request(format!(
                "delay must be in {}..={} ms, got {}",
                DELAY_MS_RANGE.start(),
                DELAY_MS_RANGE.end(),
                self.delay_ms
            )));
        }
        if !QUALITY_RANGE.contains(&self.quality) {
            return Err(FlipbookError::invalid_request(format!(
                "quality must be in {}..={}, got {}",
                QUALITY_RANGE.start(),
                QUALITY_RANGE.end(),
                self.quality
            )));
        }
        if self.loop_count == LoopCount::Repeat(0) {
            return Err(FlipbookError::invalid_request(
                "repeat count must be at least 1 (use Infinite for endless looping)",
            ));
        }
        Ok(())
    }

    /// The concrete motion category for this request.
    pub fn category(&self) -> MotionCategory {
        self.motion.resolve(&self.base_prompt)
    }
}

/// Builder for [`AnimationRequest`].
#[derive(Clone, Debug)]
pub struct AnimationRequestBuilder {
    base_prompt: String,
    frame_count: u32,
    motion: MotionChoice,
    canvas: Canvas,
    delay_ms: Option<u32>,
    quality: Option<u8>,
    loop_count: LoopCount,
}

impl AnimationRequestBuilder {
    /// Seed frame count, canvas, delay and quality from a preset. Later setters override it.
    pub fn preset(mut self, preset: Preset) -> Self {
        let p = preset.params();
        self.frame_count = p.frame_count;
        self.canvas = p.canvas;
        self.delay_ms = Some(p.delay_ms);
        self.quality = Some(p.quality);
        self
    }

    /// Number of frames.
    pub fn frames(mut self, frame_count: u32) -> Self {
        self.frame_count = frame_count;
        self
    }

    /// Motion category or `Auto`.
    pub fn motion(mut self, motion: MotionChoice) -> Self {
        self.motion = motion;
        self
    }

    /// Output size. Zero sizes are rejected by `build`.
    pub fn canvas(mut self, width: u32, height: u32) -> Self {
        self.canvas = Canvas { width, height };
        self
    }

    /// Per-frame delay; when unset it comes from [`resolve_defaults`].
    pub fn delay_ms(mut self, delay_ms: u32) -> Self {
        self.delay_ms = Some(delay_ms);
        self
    }

    /// Encoding quality; when unset it comes from [`resolve_defaults`].
    pub fn quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality);
        self
    }

    /// Loop behaviour.
    pub fn loop_count(mut self, loop_count: LoopCount) -> Self {
        self.loop_count = loop_count;
        self
    }

    /// Resolve defaults and validate.
    pub fn build(self) -> FlipbookResult<AnimationRequest> {
        let defaults = resolve_defaults(self.frame_count);
        let req = AnimationRequest {
            base_prompt: self.base_prompt,
            frame_count: self.frame_count,
            motion: self.motion,
            canvas: self.canvas,
            delay_ms: self.delay_ms.unwrap_or(defaults.delay_ms),
            quality: self.quality.unwrap_or(defaults.quality),
            loop_count: self.loop_count,
        };
        req.validate()?;
        Ok(req)
    }
}
