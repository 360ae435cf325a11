//! flipbook turns one prompt into an animated image.
//!
//! A generative-image API draws the individual frames; flipbook decides what each frame should
//! show and stitches the results into a looping animation.
//!
//! # Pipeline overview
//!
//! 1. **Classify**: `prompt -> MotionCategory` (walking, flapping, rotating, ...)
//! 2. **Plan**: `prompt + category + frame count -> FramePlan` (one prompt per frame)
//! 3. **Materialize**: `FramePlan -> FrameArtifact`s (one backend call per frame, in order)
//! 4. **Assemble**: successful frames -> one GIF (or MP4 via the system `ffmpeg` binary)
//!
//! Design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Deterministic planning**: classification and planning are pure functions of their input.
//! - **Sequential generation**: frames are generated one at a time in index order; a failed
//!   frame is recorded and the run continues.
//! - **Injected backends**: nothing reaches the network except through an [`ImageBackend`]
//!   passed in by the caller.
#![forbid(unsafe_code)]

mod assemble;
mod backend;
mod config;
mod encode;
mod foundation;
mod intent;
mod materialize;
mod pipeline;
mod plan;
mod request;
mod settings;
mod still;
mod store;

pub use assemble::assembler::{AssembleOptions, assemble, cover_fit, decode_cover};
pub use backend::chain::BackendChain;
pub use backend::gemini::GeminiBackend;
pub use backend::placeholder::{PlaceholderBackend, placeholder_png, render_placeholder};
pub use backend::{GenerateRequest, ImageBackend, ReferenceImage};
pub use config::{Config, DEFAULT_API_BASE, DEFAULT_MODEL};
pub use encode::ffmpeg::{Mp4Sink, crf_for_quality, is_ffmpeg_on_path, validate_mp4_config};
pub use encode::gif::{GifSink, encode_gif, gif_speed};
pub use encode::sink::{
    AnimationSink, InMemorySink, OutputArtifact, OutputFormat, SinkConfig, ensure_parent_dir,
};
pub use foundation::core::{Canvas, LoopCount};
pub use foundation::error::{FlipbookError, FlipbookResult};
pub use intent::classify::{MotionCategory, MotionChoice, classify};
pub use materialize::cancel::CancelToken;
pub use materialize::materializer::{
    FrameArtifact, FrameStatus, MaterializeOutcome, Materializer, RetryPolicy, frame_key,
};
pub use pipeline::{AssemblyState, FillPolicy, Pipeline, RunStatus, SequenceResult};
pub use plan::planner::{
    CONSISTENCY_SUFFIX, FramePlan, FrameSpec, phase_descriptor, plan, progress_fraction,
};
pub use request::{
    AnimationRequest, AnimationRequestBuilder, DELAY_MS_RANGE, FRAME_COUNT_RANGE, QUALITY_RANGE,
};
pub use settings::resolve::{EncodeDefaults, Preset, PresetParams, default_buckets, resolve_defaults};
pub use still::StillOp;
pub use store::frames::{DirFrameStore, FrameHandle, FrameStore, MemoryFrameStore};
