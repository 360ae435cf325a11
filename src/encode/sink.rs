use std::path::PathBuf;

use crate::foundation::{
    core::{Canvas, LoopCount},
    error::{FlipbookError, FlipbookResult},
};

/// Encoding parameters handed to an [`AnimationSink`] before the first frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SinkConfig {
    /// Size every pushed frame has.
    pub canvas: Canvas,
    /// Display time of every frame in milliseconds.
    pub delay_ms: u32,
    /// Encoding quality, 1..=100.
    pub quality: u8,
    /// Loop behaviour.
    pub loop_count: LoopCount,
}

/// Container of an encoded animation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Animated GIF.
    Gif,
    /// H.264 MP4 via the system `ffmpeg` binary.
    Mp4,
    /// Frames kept in memory, nothing encoded.
    Memory,
}

impl OutputFormat {
    /// Conventional file extension.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Gif => "gif",
            Self::Mp4 => "mp4",
            Self::Memory => "",
        }
    }
}

/// Description of a finished animation.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct OutputArtifact {
    /// Container format.
    pub format: OutputFormat,
    /// Written file, absent for in-memory sinks.
    pub location: Option<PathBuf>,
    /// Frames encoded.
    pub frame_count: usize,
    /// Encoded size in bytes (raw RGBA size for in-memory sinks).
    pub byte_len: u64,
}

/// Consumer of assembled frames.
///
/// Call order: `begin` once, `push_frame` once per frame in display order, `end` once. Every
/// pushed frame has exactly the canvas size given to `begin`.
pub trait AnimationSink {
    /// Called once before any frame.
    fn begin(&mut self, cfg: &SinkConfig) -> FlipbookResult<()>;
    /// Append one frame.
    fn push_frame(&mut self, frame: &image::RgbaImage) -> FlipbookResult<()>;
    /// Finish encoding and describe the result.
    fn end(&mut self) -> FlipbookResult<OutputArtifact>;
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<image::RgbaImage>,
    finished: bool,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg
    }

    /// Frames in push order.
    pub fn frames(&self) -> &[image::RgbaImage] {
        &self.frames
    }

    /// Whether `end` has been called.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl AnimationSink for InMemorySink {
    fn begin(&mut self, cfg: &SinkConfig) -> FlipbookResult<()> {
        self.cfg = Some(*cfg);
        self.frames.clear();
        self.finished = false;
        Ok(())
    }

    fn push_frame(&mut self, frame: &image::RgbaImage) -> FlipbookResult<()> {
        let cfg = self
            .cfg
            .ok_or_else(|| FlipbookError::encode("push_frame called before begin"))?;
        check_frame_size(frame, cfg.canvas)?;
        self.frames.push(frame.clone());
        Ok(())
    }

    fn end(&mut self) -> FlipbookResult<OutputArtifact> {
        self.finished = true;
        Ok(OutputArtifact {
            format: OutputFormat::Memory,
            location: None,
            frame_count: self.frames.len(),
            byte_len: self.frames.iter().map(|f| f.as_raw().len() as u64).sum(),
        })
    }
}

pub(crate) fn check_frame_size(frame: &image::RgbaImage, canvas: Canvas) -> FlipbookResult<()> {
    if frame.dimensions() != (canvas.width, canvas.height) {
        return Err(FlipbookError::encode(format!(
            "frame size mismatch: got {}x{}, expected {canvas}",
            frame.width(),
            frame.height()
        )));
    }
    Ok(())
}

/// Create the parent directory of `path` if it has one.
pub fn ensure_parent_dir(path: &std::path::Path) -> FlipbookResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}
