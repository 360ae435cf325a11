use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use anyhow::Context as _;
use image::codecs::gif::{GifEncoder, Repeat};

use crate::{
    encode::sink::{
        AnimationSink, OutputArtifact, OutputFormat, SinkConfig, check_frame_size,
        ensure_parent_dir,
    },
    foundation::error::{FlipbookError, FlipbookResult},
};

/// Animated GIF written to a file.
///
/// Each frame is encoded as soon as it is pushed, into a temporary sibling file that `end`
/// renames into place. A run that fails or is dropped mid-way never leaves a truncated GIF
/// under the final name.
pub struct GifSink {
    out_path: PathBuf,
    overwrite: bool,
    cfg: Option<SinkConfig>,
    stream: Option<GifStream>,
    frames: usize,
}

struct GifStream {
    encoder: GifEncoder<BufWriter<LatchedFile>>,
    tmp_path: PathBuf,
    write_error: Arc<Mutex<Option<String>>>,
}

impl GifStream {
    // Dropping the encoder writes the trailer and flushes the buffer.
    fn finish(self) -> FlipbookResult<PathBuf> {
        drop(self.encoder);
        let failed = self.write_error.lock().ok().and_then(|mut e| e.take());
        if let Some(e) = failed {
            let _ = std::fs::remove_file(&self.tmp_path);
            return Err(FlipbookError::encode(format!(
                "failed to write gif '{}': {e}",
                self.tmp_path.display()
            )));
        }
        Ok(self.tmp_path)
    }

    fn discard(self) {
        drop(self.encoder);
        let _ = std::fs::remove_file(&self.tmp_path);
    }
}

// The GIF encoder swallows I/O errors raised while it is dropped; this keeps the first one.
struct LatchedFile {
    file: File,
    error: Arc<Mutex<Option<String>>>,
}

impl LatchedFile {
    fn latch(&self, e: &std::io::Error) {
        if let Ok(mut slot) = self.error.lock()
            && slot.is_none()
        {
            *slot = Some(e.to_string());
        }
    }
}

impl Write for LatchedFile {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.file.write(buf).inspect_err(|e| self.latch(e))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush().inspect_err(|e| self.latch(e))
    }
}

impl GifSink {
    /// Write the animation to `out_path`.
    pub fn new(out_path: impl Into<PathBuf>, overwrite: bool) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite,
            cfg: None,
            stream: None,
            frames: 0,
        }
    }

    /// Target path.
    pub fn out_path(&self) -> &Path {
        &self.out_path
    }

    fn tmp_path(&self) -> PathBuf {
        self.out_path.with_extension("gif.partial")
    }
}

impl AnimationSink for GifSink {
    fn begin(&mut self, cfg: &SinkConfig) -> FlipbookResult<()> {
        cfg.canvas.validate()?;
        if cfg.canvas.width > u32::from(u16::MAX) || cfg.canvas.height > u32::from(u16::MAX) {
            return Err(FlipbookError::encode(format!(
                "gif frames are limited to 65535x65535, got {}",
                cfg.canvas
            )));
        }
        if !self.overwrite && self.out_path.exists() {
            return Err(FlipbookError::encode(format!(
                "output file '{}' already exists",
                self.out_path.display()
            )));
        }
        if let Some(old) = self.stream.take() {
            old.discard();
        }

        ensure_parent_dir(&self.out_path)?;
        let tmp_path = self.tmp_path();
        let file = File::create(&tmp_path)
            .with_context(|| format!("create gif '{}'", tmp_path.display()))?;
        let write_error = Arc::new(Mutex::new(None));
        let writer = BufWriter::new(LatchedFile {
            file,
            error: Arc::clone(&write_error),
        });
        let stream = GifStream {
            encoder: new_encoder(writer, cfg)?,
            tmp_path,
            write_error,
        };

        self.stream = Some(stream);
        self.cfg = Some(*cfg);
        self.frames = 0;
        Ok(())
    }

    fn push_frame(&mut self, frame: &image::RgbaImage) -> FlipbookResult<()> {
        let (Some(cfg), Some(stream)) = (self.cfg, self.stream.as_mut()) else {
            return Err(FlipbookError::encode("push_frame called before begin"));
        };
        check_frame_size(frame, cfg.canvas)?;
        encode_one(&mut stream.encoder, frame, &cfg, self.frames)?;
        self.frames += 1;
        Ok(())
    }

    fn end(&mut self) -> FlipbookResult<OutputArtifact> {
        let (Some(_), Some(stream)) = (self.cfg.take(), self.stream.take()) else {
            return Err(FlipbookError::encode("end called before begin"));
        };
        let tmp = stream.finish()?;
        std::fs::rename(&tmp, &self.out_path)
            .with_context(|| format!("move gif into place at '{}'", self.out_path.display()))?;
        let byte_len = std::fs::metadata(&self.out_path)
            .with_context(|| format!("stat gif '{}'", self.out_path.display()))?
            .len();

        Ok(OutputArtifact {
            format: OutputFormat::Gif,
            location: Some(self.out_path.clone()),
            frame_count: self.frames,
            byte_len,
        })
    }
}

impl Drop for GifSink {
    fn drop(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.discard();
        }
    }
}

/// Encode `frames` as one animated GIF in memory with a shared delay, quality and loop count.
pub fn encode_gif(frames: &[image::RgbaImage], cfg: &SinkConfig) -> FlipbookResult<Vec<u8>> {
    let mut buf = Vec::new();
    {
        let mut encoder = new_encoder(&mut buf, cfg)?;
        for (i, frame) in frames.iter().enumerate() {
            check_frame_size(frame, cfg.canvas)?;
            encode_one(&mut encoder, frame, cfg, i)?;
        }
    }
    Ok(buf)
}

fn new_encoder<W: Write>(w: W, cfg: &SinkConfig) -> FlipbookResult<GifEncoder<W>> {
    let mut encoder = GifEncoder::new_with_speed(w, gif_speed(cfg.quality));
    if let Some(count) = cfg.loop_count.encoded() {
        let repeat = if count == 0 {
            Repeat::Infinite
        } else {
            Repeat::Finite(count)
        };
        encoder
            .set_repeat(repeat)
            .map_err(|e| FlipbookError::encode(format!("failed to set gif loop count: {e}")))?;
    }
    Ok(encoder)
}

fn encode_one<W: Write>(
    encoder: &mut GifEncoder<W>,
    frame: &image::RgbaImage,
    cfg: &SinkConfig,
    index: usize,
) -> FlipbookResult<()> {
    let delay = image::Delay::from_numer_denom_ms(cfg.delay_ms, 1);
    encoder
        .encode_frame(image::Frame::from_parts(frame.clone(), 0, 0, delay))
        .map_err(|e| FlipbookError::encode(format!("failed to encode gif frame {index}: {e}")))
}

/// Map quality 1..=100 onto the GIF quantizer speed 30..=1 (1 is slowest and best).
pub fn gif_speed(quality: u8) -> i32 {
    let q = i32::from(quality.clamp(1, 100));
    1 + (100 - q) * 29 / 99
}

#[cfg(test)]
#[path = "../../tests/unit/encode/gif.rs"]
mod tests;
