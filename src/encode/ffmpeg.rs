use std::{
    path::PathBuf,
    process::{Child, ChildStdin, Command, Stdio},
};

use crate::{
    encode::sink::{
        AnimationSink, OutputArtifact, OutputFormat, SinkConfig, check_frame_size,
        ensure_parent_dir,
    },
    foundation::error::{FlipbookError, FlipbookResult},
};

/// Check whether a runnable `ffmpeg` binary is on `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// H.264 MP4 written by piping raw RGBA frames into the system `ffmpeg` binary.
///
/// The frame rate is `1000 / delay_ms`. MP4 has no loop flag, so the loop count is ignored;
/// transparent pixels are flattened over `bg_rgba`. Width and height must be even.
pub struct Mp4Sink {
    out_path: PathBuf,
    overwrite: bool,
    bg_rgba: [u8; 4],
    cfg: Option<SinkConfig>,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    scratch: Vec<u8>,
    frames: usize,
}

impl Mp4Sink {
    /// Write the video to `out_path`, flattening alpha over black.
    pub fn new(out_path: impl Into<PathBuf>, overwrite: bool) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite,
            bg_rgba: [0, 0, 0, 255],
            cfg: None,
            child: None,
            stdin: None,
            scratch: Vec::new(),
            frames: 0,
        }
    }

    /// Background colour used when flattening transparent pixels.
    pub fn with_background(mut self, bg_rgba: [u8; 4]) -> Self {
        self.bg_rgba = bg_rgba;
        self
    }
}

/// Validate a sink configuration for yuv420p MP4 output.
pub fn validate_mp4_config(cfg: &SinkConfig) -> FlipbookResult<()> {
    cfg.canvas.validate()?;
    if !cfg.canvas.width.is_multiple_of(2) || !cfg.canvas.height.is_multiple_of(2) {
        return Err(FlipbookError::encode(
            "mp4 width/height must be even (required for yuv420p output)",
        ));
    }
    if cfg.delay_ms == 0 {
        return Err(FlipbookError::encode("mp4 frame delay must be non-zero"));
    }
    Ok(())
}

/// Map quality 1..=100 onto x264 CRF 51..=18 (lower CRF is better).
pub fn crf_for_quality(quality: u8) -> u8 {
    let q = u32::from(quality.clamp(1, 100));
    (51 - (q * 33) / 100) as u8
}

impl AnimationSink for Mp4Sink {
    fn begin(&mut self, cfg: &SinkConfig) -> FlipbookResult<()> {
        validate_mp4_config(cfg)?;
        ensure_parent_dir(&self.out_path)?;

        if !self.overwrite && self.out_path.exists() {
            return Err(FlipbookError::encode(format!(
                "output file '{}' already exists",
                self.out_path.display()
            )));
        }

        if !is_ffmpeg_on_path() {
            return Err(FlipbookError::encode(
                "ffmpeg is required for MP4 output, but was not found on PATH",
            ));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        if self.overwrite {
            cmd.arg("-y");
        } else {
            cmd.arg("-n");
        }

        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &cfg.canvas.to_string(),
            "-r",
            &format!("1000/{}", cfg.delay_ms),
            "-i",
            "pipe:0",
            "-an",
            "-c:v",
            "libx264",
            "-crf",
            &crf_for_quality(cfg.quality).to_string(),
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
        ])
        .arg(&self.out_path);

        let mut child = cmd.spawn().map_err(|e| {
            FlipbookError::encode(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| FlipbookError::encode("failed to open ffmpeg stdin (unexpected)"))?;

        self.scratch = vec![0u8; (cfg.canvas.width as usize) * (cfg.canvas.height as usize) * 4];
        self.cfg = Some(*cfg);
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.frames = 0;
        Ok(())
    }

    fn push_frame(&mut self, frame: &image::RgbaImage) -> FlipbookResult<()> {
        let Some(cfg) = self.cfg else {
            return Err(FlipbookError::encode("push_frame called before begin"));
        };
        check_frame_size(frame, cfg.canvas)?;

        flatten_to_opaque_rgba8(&mut self.scratch, frame.as_raw(), self.bg_rgba)?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(FlipbookError::encode("ffmpeg encoder is already finalized"));
        };

        use std::io::Write as _;
        stdin.write_all(&self.scratch).map_err(|e| {
            FlipbookError::encode(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        self.frames += 1;
        Ok(())
    }

    fn end(&mut self) -> FlipbookResult<OutputArtifact> {
        drop(self.stdin.take());
        let Some(child) = self.child.take() else {
            return Err(FlipbookError::encode("end called before begin"));
        };

        let output = child.wait_with_output().map_err(|e| {
            FlipbookError::encode(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FlipbookError::encode(format!(
                "ffmpeg exited with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let byte_len = std::fs::metadata(&self.out_path)
            .map(|m| m.len())
            .unwrap_or(0);
        Ok(OutputArtifact {
            format: OutputFormat::Mp4,
            location: Some(self.out_path.clone()),
            frame_count: self.frames,
            byte_len,
        })
    }
}

fn flatten_to_opaque_rgba8(dst: &mut [u8], src: &[u8], bg_rgba: [u8; 4]) -> FlipbookResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(FlipbookError::encode(
            "flatten_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    let bg_r = bg_rgba[0] as u16;
    let bg_g = bg_rgba[1] as u16;
    let bg_b = bg_rgba[2] as u16;

    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let a = s[3] as u16;
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }

        let inv = 255u16 - a;
        d[0] = (mul_div255(s[0] as u16, a) + mul_div255(bg_r, inv)).min(255) as u8;
        d[1] = (mul_div255(s[1] as u16, a) + mul_div255(bg_g, inv)).min(255) as u8;
        d[2] = (mul_div255(s[2] as u16, a) + mul_div255(bg_b, inv)).min(255) as u8;
        d[3] = 255;
    }

    Ok(())
}

fn mul_div255(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
