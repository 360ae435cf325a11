use std::{fmt, str::FromStr};

use crate::foundation::{core::Canvas, error::FlipbookError};

/// Delay and quality derived from the frame count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EncodeDefaults {
    /// Per-frame display time in milliseconds.
    pub delay_ms: u32,
    /// Encoding quality, 1..=100.
    pub quality: u8,
}

// (max frame count inclusive, delay_ms, quality). Few frames can afford long display times and
// high quality; long sequences are kept small and fast.
const FRAME_COUNT_BUCKETS: &[(u32, u32, u8)] = &[(3, 800, 95), (5, 600, 90), (8, 400, 85)];
const MANY_FRAMES: (u32, u8) = (250, 75);

/// Default encoding parameters for a sequence of `frame_count` frames.
///
/// | frames | delay | quality |
/// |---|---|---|
/// | ≤ 3 | 800 ms | 95 |
/// | 4–5 | 600 ms | 90 |
/// | 6–8 | 400 ms | 85 |
/// | > 8 | 250 ms | 75 |
pub fn resolve_defaults(frame_count: u32) -> EncodeDefaults {
    let (delay_ms, quality) = FRAME_COUNT_BUCKETS
        .iter()
        .find(|(max, _, _)| frame_count <= *max)
        .map(|(_, d, q)| (*d, *q))
        .unwrap_or(MANY_FRAMES);
    EncodeDefaults { delay_ms, quality }
}

/// The bucket table behind [`resolve_defaults`], as `(label, defaults)` rows.
pub fn default_buckets() -> Vec<(&'static str, EncodeDefaults)> {
    vec![
        ("<= 3 frames", resolve_defaults(3)),
        ("4-5 frames", resolve_defaults(5)),
        ("6-8 frames", resolve_defaults(8)),
        ("> 8 frames", resolve_defaults(9)),
    ]
}

/// Named output targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// Square, mid-length loop for social feeds.
    Social,
    /// Widescreen, slow and high quality for slides.
    Presentation,
    /// Small landscape banner for web pages.
    Website,
    /// Tiny, quick preview.
    Thumbnail,
}

/// Fixed parameter bundle behind a [`Preset`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PresetParams {
    /// Number of frames.
    pub frame_count: u32,
    /// Output size.
    pub canvas: Canvas,
    /// Per-frame delay in milliseconds.
    pub delay_ms: u32,
    /// Encoding quality, 1..=100.
    pub quality: u8,
}

impl Preset {
    /// Every preset, in display order.
    pub const ALL: [Preset; 4] = [
        Preset::Social,
        Preset::Presentation,
        Preset::Website,
        Preset::Thumbnail,
    ];

    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Social => "social",
            Self::Presentation => "presentation",
            Self::Website => "website",
            Self::Thumbnail => "thumbnail",
        }
    }

    /// The preset's parameter bundle.
    pub fn params(self) -> PresetParams {
        let (frame_count, width, height, delay_ms, quality) = match self {
            Self::Social => (6, 1080, 1080, 400, 85),
            Self::Presentation => (8, 1920, 1080, 600, 95),
            Self::Website => (5, 800, 600, 500, 80),
            Self::Thumbnail => (4, 256, 256, 300, 70),
        };
        PresetParams {
            frame_count,
            canvas: Canvas { width, height },
            delay_ms,
            quality,
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = FlipbookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| FlipbookError::invalid_request(format!("unknown preset '{s}'")))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/settings/resolve.rs"]
mod tests;
