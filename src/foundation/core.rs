use crate::foundation::error::{FlipbookError, FlipbookResult};

/// Output canvas size in pixels. Every encoded frame has exactly this size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Build a canvas, rejecting zero dimensions.
    pub fn new(width: u32, height: u32) -> FlipbookResult<Self> {
        let canvas = Self { width, height };
        canvas.validate()?;
        Ok(canvas)
    }

    /// Check that both dimensions are non-zero.
    pub fn validate(self) -> FlipbookResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(FlipbookError::invalid_request(format!(
                "canvas must be non-empty, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// How many times an animation plays.
///
/// Mirrors the animated-GIF loop-count convention: a stored count of `0` means loop forever,
/// `n` means `n` repetitions, and an absent loop extension means the animation plays once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopCount {
    /// Loop forever (loop count `0`).
    #[default]
    Infinite,
    /// Repeat `n` times (`n >= 1`).
    Repeat(u16),
    /// Play once, no loop extension.
    Once,
}

impl LoopCount {
    /// Map a raw loop-count number: `0` is infinite, anything else repeats that many times.
    pub fn from_count(count: u16) -> Self {
        if count == 0 {
            Self::Infinite
        } else {
            Self::Repeat(count)
        }
    }

    /// Map the boolean "loop" switch: `true` loops forever, `false` plays once.
    pub fn from_flag(looping: bool) -> Self {
        if looping { Self::Infinite } else { Self::Once }
    }

    /// The stored loop count, or `None` when no loop extension should be written.
    pub fn encoded(self) -> Option<u16> {
        match self {
            Self::Infinite => Some(0),
            Self::Repeat(n) => Some(n),
            Self::Once => None,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
