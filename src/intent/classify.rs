use std::{fmt, str::FromStr};

use crate::foundation::error::FlipbookError;

/// Discrete class of animated movement. Selects the descriptor table the planner uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MotionCategory {
    /// Walking, running and other gait cycles.
    CyclicLimb,
    /// Flying creatures flapping their wings.
    WingBeat,
    /// Dance moves cycling through distinct poses.
    DancePose,
    /// One-way change from an initial to a final state (growing, melting, morphing).
    ProgressiveTransform,
    /// Monotonic rotation around a vertical axis.
    Rotational,
    /// Waves, ripples, swaying.
    Wave,
    /// Gentle oscillation for anything else.
    Generic,
}

impl MotionCategory {
    /// Every category, in classifier table order followed by the fallback.
    pub const ALL: [MotionCategory; 7] = [
        MotionCategory::CyclicLimb,
        MotionCategory::WingBeat,
        MotionCategory::DancePose,
        MotionCategory::ProgressiveTransform,
        MotionCategory::Rotational,
        MotionCategory::Wave,
        MotionCategory::Generic,
    ];

    /// Stable kebab-case name, as accepted by `--animation`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CyclicLimb => "cyclic-limb",
            Self::WingBeat => "wing-beat",
            Self::DancePose => "dance-pose",
            Self::ProgressiveTransform => "progressive-transform",
            Self::Rotational => "rotational",
            Self::Wave => "wave",
            Self::Generic => "generic",
        }
    }

    /// Whether the planner cycles a fixed phrase table for this category.
    pub fn is_cyclic(self) -> bool {
        !matches!(self, Self::Rotational | Self::ProgressiveTransform)
    }
}

impl fmt::Display for MotionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MotionCategory {
    type Err = FlipbookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_lowercase().replace('_', "-");
        let cat = match norm.as_str() {
            "cyclic-limb" | "walk" => Self::CyclicLimb,
            "wing-beat" | "fly" => Self::WingBeat,
            "dance-pose" | "dance" => Self::DancePose,
            "progressive-transform" | "transform" => Self::ProgressiveTransform,
            "rotational" | "rotate" | "spin" => Self::Rotational,
            "wave" => Self::Wave,
            "generic" | "oscillate" => Self::Generic,
            other => {
                return Err(FlipbookError::invalid_request(format!(
                    "unknown animation category '{other}'"
                )));
            }
        };
        Ok(cat)
    }
}

/// Either an explicit category or a request to classify the prompt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MotionChoice {
    /// Derive the category from the prompt with [`classify`].
    #[default]
    Auto,
    /// Use this category as given.
    Category(MotionCategory),
}

impl MotionChoice {
    /// Resolve to a concrete category, classifying `base_prompt` when set to `Auto`.
    pub fn resolve(self, base_prompt: &str) -> MotionCategory {
        match self {
            Self::Auto => classify(base_prompt),
            Self::Category(cat) => cat,
        }
    }
}

impl FromStr for MotionChoice {
    type Err = FlipbookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        s.parse().map(Self::Category)
    }
}

// Checked top to bottom; the first row with any matching keyword wins.
const KEYWORD_TABLE: &[(MotionCategory, &[&str])] = &[
    (
        MotionCategory::CyclicLimb,
        &[
            "walk", "running", "runs", "jog", "gallop", "march", "trot", "stride", "stroll",
            "sprint",
        ],
    ),
    (
        MotionCategory::WingBeat,
        &[
            "flying",
            "flies",
            "fly ",
            "flap",
            "wings",
            "soar",
            "flutter",
            "butterfly",
            "bird",
        ],
    ),
    (
        MotionCategory::DancePose,
        &["danc", "ballet", "twirl", "pirouette", "groove", "boogie"],
    ),
    (
        MotionCategory::ProgressiveTransform,
        &[
            "transform",
            "morph",
            "growing",
            "grows",
            "bloom",
            "melt",
            "evolv",
            "metamorph",
            "sunrise",
            "sunset",
            "fill",
        ],
    ),
    (
        MotionCategory::Rotational,
        &["rotat", "spin", "revolv", "orbit", "turntable", "360"],
    ),
    (
        MotionCategory::Wave,
        &[
            "wave", "ripple", "sway", "flag", "flowing", "flows", "undulat",
        ],
    ),
];

/// Map a free-text prompt to a motion category.
///
/// Case-insensitive substring match against a fixed, ordered keyword table. The table order is
/// part of the contract: a prompt matching several rows resolves to the earliest row, so
/// "dancing while flying" is a [`MotionCategory::WingBeat`]. Prompts matching nothing fall
/// through to [`MotionCategory::Generic`].
pub fn classify(base_prompt: &str) -> MotionCategory {
    let lowered = base_prompt.to_lowercase();
    KEYWORD_TABLE
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(cat, _)| *cat)
        .unwrap_or(MotionCategory::Generic)
}

#[cfg(test)]
#[path = "../../tests/unit/intent/classify.rs"]
mod tests;
