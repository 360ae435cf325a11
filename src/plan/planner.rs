use crate::intent::classify::MotionCategory;

/// Appended to every frame prompt to bias the backend toward visual continuity across frames.
pub const CONSISTENCY_SUFFIX: &str =
    "consistent character design, consistent background, same scene composition and lighting";

const GAIT_PHASES: &[&str] = &[
    "contact pose with the left leg forward and the right leg back",
    "passing pose with the left foot planted and the right leg swinging through",
    "contact pose with the right leg forward and the left leg back",
    "passing pose with the right foot planted and the left leg swinging through",
];

const WING_PHASES: &[&str] = &[
    "wings fully raised above the body",
    "wings level at the middle of the downstroke",
    "wings fully lowered below the body",
    "wings level at the middle of the upstroke",
];

const DANCE_PHASES: &[&str] = &[
    "starting pose with arms relaxed at the sides",
    "arms raised overhead, weight on the left foot",
    "mid-spin with arms extended outward",
    "arms crossed in front, weight on the right foot",
    "low crouch with one arm pointing up",
    "finishing flourish with arms open wide",
];

const WAVE_PHASES: &[&str] = &[
    "at the crest of the wave",
    "descending from the crest",
    "at the trough of the wave",
    "rising toward the crest",
];

const OSCILLATION_PHASES: &[&str] = &[
    "neutral centered position",
    "shifted slightly to the left",
    "neutral centered position, returning",
    "shifted slightly to the right",
];

const TRANSFORM_INITIAL: &str = "initial state, at the very beginning of the transformation";
const TRANSFORM_FINAL: &str = "final state, transformation complete";

/// One planned frame: its position in the sequence and the prompt sent to the backend.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrameSpec {
    /// 0-based frame index.
    pub index: u32,
    /// Full prompt text for this frame.
    pub prompt: String,
    /// `index / (frame_count - 1)`, or `0` for single-frame plans.
    pub progress: f64,
}

/// Ordered frame prompts for one animation, before any image exists.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FramePlan {
    /// Category the descriptors were drawn from.
    pub category: MotionCategory,
    /// Number of frames; equals `frames.len()`.
    pub frame_count: u32,
    /// Frames in index order.
    pub frames: Vec<FrameSpec>,
}

impl FramePlan {
    /// Number of planned frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the plan has no frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Expand one prompt into `frame_count` ordered frame prompts.
///
/// Pure and deterministic. The caller is responsible for validating `frame_count`; a count of
/// zero yields an empty plan.
pub fn plan(base_prompt: &str, frame_count: u32, category: MotionCategory) -> FramePlan {
    let base = base_prompt.trim();
    let frames = (0..frame_count)
        .map(|index| {
            let progress = progress_fraction(index, frame_count);
            let descriptor = phase_descriptor(category, index, frame_count);
            FrameSpec {
                index,
                prompt: format!(
                    "{base}, {descriptor}, frame {} of {frame_count}, {CONSISTENCY_SUFFIX}",
                    index + 1
                ),
                progress,
            }
        })
        .collect();

    FramePlan {
        category,
        frame_count,
        frames,
    }
}

/// `index / (frame_count - 1)`; single-frame sequences are pinned to `0`.
pub fn progress_fraction(index: u32, frame_count: u32) -> f64 {
    if frame_count <= 1 {
        return 0.0;
    }
    f64::from(index) / f64::from(frame_count - 1)
}

/// Motion descriptor for one frame of a category.
pub fn phase_descriptor(category: MotionCategory, index: u32, frame_count: u32) -> String {
    match category {
        MotionCategory::CyclicLimb => cycle(GAIT_PHASES, index).to_string(),
        MotionCategory::WingBeat => cycle(WING_PHASES, index).to_string(),
        MotionCategory::DancePose => cycle(DANCE_PHASES, index).to_string(),
        MotionCategory::Wave => cycle(WAVE_PHASES, index).to_string(),
        MotionCategory::Generic => cycle(OSCILLATION_PHASES, index).to_string(),
        MotionCategory::Rotational => {
            let degrees = if frame_count == 0 {
                0
            } else {
                (360.0 * f64::from(index) / f64::from(frame_count)).round() as u32
            };
            format!("rotated {degrees} degrees around its vertical axis")
        }
        MotionCategory::ProgressiveTransform => {
            if index == 0 {
                TRANSFORM_INITIAL.to_string()
            } else if index + 1 == frame_count {
                TRANSFORM_FINAL.to_string()
            } else {
                let percent = (100.0 * progress_fraction(index, frame_count)).round() as u32;
                format!("{percent}% transformed, midway through the change")
            }
        }
    }
}

fn cycle(table: &'static [&'static str], index: u32) -> &'static str {
    table[index as usize % table.len()]
}

#[cfg(test)]
#[path = "../../tests/unit/plan/planner.rs"]
mod tests;
