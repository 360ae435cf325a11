use tracing::{info, warn};

use crate::{
    assemble::assembler::{AssembleOptions, assemble},
    backend::{ImageBackend, placeholder::placeholder_png},
    encode::sink::{AnimationSink, OutputArtifact},
    foundation::error::{FlipbookError, FlipbookResult},
    intent::classify::MotionCategory,
    materialize::materializer::{FrameArtifact, FrameStatus, Materializer},
    plan::planner::{FramePlan, plan},
    request::AnimationRequest,
    store::frames::{FrameHandle, FrameStore},
};

/// What happens to the slot of a frame that failed to generate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillPolicy {
    /// Skip failed frames; the animation is shorter.
    #[default]
    Omit,
    /// Substitute a locally rendered placeholder so frame positions and timing are kept.
    Placeholder,
}

/// Whether and how the assembly step ran.
#[derive(Debug)]
pub enum AssemblyState {
    /// Assembly was skipped (cancelled run, or partial results not accepted).
    NotAttempted,
    /// The animation was encoded.
    Encoded(OutputArtifact),
    /// Assembly failed, e.g. with [`FlipbookError::EmptySequence`].
    Failed(FlipbookError),
}

/// Overall verdict of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunStatus {
    /// Every planned frame was generated and the animation was encoded.
    Complete,
    /// Only some frames were generated.
    Partial {
        /// Frames generated.
        succeeded: usize,
        /// Frames planned.
        total: usize,
    },
    /// No animation could be produced.
    Failed,
    /// The run was cancelled before all frames were attempted.
    Cancelled,
}

/// Everything a run produced, for reporting by the caller.
#[derive(Debug)]
pub struct SequenceResult {
    /// Category the plan was drawn from.
    pub category: MotionCategory,
    /// The frame plan.
    pub plan: FramePlan,
    /// Per-frame outcomes in index order.
    pub artifacts: Vec<FrameArtifact>,
    /// Assembly outcome.
    pub assembly: AssemblyState,
    /// Whether materialization stopped early.
    pub cancelled: bool,
}

impl SequenceResult {
    /// Frames generated successfully.
    pub fn succeeded(&self) -> usize {
        self.artifacts.iter().filter(|a| a.is_success()).count()
    }

    /// The encoded animation, if assembly ran and succeeded.
    pub fn output(&self) -> Option<&OutputArtifact> {
        match &self.assembly {
            AssemblyState::Encoded(out) => Some(out),
            AssemblyState::NotAttempted | AssemblyState::Failed(_) => None,
        }
    }

    /// Complete, partial, failed or cancelled.
    pub fn status(&self) -> RunStatus {
        if self.cancelled {
            return RunStatus::Cancelled;
        }
        let succeeded = self.succeeded();
        if succeeded == 0 || matches!(self.assembly, AssemblyState::Failed(_)) {
            return RunStatus::Failed;
        }
        let total = self.plan.len();
        if succeeded < total {
            RunStatus::Partial { succeeded, total }
        } else {
            RunStatus::Complete
        }
    }
}

/// Classify, plan, materialize and assemble one [`AnimationRequest`].
///
/// The backend is injected; fallbacks across several backends are expressed by passing a
/// [`BackendChain`](crate::BackendChain).
pub struct Pipeline<'a> {
    backend: &'a dyn ImageBackend,
    materializer: Materializer,
    fill: FillPolicy,
    assemble_partial: bool,
}

impl<'a> Pipeline<'a> {
    /// Pipeline with a single-attempt materializer, omit-on-failure and partial assembly on.
    pub fn new(backend: &'a dyn ImageBackend) -> Self {
        Self {
            backend,
            materializer: Materializer::new(),
            fill: FillPolicy::Omit,
            assemble_partial: true,
        }
    }

    /// Use a configured materializer (retries, timeout, cancellation, references).
    pub fn with_materializer(mut self, materializer: Materializer) -> Self {
        self.materializer = materializer;
        self
    }

    /// Choose what happens to failed frame slots.
    pub fn with_fill_policy(mut self, fill: FillPolicy) -> Self {
        self.fill = fill;
        self
    }

    /// Whether to assemble when only some frames succeeded.
    pub fn with_assemble_partial(mut self, assemble_partial: bool) -> Self {
        self.assemble_partial = assemble_partial;
        self
    }

    /// Validate the request and produce its frame plan without generating anything.
    pub fn plan(request: &AnimationRequest) -> FlipbookResult<FramePlan> {
        request.validate()?;
        Ok(plan(
            &request.base_prompt,
            request.frame_count,
            request.category(),
        ))
    }

    /// Run the whole pipeline.
    ///
    /// Returns `Err` only for an invalid request, before any side effect. Frame failures and
    /// assembly failures are reported inside the [`SequenceResult`]. A cancelled run is never
    /// assembled.
    #[tracing::instrument(skip_all, fields(frames = request.frame_count))]
    pub fn run(
        &self,
        request: &AnimationRequest,
        store: &mut dyn FrameStore,
        sink: &mut dyn AnimationSink,
    ) -> FlipbookResult<SequenceResult> {
        let frame_plan = Self::plan(request)?;
        let category = frame_plan.category;
        info!(%category, backend = self.backend.name(), "planned {} frames", frame_plan.len());

        let outcome = self.materializer.materialize(&frame_plan, self.backend, store);
        let succeeded = outcome.succeeded();
        info!(succeeded, total = frame_plan.len(), "materialization finished");

        let assembly = if outcome.cancelled {
            warn!("run cancelled; skipping assembly");
            AssemblyState::NotAttempted
        } else if succeeded < frame_plan.len() && succeeded > 0 && !self.assemble_partial {
            warn!(succeeded, "partial results not accepted; skipping assembly");
            AssemblyState::NotAttempted
        } else {
            let opts = AssembleOptions {
                canvas: request.canvas,
                delay_ms: request.delay_ms,
                quality: request.quality,
                loop_count: request.loop_count,
            };
            match self
                .assembly_frames(&outcome.artifacts, request, store)
                .and_then(|frames| assemble(&frames, &*store, &opts, &mut *sink))
            {
                Ok(out) => AssemblyState::Encoded(out),
                Err(e) => {
                    warn!(error = %e, "assembly failed");
                    AssemblyState::Failed(e)
                }
            }
        };

        Ok(SequenceResult {
            category,
            plan: frame_plan,
            artifacts: outcome.artifacts,
            assembly,
            cancelled: outcome.cancelled,
        })
    }

    fn assembly_frames(
        &self,
        artifacts: &[FrameArtifact],
        request: &AnimationRequest,
        store: &mut dyn FrameStore,
    ) -> FlipbookResult<Vec<FrameHandle>> {
        if !artifacts.iter().any(FrameArtifact::is_success) {
            return Err(FlipbookError::EmptySequence);
        }

        let mut frames = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            match (&artifact.status, self.fill) {
                (FrameStatus::Success { handle }, _) => frames.push(handle.clone()),
                (FrameStatus::Failed { .. }, FillPolicy::Omit) => {}
                (FrameStatus::Failed { .. }, FillPolicy::Placeholder) => {
                    let label = format!("placeholder {}", artifact.index);
                    let bytes = placeholder_png(&label, request.canvas)?;
                    let handle =
                        store.write(&format!("placeholder_{:03}.png", artifact.index), &bytes)?;
                    warn!(index = artifact.index, "filled failed frame with placeholder");
                    frames.push(handle);
                }
            }
        }
        Ok(frames)
    }
}

#[cfg(test)]
#[path = "../tests/unit/pipeline.rs"]
mod tests;
