use std::time::Duration;

use tracing::{error, info, info_span, warn};

use crate::{
    backend::{GenerateRequest, ImageBackend, ReferenceImage},
    foundation::error::{FlipbookError, FlipbookResult},
    materialize::cancel::CancelToken,
    plan::planner::{FramePlan, FrameSpec},
    store::frames::{FrameHandle, FrameStore},
};

/// How often a frame is re-attempted before it is recorded as failed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure. `0` means a single attempt.
    pub max_retries: u32,
    /// Pause between attempts.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Build a policy.
    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// Total attempts per frame.
    pub fn max_attempts(self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Outcome of one planned frame.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FrameStatus {
    /// The image was generated and stored.
    Success {
        /// Where the image was stored.
        handle: FrameHandle,
    },
    /// Every attempt failed, or the image could not be stored.
    Failed {
        /// Description of the last failure.
        error: String,
    },
}

/// Per-frame record produced by the materializer, in index order. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct FrameArtifact {
    /// Frame index from the plan.
    pub index: u32,
    /// Success with a stored handle, or failure with a description.
    #[serde(flatten)]
    pub status: FrameStatus,
    /// Backend calls made for this frame.
    pub attempts: u32,
}

impl FrameArtifact {
    /// Stored handle, for successful frames.
    pub fn handle(&self) -> Option<&FrameHandle> {
        match &self.status {
            FrameStatus::Success { handle } => Some(handle),
            FrameStatus::Failed { .. } => None,
        }
    }

    /// Failure description, for failed frames.
    pub fn error(&self) -> Option<&str> {
        match &self.status {
            FrameStatus::Success { .. } => None,
            FrameStatus::Failed { error } => Some(error),
        }
    }

    /// Whether the frame was stored.
    pub fn is_success(&self) -> bool {
        matches!(self.status, FrameStatus::Success { .. })
    }
}

/// Result of materializing a plan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaterializeOutcome {
    /// One artifact per attempted frame, in index order.
    pub artifacts: Vec<FrameArtifact>,
    /// Whether the run stopped early because of cancellation.
    pub cancelled: bool,
}

impl MaterializeOutcome {
    /// Number of stored frames.
    pub fn succeeded(&self) -> usize {
        self.artifacts.iter().filter(|a| a.is_success()).count()
    }

    /// Handles of stored frames, in index order. Failed frames are skipped.
    pub fn successful_handles(&self) -> Vec<FrameHandle> {
        self.artifacts
            .iter()
            .filter_map(|a| a.handle().cloned())
            .collect()
    }
}

/// Turns planned frame prompts into stored images, one frame at a time.
///
/// Frames are generated strictly in index order with a single request in flight. A frame that
/// fails every attempt is recorded and the next frame is still attempted.
#[derive(Clone, Debug, Default)]
pub struct Materializer {
    retry: RetryPolicy,
    request_timeout: Option<Duration>,
    reference_images: Vec<ReferenceImage>,
    cancel: CancelToken,
}

impl Materializer {
    /// Materializer with a single attempt per frame and no timeout override.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Bound each backend call. The remaining time of the cancel deadline also applies.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Send these reference images with every frame prompt (e.g. a character sheet).
    pub fn with_reference_images(mut self, images: Vec<ReferenceImage>) -> Self {
        self.reference_images = images;
        self
    }

    /// Share a cancellation token with the caller.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Generate and store every frame of `plan`.
    #[tracing::instrument(skip_all, fields(frames = plan.frames.len(), backend = backend.name()))]
    pub fn materialize(
        &self,
        plan: &FramePlan,
        backend: &dyn ImageBackend,
        store: &mut dyn FrameStore,
    ) -> MaterializeOutcome {
        let mut artifacts = Vec::with_capacity(plan.frames.len());

        for spec in &plan.frames {
            if self.cancel.is_cancelled() {
                warn!(next_index = spec.index, "cancelled; stopping before next frame");
                return MaterializeOutcome {
                    artifacts,
                    cancelled: true,
                };
            }

            let span = info_span!("frame", index = spec.index);
            let _guard = span.enter();

            match self.materialize_frame(spec, plan.frame_count, backend, store) {
                Ok(artifact) => artifacts.push(artifact),
                Err(attempts) => {
                    artifacts.push(FrameArtifact {
                        index: spec.index,
                        status: FrameStatus::Failed {
                            error: FlipbookError::Cancelled.to_string(),
                        },
                        attempts,
                    });
                    warn!("cancelled during retries");
                    return MaterializeOutcome {
                        artifacts,
                        cancelled: true,
                    };
                }
            }
        }

        MaterializeOutcome {
            artifacts,
            cancelled: false,
        }
    }

    // Err carries the attempt count when cancellation interrupted the retry loop.
    fn materialize_frame(
        &self,
        spec: &FrameSpec,
        frame_count: u32,
        backend: &dyn ImageBackend,
        store: &mut dyn FrameStore,
    ) -> Result<FrameArtifact, u32> {
        let max_attempts = self.retry.max_attempts();
        let mut last_error = String::new();
        let mut attempts = 0;

        while attempts < max_attempts {
            if attempts > 0 {
                self.pause_before_retry();
                if self.cancel.is_cancelled() {
                    return Err(attempts);
                }
            }
            attempts += 1;

            let request = GenerateRequest {
                prompt: &spec.prompt,
                reference_images: &self.reference_images,
                timeout: self.effective_timeout(),
            };

            match backend.generate(&request).and_then(non_empty) {
                Ok(bytes) => {
                    let key = frame_key(spec.index, &bytes);
                    let status = match store.write(&key, &bytes) {
                        Ok(handle) => {
                            info!(
                                attempts,
                                bytes = bytes.len(),
                                key = %handle,
                                "frame {} of {frame_count} stored",
                                spec.index + 1
                            );
                            FrameStatus::Success { handle }
                        }
                        Err(e) => {
                            error!(error = %e, "frame generated but could not be stored");
                            FrameStatus::Failed {
                                error: e.to_string(),
                            }
                        }
                    };
                    return Ok(FrameArtifact {
                        index: spec.index,
                        status,
                        attempts,
                    });
                }
                Err(e) => {
                    warn!(attempt = attempts, max_attempts, error = %e, "generation attempt failed");
                    last_error = e.to_string();
                }
            }
        }

        error!(attempts, error = %last_error, "giving up on frame");
        Ok(FrameArtifact {
            index: spec.index,
            status: FrameStatus::Failed { error: last_error },
            attempts,
        })
    }

    fn effective_timeout(&self) -> Option<Duration> {
        match (self.request_timeout, self.cancel.remaining()) {
            (Some(t), Some(left)) => Some(t.min(left)),
            (t, left) => t.or(left),
        }
    }

    fn pause_before_retry(&self) {
        let pause = match self.cancel.remaining() {
            Some(left) => self.retry.backoff.min(left),
            None => self.retry.backoff,
        };
        if !pause.is_zero() {
            std::thread::sleep(pause);
        }
    }
}

fn non_empty(bytes: Vec<u8>) -> FlipbookResult<Vec<u8>> {
    if bytes.is_empty() {
        return Err(FlipbookError::backend("backend returned an empty image"));
    }
    Ok(bytes)
}

/// Storage key for frame `index`, with an extension sniffed from the image bytes.
pub fn frame_key(index: u32, bytes: &[u8]) -> String {
    let ext = image::guess_format(bytes)
        .ok()
        .and_then(|f| f.extensions_str().first().copied())
        .unwrap_or("png");
    format!("frame_{index:03}.{ext}")
}

#[cfg(test)]
#[path = "../../tests/unit/materialize/materializer.rs"]
mod tests;
