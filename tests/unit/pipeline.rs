use std::cell::RefCell;

use super::*;
use crate::{
    backend::GenerateRequest,
    encode::sink::InMemorySink,
    foundation::core::Canvas,
    materialize::cancel::CancelToken,
    store::frames::MemoryFrameStore,
};

struct FailingIndices {
    fail: Vec<u32>,
    calls: RefCell<u32>,
}

impl FailingIndices {
    fn new(fail: &[u32]) -> Self {
        Self {
            fail: fail.to_vec(),
            calls: RefCell::new(0),
        }
    }
}

impl ImageBackend for FailingIndices {
    fn name(&self) -> &str {
        "failing-indices"
    }

    fn generate(&self, request: &GenerateRequest<'_>) -> FlipbookResult<Vec<u8>> {
        let idx = {
            let mut calls = self.calls.borrow_mut();
            *calls += 1;
            *calls - 1
        };
        if self.fail.contains(&idx) {
            return Err(FlipbookError::backend("boom"));
        }
        placeholder_png(
            request.prompt,
            Canvas {
                width: 6,
                height: 6,
            },
        )
    }
}

fn request(frames: u32) -> AnimationRequest {
    AnimationRequest::builder("a cat walking")
        .frames(frames)
        .canvas(6, 6)
        .build()
        .unwrap()
}

#[test]
fn invalid_request_fails_before_any_backend_call() {
    let backend = FailingIndices::new(&[]);
    let mut req = request(4);
    req.frame_count = 50;

    let mut store = MemoryFrameStore::new();
    let mut sink = InMemorySink::new();
    let err = Pipeline::new(&backend)
        .run(&req, &mut store, &mut sink)
        .unwrap_err();
    assert!(matches!(err, FlipbookError::InvalidRequest(_)));
    assert_eq!(*backend.calls.borrow(), 0);
    assert!(store.is_empty());
}

#[test]
fn total_failure_is_reported_as_empty_sequence() {
    let backend = FailingIndices::new(&[0, 1, 2]);
    let mut store = MemoryFrameStore::new();
    let mut sink = InMemorySink::new();
    let result = Pipeline::new(&backend)
        .run(&request(3), &mut store, &mut sink)
        .unwrap();

    assert_eq!(result.status(), RunStatus::Failed);
    assert!(matches!(
        result.assembly,
        AssemblyState::Failed(FlipbookError::EmptySequence)
    ));
    assert!(result.output().is_none());
    assert!(sink.config().is_none());
}

#[test]
fn placeholder_policy_keeps_frame_positions() {
    let backend = FailingIndices::new(&[1]);
    let mut store = MemoryFrameStore::new();
    let mut sink = InMemorySink::new();
    let result = Pipeline::new(&backend)
        .with_fill_policy(FillPolicy::Placeholder)
        .run(&request(3), &mut store, &mut sink)
        .unwrap();

    assert_eq!(
        result.status(),
        RunStatus::Partial {
            succeeded: 2,
            total: 3
        }
    );
    assert_eq!(result.output().unwrap().frame_count, 3);
    assert_eq!(
        store.keys().collect::<Vec<_>>(),
        vec!["frame_000.png", "frame_002.png", "placeholder_001.png"]
    );
}

#[test]
fn partial_results_can_be_refused() {
    let backend = FailingIndices::new(&[0]);
    let mut store = MemoryFrameStore::new();
    let mut sink = InMemorySink::new();
    let result = Pipeline::new(&backend)
        .with_assemble_partial(false)
        .run(&request(3), &mut store, &mut sink)
        .unwrap();

    assert!(matches!(result.assembly, AssemblyState::NotAttempted));
    assert_eq!(
        result.status(),
        RunStatus::Partial {
            succeeded: 2,
            total: 3
        }
    );
    assert!(sink.config().is_none());
}

#[test]
fn cancelled_run_is_not_assembled() {
    let backend = FailingIndices::new(&[]);
    let cancel = CancelToken::new();
    cancel.cancel();

    let mut store = MemoryFrameStore::new();
    let mut sink = InMemorySink::new();
    let result = Pipeline::new(&backend)
        .with_materializer(Materializer::new().with_cancel(cancel))
        .run(&request(3), &mut store, &mut sink)
        .unwrap();

    assert_eq!(result.status(), RunStatus::Cancelled);
    assert!(matches!(result.assembly, AssemblyState::NotAttempted));
    assert!(!sink.is_finished());
}

/// Succeeds on every call and trips `cancel` after the second frame.
struct CancelsAfterSecondFrame {
    inner: FailingIndices,
    cancel: CancelToken,
}

impl ImageBackend for CancelsAfterSecondFrame {
    fn name(&self) -> &str {
        "cancels-after-second-frame"
    }

    fn generate(&self, request: &GenerateRequest<'_>) -> FlipbookResult<Vec<u8>> {
        let bytes = self.inner.generate(request);
        if *self.inner.calls.borrow() == 2 {
            self.cancel.cancel();
        }
        bytes
    }
}

#[test]
fn run_cancelled_mid_way_keeps_finished_frames_and_skips_assembly() {
    let cancel = CancelToken::new();
    let backend = CancelsAfterSecondFrame {
        inner: FailingIndices::new(&[]),
        cancel: cancel.clone(),
    };

    let mut store = MemoryFrameStore::new();
    let mut sink = InMemorySink::new();
    let result = Pipeline::new(&backend)
        .with_materializer(Materializer::new().with_cancel(cancel))
        .run(&request(4), &mut store, &mut sink)
        .unwrap();

    assert_eq!(result.artifacts.len(), 2);
    assert_eq!(result.succeeded(), 2);
    assert_eq!(store.len(), 2);
    assert_eq!(*backend.inner.calls.borrow(), 2);
    assert_eq!(result.status(), RunStatus::Cancelled);
    assert!(matches!(result.assembly, AssemblyState::NotAttempted));
    assert!(sink.config().is_none());
    assert!(!sink.is_finished());
}

#[test]
fn plan_only_validates_and_classifies() {
    let p = Pipeline::plan(&request(4)).unwrap();
    assert_eq!(p.category, MotionCategory::CyclicLimb);
    assert_eq!(p.len(), 4);

    let mut bad = request(4);
    bad.quality = 0;
    assert!(Pipeline::plan(&bad).is_err());
}
