use std::cell::Cell;

use super::*;

struct Fixed {
    name: &'static str,
    result: Result<Vec<u8>, &'static str>,
    calls: Cell<u32>,
}

impl Fixed {
    fn ok(name: &'static str, bytes: &[u8]) -> Self {
        Self {
            name,
            result: Ok(bytes.to_vec()),
            calls: Cell::new(0),
        }
    }

    fn err(name: &'static str, msg: &'static str) -> Self {
        Self {
            name,
            result: Err(msg),
            calls: Cell::new(0),
        }
    }
}

impl ImageBackend for Fixed {
    fn name(&self) -> &str {
        self.name
    }

    fn generate(&self, _request: &GenerateRequest<'_>) -> FlipbookResult<Vec<u8>> {
        self.calls.set(self.calls.get() + 1);
        self.result.clone().map_err(FlipbookError::backend)
    }
}

#[test]
fn first_success_wins() {
    let chain = BackendChain::new(vec![
        Box::new(Fixed::err("primary", "quota exceeded")),
        Box::new(Fixed::ok("secondary", b"img")),
        Box::new(Fixed::ok("tertiary", b"never")),
    ]);
    assert_eq!(chain.name(), "primary -> secondary -> tertiary");
    let out = chain.generate(&GenerateRequest::text("p")).unwrap();
    assert_eq!(out, b"img");
}

#[test]
fn all_failures_are_reported_in_order() {
    let chain = BackendChain::new(vec![
        Box::new(Fixed::err("a", "timeout")),
        Box::new(Fixed::err("b", "rejected")),
    ]);
    let err = chain.generate(&GenerateRequest::text("p")).unwrap_err();
    let msg = err.to_string();
    assert!(matches!(err, FlipbookError::Backend(_)));
    let a = msg.find("a: backend error: timeout").unwrap();
    let b = msg.find("b: backend error: rejected").unwrap();
    assert!(a < b);
}

#[test]
fn empty_chain_fails() {
    let chain = BackendChain::new(vec![]);
    assert!(chain.is_empty());
    assert!(chain.generate(&GenerateRequest::text("p")).is_err());
}
