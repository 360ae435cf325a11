use super::*;

#[test]
fn canvas_rejects_zero_dimensions() {
    assert!(Canvas::new(0, 10).is_err());
    assert!(Canvas::new(10, 0).is_err());
    let c = Canvas::new(64, 32).unwrap();
    assert_eq!(c.to_string(), "64x32");
}

#[test]
fn loop_count_follows_gif_convention() {
    assert_eq!(LoopCount::from_count(0), LoopCount::Infinite);
    assert_eq!(LoopCount::from_count(3), LoopCount::Repeat(3));
    assert_eq!(LoopCount::Infinite.encoded(), Some(0));
    assert_eq!(LoopCount::Repeat(3).encoded(), Some(3));
    assert_eq!(LoopCount::Once.encoded(), None);
    assert_eq!(LoopCount::from_flag(true), LoopCount::Infinite);
    assert_eq!(LoopCount::from_flag(false), LoopCount::Once);
}
