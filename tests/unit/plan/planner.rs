use super::*;

#[test]
fn plan_is_deterministic() {
    for cat in MotionCategory::ALL {
        let a = plan("a fox in the snow", 7, cat);
        let b = plan("a fox in the snow", 7, cat);
        assert_eq!(a, b);
    }
}

#[test]
fn every_prompt_carries_position_marker_and_suffix() {
    for cat in MotionCategory::ALL {
        for n in 2..=20 {
            let p = plan("a lighthouse", n, cat);
            assert_eq!(p.frames.len(), n as usize);
            for (i, f) in p.frames.iter().enumerate() {
                assert_eq!(f.index as usize, i);
                assert!(f.prompt.starts_with("a lighthouse, "));
                assert!(f.prompt.contains(&format!("frame {} of {n}", i + 1)));
                assert!(f.prompt.ends_with(CONSISTENCY_SUFFIX));
            }
        }
    }
}

#[test]
fn progressive_transform_has_initial_percent_and_final_phases() {
    let p = plan("an ice cube", 5, MotionCategory::ProgressiveTransform);
    assert!(p.frames[0].prompt.contains("initial state"));
    assert!(p.frames[4].prompt.contains("final state"));
    assert!(p.frames[1].prompt.contains("25% transformed"));
    assert!(p.frames[2].prompt.contains("50% transformed"));
    assert!(p.frames[3].prompt.contains("75% transformed"));
    assert!(!p.frames[0].prompt.contains('%'));
    assert!(!p.frames[4].prompt.contains('%'));
}

#[test]
fn rotational_embeds_monotonic_angles() {
    let p = plan("a sneaker", 4, MotionCategory::Rotational);
    for (f, deg) in p.frames.iter().zip([0, 90, 180, 270]) {
        assert!(
            f.prompt.contains(&format!("rotated {deg} degrees")),
            "{}",
            f.prompt
        );
    }

    // Not cycled: angles keep growing past any table length.
    let p = plan("a sneaker", 12, MotionCategory::Rotational);
    assert!(p.frames[11].prompt.contains("rotated 330 degrees"));
}

#[test]
fn cyclic_gait_repeats_with_period_four() {
    let p = plan("a cat walking", 4, MotionCategory::CyclicLimb);
    let descriptors: Vec<_> = (0..4)
        .map(|i| phase_descriptor(MotionCategory::CyclicLimb, i, 4))
        .collect();
    let mut unique = descriptors.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 4);
    for (f, d) in p.frames.iter().zip(&descriptors) {
        assert!(f.prompt.contains(d.as_str()));
    }

    assert_eq!(
        phase_descriptor(MotionCategory::CyclicLimb, 5, 9),
        phase_descriptor(MotionCategory::CyclicLimb, 1, 9)
    );
}

#[test]
fn progress_fraction_spans_zero_to_one() {
    assert_eq!(progress_fraction(0, 1), 0.0);
    assert_eq!(progress_fraction(0, 5), 0.0);
    assert_eq!(progress_fraction(2, 5), 0.5);
    assert_eq!(progress_fraction(4, 5), 1.0);

    let p = plan("x", 1, MotionCategory::Generic);
    assert_eq!(p.frames[0].progress, 0.0);
    assert!(p.frames[0].prompt.contains("frame 1 of 1"));
}
