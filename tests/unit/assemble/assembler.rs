use std::io::Cursor;

use super::*;
use crate::{encode::sink::InMemorySink, store::frames::MemoryFrameStore};

fn png(img: image::RgbaImage) -> Vec<u8> {
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn opts(width: u32, height: u32) -> AssembleOptions {
    AssembleOptions {
        canvas: Canvas { width, height },
        delay_ms: 500,
        quality: 80,
        loop_count: LoopCount::Infinite,
    }
}

#[test]
fn empty_sequence_is_rejected_before_the_sink_starts() {
    let store = MemoryFrameStore::new();
    let mut sink = InMemorySink::new();
    let err = assemble(&[], &store, &opts(8, 8), &mut sink).unwrap_err();
    assert!(matches!(err, FlipbookError::EmptySequence));
    assert!(sink.config().is_none());
    assert!(!sink.is_finished());
}

#[test]
fn single_frame_assembles() {
    let mut store = MemoryFrameStore::new();
    let h = store
        .write("frame_000.png", &png(image::RgbaImage::new(8, 8)))
        .unwrap();
    let mut sink = InMemorySink::new();
    let out = assemble(&[h], &store, &opts(8, 8), &mut sink).unwrap();
    assert_eq!(out.frame_count, 1);
    assert_eq!(sink.frames().len(), 1);
}

#[test]
fn frames_keep_input_order_and_uniform_size() {
    let mut store = MemoryFrameStore::new();
    let sizes = [(40, 20), (10, 30), (16, 16)];
    let mut handles = Vec::new();
    for (i, (w, h)) in sizes.into_iter().enumerate() {
        let shade = (i as u8 + 1) * 60;
        let img = image::RgbaImage::from_pixel(w, h, image::Rgba([shade, 0, 0, 255]));
        handles.push(store.write(&format!("frame_{i:03}.png"), &png(img)).unwrap());
    }
    handles.reverse();

    let mut sink = InMemorySink::new();
    assemble(&handles, &store, &opts(12, 12), &mut sink).unwrap();

    let shades: Vec<u8> = sink.frames().iter().map(|f| f.get_pixel(6, 6)[0]).collect();
    assert_eq!(shades, vec![180, 120, 60]);
    for f in sink.frames() {
        assert_eq!(f.dimensions(), (12, 12));
    }
    assert_eq!(sink.config().unwrap().delay_ms, 500);
}

#[test]
fn cover_fit_crops_instead_of_letterboxing() {
    // Left half red, right half blue; a square crop of a 2:1 image keeps the centre.
    let img = image::RgbaImage::from_fn(40, 20, |x, _| {
        if x < 20 {
            image::Rgba([255, 0, 0, 255])
        } else {
            image::Rgba([0, 0, 255, 255])
        }
    });
    let out = cover_fit(&image::DynamicImage::ImageRgba8(img), Canvas { width: 10, height: 10 });
    assert_eq!(out.dimensions(), (10, 10));
    // No transparent or black bars at the edges.
    for y in [0, 9] {
        for x in [0, 9] {
            assert_eq!(out.get_pixel(x, y)[3], 255);
        }
    }
    assert!(out.get_pixel(0, 5)[0] > 200);
    assert!(out.get_pixel(9, 5)[2] > 200);
}

#[test]
fn undecodable_frame_aborts_assembly() {
    let mut store = MemoryFrameStore::new();
    let h = store.write("frame_000.png", b"not an image").unwrap();
    let mut sink = InMemorySink::new();
    assert!(assemble(&[h], &store, &opts(8, 8), &mut sink).is_err());
}
