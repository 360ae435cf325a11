use std::io::Cursor;

use image::AnimationDecoder as _;

use super::*;
use crate::foundation::core::{Canvas, LoopCount};

fn solid(w: u32, h: u32, rgba: [u8; 4]) -> image::RgbaImage {
    image::RgbaImage::from_pixel(w, h, image::Rgba(rgba))
}

fn cfg(loop_count: LoopCount) -> SinkConfig {
    SinkConfig {
        canvas: Canvas {
            width: 8,
            height: 6,
        },
        delay_ms: 300,
        quality: 90,
        loop_count,
    }
}

fn decode(bytes: &[u8]) -> Vec<image::Frame> {
    image::codecs::gif::GifDecoder::new(Cursor::new(bytes))
        .unwrap()
        .into_frames()
        .collect_frames()
        .unwrap()
}

fn netscape_loop_count(bytes: &[u8]) -> Option<u16> {
    let tag = b"NETSCAPE2.0";
    let pos = bytes.windows(tag.len()).position(|w| w == tag)?;
    let sub = &bytes[pos + tag.len()..];
    // sub-block: size 3, id 1, little-endian count
    Some(u16::from_le_bytes([sub[2], sub[3]]))
}

#[test]
fn frames_keep_order_size_and_delay() {
    let frames = vec![
        solid(8, 6, [255, 0, 0, 255]),
        solid(8, 6, [0, 255, 0, 255]),
        solid(8, 6, [0, 0, 255, 255]),
    ];
    let bytes = encode_gif(&frames, &cfg(LoopCount::Infinite)).unwrap();
    let decoded = decode(&bytes);
    assert_eq!(decoded.len(), 3);

    for (channel, f) in decoded.iter().enumerate() {
        assert_eq!(f.buffer().dimensions(), (8, 6));
        let px = f.buffer().get_pixel(3, 3);
        // palette quantization may shift values slightly
        for c in 0..3 {
            if c == channel {
                assert!(px[c] > 200, "{px:?}");
            } else {
                assert!(px[c] < 55, "{px:?}");
            }
        }
        let (num, den) = f.delay().numer_denom_ms();
        assert_eq!(num / den, 300);
    }
}

#[test]
fn loop_count_uses_netscape_convention() {
    let frames = vec![solid(8, 6, [9, 9, 9, 255]), solid(8, 6, [200, 9, 9, 255])];

    let infinite = encode_gif(&frames, &cfg(LoopCount::Infinite)).unwrap();
    assert_eq!(netscape_loop_count(&infinite), Some(0));

    let three = encode_gif(&frames, &cfg(LoopCount::Repeat(3))).unwrap();
    assert_eq!(netscape_loop_count(&three), Some(3));

    let once = encode_gif(&frames, &cfg(LoopCount::Once)).unwrap();
    assert_eq!(netscape_loop_count(&once), None);
}

#[test]
fn single_frame_gif_is_valid() {
    let bytes = encode_gif(&[solid(8, 6, [1, 2, 3, 255])], &cfg(LoopCount::Infinite)).unwrap();
    assert_eq!(decode(&bytes).len(), 1);
}

#[test]
fn mismatched_frame_is_rejected() {
    let mut sink = GifSink::new("target/unit_gif/never.gif", true);
    sink.begin(&cfg(LoopCount::Infinite)).unwrap();
    let err = sink.push_frame(&solid(4, 4, [0, 0, 0, 255])).unwrap_err();
    assert!(matches!(err, FlipbookError::Encode(_)));
}

#[test]
fn sink_writes_file() {
    let out = PathBuf::from("target").join("unit_gif").join("two.gif");
    let _ = std::fs::remove_file(&out);

    let mut sink = GifSink::new(&out, true);
    sink.begin(&cfg(LoopCount::Infinite)).unwrap();
    sink.push_frame(&solid(8, 6, [10, 20, 30, 255])).unwrap();
    sink.push_frame(&solid(8, 6, [30, 20, 10, 255])).unwrap();
    let artifact = sink.end().unwrap();

    assert_eq!(artifact.format, OutputFormat::Gif);
    assert_eq!(artifact.frame_count, 2);
    assert_eq!(artifact.location.as_deref(), Some(out.as_path()));
    let bytes = std::fs::read(&out).unwrap();
    assert_eq!(bytes.len() as u64, artifact.byte_len);
    assert_eq!(decode(&bytes).len(), 2);
}

#[test]
fn quality_maps_to_speed() {
    assert_eq!(gif_speed(100), 1);
    assert_eq!(gif_speed(1), 30);
    assert!(gif_speed(50) > gif_speed(90));
}

#[test]
fn dropped_sink_leaves_no_files_behind() {
    let out = PathBuf::from("target").join("unit_gif").join("dropped.gif");
    let partial = out.with_extension("gif.partial");
    let _ = std::fs::remove_file(&out);
    let _ = std::fs::remove_file(&partial);

    let mut sink = GifSink::new(&out, true);
    sink.begin(&cfg(LoopCount::Infinite)).unwrap();
    sink.push_frame(&solid(8, 6, [10, 20, 30, 255])).unwrap();
    assert!(partial.exists());
    assert!(!out.exists());

    drop(sink);
    assert!(!partial.exists());
    assert!(!out.exists());
}

#[test]
fn streamed_file_matches_in_memory_encoding() {
    let frames = [
        solid(8, 6, [200, 10, 10, 255]),
        solid(8, 6, [10, 200, 10, 255]),
        solid(8, 6, [10, 10, 200, 255]),
    ];
    let out = PathBuf::from("target").join("unit_gif").join("streamed.gif");
    let _ = std::fs::remove_file(&out);

    let mut sink = GifSink::new(&out, true);
    sink.begin(&cfg(LoopCount::Repeat(2))).unwrap();
    for f in &frames {
        sink.push_frame(f).unwrap();
    }
    let artifact = sink.end().unwrap();

    let on_disk = std::fs::read(&out).unwrap();
    assert_eq!(artifact.frame_count, 3);
    assert_eq!(on_disk, encode_gif(&frames, &cfg(LoopCount::Repeat(2))).unwrap());
    assert!(!out.with_extension("gif.partial").exists());
}
