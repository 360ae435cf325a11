use super::*;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = PathBuf::from("target").join("unit_frame_store").join(name);
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

#[test]
fn dir_store_round_trips_and_leaves_no_partial_files() {
    let dir = scratch_dir("round_trip");
    let mut store = DirFrameStore::create(&dir).unwrap();

    let h = store.write("frame_000.png", b"abc").unwrap();
    assert_eq!(h.key(), "frame_000.png");
    assert_eq!(store.read(&h).unwrap(), b"abc");
    assert_eq!(store.location(&h).unwrap(), dir.join("frame_000.png"));

    let names: Vec<String> = std::fs::read_dir(&dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["frame_000.png".to_string()]);

    store.remove().unwrap();
    assert!(!dir.exists());
}

#[test]
fn each_key_is_written_once() {
    let dir = scratch_dir("write_once");
    let mut store = DirFrameStore::create(&dir).unwrap();
    store.write("frame_001.png", b"a").unwrap();
    assert!(matches!(
        store.write("frame_001.png", b"b"),
        Err(FlipbookError::Storage(_))
    ));

    let mut mem = MemoryFrameStore::new();
    mem.write("frame_001.png", b"a").unwrap();
    assert!(mem.write("frame_001.png", b"b").is_err());
    assert_eq!(mem.len(), 1);
}

#[test]
fn keys_cannot_escape_the_store() {
    let mut mem = MemoryFrameStore::new();
    for bad in ["", "../x.png", "a/b.png", ".hidden"] {
        assert!(mem.write(bad, b"x").is_err(), "{bad}");
    }
    assert!(mem.is_empty());
}

#[test]
fn memory_store_reports_missing_frames() {
    let mut mem = MemoryFrameStore::new();
    let h = mem.write("frame_000.png", b"x").unwrap();
    assert_eq!(mem.keys().collect::<Vec<_>>(), vec!["frame_000.png"]);
    assert!(mem.location(&h).is_none());

    let other = MemoryFrameStore::new();
    assert!(matches!(other.read(&h), Err(FlipbookError::Storage(_))));
}

#[test]
fn dir_store_refuses_a_directory_from_another_run() {
    let dir = scratch_dir("claimed");
    let mut first = DirFrameStore::create(&dir).unwrap();
    first.write("frame_002.png", b"old").unwrap();

    assert!(matches!(
        DirFrameStore::create(&dir),
        Err(FlipbookError::Storage(_))
    ));
    assert_eq!(std::fs::read(dir.join("frame_002.png")).unwrap(), b"old");

    // An empty leftover directory is fine to reuse.
    let empty = scratch_dir("empty_leftover");
    std::fs::create_dir_all(&empty).unwrap();
    assert!(DirFrameStore::create(&empty).is_ok());
}
