use std::{
    collections::{BTreeMap, HashSet},
    path::{Path, PathBuf},
};

use crate::foundation::error::{FlipbookError, FlipbookResult};

/// Opaque reference to one stored frame image.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct FrameHandle {
    key: String,
}

impl FrameHandle {
    /// Storage key the frame was written under.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl std::fmt::Display for FrameHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key)
    }
}

/// Durable-for-one-run storage for frame images.
///
/// A key can be written once per store instance; a second write to the same key is a
/// [`FlipbookError::Storage`] error.
pub trait FrameStore {
    /// Persist `bytes` under `key`.
    fn write(&mut self, key: &str, bytes: &[u8]) -> FlipbookResult<FrameHandle>;

    /// Read back a stored frame.
    fn read(&self, handle: &FrameHandle) -> FlipbookResult<Vec<u8>>;

    /// Filesystem location of a stored frame, for stores that have one.
    fn location(&self, handle: &FrameHandle) -> Option<PathBuf> {
        let _ = handle;
        None
    }
}

/// Frames stored as files in one directory.
///
/// Writes go to a hidden temporary file first and are renamed into place, so an interrupted
/// write never leaves a truncated frame under its final name.
#[derive(Debug)]
pub struct DirFrameStore {
    root: PathBuf,
    written: HashSet<String>,
}

impl DirFrameStore {
    /// Claim `root` as the frame directory of one run.
    ///
    /// The directory is created if missing. An existing directory is accepted only when it is
    /// empty, so frames of an earlier run can never be mistaken for this run's output.
    pub fn create(root: impl Into<PathBuf>) -> FlipbookResult<Self> {
        let root = root.into();
        let create_err = |e: std::io::Error| {
            FlipbookError::storage(format!(
                "failed to create frame directory '{}': {e}",
                root.display()
            ))
        };
        if let Some(parent) = root.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(create_err)?;
        }
        match std::fs::create_dir(&root) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let mut entries = std::fs::read_dir(&root).map_err(create_err)?;
                if entries.next().is_some() {
                    return Err(FlipbookError::storage(format!(
                        "frame directory '{}' already holds files from another run",
                        root.display()
                    )));
                }
            }
            Err(e) => return Err(create_err(e)),
        }
        Ok(Self {
            root,
            written: HashSet::new(),
        })
    }

    /// Directory holding the frames.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Delete the frame directory and everything in it.
    pub fn remove(self) -> FlipbookResult<()> {
        std::fs::remove_dir_all(&self.root).map_err(|e| {
            FlipbookError::storage(format!(
                "failed to remove frame directory '{}': {e}",
                self.root.display()
            ))
        })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl FrameStore for DirFrameStore {
    fn write(&mut self, key: &str, bytes: &[u8]) -> FlipbookResult<FrameHandle> {
        validate_key(key)?;
        if self.written.contains(key) {
            return Err(FlipbookError::storage(format!(
                "frame '{key}' was already written in this run"
            )));
        }

        let final_path = self.path_for(key);
        let tmp_path = self.path_for(&format!(".{key}.partial"));
        std::fs::write(&tmp_path, bytes).map_err(|e| {
            let _ = std::fs::remove_file(&tmp_path);
            FlipbookError::storage(format!("failed to write '{}': {e}", tmp_path.display()))
        })?;
        std::fs::rename(&tmp_path, &final_path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp_path);
            FlipbookError::storage(format!(
                "failed to move frame into place at '{}': {e}",
                final_path.display()
            ))
        })?;

        self.written.insert(key.to_string());
        Ok(FrameHandle {
            key: key.to_string(),
        })
    }

    fn read(&self, handle: &FrameHandle) -> FlipbookResult<Vec<u8>> {
        let path = self.path_for(handle.key());
        std::fs::read(&path)
            .map_err(|e| FlipbookError::storage(format!("failed to read '{}': {e}", path.display())))
    }

    fn location(&self, handle: &FrameHandle) -> Option<PathBuf> {
        Some(self.path_for(handle.key()))
    }
}

/// Frames kept in memory; nothing touches the filesystem.
#[derive(Debug, Default)]
pub struct MemoryFrameStore {
    frames: BTreeMap<String, Vec<u8>>,
}

impl MemoryFrameStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.frames.keys().map(String::as_str)
    }

    /// Number of stored frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameStore for MemoryFrameStore {
    fn write(&mut self, key: &str, bytes: &[u8]) -> FlipbookResult<FrameHandle> {
        validate_key(key)?;
        if self.frames.contains_key(key) {
            return Err(FlipbookError::storage(format!(
                "frame '{key}' was already written in this run"
            )));
        }
        self.frames.insert(key.to_string(), bytes.to_vec());
        Ok(FrameHandle {
            key: key.to_string(),
        })
    }

    fn read(&self, handle: &FrameHandle) -> FlipbookResult<Vec<u8>> {
        self.frames
            .get(handle.key())
            .cloned()
            .ok_or_else(|| FlipbookError::storage(format!("no frame stored under '{handle}'")))
    }
}

fn validate_key(key: &str) -> FlipbookResult<()> {
    let ok = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if !ok {
        return Err(FlipbookError::storage(format!("invalid frame key '{key}'")));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/store/frames.rs"]
mod tests;
