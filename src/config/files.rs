//! Filesystem access for candidate configuration files.
//!
//! The loader only needs "open a path for reading", with `NotFound` kept
//! distinguishable from every other failure. Tests swap in
//! [`MemoryFileSystem`] instead of touching disk.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

/// Read-only filesystem capability used by the loader.
pub trait FileSystem: fmt::Debug + Send + Sync {
    /// Open `path` for reading.
    ///
    /// Implementations must report a missing file as
    /// [`io::ErrorKind::NotFound`]; any other error aborts resolution.
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + '_>>;
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + '_>> {
        let file = std::fs::File::open(path)?;
        Ok(Box::new(file))
    }
}

/// In-memory filesystem keyed by normalized path.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
    files: BTreeMap<PathBuf, Vec<u8>>,
    denied: BTreeSet<PathBuf>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `content` at `path`, replacing any previous content.
    pub fn write(&mut self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        self.files.insert(normalize(path.as_ref()), content.into());
    }

    /// Builder form of [`write`](Self::write).
    pub fn with_file(mut self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) -> Self {
        self.write(path, content);
        self
    }

    /// Make every open of `path` fail with `PermissionDenied`.
    pub fn deny(&mut self, path: impl AsRef<Path>) {
        self.denied.insert(normalize(path.as_ref()));
    }
}

impl FileSystem for MemoryFileSystem {
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + '_>> {
        let key = normalize(path);
        if self.denied.contains(&key) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("permission denied: {}", path.display()),
            ));
        }
        match self.files.get(&key) {
            Some(content) => Ok(Box::new(content.as_slice())),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {}", path.display()),
            )),
        }
    }
}

/// Drop `.` components so `./app.json` and `app.json` name the same file.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
