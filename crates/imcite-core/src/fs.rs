//! Filesystem seam
//!
//! Brokers never call `std::fs` directly; they go through the [`FileSystem`]
//! trait so tests can swap the real filesystem for an in-memory one without
//! touching global state. Methods mirror the `std::fs` free functions and
//! keep their `io::Result` signatures; mapping errors onto broker errors is
//! the caller's job.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Size and modification time for a stored file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FileStat {
    pub size: u64,
    pub modified: DateTime<Utc>,
}

/// The trait all storage backends implement.
pub trait FileSystem: Send + Sync {
    /// Read a file's full contents.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Write a file, replacing any existing contents.
    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    /// Copy a file, replacing any existing destination.
    fn copy(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Rename a file within the same filesystem.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Remove a file. Removing a missing file is an error.
    fn remove(&self, path: &Path) -> io::Result<()>;

    /// Whether a file or directory exists at the path.
    fn exists(&self, path: &Path) -> bool;

    /// Paths of the regular files directly inside a directory.
    fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;

    /// Size and modification time of a file.
    fn stat(&self, path: &Path) -> io::Result<FileStat>;

    /// Create a directory and any missing parents.
    fn create_dir_all(&self, dir: &Path) -> io::Result<()>;
}

/// The real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        std::fs::write(path, bytes)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::copy(from, to).map(|_| ())
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        let meta = std::fs::metadata(path)?;
        Ok(FileStat {
            size: meta.len(),
            modified: DateTime::from(meta.modified()?),
        })
    }

    fn create_dir_all(&self, dir: &Path) -> io::Result<()> {
        std::fs::create_dir_all(dir)
    }
}

#[derive(Debug, Clone)]
struct MemFile {
    bytes: Vec<u8>,
    modified: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct MemState {
    files: BTreeMap<PathBuf, MemFile>,
    dirs: BTreeSet<PathBuf>,
}

/// In-memory filesystem for tests.
///
/// Deliberately strict about parent directories: writing into a directory
/// that was never created fails with `NotFound`, the same way the real
/// filesystem does, so broker setup bugs surface in unit tests.
#[derive(Debug, Default)]
pub struct MemFileSystem {
    state: Mutex<MemState>,
}

impl MemFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn require_parent(state: &MemState, path: &Path) -> io::Result<()> {
        match path.parent() {
            Some(parent) if parent.as_os_str().is_empty() || state.dirs.contains(parent) => Ok(()),
            Some(parent) => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such directory: {}", parent.display()),
            )),
            None => Ok(()),
        }
    }
}

impl FileSystem for MemFileSystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let state = self.lock();
        state
            .files
            .get(path)
            .map(|f| f.bytes.clone())
            .ok_or_else(|| not_found(path))
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut state = self.lock();
        Self::require_parent(&state, path)?;
        state.files.insert(
            path.to_path_buf(),
            MemFile {
                bytes: bytes.to_vec(),
                modified: Utc::now(),
            },
        );
        Ok(())
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut state = self.lock();
        Self::require_parent(&state, to)?;
        let file = state.files.get(from).cloned().ok_or_else(|| not_found(from))?;
        state.files.insert(
            to.to_path_buf(),
            MemFile {
                bytes: file.bytes,
                modified: Utc::now(),
            },
        );
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut state = self.lock();
        Self::require_parent(&state, to)?;
        let file = state.files.remove(from).ok_or_else(|| not_found(from))?;
        state.files.insert(to.to_path_buf(), file);
        Ok(())
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        let mut state = self.lock();
        state
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| not_found(path))
    }

    fn exists(&self, path: &Path) -> bool {
        let state = self.lock();
        state.files.contains_key(path) || state.dirs.contains(path)
    }

    fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let state = self.lock();
        if !state.dirs.contains(dir) {
            return Err(not_found(dir));
        }
        Ok(state
            .files
            .keys()
            .filter(|p| p.parent() == Some(dir))
            .cloned()
            .collect())
    }

    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        let state = self.lock();
        let file = state.files.get(path).ok_or_else(|| not_found(path))?;
        Ok(FileStat {
            size: file.bytes.len() as u64,
            modified: file.modified,
        })
    }

    fn create_dir_all(&self, dir: &Path) -> io::Result<()> {
        let mut state = self.lock();
        let mut current = PathBuf::new();
        for part in dir.components() {
            current.push(part);
            state.dirs.insert(current.clone());
        }
        Ok(())
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("no such file: {}", path.display()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mem_write_requires_parent_dir() {
        let fs = MemFileSystem::new();
        let err = fs.write(Path::new("/repo/bib/a.bib"), b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);

        fs.create_dir_all(Path::new("/repo/bib")).unwrap();
        fs.write(Path::new("/repo/bib/a.bib"), b"x").unwrap();
        assert_eq!(fs.read(Path::new("/repo/bib/a.bib")).unwrap(), b"x");
    }

    #[test]
    fn test_mem_list_is_shallow_and_sorted() {
        let fs = MemFileSystem::new();
        fs.create_dir_all(Path::new("/repo/doc/deep")).unwrap();
        fs.write(Path::new("/repo/doc/b.pdf"), b"b").unwrap();
        fs.write(Path::new("/repo/doc/a.pdf"), b"a").unwrap();
        fs.write(Path::new("/repo/doc/deep/c.pdf"), b"c").unwrap();

        let listed = fs.list(Path::new("/repo/doc")).unwrap();
        assert_eq!(
            listed,
            vec![
                PathBuf::from("/repo/doc/a.pdf"),
                PathBuf::from("/repo/doc/b.pdf")
            ]
        );
    }

    #[test]
    fn test_mem_rename_moves_contents() {
        let fs = MemFileSystem::new();
        fs.create_dir_all(Path::new("/repo")).unwrap();
        fs.write(Path::new("/repo/old.bib"), b"entry").unwrap();
        fs.rename(Path::new("/repo/old.bib"), Path::new("/repo/new.bib"))
            .unwrap();
        assert!(!fs.exists(Path::new("/repo/old.bib")));
        assert_eq!(fs.read(Path::new("/repo/new.bib")).unwrap(), b"entry");
    }

    #[test]
    fn test_mem_remove_missing_is_error() {
        let fs = MemFileSystem::new();
        assert!(fs.remove(Path::new("/nope")).is_err());
    }

    #[test]
    fn test_os_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let fs = OsFileSystem;
        let path = dir.path().join("sample.txt");
        fs.write(&path, b"hello").unwrap();
        assert!(fs.exists(&path));
        assert_eq!(fs.read(&path).unwrap(), b"hello");
        let stat = fs.stat(&path).unwrap();
        assert_eq!(stat.size, 5);
    }
}
