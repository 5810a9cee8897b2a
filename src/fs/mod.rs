//! Filesystem gateway.
//!
//! Every byte the binder reads or writes goes through [`FileSystem`], so
//! the orchestration layer can run unchanged against the real disk
//! ([`OsFileSystem`]) or an in-memory double ([`MemoryFileSystem`]). The
//! surface is deliberately narrow: whole-document reads and writes,
//! moves, deletes, stat, and a recursive walk.

use chrono::{DateTime, Utc};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub mod memory;
pub mod os;

pub use memory::MemoryFileSystem;
pub use os::OsFileSystem;

/// Timestamps reported by [`FileSystem::stat`]. Platforms that cannot
/// answer a field report the current time instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileTimes {
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub accessed: DateTime<Utc>,
}

/// One entry produced by [`FileSystem::walk`], relative to the walk root.
/// Directories are reported too; the schema mirrors empty ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    pub rel_path: PathBuf,
    pub is_dir: bool,
}

/// Raw storage I/O behind the binder.
///
/// Implementations must be safe to call from the autosave worker thread
/// as well as the owning thread, and `write`/`rename` create missing
/// parent directories of the destination.
pub trait FileSystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    /// Create a directory and any missing ancestors. Idempotent.
    fn mkdir_all(&self, path: &Path) -> io::Result<()>;

    /// Read a whole file as UTF-8.
    fn read(&self, path: &Path) -> io::Result<String>;

    /// Overwrite a whole file, creating parents as needed.
    fn write(&self, path: &Path, contents: &str) -> io::Result<()>;

    /// Move a file or a whole directory subtree, creating parents of the
    /// destination as needed.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Delete a file or a whole directory subtree.
    fn remove(&self, path: &Path) -> io::Result<()>;

    fn stat(&self, path: &Path) -> io::Result<FileTimes>;

    /// Recursively list `root`, depth-first, sorted by name, parents
    /// before children. Entries whose name starts with `.` are skipped
    /// at every depth; names in `ignore` are skipped when they are direct
    /// children of `root`.
    fn walk(&self, root: &Path, ignore: &[String]) -> io::Result<Vec<WalkEntry>>;
}

impl<F: FileSystem + ?Sized> FileSystem for Arc<F> {
    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }

    fn mkdir_all(&self, path: &Path) -> io::Result<()> {
        (**self).mkdir_all(path)
    }

    fn read(&self, path: &Path) -> io::Result<String> {
        (**self).read(path)
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        (**self).write(path, contents)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        (**self).rename(from, to)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        (**self).remove(path)
    }

    fn stat(&self, path: &Path) -> io::Result<FileTimes> {
        (**self).stat(path)
    }

    fn walk(&self, root: &Path, ignore: &[String]) -> io::Result<Vec<WalkEntry>> {
        (**self).walk(root, ignore)
    }
}
