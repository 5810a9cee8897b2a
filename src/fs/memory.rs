//! In-memory gateway for tests.
//!
//! Holds files and directories in sorted maps, counts content reads so
//! tests can prove an operation did not touch the disk twice, and can
//! simulate write, rename, and remove failures for error-path coverage.

use super::{FileSystem, FileTimes, WalkEntry};
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Default)]
struct MemState {
    files: BTreeMap<PathBuf, String>,
    dirs: BTreeSet<PathBuf>,
    reads: u64,
    fail_writes: bool,
    fail_renames: bool,
    fail_removes: bool,
}

#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    state: Mutex<MemState>,
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("no such path: {}", path.display()),
    )
}

fn simulated(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("simulated {} error", what))
}

fn add_dirs(state: &mut MemState, path: &Path) {
    let mut current = PathBuf::new();
    for component in path.components() {
        current.push(component);
        if matches!(component, Component::Normal(_)) {
            state.dirs.insert(current.clone());
        }
    }
}

fn add_parent_dirs(state: &mut MemState, path: &Path) {
    if let Some(parent) = path.parent() {
        add_dirs(state, parent);
    }
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of content reads served so far.
    pub fn read_count(&self) -> u64 {
        self.state.lock().reads
    }

    /// When enabled, every `write` fails with a simulated I/O error.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        self.state.lock().fail_writes = simulate;
    }

    /// When enabled, every `rename` fails with a simulated I/O error.
    pub fn set_simulate_rename_error(&self, simulate: bool) {
        self.state.lock().fail_renames = simulate;
    }

    /// When enabled, every `remove` fails with a simulated I/O error.
    pub fn set_simulate_remove_error(&self, simulate: bool) {
        self.state.lock().fail_removes = simulate;
    }

    /// Peek at a file without bumping the read counter.
    pub fn snapshot(&self, path: &Path) -> Option<String> {
        self.state.lock().files.get(path).cloned()
    }
}

impl FileSystem for MemoryFileSystem {
    fn exists(&self, path: &Path) -> bool {
        let state = self.state.lock();
        state.files.contains_key(path) || state.dirs.contains(path)
    }

    fn mkdir_all(&self, path: &Path) -> io::Result<()> {
        add_dirs(&mut self.state.lock(), path);
        Ok(())
    }

    fn read(&self, path: &Path) -> io::Result<String> {
        let mut state = self.state.lock();
        match state.files.get(path).cloned() {
            Some(contents) => {
                state.reads += 1;
                Ok(contents)
            }
            None => Err(not_found(path)),
        }
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        let mut state = self.state.lock();
        if state.fail_writes {
            return Err(simulated("write"));
        }
        add_parent_dirs(&mut state, path);
        state.files.insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut state = self.state.lock();
        if state.fail_renames {
            return Err(simulated("rename"));
        }
        if let Some(contents) = state.files.remove(from) {
            add_parent_dirs(&mut state, to);
            state.files.insert(to.to_path_buf(), contents);
            return Ok(());
        }
        if state.dirs.contains(from) {
            let files: Vec<(PathBuf, String)> = state
                .files
                .iter()
                .filter(|(path, _)| path.starts_with(from))
                .map(|(path, contents)| (path.clone(), contents.clone()))
                .collect();
            let dirs: Vec<PathBuf> = state
                .dirs
                .iter()
                .filter(|path| path.starts_with(from))
                .cloned()
                .collect();
            add_parent_dirs(&mut state, to);
            for (path, contents) in files {
                state.files.remove(&path);
                if let Ok(rest) = path.strip_prefix(from) {
                    state.files.insert(to.join(rest), contents);
                }
            }
            for path in dirs {
                state.dirs.remove(&path);
                if let Ok(rest) = path.strip_prefix(from) {
                    state.dirs.insert(to.join(rest));
                }
            }
            return Ok(());
        }
        Err(not_found(from))
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        let mut state = self.state.lock();
        if state.fail_removes {
            return Err(simulated("remove"));
        }
        if state.files.remove(path).is_some() {
            return Ok(());
        }
        if state.dirs.contains(path) {
            state.files.retain(|p, _| !p.starts_with(path));
            state.dirs.retain(|p| !p.starts_with(path));
            return Ok(());
        }
        Err(not_found(path))
    }

    fn stat(&self, path: &Path) -> io::Result<FileTimes> {
        if !self.exists(path) {
            return Err(not_found(path));
        }
        let now = Utc::now();
        Ok(FileTimes {
            created: now,
            modified: now,
            accessed: now,
        })
    }

    fn walk(&self, root: &Path, ignore: &[String]) -> io::Result<Vec<WalkEntry>> {
        let state = self.state.lock();
        let mut entries = Vec::new();
        let mut push = |path: &PathBuf, is_dir: bool| {
            let rel_path = match path.strip_prefix(root) {
                Ok(rel) if !rel.as_os_str().is_empty() => rel.to_path_buf(),
                _ => return,
            };
            let mut components = rel_path.components();
            let first = components
                .next()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .unwrap_or_default();
            if ignore.iter().any(|ignored| *ignored == first) {
                return;
            }
            let hidden = rel_path
                .components()
                .any(|c| c.as_os_str().to_string_lossy().starts_with('.'));
            if hidden {
                return;
            }
            entries.push(WalkEntry { rel_path, is_dir });
        };
        for dir in &state.dirs {
            push(dir, true);
        }
        for file in state.files.keys() {
            push(file, false);
        }
        // lexicographic component order puts every parent before its children
        entries.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
        Ok(entries)
    }
}
