//! Production gateway backed by `std::fs` and `walkdir`.

use super::{FileSystem, FileTimes, WalkEntry};
use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Default, Clone)]
pub struct OsFileSystem;

impl OsFileSystem {
    pub fn new() -> Self {
        Self
    }
}

fn keep_entry(entry: &DirEntry, ignore: &[String]) -> bool {
    let name = entry.file_name().to_string_lossy();
    if name.starts_with('.') {
        return false;
    }
    if entry.depth() == 1 && ignore.iter().any(|ignored| ignored.as_str() == name) {
        return false;
    }
    true
}

impl FileSystem for OsFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn mkdir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn read(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(from, to)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        if path.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        }
    }

    fn stat(&self, path: &Path) -> io::Result<FileTimes> {
        let meta = fs::metadata(path)?;
        // creation time is not available on every filesystem
        Ok(FileTimes {
            created: meta.created().unwrap_or_else(|_| SystemTime::now()).into(),
            modified: meta.modified().unwrap_or_else(|_| SystemTime::now()).into(),
            accessed: meta.accessed().unwrap_or_else(|_| SystemTime::now()).into(),
        })
    }

    fn walk(&self, root: &Path, ignore: &[String]) -> io::Result<Vec<WalkEntry>> {
        let mut entries = Vec::new();
        if !root.exists() {
            return Ok(entries);
        }
        let walker = WalkDir::new(root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter();
        for entry in walker.filter_entry(|e| keep_entry(e, ignore)) {
            let entry = entry.map_err(io::Error::from)?;
            let rel_path = entry
                .path()
                .strip_prefix(root)
                .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?
                .to_path_buf();
            entries.push(WalkEntry {
                rel_path,
                is_dir: entry.file_type().is_dir(),
            });
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_creates_parents_and_read_round_trips() {
        let dir = TempDir::new().unwrap();
        let fs = OsFileSystem::new();
        let path = dir.path().join("a/b/c.txt");

        fs.write(&path, "hello").unwrap();
        assert!(fs.exists(&path));
        assert_eq!(fs.read(&path).unwrap(), "hello");
    }

    #[test]
    fn test_rename_moves_subtree() {
        let dir = TempDir::new().unwrap();
        let fs = OsFileSystem::new();
        fs.write(&dir.path().join("src/n/one.txt"), "1").unwrap();

        fs.rename(&dir.path().join("src"), &dir.path().join("moved/src"))
            .unwrap();
        assert!(!fs.exists(&dir.path().join("src")));
        assert_eq!(fs.read(&dir.path().join("moved/src/n/one.txt")).unwrap(), "1");
    }

    #[test]
    fn test_remove_handles_files_and_dirs() {
        let dir = TempDir::new().unwrap();
        let fs = OsFileSystem::new();
        fs.write(&dir.path().join("d/one.txt"), "1").unwrap();
        fs.write(&dir.path().join("d/two.txt"), "2").unwrap();

        fs.remove(&dir.path().join("d/one.txt")).unwrap();
        assert!(!fs.exists(&dir.path().join("d/one.txt")));

        fs.remove(&dir.path().join("d")).unwrap();
        assert!(!fs.exists(&dir.path().join("d")));
    }

    #[test]
    fn test_walk_reports_dirs_and_files_relative() {
        let dir = TempDir::new().unwrap();
        let fs = OsFileSystem::new();
        fs.write(&dir.path().join("A/B/c.txt"), "").unwrap();
        fs.mkdir_all(&dir.path().join("Empty")).unwrap();

        let entries = fs.walk(dir.path(), &[]).unwrap();
        let rels: Vec<String> = entries
            .iter()
            .map(|e| e.rel_path.to_string_lossy().into_owned())
            .collect();
        assert!(rels.contains(&"A".to_string()));
        assert!(rels.contains(&format!("A{}B", std::path::MAIN_SEPARATOR)));
        assert!(rels.contains(&"Empty".to_string()));
        assert!(entries
            .iter()
            .any(|e| !e.is_dir && e.rel_path.ends_with("c.txt")));
    }

    #[test]
    fn test_walk_skips_dotfiles_and_top_level_ignores() {
        let dir = TempDir::new().unwrap();
        let fs = OsFileSystem::new();
        fs.write(&dir.path().join(".hidden/x.txt"), "").unwrap();
        fs.write(&dir.path().join("A/.secret"), "").unwrap();
        fs.write(&dir.path().join("Trash/A/gone.txt"), "").unwrap();
        fs.write(&dir.path().join("A/Trash/kept.txt"), "").unwrap();

        let entries = fs
            .walk(dir.path(), &["Trash".to_string()])
            .unwrap();
        let rels: Vec<String> = entries
            .iter()
            .map(|e| e.rel_path.to_string_lossy().into_owned())
            .collect();
        assert!(rels.iter().all(|r| !r.contains("hidden")));
        assert!(rels.iter().all(|r| !r.contains(".secret")));
        // the ignore only applies to direct children of the root
        assert!(rels.iter().all(|r| !r.starts_with("Trash")));
        assert!(rels.iter().any(|r| r.contains("kept.txt")));
    }

    #[test]
    fn test_walk_missing_root_is_empty() {
        let dir = TempDir::new().unwrap();
        let fs = OsFileSystem::new();
        let entries = fs.walk(&dir.path().join("absent"), &[]).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_parents_come_before_children() {
        let dir = TempDir::new().unwrap();
        let fs = OsFileSystem::new();
        fs.write(&dir.path().join("A/B/c.txt"), "").unwrap();

        let entries = fs.walk(dir.path(), &[]).unwrap();
        let a = entries
            .iter()
            .position(|e| e.rel_path == Path::new("A"))
            .unwrap();
        let ab = entries
            .iter()
            .position(|e| e.rel_path == Path::new("A/B"))
            .unwrap();
        let abc = entries
            .iter()
            .position(|e| e.rel_path == Path::new("A/B/c.txt"))
            .unwrap();
        assert!(a < ab && ab < abc);
    }
}
