//! Binder orchestration.
//!
//! [`Binder`] is the public face: a thin facade over a locked core shared
//! with the autosave worker thread. The core owns the schema mirror, the
//! metadata store, and the recents cache, and pushes every byte of I/O
//! through the filesystem gateway.
//!
//! Ordering discipline: a structural operation touches the disk first and
//! mutates the schema only after the disk call succeeded, so the mirror
//! never claims something the tree does not have. `remove` inverts this
//! (unregister, then delete); a failed delete strands a file on disk,
//! never a schema entry without one. The one place errors do not
//! propagate is fire-and-forget persistence (eviction flushes and the
//! background sweep); those failures are logged and recorded in a
//! bounded, drainable sink.

use crate::artifact::{Artifact, ArtifactHandle};
use crate::config::{BinderConfig, CONFIG_FILENAME, DEFAULT_SECTION, METADATA_FILENAME, TRASH_DIR};
use crate::error::{BinderError, Result};
use crate::fs::{FileSystem, OsFileSystem};
use crate::metadata::MetadataStore;
use crate::naming::{validate_name, ArtifactKind, ArtifactPath};
use crate::recents::RecentsCache;
use crate::schema::{Area, SchemaTree};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Most background-save failures the sink retains; the oldest fall off
/// first.
const FLUSH_FAILURE_CAP: usize = 64;

/// Record of a background save that failed.
///
/// Eviction flushes and timer sweeps never fail the operation that
/// triggered them; they report here and are drained with
/// [`Binder::take_flush_failures`]. The sink is bounded; once full, the
/// oldest record is dropped for each new one.
#[derive(Debug, Clone)]
pub struct FlushFailure {
    /// Identity of the artifact (or name of the record file) that could
    /// not be written.
    pub path: String,
    pub error: String,
    pub at: DateTime<Utc>,
}

fn not_found(area: Area, path: &ArtifactPath) -> BinderError {
    match area {
        Area::Notes => BinderError::NotFound {
            path: path.to_string(),
        },
        Area::Trash => BinderError::NotFoundInTrash {
            path: path.to_string(),
        },
    }
}

/// Metadata key for an identity: relative path, with trash entries under
/// the `Trash/` prefix.
fn meta_key(area: Area, path: &ArtifactPath) -> String {
    match area {
        Area::Notes => path.to_string(),
        Area::Trash => format!("{}/{}", TRASH_DIR, path),
    }
}

/// Re-point a descendant identity after its section or notebook moved
/// from `src` to `dst`.
fn rebase(old: &ArtifactPath, src: &ArtifactPath, dst: &ArtifactPath) -> ArtifactPath {
    match src.kind() {
        ArtifactKind::Section => ArtifactPath::raw(dst.section(), old.notebook(), old.filename()),
        ArtifactKind::Notebook => {
            ArtifactPath::raw(dst.section(), dst.notebook(), old.filename())
        }
        _ => old.clone(),
    }
}

fn rel_to_string(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn stamp_now() -> String {
    Utc::now().format("%Y%m%dT%H%M%S").to_string()
}

#[derive(Debug)]
struct BinderCore<F> {
    config: BinderConfig,
    fs: F,
    schema: SchemaTree,
    metadata: MetadataStore,
    recents: RecentsCache,
    flush_failures: Vec<FlushFailure>,
}

impl<F: FileSystem> BinderCore<F> {
    fn new(fs: F, config: BinderConfig) -> Self {
        let recents = RecentsCache::new(config.recents_capacity);
        Self {
            config,
            fs,
            schema: SchemaTree::default(),
            metadata: MetadataStore::default(),
            recents,
            flush_failures: Vec::new(),
        }
    }

    // --- Construction ---

    fn init_new(&mut self, sections: &[&str]) -> Result<()> {
        let config_file = self.config.config_file();
        if self.fs.exists(&config_file) {
            return Err(BinderError::Config(format!(
                "binder config already exists at {}",
                config_file.display()
            )));
        }
        self.fs.mkdir_all(&self.config.data_dir())?;
        self.fs.mkdir_all(&self.config.trash_dir())?;
        self.ensure_section_dir(DEFAULT_SECTION)?;
        for section in sections {
            self.ensure_section_dir(section)?;
        }
        self.save_config()?;
        self.save_metadata()?;
        info!(binder = %self.config.name, "created binder");
        Ok(())
    }

    fn init_existing(&mut self) -> Result<()> {
        let config_file = self.config.config_file();
        if !self.fs.exists(&config_file) {
            return Err(BinderError::Config(format!(
                "no binder config at {}",
                config_file.display()
            )));
        }
        let raw = self.fs.read(&config_file)?;
        // the persisted record wins over whatever the caller passed
        self.config = BinderConfig::from_json(&raw, &self.config.config_dir)?;
        if !self.fs.exists(&self.config.data_dir()) {
            return Err(BinderError::Config(format!(
                "binder data directory {} is missing",
                self.config.data_dir().display()
            )));
        }
        self.recents = RecentsCache::new(self.config.recents_capacity);
        self.load_metadata()?;
        self.load_area(Area::Notes)?;
        self.load_area(Area::Trash)?;
        self.save_config()?;
        self.save_metadata()?;
        info!(binder = %self.config.name, "opened binder");
        Ok(())
    }

    fn load_metadata(&mut self) -> Result<()> {
        let path = self.config.metadata_file();
        if self.fs.exists(&path) {
            let raw = self.fs.read(&path)?;
            self.metadata = serde_json::from_str(&raw)?;
        }
        Ok(())
    }

    fn area_root(&self, area: Area) -> PathBuf {
        match area {
            Area::Notes => self.config.data_dir(),
            Area::Trash => self.config.trash_dir(),
        }
    }

    fn abs_path(&self, area: Area, path: &ArtifactPath) -> PathBuf {
        self.area_root(area).join(path.rel_path())
    }

    /// Names excluded when walking the notes area: the reserved trash
    /// directory, plus a custom trash location if it sits in the data dir.
    fn notes_ignores(&self) -> Vec<String> {
        let mut ignores = vec![TRASH_DIR.to_string()];
        let trash = self.config.trash_dir();
        if let (Some(parent), Some(name)) = (trash.parent(), trash.file_name()) {
            if parent == self.config.data_dir() {
                let name = name.to_string_lossy().into_owned();
                if !ignores.contains(&name) {
                    ignores.push(name);
                }
            }
        }
        ignores
    }

    /// Rebuild one area of the schema from the directory tree. Entries
    /// that do not fit the section/notebook/file shape are skipped and
    /// left on disk untouched.
    fn load_area(&mut self, area: Area) -> Result<()> {
        self.schema.clear(area);
        let root = self.area_root(area);
        let ignore = match area {
            Area::Notes => self.notes_ignores(),
            Area::Trash => Vec::new(),
        };
        for entry in self.fs.walk(&root, &ignore)? {
            let rel = rel_to_string(&entry.rel_path);
            let path = match ArtifactPath::parse(&rel) {
                Ok(path) => path,
                Err(err) => {
                    warn!(area = ?area, path = %rel, %err, "skipping unrecognized entry");
                    continue;
                }
            };
            match (path.kind(), entry.is_dir) {
                (ArtifactKind::Section, true) => self.schema.ensure_section(area, path.section()),
                (ArtifactKind::Notebook, true) => {
                    self.schema
                        .ensure_notebook(area, path.section(), path.notebook())
                }
                (ArtifactKind::File, false) => {
                    let handle = ArtifactHandle::new(Artifact::in_area(path, area));
                    self.schema.insert(area, handle);
                }
                _ => {
                    debug!(area = ?area, path = %rel, "ignoring stray entry");
                }
            }
        }
        Ok(())
    }

    // --- Lookup ---

    fn get(&mut self, path: &ArtifactPath, area: Area) -> Result<ArtifactHandle> {
        match path.kind() {
            ArtifactKind::File => {
                let handle = self
                    .schema
                    .get(area, path)
                    .ok_or_else(|| not_found(area, path))?;
                self.hydrate(&handle)?;
                if let Some(evicted) = self.recents.enqueue(&handle) {
                    self.flush_evicted(&evicted);
                }
                Ok(handle)
            }
            ArtifactKind::Section => {
                if self.schema.has_section(area, path.section()) {
                    Ok(ArtifactHandle::new(Artifact::in_area(path.clone(), area)))
                } else {
                    Err(not_found(area, path))
                }
            }
            ArtifactKind::Notebook => {
                if self
                    .schema
                    .has_notebook(area, path.section(), path.notebook())
                {
                    Ok(ArtifactHandle::new(Artifact::in_area(path.clone(), area)))
                } else {
                    Err(not_found(area, path))
                }
            }
            ArtifactKind::Unknown => Err(not_found(area, path)),
        }
    }

    /// Load content and merge metadata on first access. Subsequent calls
    /// are free: the loaded flag never goes back down.
    fn hydrate(&mut self, handle: &ArtifactHandle) -> Result<()> {
        if handle.is_loaded() {
            return Ok(());
        }
        let (area, path) = handle.with(|a| (a.area, a.path.clone()));
        let abs = self.abs_path(area, &path);
        let content = self.fs.read(&abs)?;
        let times = self.fs.stat(&abs).ok();
        let key = meta_key(area, &path);
        let tags = match self.metadata.get(&key) {
            Some(record) => record.tags.clone(),
            None => {
                // seed the store so the identity shows up in the sidecar
                self.metadata.upsert(&key);
                Vec::new()
            }
        };
        handle.with_mut(|artifact| {
            artifact.buf = content;
            artifact.loaded = true;
            artifact.dirty = false;
            artifact.tags = tags;
            if let Some(times) = times {
                artifact.created = times.created;
                artifact.updated = times.modified;
                artifact.accessed = times.accessed;
            }
        });
        debug!(path = %path, "loaded artifact");
        Ok(())
    }

    // --- Mutation ---

    fn ensure_section_dir(&mut self, section: &str) -> Result<()> {
        validate_name("section name", section)?;
        if section == TRASH_DIR {
            return Err(BinderError::AlreadyExists {
                path: TRASH_DIR.to_string(),
            });
        }
        self.fs.mkdir_all(&self.config.data_dir().join(section))?;
        self.schema.ensure_section(Area::Notes, section);
        Ok(())
    }

    fn ensure_notebook_dir(&mut self, section: &str, notebook: &str) -> Result<()> {
        self.ensure_section_dir(section)?;
        validate_name("notebook name", notebook)?;
        self.fs
            .mkdir_all(&self.config.data_dir().join(section).join(notebook))?;
        self.schema.ensure_notebook(Area::Notes, section, notebook);
        Ok(())
    }

    fn add(&mut self, path: &ArtifactPath) -> Result<ArtifactHandle> {
        match path.kind() {
            ArtifactKind::Unknown => Err(BinderError::InvalidName {
                field: "section name",
                value: path.section().to_string(),
            }),
            ArtifactKind::Section => {
                self.ensure_section_dir(path.section())?;
                Ok(ArtifactHandle::new(Artifact::new(path.clone())))
            }
            ArtifactKind::Notebook => {
                self.ensure_notebook_dir(path.section(), path.notebook())?;
                Ok(ArtifactHandle::new(Artifact::new(path.clone())))
            }
            ArtifactKind::File => {
                if self.schema.has_artifact(Area::Notes, path) {
                    return Err(BinderError::AlreadyExists {
                        path: path.to_string(),
                    });
                }
                let abs = self.abs_path(Area::Notes, path);
                if self.fs.exists(&abs) {
                    return Err(BinderError::AlreadyExists {
                        path: path.to_string(),
                    });
                }
                self.ensure_notebook_dir(path.section(), path.notebook())?;
                self.fs.write(&abs, "")?;
                let mut artifact = Artifact::new(path.clone());
                artifact.loaded = true;
                let handle = ArtifactHandle::new(artifact);
                self.schema.insert(Area::Notes, handle.clone());
                self.metadata.upsert(&meta_key(Area::Notes, path));
                if let Some(evicted) = self.recents.enqueue(&handle) {
                    self.flush_evicted(&evicted);
                }
                info!(path = %path, "added artifact");
                Ok(handle)
            }
        }
    }

    /// First collision-free destination for `path` in `area`: the path
    /// itself, else a timestamp suffix, else timestamp plus counter.
    fn free_slot(&self, area: Area, path: &ArtifactPath) -> ArtifactPath {
        if !self.occupied(area, path) {
            return path.clone();
        }
        let stamp = stamp_now();
        let mut candidate = path.uniquified(&stamp);
        let mut attempt = 2u32;
        while self.occupied(area, &candidate) {
            candidate = path.uniquified(&format!("{}-{}", stamp, attempt));
            attempt += 1;
        }
        candidate
    }

    fn occupied(&self, area: Area, path: &ArtifactPath) -> bool {
        self.fs.exists(&self.abs_path(area, path))
    }

    fn trash(&mut self, path: &ArtifactPath) -> Result<ArtifactPath> {
        match path.kind() {
            ArtifactKind::File => {
                let handle = self
                    .schema
                    .get(Area::Notes, path)
                    .ok_or_else(|| not_found(Area::Notes, path))?;
                // unsaved edits travel with the file
                self.flush_artifact(&handle)?;
                let dst = self.free_slot(Area::Trash, path);
                self.fs.rename(
                    &self.abs_path(Area::Notes, path),
                    &self.abs_path(Area::Trash, &dst),
                )?;
                self.schema.remove(Area::Notes, path);
                self.metadata
                    .relocate(&meta_key(Area::Notes, path), &meta_key(Area::Trash, &dst));
                handle.with_mut(|artifact| {
                    artifact.path = dst.clone();
                    artifact.area = Area::Trash;
                });
                self.schema.insert(Area::Trash, handle);
                info!(from = %path, to = %dst, "trashed artifact");
                Ok(dst)
            }
            ArtifactKind::Section | ArtifactKind::Notebook => {
                self.move_subtree(Area::Notes, Area::Trash, path)
            }
            ArtifactKind::Unknown => Err(not_found(Area::Notes, path)),
        }
    }

    fn restore(&mut self, path: &ArtifactPath) -> Result<ArtifactPath> {
        match path.kind() {
            ArtifactKind::File => {
                let handle = self
                    .schema
                    .get(Area::Trash, path)
                    .ok_or_else(|| not_found(Area::Trash, path))?;
                let dst = self.free_slot(Area::Notes, path);
                self.fs.rename(
                    &self.abs_path(Area::Trash, path),
                    &self.abs_path(Area::Notes, &dst),
                )?;
                self.schema.remove(Area::Trash, path);
                self.metadata
                    .relocate(&meta_key(Area::Trash, path), &meta_key(Area::Notes, &dst));
                handle.with_mut(|artifact| {
                    artifact.path = dst.clone();
                    artifact.area = Area::Notes;
                });
                self.schema.insert(Area::Notes, handle);
                info!(from = %path, to = %dst, "restored artifact");
                Ok(dst)
            }
            ArtifactKind::Section | ArtifactKind::Notebook => {
                self.move_subtree(Area::Trash, Area::Notes, path)
            }
            ArtifactKind::Unknown => Err(not_found(Area::Trash, path)),
        }
    }

    /// Move a section or notebook between areas, keeping every descendant
    /// handle alive and every metadata record keyed to its new location.
    fn move_subtree(
        &mut self,
        from_area: Area,
        to_area: Area,
        path: &ArtifactPath,
    ) -> Result<ArtifactPath> {
        let exists = match path.kind() {
            ArtifactKind::Section => self.schema.has_section(from_area, path.section()),
            _ => self
                .schema
                .has_notebook(from_area, path.section(), path.notebook()),
        };
        if !exists {
            return Err(not_found(from_area, path));
        }
        for handle in self.schema.descendants(from_area, path) {
            self.flush_artifact(&handle)?;
        }
        let dst = self.free_slot(to_area, path);
        self.fs.rename(
            &self.abs_path(from_area, path),
            &self.abs_path(to_area, &dst),
        )?;
        // empty notebooks move with their section
        let notebooks = match path.kind() {
            ArtifactKind::Section => self.schema.notebooks(from_area, path.section()),
            _ => Vec::new(),
        };
        let moved = self.schema.remove(from_area, path);
        match dst.kind() {
            ArtifactKind::Section => {
                self.schema.ensure_section(to_area, dst.section());
                for notebook in &notebooks {
                    self.schema.ensure_notebook(to_area, dst.section(), notebook);
                }
            }
            _ => self
                .schema
                .ensure_notebook(to_area, dst.section(), dst.notebook()),
        }
        for handle in moved {
            let old = handle.path();
            let new = rebase(&old, path, &dst);
            self.metadata
                .relocate(&meta_key(from_area, &old), &meta_key(to_area, &new));
            handle.with_mut(|artifact| {
                artifact.path = new;
                artifact.area = to_area;
            });
            self.schema.insert(to_area, handle);
        }
        info!(from = %path, to = %dst, area = ?to_area, "moved subtree");
        Ok(dst)
    }

    fn remove(&mut self, path: &ArtifactPath) -> Result<()> {
        let exists = match path.kind() {
            ArtifactKind::File => self.schema.has_artifact(Area::Notes, path),
            ArtifactKind::Notebook => self
                .schema
                .has_notebook(Area::Notes, path.section(), path.notebook()),
            ArtifactKind::Section => self.schema.has_section(Area::Notes, path.section()),
            ArtifactKind::Unknown => false,
        };
        if !exists {
            return Err(not_found(Area::Notes, path));
        }
        for handle in self.schema.remove(Area::Notes, path) {
            self.recents.eject(&handle);
        }
        let abs = self.abs_path(Area::Notes, path);
        if self.fs.exists(&abs) {
            self.fs.remove(&abs)?;
        }
        // the metadata record outlives the file on purpose
        info!(path = %path, "removed");
        Ok(())
    }

    fn empty_trash(&mut self) -> Result<()> {
        let trash = self.config.trash_dir();
        let parent_ok = trash
            .parent()
            .map(|parent| parent == self.config.data_dir())
            .unwrap_or(false);
        let name_ok = trash
            .file_name()
            .map(|name| name == TRASH_DIR)
            .unwrap_or(false);
        if !parent_ok || !name_ok {
            return Err(BinderError::TrashGuard(trash));
        }
        if self.fs.exists(&trash) {
            self.fs.remove(&trash)?;
        }
        self.fs.mkdir_all(&trash)?;
        for handle in self.schema.artifacts_in_order(Area::Trash) {
            self.recents.eject(&handle);
        }
        self.schema.clear(Area::Trash);
        info!("emptied trash");
        Ok(())
    }

    fn rename(&mut self, src: &ArtifactPath, dst: &ArtifactPath) -> Result<()> {
        if src == dst {
            return Err(BinderError::RenameNoOp);
        }
        if src.kind() != dst.kind() {
            return Err(BinderError::KindMismatch {
                src: src.to_string(),
                dst: dst.to_string(),
            });
        }
        match src.kind() {
            ArtifactKind::File => {
                let src_handle = self
                    .schema
                    .get(Area::Notes, src)
                    .ok_or_else(|| not_found(Area::Notes, src))?;
                self.hydrate(&src_handle)?;
                let dst_handle = self.add(dst)?;
                let (content, tags) = src_handle.with(|a| (a.buf.clone(), a.tags.clone()));
                dst_handle.with_mut(|artifact| {
                    artifact.buf = content;
                    artifact.tags = tags;
                    artifact.dirty = true;
                });
                self.metadata
                    .copy(&meta_key(Area::Notes, src), &meta_key(Area::Notes, dst));
                let src_abs = self.abs_path(Area::Notes, src);
                if let Err(err) = self.fs.remove(&src_abs) {
                    warn!(src = %src, dst = %dst, %err, "rename left the source behind");
                    return Err(BinderError::PartialRename {
                        src: src.to_string(),
                        dst: dst.to_string(),
                        source: err,
                    });
                }
                self.schema.remove(Area::Notes, src);
                self.recents.eject(&src_handle);
                info!(from = %src, to = %dst, "renamed artifact");
                Ok(())
            }
            ArtifactKind::Section | ArtifactKind::Notebook => self.rename_subtree(src, dst),
            ArtifactKind::Unknown => Err(not_found(Area::Notes, src)),
        }
    }

    /// Rename a section or notebook as add + per-file copy + remove, the
    /// same composition a file rename uses.
    fn rename_subtree(&mut self, src: &ArtifactPath, dst: &ArtifactPath) -> Result<()> {
        let src_exists = match src.kind() {
            ArtifactKind::Section => self.schema.has_section(Area::Notes, src.section()),
            _ => self
                .schema
                .has_notebook(Area::Notes, src.section(), src.notebook()),
        };
        if !src_exists {
            return Err(not_found(Area::Notes, src));
        }
        let dst_taken = match dst.kind() {
            ArtifactKind::Section => {
                self.schema.has_section(Area::Notes, dst.section())
                    || self.occupied(Area::Notes, dst)
            }
            _ => {
                self.schema
                    .has_notebook(Area::Notes, dst.section(), dst.notebook())
                    || self.occupied(Area::Notes, dst)
            }
        };
        if dst_taken {
            return Err(BinderError::AlreadyExists {
                path: dst.to_string(),
            });
        }
        self.add(dst)?;
        if src.kind() == ArtifactKind::Section {
            for notebook in self.schema.notebooks(Area::Notes, src.section()) {
                self.ensure_notebook_dir(dst.section(), &notebook)?;
            }
        }
        for handle in self.schema.descendants(Area::Notes, src) {
            self.hydrate(&handle)?;
            let old = handle.path();
            let new = rebase(&old, src, dst);
            let new_handle = self.add(&new)?;
            let (content, tags) = handle.with(|a| (a.buf.clone(), a.tags.clone()));
            new_handle.with_mut(|artifact| {
                artifact.buf = content;
                artifact.tags = tags;
                artifact.dirty = true;
            });
            self.metadata
                .copy(&meta_key(Area::Notes, &old), &meta_key(Area::Notes, &new));
        }
        let src_abs = self.abs_path(Area::Notes, src);
        if let Err(err) = self.fs.remove(&src_abs) {
            warn!(src = %src, dst = %dst, %err, "rename left the source behind");
            return Err(BinderError::PartialRename {
                src: src.to_string(),
                dst: dst.to_string(),
                source: err,
            });
        }
        for handle in self.schema.remove(Area::Notes, src) {
            self.recents.eject(&handle);
        }
        info!(from = %src, to = %dst, "renamed subtree");
        Ok(())
    }

    // --- Search ---

    fn find(&mut self, pattern: &str) -> Result<Vec<ArtifactHandle>> {
        let re = Regex::new(pattern)?;
        let mut matches = Vec::new();
        for handle in self.schema.artifacts_in_order(Area::Notes) {
            self.hydrate(&handle)?;
            if handle.with(|a| re.is_match(&a.buf)) {
                matches.push(handle);
            }
        }
        debug!(pattern, hits = matches.len(), "find finished");
        Ok(matches)
    }

    // --- Persistence ---

    fn flush_artifact(&mut self, handle: &ArtifactHandle) -> Result<()> {
        if !handle.is_dirty() {
            return Ok(());
        }
        let (area, path, content) = handle.with(|a| (a.area, a.path.clone(), a.buf.clone()));
        self.fs.write(&self.abs_path(area, &path), &content)?;
        handle.with_mut(|artifact| artifact.dirty = false);
        debug!(path = %path, "flushed artifact");
        Ok(())
    }

    fn flush_evicted(&mut self, evicted: &ArtifactHandle) {
        if let Err(err) = self.flush_artifact(evicted) {
            let path = evicted.path().to_string();
            self.note_flush_failure(&path, &err);
        }
    }

    fn note_flush_failure(&mut self, path: &str, err: &BinderError) {
        warn!(%path, %err, "background flush failed");
        if self.flush_failures.len() >= FLUSH_FAILURE_CAP {
            self.flush_failures.remove(0);
        }
        self.flush_failures.push(FlushFailure {
            path: path.to_string(),
            error: err.to_string(),
            at: Utc::now(),
        });
    }

    fn save_config(&mut self) -> Result<()> {
        self.fs.mkdir_all(&self.config.config_dir)?;
        self.fs
            .write(&self.config.config_file(), &self.config.to_json()?)?;
        Ok(())
    }

    fn save_metadata(&mut self) -> Result<()> {
        // fold live tag state back into the records first; unloaded
        // artifacts never touched their tags, so the records stay
        // authoritative for them
        for area in [Area::Notes, Area::Trash] {
            for handle in self.schema.artifacts_in_order(area) {
                let (path, tags, loaded) =
                    handle.with(|a| (a.path.clone(), a.tags.clone(), a.loaded));
                if loaded {
                    self.metadata.upsert(&meta_key(area, &path)).tags = tags;
                }
            }
        }
        self.fs.mkdir_all(&self.config.config_dir)?;
        let raw = serde_json::to_string_pretty(&self.metadata)?;
        self.fs.write(&self.config.metadata_file(), &raw)?;
        Ok(())
    }

    /// Full save: config record, metadata sidecar, then every dirty
    /// artifact. Every part runs even when an earlier one fails; the
    /// first error is what the caller gets.
    fn save_all(&mut self) -> Result<()> {
        let mut first_err: Option<BinderError> = None;
        if let Err(err) = self.save_config() {
            first_err.get_or_insert(err);
        }
        if let Err(err) = self.save_metadata() {
            first_err.get_or_insert(err);
        }
        for area in [Area::Notes, Area::Trash] {
            for handle in self.schema.artifacts_in_order(area) {
                if let Err(err) = self.flush_artifact(&handle) {
                    warn!(path = %handle.path(), %err, "artifact flush failed during save");
                    first_err.get_or_insert(err);
                }
            }
        }
        match first_err {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    fn save_artifact(&mut self, path: &ArtifactPath) -> Result<()> {
        let handle = self
            .schema
            .get(Area::Notes, path)
            .or_else(|| self.schema.get(Area::Trash, path))
            .ok_or_else(|| not_found(Area::Notes, path))?;
        self.flush_artifact(&handle)
    }

    /// Timer sweep. Failures land in the sink, never in a caller.
    fn background_save(&mut self) {
        debug!("background save sweep");
        if let Err(err) = self.save_config() {
            self.note_flush_failure(CONFIG_FILENAME, &err);
        }
        if let Err(err) = self.save_metadata() {
            self.note_flush_failure(METADATA_FILENAME, &err);
        }
        for area in [Area::Notes, Area::Trash] {
            for handle in self.schema.artifacts_in_order(area) {
                if let Err(err) = self.flush_artifact(&handle) {
                    let path = handle.path().to_string();
                    self.note_flush_failure(&path, &err);
                }
            }
        }
    }
}

#[derive(Debug)]
struct AutosaveWorker {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

impl AutosaveWorker {
    fn start<F: FileSystem + 'static>(
        core: Arc<Mutex<BinderCore<F>>>,
        interval_ms: u64,
    ) -> Self {
        let (stop_tx, ticks) = mpsc::channel::<()>();
        let interval = Duration::from_millis(interval_ms.max(1));
        let handle = thread::spawn(move || loop {
            match ticks.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => core.lock().background_save(),
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });
        Self { stop_tx, handle }
    }

    fn stop(self) {
        // waking the worker ends it; the send fails if it already exited
        let _ = self.stop_tx.send(());
        let _ = self.handle.join();
    }
}

/// A hierarchical, filesystem-backed store of plain-text artifacts.
///
/// Artifacts live under `{root}/{name}/{section}/{notebook}/{file}` with
/// trashed ones under the reserved `Trash` directory. The binder keeps an
/// in-memory mirror of that tree, hands out shared [`ArtifactHandle`]s,
/// tracks unsaved edits, and persists on demand plus on a background
/// timer.
#[derive(Debug)]
pub struct Binder<F = OsFileSystem> {
    core: Arc<Mutex<BinderCore<F>>>,
    autosave: Option<AutosaveWorker>,
}

impl Binder<OsFileSystem> {
    /// Create a new binder on the real filesystem. The data directory,
    /// its trash, the `Default` section, and every requested section are
    /// created, and the config record is written immediately. Creating
    /// over an existing config record is a configuration error; use
    /// [`Binder::open`] for an initialized binder.
    pub fn create(config: BinderConfig, sections: &[&str]) -> Result<Self> {
        Self::create_on(OsFileSystem::new(), config, sections)
    }

    /// Open an existing binder on the real filesystem. The persisted
    /// config record and the data directory must both exist.
    pub fn open(config: BinderConfig) -> Result<Self> {
        Self::open_on(OsFileSystem::new(), config)
    }
}

impl<F: FileSystem + 'static> Binder<F> {
    /// [`Binder::create`] against an explicit gateway.
    pub fn create_on(fs: F, config: BinderConfig, sections: &[&str]) -> Result<Self> {
        let mut core = BinderCore::new(fs, config);
        core.init_new(sections)?;
        Ok(Self::start(core))
    }

    /// [`Binder::open`] against an explicit gateway.
    pub fn open_on(fs: F, config: BinderConfig) -> Result<Self> {
        let mut core = BinderCore::new(fs, config);
        core.init_existing()?;
        Ok(Self::start(core))
    }

    fn start(core: BinderCore<F>) -> Self {
        let interval_ms = core.config.save_interval_ms;
        let core = Arc::new(Mutex::new(core));
        let autosave = AutosaveWorker::start(Arc::clone(&core), interval_ms);
        Self {
            core,
            autosave: Some(autosave),
        }
    }

    /// Fetch an artifact from the notes area. File content is loaded on
    /// first access and the handle joins the recents cache; later calls
    /// return the same instance without touching the disk.
    pub fn get(&self, path: &ArtifactPath) -> Result<ArtifactHandle> {
        self.core.lock().get(path, Area::Notes)
    }

    /// Fetch from an explicit area; `Trash` resolves trashed artifacts.
    pub fn get_from(&self, path: &ArtifactPath, area: Area) -> Result<ArtifactHandle> {
        self.core.lock().get(path, area)
    }

    /// Create the identity: directories for a section or notebook, an
    /// empty file for an artifact. Adding an existing artifact is an
    /// error; re-adding a section or notebook is a no-op.
    pub fn add(&mut self, path: &ArtifactPath) -> Result<ArtifactHandle> {
        self.core.lock().add(path)
    }

    /// Move an artifact, notebook, or section into the trash, keeping its
    /// relative location. Returns the destination identity, uniquified if
    /// the slot was taken.
    pub fn trash(&mut self, path: &ArtifactPath) -> Result<ArtifactPath> {
        self.core.lock().trash(path)
    }

    /// Move a trashed identity back into the notes area. Returns the
    /// destination identity, uniquified if the slot was taken.
    pub fn restore(&mut self, path: &ArtifactPath) -> Result<ArtifactPath> {
        self.core.lock().restore(path)
    }

    /// Permanently delete from the notes area, bypassing the trash. The
    /// metadata record is kept.
    pub fn remove(&mut self, path: &ArtifactPath) -> Result<()> {
        self.core.lock().remove(path)
    }

    /// Permanently delete everything in the trash. Refuses to run when
    /// the configured trash directory is not the binder's own `Trash`.
    pub fn empty_trash(&mut self) -> Result<()> {
        self.core.lock().empty_trash()
    }

    /// Rename within the notes area: create the destination, copy content
    /// and tags, then remove the source. There is no rollback; a failure
    /// after the copy surfaces as [`BinderError::PartialRename`] with
    /// both entries still present.
    pub fn rename(&mut self, src: &ArtifactPath, dst: &ArtifactPath) -> Result<()> {
        self.core.lock().rename(src, dst)
    }

    /// Full-text regex search over the notes area, visiting artifacts in
    /// registration order and loading them as needed.
    pub fn find(&self, pattern: &str) -> Result<Vec<ArtifactHandle>> {
        self.core.lock().find(pattern)
    }

    /// Write the config record, the metadata sidecar, and every dirty
    /// artifact. All parts run; the first failure is returned.
    pub fn save(&self) -> Result<()> {
        self.core.lock().save_all()
    }

    /// Flush one artifact if dirty.
    pub fn save_artifact(&self, path: &ArtifactPath) -> Result<()> {
        self.core.lock().save_artifact(path)
    }

    /// Stop the autosave timer and perform a final full save. Safe to
    /// call more than once; the timer never re-arms.
    pub fn shutdown(&mut self) -> Result<()> {
        if let Some(worker) = self.autosave.take() {
            worker.stop();
        }
        self.core.lock().save_all()
    }

    /// Notes sections plus the reserved `Trash` name, sorted.
    pub fn sections(&self) -> Vec<String> {
        let core = self.core.lock();
        let mut sections = core.schema.sections(Area::Notes);
        sections.push(TRASH_DIR.to_string());
        sections.sort();
        sections.dedup();
        sections
    }

    pub fn sections_in(&self, area: Area) -> Vec<String> {
        self.core.lock().schema.sections(area)
    }

    pub fn notebooks(&self, area: Area, section: &str) -> Vec<String> {
        self.core.lock().schema.notebooks(area, section)
    }

    pub fn artifacts(&self, area: Area, section: &str, notebook: &str) -> Vec<String> {
        self.core.lock().schema.artifacts(area, section, notebook)
    }

    pub fn has_section(&self, area: Area, section: &str) -> bool {
        self.core.lock().schema.has_section(area, section)
    }

    pub fn has_notebook(&self, area: Area, section: &str, notebook: &str) -> bool {
        self.core.lock().schema.has_notebook(area, section, notebook)
    }

    pub fn has_artifact(&self, area: Area, path: &ArtifactPath) -> bool {
        self.core.lock().schema.has_artifact(area, path)
    }

    /// Current recents cache content, oldest first.
    pub fn recents(&self) -> Vec<ArtifactHandle> {
        self.core.lock().recents.handles()
    }

    /// Drain the record of background save failures.
    pub fn take_flush_failures(&self) -> Vec<FlushFailure> {
        std::mem::take(&mut self.core.lock().flush_failures)
    }

    /// Snapshot of the effective configuration.
    pub fn config(&self) -> BinderConfig {
        self.core.lock().config.clone()
    }

    pub fn name(&self) -> String {
        self.core.lock().config.name.clone()
    }
}

impl<F> Drop for Binder<F> {
    fn drop(&mut self) {
        if let Some(worker) = self.autosave.take() {
            worker.stop();
        }
    }
}
