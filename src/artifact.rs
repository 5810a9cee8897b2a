//! The artifact value object and the shared handle the binder hands out.
//!
//! The schema owns exactly one handle per resident identity; the recents
//! cache and callers hold clones of the same allocation. Mutation through
//! any clone is visible everywhere, and pointer equality ([`ArtifactHandle::same`])
//! answers "is this the same artifact" without comparing content.

use crate::error::Result;
use crate::naming::{ArtifactKind, ArtifactPath};
use crate::schema::Area;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;

/// A plain-text document plus its in-memory state.
///
/// `buf` holds the content once loaded; `dirty` tracks whether `buf` has
/// diverged from what was last persisted. Timestamps come from the
/// filesystem when available and are synthesized otherwise.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub(crate) path: ArtifactPath,
    pub(crate) area: Area,
    pub(crate) buf: String,
    pub(crate) dirty: bool,
    pub(crate) loaded: bool,
    pub(crate) tags: Vec<String>,
    pub(crate) created: DateTime<Utc>,
    pub(crate) updated: DateTime<Utc>,
    pub(crate) accessed: DateTime<Utc>,
}

impl Artifact {
    /// A fresh, unloaded artifact in the notes area.
    pub fn new(path: ArtifactPath) -> Self {
        Self::in_area(path, Area::Notes)
    }

    pub(crate) fn in_area(path: ArtifactPath, area: Area) -> Self {
        let now = Utc::now();
        Self {
            path,
            area,
            buf: String::new(),
            dirty: false,
            loaded: false,
            tags: Vec::new(),
            created: now,
            updated: now,
            accessed: now,
        }
    }

    /// Build from a `/`-separated relative path.
    pub fn from_rel_path(rel: &str) -> Result<Self> {
        Ok(Self::new(ArtifactPath::parse(rel)?))
    }

    pub fn kind(&self) -> ArtifactKind {
        self.path.kind()
    }

    /// Replace the content buffer. A no-op when nothing changes; otherwise
    /// the artifact is dirty until the next flush.
    pub fn set_content(&mut self, content: &str) {
        if self.buf == content {
            return;
        }
        self.buf = content.to_string();
        self.dirty = true;
        self.updated = Utc::now();
    }

    /// Append a tag, keeping insertion order. Duplicates are ignored.
    pub fn add_tag(&mut self, tag: &str) {
        if !self.tags.iter().any(|t| t == tag) {
            self.tags.push(tag.to_string());
        }
    }

    pub fn remove_tag(&mut self, tag: &str) {
        self.tags.retain(|t| t != tag);
    }
}

/// Shared, mutable reference to an artifact.
#[derive(Debug, Clone)]
pub struct ArtifactHandle(Arc<RwLock<Artifact>>);

impl ArtifactHandle {
    pub fn new(artifact: Artifact) -> Self {
        Self(Arc::new(RwLock::new(artifact)))
    }

    /// True when both handles refer to the same artifact instance.
    pub fn same(&self, other: &ArtifactHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn path(&self) -> ArtifactPath {
        self.0.read().path.clone()
    }

    pub fn area(&self) -> Area {
        self.0.read().area
    }

    pub fn kind(&self) -> ArtifactKind {
        self.0.read().path.kind()
    }

    pub fn content(&self) -> String {
        self.0.read().buf.clone()
    }

    pub fn set_content(&self, content: &str) {
        self.0.write().set_content(content);
    }

    pub fn is_dirty(&self) -> bool {
        self.0.read().dirty
    }

    pub fn is_loaded(&self) -> bool {
        self.0.read().loaded
    }

    pub fn tags(&self) -> Vec<String> {
        self.0.read().tags.clone()
    }

    pub fn add_tag(&self, tag: &str) {
        self.0.write().add_tag(tag);
    }

    pub fn remove_tag(&self, tag: &str) {
        self.0.write().remove_tag(tag);
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.0.read().created
    }

    pub fn updated(&self) -> DateTime<Utc> {
        self.0.read().updated
    }

    pub fn accessed(&self) -> DateTime<Utc> {
        self.0.read().accessed
    }

    pub(crate) fn with<R>(&self, f: impl FnOnce(&Artifact) -> R) -> R {
        f(&self.0.read())
    }

    pub(crate) fn with_mut<R>(&self, f: impl FnOnce(&mut Artifact) -> R) -> R {
        f(&mut self.0.write())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_path() -> ArtifactPath {
        ArtifactPath::for_file("Work", "Ideas", "note.txt").unwrap()
    }

    #[test]
    fn test_new_artifact_is_clean_and_unloaded() {
        let artifact = Artifact::new(file_path());
        assert!(!artifact.dirty);
        assert!(!artifact.loaded);
        assert_eq!(artifact.buf, "");
        assert_eq!(artifact.kind(), ArtifactKind::File);
        assert_eq!(artifact.area, Area::Notes);
    }

    #[test]
    fn test_set_content_marks_dirty_only_on_change() {
        let mut artifact = Artifact::new(file_path());
        artifact.set_content("hello");
        assert!(artifact.dirty);

        artifact.dirty = false;
        artifact.set_content("hello");
        assert!(!artifact.dirty, "identical content must not re-dirty");

        artifact.set_content("changed");
        assert!(artifact.dirty);
    }

    #[test]
    fn test_tags_keep_order_and_ignore_duplicates() {
        let mut artifact = Artifact::new(file_path());
        artifact.add_tag("b");
        artifact.add_tag("a");
        artifact.add_tag("b");
        assert_eq!(artifact.tags, vec!["b", "a"]);

        artifact.remove_tag("b");
        assert_eq!(artifact.tags, vec!["a"]);
    }

    #[test]
    fn test_handle_clones_share_state() {
        let handle = ArtifactHandle::new(Artifact::new(file_path()));
        let clone = handle.clone();
        assert!(handle.same(&clone));

        clone.set_content("via clone");
        assert_eq!(handle.content(), "via clone");
        assert!(handle.is_dirty());
    }

    #[test]
    fn test_same_distinguishes_instances() {
        let a = ArtifactHandle::new(Artifact::new(file_path()));
        let b = ArtifactHandle::new(Artifact::new(file_path()));
        // identical identity, different instances
        assert_eq!(a.path(), b.path());
        assert!(!a.same(&b));
    }

    #[test]
    fn test_from_rel_path() {
        let artifact = Artifact::from_rel_path("Work/Ideas/note.txt").unwrap();
        assert_eq!(artifact.path, file_path());
        assert!(Artifact::from_rel_path("a/b/c/d").is_err());
    }
}
