//! In-memory mirror of the binder's on-disk tree.
//!
//! Two parallel namespaces (notes and trash) each map section → notebook →
//! filename → handle. Section and notebook nodes may exist with no
//! children, mirroring empty directories. Every registered file gets a
//! monotonically increasing sequence number; full-text search walks
//! artifacts in that registration order.

use crate::artifact::ArtifactHandle;
use crate::naming::{ArtifactKind, ArtifactPath};
use std::collections::BTreeMap;

/// Which of the two namespaces an identity lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Area {
    Notes,
    Trash,
}

#[derive(Debug, Default)]
struct Namespace {
    sections: BTreeMap<String, SectionNode>,
}

#[derive(Debug, Default)]
struct SectionNode {
    notebooks: BTreeMap<String, NotebookNode>,
}

#[derive(Debug, Default)]
struct NotebookNode {
    files: BTreeMap<String, FileEntry>,
}

#[derive(Debug)]
struct FileEntry {
    handle: ArtifactHandle,
    seq: u64,
}

#[derive(Debug, Default)]
pub(crate) struct SchemaTree {
    notes: Namespace,
    trash: Namespace,
    next_seq: u64,
}

impl SchemaTree {
    fn namespace(&self, area: Area) -> &Namespace {
        match area {
            Area::Notes => &self.notes,
            Area::Trash => &self.trash,
        }
    }

    fn namespace_mut(&mut self, area: Area) -> &mut Namespace {
        match area {
            Area::Notes => &mut self.notes,
            Area::Trash => &mut self.trash,
        }
    }

    /// Create the section node if it is not already present.
    pub fn ensure_section(&mut self, area: Area, section: &str) {
        self.namespace_mut(area)
            .sections
            .entry(section.to_string())
            .or_default();
    }

    /// Create the notebook node (and its section) if not already present.
    pub fn ensure_notebook(&mut self, area: Area, section: &str, notebook: &str) {
        self.namespace_mut(area)
            .sections
            .entry(section.to_string())
            .or_default()
            .notebooks
            .entry(notebook.to_string())
            .or_default();
    }

    /// Register a file artifact under its own identity, assigning the next
    /// sequence number. Parent nodes are created as needed.
    pub fn insert(&mut self, area: Area, handle: ArtifactHandle) {
        let path = handle.path();
        let seq = self.next_seq;
        self.next_seq += 1;
        self.namespace_mut(area)
            .sections
            .entry(path.section().to_string())
            .or_default()
            .notebooks
            .entry(path.notebook().to_string())
            .or_default()
            .files
            .insert(path.filename().to_string(), FileEntry { handle, seq });
    }

    /// Resolve a file identity to its registered handle.
    pub fn get(&self, area: Area, path: &ArtifactPath) -> Option<ArtifactHandle> {
        self.namespace(area)
            .sections
            .get(path.section())?
            .notebooks
            .get(path.notebook())?
            .files
            .get(path.filename())
            .map(|entry| entry.handle.clone())
    }

    pub fn has_section(&self, area: Area, section: &str) -> bool {
        self.namespace(area).sections.contains_key(section)
    }

    pub fn has_notebook(&self, area: Area, section: &str, notebook: &str) -> bool {
        self.namespace(area)
            .sections
            .get(section)
            .map(|s| s.notebooks.contains_key(notebook))
            .unwrap_or(false)
    }

    pub fn has_artifact(&self, area: Area, path: &ArtifactPath) -> bool {
        self.get(area, path).is_some()
    }

    /// Remove the node addressed by `path`, whatever its kind. Returns the
    /// file handles that were dropped, in registration order: one for a
    /// file identity, every descendant for a notebook or section.
    pub fn remove(&mut self, area: Area, path: &ArtifactPath) -> Vec<ArtifactHandle> {
        let ns = self.namespace_mut(area);
        let mut entries: Vec<FileEntry> = Vec::new();
        match path.kind() {
            ArtifactKind::File => {
                if let Some(section) = ns.sections.get_mut(path.section()) {
                    if let Some(notebook) = section.notebooks.get_mut(path.notebook()) {
                        if let Some(entry) = notebook.files.remove(path.filename()) {
                            entries.push(entry);
                        }
                    }
                }
            }
            ArtifactKind::Notebook => {
                if let Some(section) = ns.sections.get_mut(path.section()) {
                    if let Some(notebook) = section.notebooks.remove(path.notebook()) {
                        entries.extend(notebook.files.into_values());
                    }
                }
            }
            ArtifactKind::Section => {
                if let Some(section) = ns.sections.remove(path.section()) {
                    for notebook in section.notebooks.into_values() {
                        entries.extend(notebook.files.into_values());
                    }
                }
            }
            ArtifactKind::Unknown => {}
        }
        entries.sort_by_key(|entry| entry.seq);
        entries.into_iter().map(|entry| entry.handle).collect()
    }

    pub fn sections(&self, area: Area) -> Vec<String> {
        self.namespace(area).sections.keys().cloned().collect()
    }

    pub fn notebooks(&self, area: Area, section: &str) -> Vec<String> {
        self.namespace(area)
            .sections
            .get(section)
            .map(|s| s.notebooks.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn artifacts(&self, area: Area, section: &str, notebook: &str) -> Vec<String> {
        self.namespace(area)
            .sections
            .get(section)
            .and_then(|s| s.notebooks.get(notebook))
            .map(|n| n.files.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Every file handle in the area, oldest registration first.
    pub fn artifacts_in_order(&self, area: Area) -> Vec<ArtifactHandle> {
        let mut entries: Vec<(u64, ArtifactHandle)> = Vec::new();
        for section in self.namespace(area).sections.values() {
            for notebook in section.notebooks.values() {
                for entry in notebook.files.values() {
                    entries.push((entry.seq, entry.handle.clone()));
                }
            }
        }
        entries.sort_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, handle)| handle).collect()
    }

    /// File handles under a section or notebook node, oldest first. For a
    /// file identity this is the file itself.
    pub fn descendants(&self, area: Area, path: &ArtifactPath) -> Vec<ArtifactHandle> {
        let ns = self.namespace(area);
        let mut entries: Vec<(u64, ArtifactHandle)> = Vec::new();
        match path.kind() {
            ArtifactKind::File => {
                if let Some(handle) = self.get(area, path) {
                    entries.push((0, handle));
                }
            }
            ArtifactKind::Notebook => {
                if let Some(notebook) = ns
                    .sections
                    .get(path.section())
                    .and_then(|s| s.notebooks.get(path.notebook()))
                {
                    for entry in notebook.files.values() {
                        entries.push((entry.seq, entry.handle.clone()));
                    }
                }
            }
            ArtifactKind::Section => {
                if let Some(section) = ns.sections.get(path.section()) {
                    for notebook in section.notebooks.values() {
                        for entry in notebook.files.values() {
                            entries.push((entry.seq, entry.handle.clone()));
                        }
                    }
                }
            }
            ArtifactKind::Unknown => {}
        }
        entries.sort_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, handle)| handle).collect()
    }

    /// Drop every node in the area. Sequence numbers keep counting so a
    /// reload never reuses an earlier position.
    pub fn clear(&mut self, area: Area) {
        self.namespace_mut(area).sections.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::Artifact;

    fn handle(section: &str, notebook: &str, filename: &str) -> ArtifactHandle {
        ArtifactHandle::new(Artifact::new(
            ArtifactPath::for_file(section, notebook, filename).unwrap(),
        ))
    }

    #[test]
    fn test_insert_creates_parents() {
        let mut tree = SchemaTree::default();
        tree.insert(Area::Notes, handle("A", "B", "c.txt"));
        assert!(tree.has_section(Area::Notes, "A"));
        assert!(tree.has_notebook(Area::Notes, "A", "B"));
        assert!(tree.has_artifact(
            Area::Notes,
            &ArtifactPath::for_file("A", "B", "c.txt").unwrap()
        ));
    }

    #[test]
    fn test_placeholder_nodes_without_children() {
        let mut tree = SchemaTree::default();
        tree.ensure_section(Area::Notes, "Empty");
        tree.ensure_notebook(Area::Notes, "Work", "Blank");
        assert!(tree.has_section(Area::Notes, "Empty"));
        assert!(tree.has_section(Area::Notes, "Work"));
        assert!(tree.has_notebook(Area::Notes, "Work", "Blank"));
        assert!(tree.artifacts(Area::Notes, "Work", "Blank").is_empty());
    }

    #[test]
    fn test_areas_are_independent() {
        let mut tree = SchemaTree::default();
        tree.insert(Area::Notes, handle("A", "B", "c.txt"));
        let path = ArtifactPath::for_file("A", "B", "c.txt").unwrap();
        assert!(tree.has_artifact(Area::Notes, &path));
        assert!(!tree.has_artifact(Area::Trash, &path));
    }

    #[test]
    fn test_get_returns_registered_instance() {
        let mut tree = SchemaTree::default();
        let original = handle("A", "B", "c.txt");
        tree.insert(Area::Notes, original.clone());
        let path = ArtifactPath::for_file("A", "B", "c.txt").unwrap();
        let fetched = tree.get(Area::Notes, &path).unwrap();
        assert!(fetched.same(&original));
    }

    #[test]
    fn test_registration_order_survives_name_order() {
        let mut tree = SchemaTree::default();
        // register in an order that disagrees with lexicographic sorting
        tree.insert(Area::Notes, handle("Z", "n", "1.txt"));
        tree.insert(Area::Notes, handle("A", "n", "2.txt"));
        tree.insert(Area::Notes, handle("M", "n", "3.txt"));

        let names: Vec<String> = tree
            .artifacts_in_order(Area::Notes)
            .iter()
            .map(|h| h.path().section().to_string())
            .collect();
        assert_eq!(names, vec!["Z", "A", "M"]);
    }

    #[test]
    fn test_remove_file() {
        let mut tree = SchemaTree::default();
        tree.insert(Area::Notes, handle("A", "B", "c.txt"));
        let path = ArtifactPath::for_file("A", "B", "c.txt").unwrap();
        let removed = tree.remove(Area::Notes, &path);
        assert_eq!(removed.len(), 1);
        assert!(!tree.has_artifact(Area::Notes, &path));
        // the containing notebook stays
        assert!(tree.has_notebook(Area::Notes, "A", "B"));
    }

    #[test]
    fn test_remove_section_returns_descendants_in_order() {
        let mut tree = SchemaTree::default();
        tree.insert(Area::Notes, handle("A", "B", "z.txt"));
        tree.insert(Area::Notes, handle("A", "C", "a.txt"));
        tree.insert(Area::Notes, handle("Other", "B", "x.txt"));

        let removed = tree.remove(Area::Notes, &ArtifactPath::for_section("A").unwrap());
        let names: Vec<String> = removed
            .iter()
            .map(|h| h.path().filename().to_string())
            .collect();
        assert_eq!(names, vec!["z.txt", "a.txt"]);
        assert!(!tree.has_section(Area::Notes, "A"));
        assert!(tree.has_section(Area::Notes, "Other"));
    }

    #[test]
    fn test_clear_keeps_sequence_monotonic() {
        let mut tree = SchemaTree::default();
        tree.insert(Area::Notes, handle("A", "B", "one.txt"));
        tree.clear(Area::Notes);
        assert!(tree.sections(Area::Notes).is_empty());

        tree.insert(Area::Notes, handle("A", "B", "two.txt"));
        tree.insert(Area::Notes, handle("A", "B", "three.txt"));
        let names: Vec<String> = tree
            .artifacts_in_order(Area::Notes)
            .iter()
            .map(|h| h.path().filename().to_string())
            .collect();
        assert_eq!(names, vec!["two.txt", "three.txt"]);
    }
}
