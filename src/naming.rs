//! Artifact identity.
//!
//! An artifact is addressed by up to three names: section, notebook, and
//! filename. The triple doubles as the artifact's relative location on
//! disk, so every segment is validated against a fixed character set and
//! never contains a path separator.
//!
//! Which fields are populated determines the [`ArtifactKind`]:
//!
//! | section | notebook | filename | kind     |
//! |---------|----------|----------|----------|
//! | yes     | yes      | yes      | File     |
//! | yes     | yes      | -        | Notebook |
//! | yes     | -        | -        | Section  |
//! | other   | other    | other    | Unknown  |

use crate::error::{BinderError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::PathBuf;

/// Characters a section, notebook, file, or binder name may contain.
static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{L}\p{N} .+@_!$&-]+$").expect("name pattern compiles"));

/// Check one name segment against the allowed character set.
///
/// An empty value fails too: a populated field must carry at least one
/// allowed character.
pub(crate) fn validate_name(field: &'static str, value: &str) -> Result<()> {
    if NAME_RE.is_match(value) {
        Ok(())
    } else {
        Err(BinderError::InvalidName {
            field,
            value: value.to_string(),
        })
    }
}

/// What an [`ArtifactPath`] addresses, derived from which fields are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Empty or inconsistent identity.
    Unknown,
    /// Section only.
    Section,
    /// Section and notebook.
    Notebook,
    /// Section, notebook, and filename: a content-bearing artifact.
    File,
}

/// The (section, notebook, filename) identity of an artifact.
///
/// Fields are private so an instance can only hold validated names; an
/// empty string means the field is absent. Two paths are equal when all
/// three fields match exactly, case included.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactPath {
    section: String,
    notebook: String,
    filename: String,
}

impl ArtifactPath {
    /// The empty identity; classifies as [`ArtifactKind::Unknown`].
    pub fn empty() -> Self {
        Self {
            section: String::new(),
            notebook: String::new(),
            filename: String::new(),
        }
    }

    /// Identity of a section.
    pub fn for_section(section: &str) -> Result<Self> {
        validate_name("section name", section)?;
        Ok(Self {
            section: section.to_string(),
            notebook: String::new(),
            filename: String::new(),
        })
    }

    /// Identity of a notebook inside a section.
    pub fn for_notebook(section: &str, notebook: &str) -> Result<Self> {
        validate_name("section name", section)?;
        validate_name("notebook name", notebook)?;
        Ok(Self {
            section: section.to_string(),
            notebook: notebook.to_string(),
            filename: String::new(),
        })
    }

    /// Identity of a file inside a notebook.
    pub fn for_file(section: &str, notebook: &str, filename: &str) -> Result<Self> {
        validate_name("section name", section)?;
        validate_name("notebook name", notebook)?;
        validate_name("file name", filename)?;
        Ok(Self {
            section: section.to_string(),
            notebook: notebook.to_string(),
            filename: filename.to_string(),
        })
    }

    /// Build an identity from up to three names, where empty strings mean
    /// absent. A populated field requires every coarser field to be
    /// populated as well; the gap is reported against the missing field.
    pub fn new(section: &str, notebook: &str, filename: &str) -> Result<Self> {
        if !filename.is_empty() {
            return Self::for_file(section, notebook, filename);
        }
        if !notebook.is_empty() {
            return Self::for_notebook(section, notebook);
        }
        if !section.is_empty() {
            return Self::for_section(section);
        }
        Ok(Self::empty())
    }

    /// Internal constructor for segments that were already validated.
    pub(crate) fn raw(section: &str, notebook: &str, filename: &str) -> Self {
        Self {
            section: section.to_string(),
            notebook: notebook.to_string(),
            filename: filename.to_string(),
        }
    }

    /// Decompose a `/`-separated relative path into an identity.
    ///
    /// At most three segments fit; a deeper path is an error, never a
    /// truncation. Leading and trailing separators are tolerated.
    pub fn parse(rel: &str) -> Result<Self> {
        let trimmed = rel.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::empty());
        }
        let mut parts = trimmed.split('/');
        let section = parts.next().unwrap_or_default();
        let notebook = parts.next().unwrap_or_default();
        let filename = parts.next().unwrap_or_default();
        if parts.next().is_some() {
            return Err(BinderError::PathTooDeep(rel.to_string()));
        }
        Self::new(section, notebook, filename)
    }

    pub fn section(&self) -> &str {
        &self.section
    }

    pub fn notebook(&self) -> &str {
        &self.notebook
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Classify by which fields are populated.
    pub fn kind(&self) -> ArtifactKind {
        match (
            self.section.is_empty(),
            self.notebook.is_empty(),
            self.filename.is_empty(),
        ) {
            (false, false, false) => ArtifactKind::File,
            (false, false, true) => ArtifactKind::Notebook,
            (false, true, true) => ArtifactKind::Section,
            _ => ArtifactKind::Unknown,
        }
    }

    /// The identity as a relative filesystem path.
    pub fn rel_path(&self) -> PathBuf {
        let mut path = PathBuf::new();
        for segment in [&self.section, &self.notebook, &self.filename] {
            if !segment.is_empty() {
                path.push(segment);
            }
        }
        path
    }

    /// Deepest populated segment, the one a collision suffix attaches to.
    pub fn leaf(&self) -> &str {
        if !self.filename.is_empty() {
            &self.filename
        } else if !self.notebook.is_empty() {
            &self.notebook
        } else {
            &self.section
        }
    }

    /// A copy whose deepest populated segment carries `-{stamp}`.
    ///
    /// This is the whole collision strategy: the caller derives the stamp
    /// from a clock (and a retry counter when needed), so the result is a
    /// pure function of the inputs and the original name always prefixes
    /// the new one.
    pub fn uniquified(&self, stamp: &str) -> Self {
        let mut out = self.clone();
        let target = if !out.filename.is_empty() {
            &mut out.filename
        } else if !out.notebook.is_empty() {
            &mut out.notebook
        } else {
            &mut out.section
        };
        target.push('-');
        target.push_str(stamp);
        out
    }
}

impl fmt::Display for ArtifactPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in [&self.section, &self.notebook, &self.filename] {
            if segment.is_empty() {
                continue;
            }
            if !first {
                write!(f, "/")?;
            }
            write!(f, "{}", segment)?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(ArtifactPath::empty().kind(), ArtifactKind::Unknown);
        assert_eq!(
            ArtifactPath::for_section("Work").unwrap().kind(),
            ArtifactKind::Section
        );
        assert_eq!(
            ArtifactPath::for_notebook("Work", "Ideas").unwrap().kind(),
            ArtifactKind::Notebook
        );
        assert_eq!(
            ArtifactPath::for_file("Work", "Ideas", "note.txt")
                .unwrap()
                .kind(),
            ArtifactKind::File
        );
    }

    #[test]
    fn test_gap_in_fields_is_rejected() {
        // A filename without a notebook reports the missing notebook
        let err = ArtifactPath::new("Work", "", "note.txt").unwrap_err();
        match err {
            BinderError::InvalidName { field, value } => {
                assert_eq!(field, "notebook name");
                assert_eq!(value, "");
            }
            other => panic!("unexpected error: {:?}", other),
        }

        // A notebook without a section reports the missing section
        let err = ArtifactPath::new("", "Ideas", "").unwrap_err();
        assert!(matches!(
            err,
            BinderError::InvalidName {
                field: "section name",
                ..
            }
        ));
    }

    #[test]
    fn test_allowed_characters() {
        for name in [
            "plain",
            "With Space",
            "dots.and-dashes",
            "a+b@c_d!e$f&g",
            "123",
            "Ünïcode",
        ] {
            assert!(
                ArtifactPath::for_section(name).is_ok(),
                "expected '{}' to be accepted",
                name
            );
        }
    }

    #[test]
    fn test_rejected_characters_name_the_value() {
        for name in ["a/b", "a\\b", "semi;colon", "star*", "quo\"te", "", "tab\there"] {
            let err = ArtifactPath::for_section(name).unwrap_err();
            match err {
                BinderError::InvalidName { field, value } => {
                    assert_eq!(field, "section name");
                    assert_eq!(value, name);
                }
                other => panic!("unexpected error for '{}': {:?}", name, other),
            }
        }
    }

    #[test]
    fn test_error_message_names_value_and_allowed_set() {
        let err = ArtifactPath::for_file("Work", "Ideas", "bad*name").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("file name"));
        assert!(msg.contains("bad*name"));
        assert!(msg.contains("- . + @ _ ! $ &"));
    }

    #[test]
    fn test_parse_all_depths() {
        assert_eq!(ArtifactPath::parse("").unwrap(), ArtifactPath::empty());
        assert_eq!(
            ArtifactPath::parse("Work").unwrap(),
            ArtifactPath::for_section("Work").unwrap()
        );
        assert_eq!(
            ArtifactPath::parse("Work/Ideas").unwrap(),
            ArtifactPath::for_notebook("Work", "Ideas").unwrap()
        );
        assert_eq!(
            ArtifactPath::parse("Work/Ideas/note.txt").unwrap(),
            ArtifactPath::for_file("Work", "Ideas", "note.txt").unwrap()
        );
        // separators at the edges are noise, not segments
        assert_eq!(
            ArtifactPath::parse("/Work/Ideas/").unwrap(),
            ArtifactPath::for_notebook("Work", "Ideas").unwrap()
        );
    }

    #[test]
    fn test_parse_rejects_deep_paths() {
        let err = ArtifactPath::parse("a/b/c/d").unwrap_err();
        match err {
            BinderError::PathTooDeep(path) => assert_eq!(path, "a/b/c/d"),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(matches!(
            ArtifactPath::parse("a/b/c/d/e/f"),
            Err(BinderError::PathTooDeep(_))
        ));
    }

    #[test]
    fn test_display_joins_populated_segments() {
        assert_eq!(ArtifactPath::empty().to_string(), "");
        assert_eq!(
            ArtifactPath::for_section("Work").unwrap().to_string(),
            "Work"
        );
        assert_eq!(
            ArtifactPath::for_file("Work", "Ideas", "note.txt")
                .unwrap()
                .to_string(),
            "Work/Ideas/note.txt"
        );
    }

    #[test]
    fn test_equality_is_exact_and_case_sensitive() {
        let a = ArtifactPath::for_file("Work", "Ideas", "note.txt").unwrap();
        let b = ArtifactPath::for_file("Work", "Ideas", "note.txt").unwrap();
        let c = ArtifactPath::for_file("work", "Ideas", "note.txt").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_uniquified_keeps_original_as_prefix() {
        let file = ArtifactPath::for_file("A", "B", "c.txt").unwrap();
        let stamped = file.uniquified("20260823T101530");
        assert_eq!(stamped.section(), "A");
        assert_eq!(stamped.notebook(), "B");
        assert_eq!(stamped.filename(), "c.txt-20260823T101530");
        assert!(stamped.filename().starts_with(file.filename()));

        let section = ArtifactPath::for_section("A").unwrap();
        assert_eq!(section.uniquified("7").section(), "A-7");
    }

    #[test]
    fn test_uniquified_is_deterministic() {
        let file = ArtifactPath::for_file("A", "B", "c.txt").unwrap();
        assert_eq!(file.uniquified("x"), file.uniquified("x"));
    }

    #[test]
    fn test_rel_path() {
        let file = ArtifactPath::for_file("A", "B", "c.txt").unwrap();
        assert_eq!(file.rel_path(), PathBuf::from("A/B/c.txt"));
        let section = ArtifactPath::for_section("A").unwrap();
        assert_eq!(section.rel_path(), PathBuf::from("A"));
    }
}
