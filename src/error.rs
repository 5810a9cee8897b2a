use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BinderError>;

/// Errors surfaced by binder operations.
///
/// Configuration problems are reported when a binder is constructed, before
/// any mutation. Everything else is per-operation: validation and
/// consistency errors reject the request up front, I/O errors propagate
/// from the filesystem gateway.
#[derive(Error, Debug)]
pub enum BinderError {
    /// The binder cannot be constructed (missing config record on open,
    /// existing record on create, absent data directory, unreadable
    /// persisted config).
    #[error("Configuration error: {0}")]
    Config(String),

    /// A name contains characters outside the allowed set. `field` says
    /// which segment was rejected.
    #[error("Invalid {field} '{value}': allowed characters are letters, digits, space and - . + @ _ ! $ &")]
    InvalidName { field: &'static str, value: String },

    /// The identity does not resolve in the notes area.
    #[error("{path} doesn't exist")]
    NotFound { path: String },

    /// The identity does not resolve in the trash area.
    #[error("{path} doesn't exist in Trash")]
    NotFoundInTrash { path: String },

    /// The identity is already taken where a fresh one was required.
    #[error("{path} already exists")]
    AlreadyExists { path: String },

    /// Rename was asked to rename an artifact onto itself.
    #[error("No difference between artifacts in rename request")]
    RenameNoOp,

    /// Rename across kinds (e.g. a section onto a file identity).
    #[error("Cannot rename {src} to {dst}: artifact kinds differ")]
    KindMismatch { src: String, dst: String },

    /// The destination of a rename was written but the source could not be
    /// removed. Both entries remain on disk and in the schema.
    #[error("Rename of {src} to {dst} could not remove the source")]
    PartialRename {
        src: String,
        dst: String,
        source: std::io::Error,
    },

    /// Refused to empty a directory that is not the binder's own Trash.
    #[error("Refusing to empty {}: not the binder's Trash directory", .0.display())]
    TrashGuard(PathBuf),

    /// A relative path decomposed into more than section/notebook/file.
    #[error("Path '{0}' has more than three segments")]
    PathTooDeep(String),

    /// A full-text search pattern failed to compile.
    #[error("Invalid search pattern: {0}")]
    BadPattern(#[from] regex::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
