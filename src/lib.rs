//! # Bindery Architecture
//!
//! Bindery is a **UI-agnostic document store**. Artifacts are plain text
//! files in a plain directory tree; the crate's job is to keep an
//! in-memory view of that tree honest while staying pleasant to use from
//! any front end.
//!
//! A binder maps directly onto the filesystem:
//!
//! ```text
//! {root}/{binder}/
//!     {section}/{notebook}/{artifact}     the notes area
//!     Trash/{section}/{notebook}/{...}    trashed entries, same shape
//! ```
//!
//! ## The Three-Layer Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Facade (binder.rs)                                         │
//! │  - The public Binder type; one lock around the whole state  │
//! │  - Owns the background autosave worker                      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Core state (schema, artifact, metadata, recents)           │
//! │  - In-memory mirror of the on-disk tree                     │
//! │  - Shared artifact handles, dirty tracking, recents cache   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Filesystem gateway (fs/)                                   │
//! │  - Abstract FileSystem trait                                │
//! │  - OsFileSystem (production), MemoryFileSystem (testing)    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Principle: the Disk Leads, the Mirror Follows
//!
//! Structural operations perform their filesystem step first and update
//! the in-memory schema only once that step succeeded. A failed trash or
//! rename therefore leaves the mirror describing exactly what is on
//! disk. The one inversion is `remove`, which unregisters the identity
//! before deleting: a failed delete can strand a file on disk, never a
//! schema entry without one. Content edits run the other way: they live
//! in memory until a flush, and the dirty flag says which artifacts the
//! disk has not seen yet.
//!
//! Explicit saves report their errors. Background persistence (recents
//! eviction, the autosave timer) must never interrupt whatever the
//! caller was doing, so its failures are logged and collected in a
//! bounded, drainable sink instead ([`Binder::take_flush_failures`]).
//!
//! ## One Handle per Artifact
//!
//! The binder hands out [`ArtifactHandle`]s: shared references to a
//! single artifact instance. However a handle was obtained, edits made
//! through it are visible through every other handle to the same
//! artifact, and [`ArtifactHandle::same`] answers identity questions
//! without comparing content. Trashing or restoring re-points the
//! existing instance rather than creating a new one.
//!
//! ## Module Overview
//!
//! - [`binder`]: The facade—entry point for all operations
//! - [`artifact`]: The artifact value object and the shared handle
//! - [`naming`]: Identity triple, name validation, path classification
//! - [`metadata`]: Sidecar records keyed by relative path
//! - [`recents`]: Bounded queue of recently touched artifacts
//! - [`config`]: The persisted configuration record and derived paths
//! - [`fs`]: Filesystem gateway trait and its implementations
//! - [`error`]: Error types
//! - `schema`: The in-memory tree mirror (internal; [`Area`] is re-exported)
//!
//! ## Example
//!
//! ```no_run
//! use bindery::{ArtifactPath, Binder, BinderConfig};
//! use std::path::Path;
//!
//! fn main() -> bindery::Result<()> {
//!     let config = BinderConfig::new(
//!         "Notes",
//!         Path::new("/home/me/binders"),
//!         Path::new("/home/me/.config/bindery"),
//!     )?;
//!     let mut binder = Binder::create(config, &["Work"])?;
//!
//!     let path = ArtifactPath::for_file("Work", "Ideas", "pitch.txt")?;
//!     let artifact = binder.add(&path)?;
//!     artifact.set_content("An idea worth keeping.");
//!
//!     // flushes everything and stops the autosave timer
//!     binder.shutdown()?;
//!     Ok(())
//! }
//! ```

pub mod artifact;
pub mod binder;
pub mod config;
pub mod error;
pub mod fs;
pub mod metadata;
pub mod naming;
pub mod recents;
mod schema;

pub use artifact::{Artifact, ArtifactHandle};
pub use binder::{Binder, FlushFailure};
pub use config::BinderConfig;
pub use error::{BinderError, Result};
pub use fs::{FileSystem, FileTimes, MemoryFileSystem, OsFileSystem, WalkEntry};
pub use naming::{ArtifactKind, ArtifactPath};
pub use schema::Area;
