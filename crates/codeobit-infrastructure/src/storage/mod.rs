//! Storage layer for atomic file operations.

mod artifact_store;
mod atomic_file;

pub use artifact_store::FsArtifactStore;
pub use atomic_file::{AtomicFileError, AtomicTomlFile, write_atomic, write_new_atomic};
