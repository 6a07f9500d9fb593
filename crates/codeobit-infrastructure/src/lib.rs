//! Filesystem-backed implementations for codeobit.

pub mod autosave;
pub mod config_service;
pub mod os_file_lookup;
pub mod paths;
pub mod storage;
pub mod toml_project_repository;

pub use crate::autosave::{AutoSaveManager, PendingSave, SaveRequest};
pub use crate::config_service::ConfigService;
pub use crate::os_file_lookup::OsFileLookup;
pub use crate::paths::CodeobitPaths;
pub use crate::storage::FsArtifactStore;
pub use crate::toml_project_repository::TomlProjectRepository;
