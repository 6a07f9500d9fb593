//! Auto-save engine.
//!
//! - `manifest`: on-disk version records (manifest, index ledger and sidecars)
//! - `manager`: `AutoSaveManager` (saves, dirty queue, history, recovery)

mod manager;
mod manifest;

pub use manager::{AutoSaveManager, DEFAULT_AUTOSAVE_DIR, PendingSave, SaveRequest};
pub use manifest::{
    ArtifactManifest, INDEX_FILE, INDEX_LEDGER_DIR, IndexLedger, MANIFEST_FILE, ManifestEntry,
    VersionSidecar, sidecar_path, version_file_name,
};
