//! Versioned, multi-location artifact persistence.

use super::manifest::{
    ArtifactManifest, INDEX_FILE, INDEX_LEDGER_DIR, IndexLedger, IndexLedgerFile, MANIFEST_FILE,
    ManifestEntry, ManifestFile, VersionSidecar, load_sidecar, save_sidecar, version_file_name,
};
use crate::storage::AtomicFileError;
use crate::storage::FsArtifactStore;
use chrono::{DateTime, Utc};
use codeobit_core::artifact::{
    ArtifactKind, ArtifactRef, ArtifactVersion, ContentHash, LocationAttempt, LocationError,
    SaveLocation, SaveOutcome, artifact_dir_name, logical_key, normalize_logical_path,
};
use codeobit_core::{CodeobitError, ErrorKind, Result};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Default auto-save directory relative to the launch directory.
pub const DEFAULT_AUTOSAVE_DIR: &str = ".codeobit/autosave";

/// Everything needed to save one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    pub logical_path: String,
    pub content: String,
    pub kind: ArtifactKind,
    /// User-specified output path; relative paths resolve against the
    /// project root, or the manager's base directory without a project
    pub explicit_target: Option<PathBuf>,
    /// Root of the active project, used for the fallback copy
    pub project_root: Option<PathBuf>,
}

impl SaveRequest {
    pub fn new(logical_path: impl Into<String>, content: impl Into<String>, kind: ArtifactKind) -> Self {
        Self {
            logical_path: logical_path.into(),
            content: content.into(),
            kind,
            explicit_target: None,
            project_root: None,
        }
    }

    pub fn with_target(mut self, target: Option<PathBuf>) -> Self {
        self.explicit_target = target;
        self
    }

    pub fn with_project_root(mut self, root: Option<PathBuf>) -> Self {
        self.project_root = root;
        self
    }
}

/// Result of saving one queued artifact.
#[derive(Debug, Clone)]
pub struct PendingSave {
    pub logical_path: String,
    pub result: std::result::Result<SaveOutcome, CodeobitError>,
}

#[derive(Debug, Clone)]
struct DirtyEntry {
    request: SaveRequest,
    generation: u64,
}

#[derive(Debug, Default)]
struct VersionState {
    /// Highest index handed out per logical path in this process
    last_index: HashMap<String, u64>,
    /// Copies outside the auto-save directory written in this process
    copies: HashMap<String, Vec<(SaveLocation, PathBuf)>>,
    kinds: HashMap<String, ArtifactKind>,
}

/// A place where some version of an artifact may be found.
#[derive(Debug, Clone)]
struct Candidate {
    version_index: u64,
    location: SaveLocation,
    path: PathBuf,
    content_hash: ContentHash,
    size_bytes: u64,
}

/// Saves artifacts to an ordered list of candidate locations and keeps a
/// strictly increasing version index per logical path.
///
/// Candidate order:
/// 1. the auto-save directory (always attempted)
/// 2. the explicit target, when given (always attempted, reported separately)
/// 3. the project directory for the artifact kind (only if nothing above
///    succeeded and a project is active)
///
/// Saves of the same logical path are serialized by a per-path lock, so the
/// periodic tick and foreground saves never interleave version increments.
pub struct AutoSaveManager {
    autosave_root: PathBuf,
    base_dir: PathBuf,
    path_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    state: Mutex<VersionState>,
    dirty: Mutex<BTreeMap<String, DirtyEntry>>,
    generation: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Path of the project copy relative to the project root.
///
/// The kind directory is not repeated when the logical path already starts
/// with it (`src/app.py` stays `src/app.py` for code).
fn project_relative(kind: ArtifactKind, normalized: &Path) -> PathBuf {
    let subdir = kind.project_subdir();
    if normalized.starts_with(subdir) {
        normalized.to_path_buf()
    } else {
        Path::new(subdir).join(normalized)
    }
}

fn location_error(error: &CodeobitError) -> LocationError {
    LocationError {
        kind: error.kind(),
        message: error.to_string(),
    }
}

impl AutoSaveManager {
    /// `autosave_root` holds versioned copies; `base_dir` anchors relative
    /// explicit targets when no project is active.
    pub fn new(autosave_root: impl Into<PathBuf>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            autosave_root: autosave_root.into(),
            base_dir: base_dir.into(),
            path_locks: Mutex::new(HashMap::new()),
            state: Mutex::new(VersionState::default()),
            dirty: Mutex::new(BTreeMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn autosave_root(&self) -> &Path {
        &self.autosave_root
    }

    // ============================================================================
    // Immediate saves
    // ============================================================================

    /// Saves a new version of `request.logical_path`.
    ///
    /// Returns the outcome when at least one location succeeded; individual
    /// location failures are recorded in `attempted_locations`. Fails with
    /// `SaveFailed` (carrying the outcome) only when every location failed, in
    /// which case no version index is consumed. Identical content still
    /// produces a new version.
    ///
    /// The index is reserved in the index ledgers before any copy is written.
    /// When no ledger accepts the reservation nothing is written and every
    /// location is reported as failed.
    pub fn save(&self, request: &SaveRequest) -> Result<SaveOutcome> {
        let normalized = normalize_logical_path(&request.logical_path)?;
        let key = logical_key(&normalized);

        let path_lock = self.path_lock(&key);
        let _guard = lock(&path_lock);

        let project_root = request.project_root.as_deref();
        let explicit = request
            .explicit_target
            .as_deref()
            .map(|target| self.resolve_target(target, project_root, &normalized));

        // An unreadable or foreign manifest disqualifies the auto-save
        // directory for this save; it is never replaced by a fresh one.
        let manifest = self
            .load_manifest(&normalized)
            .and_then(|manifest| Self::check_owner(manifest, &key));
        let latest = self
            .candidates(
                &key,
                &normalized,
                manifest.as_ref().ok().and_then(Option::as_ref),
                project_root,
                explicit.as_deref(),
            )
            .iter()
            .map(|c| c.version_index)
            .chain(lock(&self.state).last_index.get(&key).copied())
            .chain(self.reserved_index(&normalized, &key))
            .max()
            .unwrap_or(0);
        let version_index = latest + 1;

        let bytes = request.content.as_bytes();
        let content_hash = ContentHash::of(bytes);
        let size_bytes = bytes.len() as u64;
        let saved_at = Utc::now();
        let sidecar = VersionSidecar {
            logical_path: key.clone(),
            version_index,
            content_hash: content_hash.clone(),
            size_bytes,
            saved_at,
        };

        let mut attempts = Vec::with_capacity(3);

        if let Err(e) = self.reserve_index(&normalized, &key, version_index) {
            tracing::error!(path = %key, version = version_index, error = %e, "Could not reserve version index");
            attempts.push(Self::attempt(SaveLocation::AutoSaveDir, Err(e.clone())));
            if explicit.is_some() {
                attempts.push(Self::attempt(SaveLocation::ExplicitTarget, Err(e.clone())));
            }
            if project_root.is_some() {
                attempts.push(Self::attempt(SaveLocation::ProjectDir, Err(e)));
            }
        } else {
            let entry = ManifestEntry {
                version_index,
                file_name: version_file_name(version_index),
                content_hash: content_hash.clone(),
                size_bytes,
                saved_at,
                explicit_target: explicit.clone(),
            };
            attempts.push(Self::attempt(
                SaveLocation::AutoSaveDir,
                manifest.and_then(|_| {
                    self.write_autosave(&normalized, &key, request.kind, bytes, entry)
                }),
            ));

            if let Some(target) = explicit.as_deref() {
                attempts.push(Self::attempt(
                    SaveLocation::ExplicitTarget,
                    Self::write_explicit(target, bytes, &sidecar),
                ));
            }

            if !attempts.iter().any(LocationAttempt::succeeded) {
                if let Some(root) = project_root {
                    let relative = project_relative(request.kind, &normalized);
                    attempts.push(Self::attempt(
                        SaveLocation::ProjectDir,
                        Self::write_project(root, &relative, bytes, &sidecar),
                    ));
                }
            }
        }

        let succeeded_at = attempts
            .iter()
            .filter(|a| a.succeeded())
            .map(|a| a.location)
            .min();

        let mut outcome = SaveOutcome {
            logical_path: key.clone(),
            version_index,
            content_hash,
            size_bytes,
            attempted_locations: attempts,
            succeeded_at,
            error: None,
        };

        for failure in outcome.failures() {
            if let Some(error) = &failure.error {
                tracing::warn!(
                    path = %key,
                    location = %failure.location,
                    error = %error.message,
                    "Save location failed"
                );
            }
        }

        let Some(location) = succeeded_at else {
            self.release_index(&normalized, &key, version_index, latest);
            outcome.error = Some(ErrorKind::SaveFailed);
            tracing::error!(path = %key, version = version_index, "All save locations failed");
            return Err(CodeobitError::SaveFailed {
                logical_path: key,
                outcome: Box::new(outcome),
            });
        };

        self.record_success(&key, request.kind, &outcome);
        tracing::info!(
            path = %key,
            version = version_index,
            location = %location,
            hash = %outcome.content_hash.short(),
            "Saved artifact"
        );
        Ok(outcome)
    }

    // ============================================================================
    // Dirty queue
    // ============================================================================

    /// Queues content for the next tick or flush, replacing any content
    /// already queued for the same logical path.
    pub fn mark_dirty(&self, request: SaveRequest) -> Result<()> {
        let key = logical_key(&normalize_logical_path(&request.logical_path)?);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(path = %key, generation, "Queued auto-save");
        lock(&self.dirty).insert(
            key,
            DirtyEntry {
                request,
                generation,
            },
        );
        Ok(())
    }

    /// Saves the queued content of one logical path right away.
    pub fn save_now(&self, logical_path: &str) -> Result<SaveOutcome> {
        let key = logical_key(&normalize_logical_path(logical_path)?);
        let entry = lock(&self.dirty)
            .get(&key)
            .cloned()
            .ok_or_else(|| CodeobitError::not_found("pending save", logical_path))?;
        self.save_dirty(&key, entry)
    }

    /// Saves every artifact marked dirty since the last tick.
    ///
    /// Entries that fail entirely stay queued for the next attempt.
    pub fn scheduled_tick(&self) -> Vec<PendingSave> {
        let results = self.save_all_pending();
        if !results.is_empty() {
            tracing::debug!(count = results.len(), "Auto-save tick finished");
        }
        results
    }

    /// Saves everything still queued, e.g. before exit.
    pub fn flush(&self) -> Vec<PendingSave> {
        let results = self.save_all_pending();
        let failed = results.iter().filter(|r| r.result.is_err()).count();
        tracing::info!(saved = results.len() - failed, failed, "Flushed pending saves");
        results
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.dirty).len()
    }

    pub fn pending_paths(&self) -> Vec<String> {
        lock(&self.dirty).keys().cloned().collect()
    }

    fn save_all_pending(&self) -> Vec<PendingSave> {
        let snapshot: Vec<(String, DirtyEntry)> = lock(&self.dirty)
            .iter()
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect();

        snapshot
            .into_iter()
            .map(|(key, entry)| PendingSave {
                result: self.save_dirty(&key, entry),
                logical_path: key,
            })
            .collect()
    }

    /// Saves a queued entry and dequeues it unless it was re-queued meanwhile.
    fn save_dirty(&self, key: &str, entry: DirtyEntry) -> Result<SaveOutcome> {
        let outcome = self.save(&entry.request)?;
        let mut dirty = lock(&self.dirty);
        if dirty.get(key).map(|e| e.generation) == Some(entry.generation) {
            dirty.remove(key);
        }
        Ok(outcome)
    }

    // ============================================================================
    // History and recovery
    // ============================================================================

    /// Auto-saved versions of `logical_path`, oldest first.
    pub fn history(&self, logical_path: &str) -> Result<Vec<ManifestEntry>> {
        let normalized = normalize_logical_path(logical_path)?;
        let key = logical_key(&normalized);
        let mut manifest = Self::check_owner(self.load_manifest(&normalized)?, &key)?
            .ok_or_else(|| CodeobitError::not_found("artifact history", logical_path))?;
        manifest.versions.sort_by_key(|v| v.version_index);
        Ok(manifest.versions)
    }

    /// Content of the highest version found in any candidate location.
    ///
    /// Ties prefer the auto-save directory. Copies whose content no longer
    /// matches their recorded hash are skipped.
    pub fn recover(&self, logical_path: &str, project_root: Option<&Path>) -> Result<ArtifactVersion> {
        self.recover_matching(logical_path, project_root, |_| true)
    }

    /// Content of a specific version.
    pub fn recover_version(
        &self,
        logical_path: &str,
        version_index: u64,
        project_root: Option<&Path>,
    ) -> Result<ArtifactVersion> {
        self.recover_matching(logical_path, project_root, |c| {
            c.version_index == version_index
        })
        .map_err(|e| {
            if e.is_not_found() {
                CodeobitError::not_found(
                    "artifact version",
                    format!("{} v{}", logical_path, version_index),
                )
            } else {
                e
            }
        })
    }

    fn recover_matching<F>(
        &self,
        logical_path: &str,
        project_root: Option<&Path>,
        filter: F,
    ) -> Result<ArtifactVersion>
    where
        F: Fn(&Candidate) -> bool,
    {
        let normalized = normalize_logical_path(logical_path)?;
        let key = logical_key(&normalized);

        let path_lock = self.path_lock(&key);
        let _guard = lock(&path_lock);

        let manifest = self
            .load_manifest(&normalized)
            .and_then(|manifest| Self::check_owner(manifest, &key))
            .unwrap_or_else(|e| {
                tracing::warn!(path = %key, error = %e, "Ignoring auto-save manifest");
                None
            });

        let mut candidates: Vec<Candidate> = self
            .candidates(&key, &normalized, manifest.as_ref(), project_root, None)
            .into_iter()
            .filter(|c| filter(c))
            .collect();
        candidates.sort_by_key(|c| (Reverse(c.version_index), c.location));

        let kind = manifest
            .as_ref()
            .map(|m| m.kind)
            .or_else(|| lock(&self.state).kinds.get(&key).copied())
            .unwrap_or(ArtifactKind::Doc);
        let created_at: Option<DateTime<Utc>> = manifest
            .as_ref()
            .and_then(|m| m.versions.iter().map(|v| v.saved_at).min());

        for candidate in candidates {
            let bytes = match fs::read(&candidate.path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::debug!(path = %candidate.path.display(), error = %e, "Skipping unreadable copy");
                    continue;
                }
            };
            if ContentHash::of(&bytes) != candidate.content_hash {
                tracing::warn!(path = %candidate.path.display(), "Skipping copy with mismatched hash");
                continue;
            }

            let mut artifact_ref = ArtifactRef::new(key.clone(), kind);
            if let Some(created_at) = created_at {
                artifact_ref = artifact_ref.with_created_at(created_at);
            }
            tracing::debug!(
                path = %key,
                version = candidate.version_index,
                location = %candidate.location,
                "Recovered artifact"
            );
            return Ok(ArtifactVersion {
                artifact_ref,
                content: String::from_utf8_lossy(&bytes).into_owned(),
                version_index: candidate.version_index,
                save_location: candidate.location,
                content_hash: candidate.content_hash,
                size_bytes: candidate.size_bytes,
            });
        }

        Err(CodeobitError::not_found("artifact", logical_path))
    }

    // ============================================================================
    // Internals
    // ============================================================================

    fn path_lock(&self, key: &str) -> Arc<Mutex<()>> {
        lock(&self.path_locks)
            .entry(key.to_string())
            .or_default()
            .clone()
    }

    /// Directory holding the auto-saved versions of `logical_path`.
    pub fn version_dir(&self, logical_path: &str) -> Result<PathBuf> {
        Ok(self.artifact_dir(&normalize_logical_path(logical_path)?))
    }

    fn artifact_dir(&self, normalized: &Path) -> PathBuf {
        self.autosave_root.join(artifact_dir_name(normalized))
    }

    /// Primary ledger beside the versions, secondary one under the base dir.
    fn ledger_files(&self, normalized: &Path) -> [IndexLedgerFile; 2] {
        [
            IndexLedgerFile::new(self.artifact_dir(normalized).join(INDEX_FILE)),
            IndexLedgerFile::new(
                self.base_dir
                    .join(INDEX_LEDGER_DIR)
                    .join(format!("{}.toml", artifact_dir_name(normalized))),
            ),
        ]
    }

    /// Highest index recorded by any readable ledger.
    fn reserved_index(&self, normalized: &Path, key: &str) -> Option<u64> {
        self.ledger_files(normalized)
            .iter()
            .filter_map(|file| match file.load() {
                Ok(Some(ledger)) if ledger.logical_path == key => Some(ledger.last_index),
                Ok(_) => None,
                Err(e) => {
                    tracing::debug!(path = %file.path().display(), error = %e, "Ignoring unreadable index ledger");
                    None
                }
            })
            .max()
    }

    /// Records `version_index` in every ledger that accepts it; fails only
    /// when none does.
    fn reserve_index(&self, normalized: &Path, key: &str, version_index: u64) -> Result<()> {
        let mut first_error = None;
        let mut reserved = false;
        for file in self.ledger_files(normalized) {
            let result = file.update(IndexLedger::new(key), |ledger| {
                if ledger.logical_path != key {
                    return Err(AtomicFileError::IoError(std::io::Error::other(format!(
                        "index ledger belongs to '{}'",
                        ledger.logical_path
                    ))));
                }
                ledger.last_index = ledger.last_index.max(version_index);
                Ok(())
            });
            match result {
                Ok(()) => reserved = true,
                Err(e) => {
                    tracing::debug!(path = %file.path().display(), error = %e, "Index ledger not updated");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }
        match first_error {
            Some(e) if !reserved => Err(e.into()),
            _ => Ok(()),
        }
    }

    /// Hands a reservation back after a save that reached no location.
    fn release_index(&self, normalized: &Path, key: &str, version_index: u64, previous: u64) {
        for file in self.ledger_files(normalized) {
            if !matches!(file.load(), Ok(Some(ref ledger)) if ledger.logical_path == key) {
                continue;
            }
            let result = file.update(IndexLedger::new(key), |ledger| {
                if ledger.last_index == version_index {
                    ledger.last_index = previous;
                }
                Ok(())
            });
            if let Err(e) = result {
                tracing::warn!(path = %file.path().display(), error = %e, "Failed to release version index");
            }
        }
    }

    /// Rejects a manifest recorded for a different logical path.
    fn check_owner(manifest: Option<ArtifactManifest>, key: &str) -> Result<Option<ArtifactManifest>> {
        match manifest {
            Some(manifest) if manifest.logical_path != key => Err(CodeobitError::io(format!(
                "auto-save directory of '{}' already holds '{}'",
                key, manifest.logical_path
            ))),
            other => Ok(other),
        }
    }

    fn manifest_file(&self, normalized: &Path) -> ManifestFile {
        ManifestFile::new(self.artifact_dir(normalized).join(MANIFEST_FILE))
    }

    fn load_manifest(&self, normalized: &Path) -> Result<Option<ArtifactManifest>> {
        Ok(self.manifest_file(normalized).load()?)
    }

    fn resolve_target(&self, target: &Path, project_root: Option<&Path>, normalized: &Path) -> PathBuf {
        let base = project_root.unwrap_or(&self.base_dir);
        let path = if target.is_absolute() {
            target.to_path_buf()
        } else {
            base.join(target)
        };
        match normalized.file_name() {
            Some(name) if path.is_dir() => path.join(name),
            _ => path,
        }
    }

    /// Every known location holding some version of `key`.
    fn candidates(
        &self,
        key: &str,
        normalized: &Path,
        manifest: Option<&ArtifactManifest>,
        project_root: Option<&Path>,
        explicit: Option<&Path>,
    ) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        let mut copies: Vec<(SaveLocation, PathBuf)> = Vec::new();

        if let Some(manifest) = manifest {
            let dir = self.artifact_dir(normalized);
            candidates.extend(manifest.versions.iter().map(|entry| Candidate {
                version_index: entry.version_index,
                location: SaveLocation::AutoSaveDir,
                path: dir.join(&entry.file_name),
                content_hash: entry.content_hash.clone(),
                size_bytes: entry.size_bytes,
            }));
            copies.extend(
                manifest
                    .explicit_targets()
                    .into_iter()
                    .map(|p| (SaveLocation::ExplicitTarget, p)),
            );
        }

        let known_kind = {
            let state = lock(&self.state);
            if let Some(known) = state.copies.get(key) {
                copies.extend(known.iter().cloned());
            }
            state.kinds.get(key).copied()
        };

        if let Some(target) = explicit {
            copies.push((SaveLocation::ExplicitTarget, target.to_path_buf()));
        }

        if let Some(root) = project_root {
            let kinds: Vec<ArtifactKind> = match manifest.map(|m| m.kind).or(known_kind) {
                Some(kind) => vec![kind],
                None => [
                    ArtifactKind::Code,
                    ArtifactKind::Doc,
                    ArtifactKind::Test,
                    ArtifactKind::Report,
                ]
                .to_vec(),
            };
            copies.extend(
                kinds
                    .into_iter()
                    .map(|kind| (SaveLocation::ProjectDir, root.join(project_relative(kind, normalized)))),
            );
        }

        let mut seen: Vec<&PathBuf> = Vec::new();
        for (location, path) in &copies {
            if seen.contains(&path) {
                continue;
            }
            seen.push(path);
            match load_sidecar(path) {
                Ok(Some(sidecar)) if sidecar.logical_path == key => candidates.push(Candidate {
                    version_index: sidecar.version_index,
                    location: *location,
                    path: path.clone(),
                    content_hash: sidecar.content_hash,
                    size_bytes: sidecar.size_bytes,
                }),
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "Ignoring unreadable sidecar");
                }
            }
        }

        candidates
    }

    fn attempt(location: SaveLocation, result: Result<PathBuf>) -> LocationAttempt {
        match result {
            Ok(path) => LocationAttempt {
                location,
                physical_path: Some(path),
                error: None,
            },
            Err(e) => LocationAttempt {
                location,
                physical_path: None,
                error: Some(location_error(&e)),
            },
        }
    }

    /// Writes the version file, then appends it to the manifest.
    ///
    /// Existing version files are never replaced. A version file whose
    /// manifest entry could not be written is removed again.
    fn write_autosave(
        &self,
        normalized: &Path,
        key: &str,
        kind: ArtifactKind,
        bytes: &[u8],
        entry: ManifestEntry,
    ) -> Result<PathBuf> {
        let store = FsArtifactStore::new(&self.autosave_root);
        let relative = format!("{}/{}", artifact_dir_name(normalized), entry.file_name);
        let physical = store.write_new(&relative, bytes)?;

        let recorded = self
            .manifest_file(normalized)
            .update(ArtifactManifest::new(key, kind), |manifest| {
                if manifest.logical_path != key {
                    return Err(AtomicFileError::IoError(std::io::Error::other(format!(
                        "manifest belongs to '{}'",
                        manifest.logical_path
                    ))));
                }
                if manifest.entry(entry.version_index).is_some() {
                    return Err(AtomicFileError::IoError(std::io::Error::other(format!(
                        "version {} is already recorded",
                        entry.version_index
                    ))));
                }
                manifest.kind = kind;
                manifest.versions.push(entry);
                Ok(())
            });

        if let Err(e) = recorded {
            if let Err(remove_error) = fs::remove_file(&physical) {
                tracing::warn!(path = %physical.display(), error = %remove_error, "Failed to remove unrecorded version file");
            }
            return Err(e.into());
        }

        Ok(physical)
    }

    fn write_explicit(target: &Path, bytes: &[u8], sidecar: &VersionSidecar) -> Result<PathBuf> {
        let (Some(parent), Some(name)) = (target.parent(), target.file_name()) else {
            return Err(CodeobitError::io(format!(
                "explicit target '{}' has no file name",
                target.display()
            )));
        };
        let store = FsArtifactStore::new(parent);
        let physical = store.write(&name.to_string_lossy(), bytes)?;
        save_sidecar(&physical, sidecar)?;
        Ok(physical)
    }

    fn write_project(root: &Path, relative: &Path, bytes: &[u8], sidecar: &VersionSidecar) -> Result<PathBuf> {
        let store = FsArtifactStore::new(root);
        let physical = store.write(&relative.to_string_lossy(), bytes)?;
        save_sidecar(&physical, sidecar)?;
        Ok(physical)
    }

    fn record_success(&self, key: &str, kind: ArtifactKind, outcome: &SaveOutcome) {
        let mut state = lock(&self.state);
        state.last_index.insert(key.to_string(), outcome.version_index);
        state.kinds.insert(key.to_string(), kind);

        let copies = state.copies.entry(key.to_string()).or_default();
        for attempt in outcome.attempted_locations.iter().filter(|a| a.succeeded()) {
            if attempt.location == SaveLocation::AutoSaveDir {
                continue;
            }
            if let Some(path) = &attempt.physical_path {
                let copy = (attempt.location, path.clone());
                if !copies.contains(&copy) {
                    copies.push(copy);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager(temp_dir: &TempDir) -> AutoSaveManager {
        AutoSaveManager::new(
            temp_dir.path().join(DEFAULT_AUTOSAVE_DIR),
            temp_dir.path(),
        )
    }

    #[test]
    fn test_versions_increase_and_identical_content_is_not_deduplicated() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager(&temp_dir);
        let request = SaveRequest::new("src/app.py", "print(1)", ArtifactKind::Code);

        let indices: Vec<u64> = (0..3)
            .map(|_| manager.save(&request).unwrap().version_index)
            .collect();

        assert_eq!(indices, vec![1, 2, 3]);
        let history = manager.history("src/app.py").unwrap();
        assert_eq!(history.len(), 3);
        assert!(history.iter().all(|v| v.content_hash == history[0].content_hash));
    }

    #[test]
    fn test_version_index_survives_restart() {
        let temp_dir = TempDir::new().unwrap();
        manager(&temp_dir)
            .save(&SaveRequest::new("notes.md", "one", ArtifactKind::Doc))
            .unwrap();

        let restarted = manager(&temp_dir);
        let outcome = restarted
            .save(&SaveRequest::new("notes.md", "two", ArtifactKind::Doc))
            .unwrap();
        assert_eq!(outcome.version_index, 2);
    }

    #[test]
    fn test_explicit_target_written_and_reported() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager(&temp_dir);
        let request = SaveRequest::new("report.md", "body", ArtifactKind::Report)
            .with_target(Some(PathBuf::from("out/report.md")));

        let outcome = manager.save(&request).unwrap();

        assert_eq!(outcome.succeeded_at, Some(SaveLocation::AutoSaveDir));
        assert_eq!(outcome.saved_to_target(), Some(true));
        let target = temp_dir.path().join("out/report.md");
        assert_eq!(fs::read_to_string(&target).unwrap(), "body");
        assert!(temp_dir.path().join("out/.report.md.version.toml").exists());
    }

    #[test]
    fn test_project_fallback_when_autosave_fails() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let project = temp_dir.path().join("project");

        // The auto-save root sits below a regular file and can never be created
        let manager = AutoSaveManager::new(blocker.join("autosave"), temp_dir.path());
        let request = SaveRequest::new("app.py", "code", ArtifactKind::Code)
            .with_project_root(Some(project.clone()));

        let outcome = manager.save(&request).unwrap();

        assert_eq!(outcome.succeeded_at, Some(SaveLocation::ProjectDir));
        assert_eq!(outcome.attempted_locations.len(), 2);
        assert!(!outcome.attempted_locations[0].succeeded());
        assert_eq!(fs::read_to_string(project.join("src/app.py")).unwrap(), "code");

        let second = manager.save(&request).unwrap();
        assert_eq!(second.version_index, 2);

        let recovered = manager.recover("app.py", Some(&project)).unwrap();
        assert_eq!(recovered.version_index, 2);
        assert_eq!(recovered.save_location, SaveLocation::ProjectDir);
    }

    #[test]
    fn test_total_failure_reports_save_failed_and_keeps_counter() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, "x").unwrap();

        let manager = AutoSaveManager::new(blocker.join("autosave"), temp_dir.path());
        let request = SaveRequest::new("a.txt", "x", ArtifactKind::Code)
            .with_target(Some(blocker.join("out/a.txt")));

        let err = manager.save(&request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SaveFailed);
        let CodeobitError::SaveFailed { outcome, .. } = err else {
            panic!("expected SaveFailed");
        };
        assert_eq!(outcome.error, Some(ErrorKind::SaveFailed));
        assert_eq!(outcome.attempted_locations.len(), 2);
        assert!(outcome.succeeded_at.is_none());
        assert_eq!(outcome.version_index, 1);

        let err = manager.save(&request).unwrap_err();
        let CodeobitError::SaveFailed { outcome, .. } = err else {
            panic!("expected SaveFailed");
        };
        assert_eq!(outcome.version_index, 1);
    }

    #[test]
    fn test_traversal_rejected_before_any_write() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager(&temp_dir);

        let err = manager
            .save(&SaveRequest::new("../../etc/passwd", "x", ArtifactKind::Code))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathTraversal);
        assert!(
            manager
                .mark_dirty(SaveRequest::new("../x", "x", ArtifactKind::Code))
                .is_err()
        );
    }

    #[test]
    fn test_recover_specific_version_and_missing() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager(&temp_dir);
        for content in ["A", "B", "C"] {
            manager
                .save(&SaveRequest::new("doc.md", content, ArtifactKind::Doc))
                .unwrap();
        }

        assert_eq!(manager.recover("doc.md", None).unwrap().content, "C");
        assert_eq!(manager.recover_version("doc.md", 2, None).unwrap().content, "B");
        assert_eq!(
            manager.recover_version("doc.md", 9, None).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            manager.recover("never.md", None).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_recover_skips_corrupted_autosave_copy() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager(&temp_dir);
        let request = SaveRequest::new("r.md", "good", ArtifactKind::Report)
            .with_target(Some(PathBuf::from("r.md")));
        manager.save(&request).unwrap();

        let version_file = manager.version_dir("r.md").unwrap().join(version_file_name(1));
        fs::write(&version_file, "tampered").unwrap();

        let recovered = manager.recover("r.md", None).unwrap();
        assert_eq!(recovered.content, "good");
        assert_eq!(recovered.save_location, SaveLocation::ExplicitTarget);
    }

    #[test]
    fn test_recover_prefers_autosave_copy_on_equal_index() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager(&temp_dir);
        let request = SaveRequest::new("r.md", "same", ArtifactKind::Report)
            .with_target(Some(PathBuf::from("exports/r.md")));
        manager.save(&request).unwrap();

        let recovered = manager.recover("r.md", None).unwrap();
        assert_eq!(recovered.version_index, 1);
        assert_eq!(recovered.save_location, SaveLocation::AutoSaveDir);
    }

    #[test]
    fn test_paths_that_sanitize_alike_keep_separate_histories() {
        let temp_dir = TempDir::new().unwrap();
        let first = manager(&temp_dir);

        let spaced = first
            .save(&SaveRequest::new("my notes.md", "spaced", ArtifactKind::Doc))
            .unwrap();
        let underscored = first
            .save(&SaveRequest::new("my_notes.md", "underscored", ArtifactKind::Doc))
            .unwrap();
        assert_eq!(spaced.version_index, 1);
        assert_eq!(underscored.version_index, 1);
        assert_ne!(
            first.version_dir("my notes.md").unwrap(),
            first.version_dir("my_notes.md").unwrap()
        );

        let restarted = manager(&temp_dir);
        assert_eq!(restarted.recover("my notes.md", None).unwrap().content, "spaced");
        assert_eq!(restarted.recover("my_notes.md", None).unwrap().content, "underscored");
        assert_eq!(restarted.history("my notes.md").unwrap().len(), 1);
        assert_eq!(restarted.history("my_notes.md").unwrap().len(), 1);
    }

    #[test]
    fn test_foreign_manifest_is_never_extended() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager(&temp_dir);
        let dir = manager.version_dir("a.md").unwrap();
        ManifestFile::new(dir.join(MANIFEST_FILE))
            .save(&ArtifactManifest::new("b.md", ArtifactKind::Doc))
            .unwrap();

        let outcome = manager
            .save(
                &SaveRequest::new("a.md", "a", ArtifactKind::Doc)
                    .with_target(Some(PathBuf::from("out/a.md"))),
            )
            .unwrap();

        assert_eq!(outcome.succeeded_at, Some(SaveLocation::ExplicitTarget));
        assert!(!outcome.attempted_locations[0].succeeded());
        assert!(!dir.join(version_file_name(1)).exists());
        assert!(manager.history("a.md").is_err());
        let manifest = ManifestFile::new(dir.join(MANIFEST_FILE)).load().unwrap().unwrap();
        assert_eq!(manifest.logical_path, "b.md");
        assert!(manifest.versions.is_empty());
    }

    #[test]
    fn test_unreadable_manifest_never_overwrites_existing_version() {
        let temp_dir = TempDir::new().unwrap();
        let first = manager(&temp_dir);
        first
            .save(&SaveRequest::new("notes.md", "ORIGINAL", ArtifactKind::Doc))
            .unwrap();
        let dir = first.version_dir("notes.md").unwrap();
        fs::write(dir.join(MANIFEST_FILE), "versions = [ not toml").unwrap();

        let restarted = manager(&temp_dir);
        let err = restarted
            .save(&SaveRequest::new("notes.md", "REPLACEMENT", ArtifactKind::Doc))
            .unwrap_err();
        let CodeobitError::SaveFailed { outcome, .. } = err else {
            panic!("expected SaveFailed");
        };
        assert_eq!(outcome.version_index, 2);
        assert_eq!(outcome.attempted_locations.len(), 1);
        assert_eq!(outcome.attempted_locations[0].location, SaveLocation::AutoSaveDir);
        assert!(!outcome.attempted_locations[0].succeeded());

        let outcome = restarted
            .save(
                &SaveRequest::new("notes.md", "REPLACEMENT", ArtifactKind::Doc)
                    .with_target(Some(PathBuf::from("out/notes.md"))),
            )
            .unwrap();
        assert_eq!(outcome.version_index, 2);
        assert_eq!(outcome.succeeded_at, Some(SaveLocation::ExplicitTarget));

        assert_eq!(
            fs::read_to_string(dir.join(version_file_name(1))).unwrap(),
            "ORIGINAL"
        );
        assert!(!dir.join(version_file_name(2)).exists());
    }

    #[test]
    fn test_index_not_reused_after_target_only_save_and_restart() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("saves");
        fs::write(&root, "blocked").unwrap();

        let first = AutoSaveManager::new(root.clone(), temp_dir.path());
        let outcome = first
            .save(
                &SaveRequest::new("plan.md", "one", ArtifactKind::Doc)
                    .with_target(Some(PathBuf::from("out/plan.md"))),
            )
            .unwrap();
        assert_eq!(outcome.version_index, 1);
        assert_eq!(outcome.succeeded_at, Some(SaveLocation::ExplicitTarget));

        fs::remove_file(&root).unwrap();
        let restarted = AutoSaveManager::new(root.clone(), temp_dir.path());
        let outcome = restarted
            .save(&SaveRequest::new("plan.md", "two", ArtifactKind::Doc))
            .unwrap();
        assert_eq!(outcome.version_index, 2);
        assert_eq!(outcome.succeeded_at, Some(SaveLocation::AutoSaveDir));
        assert_eq!(restarted.recover("plan.md", None).unwrap().content, "two");
    }

    #[test]
    fn test_unreservable_index_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, "x").unwrap();
        let target = temp_dir.path().join("out/a.md");

        let manager = AutoSaveManager::new(blocker.join("autosave"), blocker.clone());
        let err = manager
            .save(
                &SaveRequest::new("a.md", "a", ArtifactKind::Doc)
                    .with_target(Some(target.clone())),
            )
            .unwrap_err();

        let CodeobitError::SaveFailed { outcome, .. } = err else {
            panic!("expected SaveFailed");
        };
        assert_eq!(outcome.attempted_locations.len(), 2);
        assert!(outcome.attempted_locations.iter().all(|a| !a.succeeded()));
        assert!(!target.exists());
    }

    #[test]
    fn test_dirty_queue_tick_and_flush() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager(&temp_dir);

        manager
            .mark_dirty(SaveRequest::new("a.md", "a1", ArtifactKind::Doc))
            .unwrap();
        manager
            .mark_dirty(SaveRequest::new("a.md", "a2", ArtifactKind::Doc))
            .unwrap();
        manager
            .mark_dirty(SaveRequest::new("b.md", "b1", ArtifactKind::Doc))
            .unwrap();
        assert_eq!(manager.pending_count(), 2);

        let outcome = manager.save_now("a.md").unwrap();
        assert_eq!(outcome.version_index, 1);
        assert_eq!(manager.pending_paths(), vec!["b.md".to_string()]);
        assert_eq!(
            manager.save_now("a.md").unwrap_err().kind(),
            ErrorKind::NotFound
        );

        let results = manager.scheduled_tick();
        assert_eq!(results.len(), 1);
        assert!(results[0].result.is_ok());
        assert_eq!(manager.pending_count(), 0);
        assert!(manager.flush().is_empty());

        assert_eq!(manager.recover("a.md", None).unwrap().content, "a2");
    }

    #[test]
    fn test_failed_flush_keeps_entry_queued() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, "x").unwrap();
        let manager = AutoSaveManager::new(blocker.join("autosave"), temp_dir.path());

        manager
            .mark_dirty(SaveRequest::new("a.md", "a", ArtifactKind::Doc))
            .unwrap();
        let results = manager.flush();

        assert_eq!(results.len(), 1);
        assert_eq!(
            results[0].result.as_ref().unwrap_err().kind(),
            ErrorKind::SaveFailed
        );
        assert_eq!(manager.pending_count(), 1);
    }

    #[test]
    fn test_project_relative_does_not_repeat_kind_dir() {
        assert_eq!(
            project_relative(ArtifactKind::Code, Path::new("src/app.py")),
            PathBuf::from("src/app.py")
        );
        assert_eq!(
            project_relative(ArtifactKind::Test, Path::new("test_app.py")),
            PathBuf::from("tests/test_app.py")
        );
    }
}
