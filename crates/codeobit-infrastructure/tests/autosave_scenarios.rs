//! End-to-end persistence scenarios against a real temporary directory.

use codeobit_core::ErrorKind;
use codeobit_core::artifact::{ArtifactKind, SaveLocation};
use codeobit_infrastructure::autosave::{
    AutoSaveManager, ArtifactManifest, DEFAULT_AUTOSAVE_DIR, MANIFEST_FILE, SaveRequest,
};
use codeobit_infrastructure::storage::{AtomicTomlFile, FsArtifactStore};
use std::fs;
use tempfile::TempDir;

fn manager_in(temp_dir: &TempDir) -> AutoSaveManager {
    AutoSaveManager::new(temp_dir.path().join(DEFAULT_AUTOSAVE_DIR), temp_dir.path())
}

#[test]
fn report_saved_twice_then_recovered() {
    let temp_dir = TempDir::new().unwrap();
    let manager = manager_in(&temp_dir);

    let first = manager
        .save(&SaveRequest::new("report.md", "A", ArtifactKind::Report))
        .unwrap();
    let second = manager
        .save(&SaveRequest::new("report.md", "B", ArtifactKind::Report))
        .unwrap();
    assert_eq!((first.version_index, second.version_index), (1, 2));

    let recovered = manager.recover("report.md", None).unwrap();
    assert_eq!(recovered.content, "B");
    assert_eq!(recovered.version_index, 2);
    assert_eq!(recovered.save_location, SaveLocation::AutoSaveDir);

    let manifest_path = manager.version_dir("report.md").unwrap().join(MANIFEST_FILE);
    let manifest = AtomicTomlFile::<ArtifactManifest>::new(manifest_path)
        .load()
        .unwrap()
        .unwrap();
    assert_eq!(manifest.versions.len(), 2);
    assert_ne!(
        manifest.versions[0].content_hash,
        manifest.versions[1].content_hash
    );
    assert_eq!(manifest.versions[1].size_bytes, 1);
}

#[test]
fn failing_explicit_target_is_not_a_total_failure() {
    let temp_dir = TempDir::new().unwrap();
    let manager = manager_in(&temp_dir);

    // A regular file where the target's parent directory should be
    let blocker = temp_dir.path().join("readonly");
    fs::write(&blocker, "occupied").unwrap();

    let request = SaveRequest::new("report.md", "content", ArtifactKind::Report)
        .with_target(Some(blocker.join("report.md")));
    let outcome = manager.save(&request).unwrap();

    assert_eq!(outcome.succeeded_at, Some(SaveLocation::AutoSaveDir));
    assert!(outcome.error.is_none());
    assert_eq!(outcome.saved_to_target(), Some(false));

    let target_attempt = outcome.attempt(SaveLocation::ExplicitTarget).unwrap();
    assert!(target_attempt.error.is_some());
    assert!(
        outcome
            .attempt(SaveLocation::AutoSaveDir)
            .unwrap()
            .succeeded()
    );
}

#[test]
fn repeated_saves_increment_by_exactly_one() {
    let temp_dir = TempDir::new().unwrap();
    let manager = manager_in(&temp_dir);

    let mut previous = 0;
    for n in 0..10 {
        let outcome = manager
            .save(&SaveRequest::new("src/lib.rs", format!("v{}", n % 3), ArtifactKind::Code))
            .unwrap();
        assert_eq!(outcome.version_index, previous + 1);
        previous = outcome.version_index;
    }
    assert_eq!(manager.recover("src/lib.rs", None).unwrap().content, "v0");
}

#[test]
fn traversal_rejected_for_any_root() {
    let temp_dir = TempDir::new().unwrap();
    for root in [
        temp_dir.path().to_path_buf(),
        temp_dir.path().join("deep/er/root"),
        temp_dir.path().join(".codeobit"),
    ] {
        let store = FsArtifactStore::new(&root);
        let err = store.write("../../etc/passwd", b"owned").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathTraversal);
    }
}

#[test]
fn concurrent_saves_never_reuse_an_index() {
    use std::sync::Arc;

    let temp_dir = TempDir::new().unwrap();
    let manager = Arc::new(manager_in(&temp_dir));

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let manager = Arc::clone(&manager);
            std::thread::spawn(move || {
                (0..5)
                    .map(|i| {
                        manager
                            .save(&SaveRequest::new(
                                "shared.md",
                                format!("{t}-{i}"),
                                ArtifactKind::Doc,
                            ))
                            .unwrap()
                            .version_index
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut indices: Vec<u64> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    indices.sort_unstable();
    assert_eq!(indices, (1..=20).collect::<Vec<_>>());
    assert_eq!(manager.history("shared.md").unwrap().len(), 20);
}
