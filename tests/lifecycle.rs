//! Integration tests for TrialDB database lifecycle operations.
//!
//! These tests verify the end-to-end behavior of:
//! - Opening new and existing databases
//! - Configuration validation
//! - Schema metadata on disk
//! - Durability across close and ungraceful drop

mod common;

use common::{new_clinical_test, new_experiment};
use trialdb::storage::SCHEMA_VERSION;
use trialdb::{Config, LinkState, RedbStore, SyncMode, TrialDB};
use tempfile::tempdir;

// ============================================================================
// Database Creation Tests
// ============================================================================

#[test]
fn test_open_creates_new_database() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.db");

    assert!(!path.exists(), "Database should not exist before open");

    let db = TrialDB::open(&path, Config::default()).unwrap();

    assert!(path.exists(), "Database file should exist after open");
    assert_eq!(db.config().sync_mode, SyncMode::Normal);

    db.close().unwrap();
}

#[test]
fn test_open_writes_schema_metadata() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.db");

    TrialDB::open(&path, Config::default())
        .unwrap()
        .close()
        .unwrap();

    let store = RedbStore::open(&path, &Config::default()).unwrap();
    assert_eq!(store.metadata().schema_version, SCHEMA_VERSION);
    assert!(store.metadata().is_compatible());
}

#[test]
fn test_open_with_every_sync_mode() {
    for sync_mode in [SyncMode::Fast, SyncMode::Normal, SyncMode::Paranoid] {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let db = TrialDB::open(
            &path,
            Config {
                sync_mode,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(db.config().sync_mode, sync_mode);
        db.close().unwrap();
    }
}

#[test]
fn test_invalid_config_is_rejected_before_touching_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.db");

    let err = TrialDB::open(
        &path,
        Config {
            full_scan_warn_threshold: 0,
            ..Default::default()
        },
    )
    .unwrap_err();

    assert!(err.is_config(), "expected config error, got {err:?}");
    assert!(!path.exists());
}

#[test]
fn test_second_open_of_locked_file_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.db");

    let db = TrialDB::open(&path, Config::default()).unwrap();
    let second = TrialDB::open(&path, Config::default());

    assert!(second.is_err(), "A locked database must not open twice");
    db.close().unwrap();
}

// ============================================================================
// Durability Tests
// ============================================================================

#[tokio::test]
async fn test_linked_documents_survive_close() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("durable.db");

    let db = TrialDB::open(&path, Config::default()).unwrap();
    let eid = db
        .create_experiment(new_experiment("EXP-1", "Durable", "Ada"))
        .await
        .unwrap();
    let cid = db
        .add_clinical_test(eid, new_clinical_test("Lipid panel"))
        .await
        .unwrap();
    db.close().unwrap();

    let db = TrialDB::open(&path, Config::default()).unwrap();
    assert_eq!(db.link_state(eid, cid).await.unwrap(), LinkState::Linked);
    let ct = db.get_clinical_test(cid).await.unwrap().unwrap();
    assert_eq!(ct.name, "Lipid panel");
    db.close().unwrap();
}

#[tokio::test]
async fn test_committed_data_survives_crash() {
    // Dropping without close() simulates an ungraceful shutdown; every
    // write was committed when its call returned.
    let dir = tempdir().unwrap();
    let path = dir.path().join("crash.db");

    let mut ids = Vec::new();
    {
        let db = TrialDB::open(&path, Config::default()).unwrap();
        for i in 0..50 {
            let eid = db
                .create_experiment(new_experiment(&format!("EXP-{i}"), "Bulk", "Bo"))
                .await
                .unwrap();
            ids.push(eid);
        }
    }

    let db = TrialDB::open(&path, Config::default()).unwrap();
    assert_eq!(db.search_experiments("").await.unwrap().len(), 50);
    for id in &ids {
        assert!(
            db.get_experiment(*id).await.unwrap().is_some(),
            "Experiment {id} must be present after crash"
        );
    }
    db.close().unwrap();
}

#[tokio::test]
async fn test_in_memory_database_has_no_path() {
    let db = TrialDB::in_memory(Config::default()).unwrap();
    assert!(db.path().is_none());

    db.create_experiment(new_experiment("EXP-1", "Scratch", ""))
        .await
        .unwrap();
    assert_eq!(db.search_experiments("").await.unwrap().len(), 1);
    db.close().unwrap();
}
