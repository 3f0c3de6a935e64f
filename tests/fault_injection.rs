//! Failure behavior of multi-document operations.
//!
//! Each operation writes the experiment side first and the clinical-test
//! side second, with no transaction spanning both. These tests fail a
//! chosen write through [`common::FaultyStore`] and check that:
//! - the error propagates,
//! - the handles still match what the store accepted,
//! - re-running the operation repairs the pair.

mod common;

use std::sync::Arc;

use common::{new_clinical_test, new_experiment, FaultyStore};
use trialdb::{
    ClinicalTest, ClinicalTestFilter, Experiment, LinkState, RelationshipManager, StorageError,
    TrialDBError,
};

async fn setup() -> (Arc<FaultyStore>, RelationshipManager, Experiment, ClinicalTest) {
    let store = FaultyStore::new();
    let manager = RelationshipManager::new(store.clone());
    let exp = Experiment::new(new_experiment("E1", "Faulty", ""));
    exp.save_to(manager.store()).await.unwrap();
    let ct = ClinicalTest::new(new_clinical_test("CBC"));
    (store, manager, exp, ct)
}

async fn stored_state(
    manager: &RelationshipManager,
    exp: &Experiment,
    ct: &ClinicalTest,
) -> LinkState {
    let exp = manager.store().get_experiment(exp.id).await.unwrap().unwrap();
    let ct_side = manager
        .store()
        .get_clinical_test(ct.id)
        .await
        .unwrap()
        .map(|c| c.references(exp.id))
        .unwrap_or(false);
    LinkState::from_sides(exp.references(ct.id), ct_side)
}

fn is_injected(err: &TrialDBError) -> bool {
    matches!(err, TrialDBError::Storage(StorageError::Backend(_)))
}

// ============================================================================
// Associate
// ============================================================================

#[tokio::test]
async fn test_associate_failing_second_write_leaves_experiment_side_only() {
    let (store, manager, mut exp, mut ct) = setup().await;
    store.fail_nth_write(2);

    let err = manager.associate(&mut exp, &mut ct).await.unwrap_err();

    assert!(is_injected(&err), "unexpected error {err:?}");
    assert_eq!(
        stored_state(&manager, &exp, &ct).await,
        LinkState::ExperimentSideOnly
    );
    // Handles mirror the store: the experiment write landed, the other did not.
    assert_eq!(LinkState::of(&exp, &ct), LinkState::ExperimentSideOnly);
    let gap = manager.verify_link(&exp, &ct).unwrap_err();
    assert!(gap.is_invariant_gap());
}

#[tokio::test]
async fn test_associate_retry_repairs_one_sided_link() {
    let (store, manager, mut exp, mut ct) = setup().await;
    store.fail_nth_write(2);
    manager.associate(&mut exp, &mut ct).await.unwrap_err();

    let before = store.write_count();
    manager.associate(&mut exp, &mut ct).await.unwrap();

    assert_eq!(
        store.write_count() - before,
        1,
        "Retry should only write the missing side"
    );
    assert_eq!(stored_state(&manager, &exp, &ct).await, LinkState::Linked);
    assert_eq!(manager.verify_link(&exp, &ct).unwrap(), LinkState::Linked);
}

#[tokio::test]
async fn test_associate_failing_first_write_changes_nothing() {
    let (store, manager, mut exp, mut ct) = setup().await;
    let snapshot = exp.clone();
    store.fail_nth_write(1);

    manager.associate(&mut exp, &mut ct).await.unwrap_err();

    assert_eq!(exp, snapshot, "Handle must not advance past the store");
    assert_eq!(stored_state(&manager, &exp, &ct).await, LinkState::Unlinked);
    assert_eq!(store.inner().clinical_test_count(), 0);
}

#[tokio::test]
async fn test_linked_pair_associate_issues_no_writes() {
    let (store, manager, mut exp, mut ct) = setup().await;
    manager.associate(&mut exp, &mut ct).await.unwrap();

    let before = store.write_count();
    manager.associate(&mut exp, &mut ct).await.unwrap();

    assert_eq!(store.write_count(), before);
}

// ============================================================================
// Disassociate
// ============================================================================

#[tokio::test]
async fn test_disassociate_failing_second_write_leaves_clinical_test_side_only() {
    let (store, manager, mut exp, mut ct) = setup().await;
    manager.associate(&mut exp, &mut ct).await.unwrap();
    store.fail_nth_write(2);

    let err = manager.disassociate(&mut exp, &mut ct).await.unwrap_err();

    assert!(is_injected(&err));
    assert_eq!(
        stored_state(&manager, &exp, &ct).await,
        LinkState::ClinicalTestSideOnly
    );
    assert!(
        store.inner().clinical_test_count() == 1,
        "Orphan removal failed, so the document must remain"
    );

    manager.disassociate(&mut exp, &mut ct).await.unwrap();
    assert!(manager
        .store()
        .get_clinical_test(ct.id)
        .await
        .unwrap()
        .is_none());
}

// ============================================================================
// Cascades
// ============================================================================

async fn experiment_with_three_tests() -> (Arc<FaultyStore>, RelationshipManager, Experiment) {
    let (store, manager, mut exp, _) = setup().await;
    for i in 0..3 {
        let mut ct = ClinicalTest::new(new_clinical_test(&format!("C{i}")));
        manager.associate(&mut exp, &mut ct).await.unwrap();
    }
    (store, manager, exp)
}

#[tokio::test]
async fn test_delete_experiment_aborts_on_failure_and_resumes() {
    let (store, manager, mut exp) = experiment_with_three_tests().await;

    // Each disassociation is two writes. Fail the experiment write of the
    // second one.
    store.fail_nth_write(3);
    manager.delete_experiment(&mut exp).await.unwrap_err();

    assert!(
        manager.store().get_experiment(exp.id).await.unwrap().is_some(),
        "Experiment must survive an aborted cascade"
    );
    assert_eq!(
        store.inner().clinical_test_count(),
        2,
        "Only the first clinical test was processed"
    );
    assert_eq!(exp.clinical_test_ids.len(), 2);

    manager.delete_experiment(&mut exp).await.unwrap();

    assert!(store.inner().is_empty());
}

#[tokio::test]
async fn test_stranded_clinical_test_after_cascade_is_removable() {
    let (store, manager, mut exp) = experiment_with_three_tests().await;

    // Fail the orphan removal of the second clinical test. The experiment
    // has already dropped it, so the clinical test is left one-sided.
    store.fail_nth_write(4);
    manager.delete_experiment(&mut exp).await.unwrap_err();
    manager.delete_experiment(&mut exp).await.unwrap();

    let mut stranded = manager
        .store()
        .query_clinical_tests(&ClinicalTestFilter::all())
        .await
        .unwrap();
    assert_eq!(stranded.len(), 1);
    let mut ct = stranded.remove(0);
    assert!(ct.references(exp.id));

    manager.delete_clinical_test(&mut ct).await.unwrap();

    assert!(store.inner().is_empty());
}

#[tokio::test]
async fn test_delete_clinical_test_aborts_on_failure_and_resumes() {
    let (store, manager, mut e1, mut ct) = setup().await;
    let mut e2 = Experiment::new(new_experiment("E2", "Second", ""));
    e2.save_to(manager.store()).await.unwrap();
    manager.associate(&mut e1, &mut ct).await.unwrap();
    manager.associate(&mut e2, &mut ct).await.unwrap();

    store.fail_nth_write(1);
    manager.delete_clinical_test(&mut ct).await.unwrap_err();
    assert!(manager
        .store()
        .get_clinical_test(ct.id)
        .await
        .unwrap()
        .is_some());

    manager.delete_clinical_test(&mut ct).await.unwrap();

    assert!(manager
        .store()
        .get_clinical_test(ct.id)
        .await
        .unwrap()
        .is_none());
    for id in [e1.id, e2.id] {
        let exp = manager.store().get_experiment(id).await.unwrap().unwrap();
        assert!(exp.clinical_test_ids.is_empty());
    }
}

/// Links `ct` fully to the lower-id experiment and leaves the higher-id
/// experiment referencing it on its own side only, so the scan in
/// `delete_clinical_test` reaches the one-sided experiment after the orphan
/// rule has already removed the clinical test.
async fn linked_then_experiment_side_only() -> (
    Arc<FaultyStore>,
    RelationshipManager,
    Experiment,
    Experiment,
    ClinicalTest,
) {
    let (store, manager, e1, mut ct) = setup().await;
    let e2 = Experiment::new(new_experiment("E2", "One-sided", ""));
    e2.save_to(manager.store()).await.unwrap();
    let (mut linked, mut side_only) = if e1.id < e2.id { (e1, e2) } else { (e2, e1) };

    manager.associate(&mut linked, &mut ct).await.unwrap();
    store.fail_nth_write(2);
    manager
        .associate(&mut side_only, &mut ct)
        .await
        .unwrap_err();
    assert_eq!(
        stored_state(&manager, &side_only, &ct).await,
        LinkState::ExperimentSideOnly
    );

    (store, manager, linked, side_only, ct)
}

#[tokio::test]
async fn test_delete_clinical_test_clears_experiment_side_only_reference() {
    let (store, manager, linked, side_only, mut ct) = linked_then_experiment_side_only().await;

    manager.delete_clinical_test(&mut ct).await.unwrap();

    assert_eq!(store.inner().clinical_test_count(), 0);
    for id in [linked.id, side_only.id] {
        let exp = manager.store().get_experiment(id).await.unwrap().unwrap();
        assert!(!exp.references(ct.id));
    }

    // Repeating the delete on the same handle converges without error.
    manager.delete_clinical_test(&mut ct).await.unwrap();
}

#[tokio::test]
async fn test_delete_clinical_test_resumes_after_orphan_removal() {
    let (store, manager, _linked, side_only, mut ct) = linked_then_experiment_side_only().await;

    // Writes: the linked experiment, the orphan removal, then the one-sided
    // experiment. Fail the last.
    store.fail_nth_write(3);
    let err = manager.delete_clinical_test(&mut ct).await.unwrap_err();
    assert!(is_injected(&err));
    assert_eq!(store.inner().clinical_test_count(), 0);
    let stale = manager
        .store()
        .get_experiment(side_only.id)
        .await
        .unwrap()
        .unwrap();
    assert!(stale.references(ct.id));

    manager.delete_clinical_test(&mut ct).await.unwrap();

    let cleared = manager
        .store()
        .get_experiment(side_only.id)
        .await
        .unwrap()
        .unwrap();
    assert!(cleared.clinical_test_ids.is_empty());
}
