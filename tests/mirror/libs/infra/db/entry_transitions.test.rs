// [tests/mirror/libs/infra/db/entry_transitions.test.rs]
/**
 * =================================================================
 * APARATO: ENTRY TRANSITION MONOTONICITY TEST
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * OBJETIVO: Certificar que el repositorio veta toda arista ilegal del
 *           DAG pending → running → {completed, failed, cancelled}.
 * =================================================================
 */

use imq_domain_models::{EntryStatus, PullRequest, Repository};
use imq_infra_db::repositories::{
    PullRequestRepository, QueueEntryRepository, QueueRepository, RepositoryCatalog,
};
use imq_infra_db::{DbClient, DbError};

async fn single_entry_harness() -> (QueueEntryRepository, String, tempfile::TempDir) {
    let scratch_dir = tempfile::tempdir().unwrap();
    let database_path = scratch_dir.path().join("ledger.db");
    let client = DbClient::connect(database_path.to_str().unwrap(), 2)
        .await
        .unwrap();

    let catalog = RepositoryCatalog::new(client.clone());
    let pull_requests = PullRequestRepository::new(client.clone());
    let queues = QueueRepository::new(client.clone());
    let entries = QueueEntryRepository::new(client.clone());

    let repository = catalog
        .ensure(&Repository::new("acme", "widgets", "main"))
        .await
        .unwrap();
    let pull_request = PullRequest::new(
        &repository.id,
        1,
        "PR",
        "dev",
        "main",
        "head",
        &"e".repeat(40),
    );
    pull_requests.upsert(&pull_request).await.unwrap();
    let queue = queues.ensure(&repository.id, "main").await.unwrap();
    let entry = entries.append(&queue.id, &pull_request.id).await.unwrap();

    (entries, entry.id, scratch_dir)
}

#[tokio::test]
async fn certify_legal_lifecycle_seals_timestamps() {
    println!("\n🧪 [PROVING_GROUNDS]: Transition monotonicity audit...");
    let (entries, entry_id, _scratch) = single_entry_harness().await;

    let running = entries
        .transition(&entry_id, EntryStatus::Running)
        .await
        .unwrap();
    assert!(running.started_at.is_some(), "running must seal started_at");

    let completed = entries
        .transition(&entry_id, EntryStatus::Completed)
        .await
        .unwrap();
    assert!(
        completed.completed_at.is_some(),
        "terminal must seal completed_at"
    );
    println!("   ✅ [SUCCESS]: Legal lifecycle sealed both instants.");
}

#[tokio::test]
async fn certify_illegal_transitions_are_vetoed() {
    let (entries, entry_id, _scratch) = single_entry_harness().await;

    // pending → completed es un salto prohibido.
    let direct_jump = entries.transition(&entry_id, EntryStatus::Completed).await;
    assert!(matches!(direct_jump, Err(DbError::InvalidOperation(_))));

    // Ciclo legal hasta terminal...
    entries
        .transition(&entry_id, EntryStatus::Running)
        .await
        .unwrap();
    entries
        .transition(&entry_id, EntryStatus::Failed)
        .await
        .unwrap();

    // ...y los terminales son sumideros.
    for illegal_target in [
        EntryStatus::Pending,
        EntryStatus::Running,
        EntryStatus::Completed,
        EntryStatus::Cancelled,
    ] {
        let verdict = entries.transition(&entry_id, illegal_target).await;
        assert!(
            matches!(verdict, Err(DbError::InvalidOperation(_))),
            "terminal state accepted {:?}",
            illegal_target
        );
    }
    println!("   ✅ [SUCCESS]: Terminal states are absolute sinks.");
}
