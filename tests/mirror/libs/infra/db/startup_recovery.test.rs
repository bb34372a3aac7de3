// [tests/mirror/libs/infra/db/startup_recovery.test.rs]
/**
 * =================================================================
 * APARATO: STARTUP RECOVERY TEST
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * OBJETIVO: Certificar que las entradas 'running' huérfanas de un
 *           proceso colapsado regresan a 'pending' en posición 0.
 * =================================================================
 */

use imq_domain_models::{EntryStatus, PullRequest, Repository};
use imq_infra_db::repositories::{
    PullRequestRepository, QueueEntryRepository, QueueRepository, RepositoryCatalog,
};
use imq_infra_db::DbClient;

#[tokio::test]
async fn certify_orphaned_running_entries_reset_to_pending_head() {
    println!("\n🧪 [PROVING_GROUNDS]: Crash recovery audit...");
    let scratch_dir = tempfile::tempdir().unwrap();
    let database_path = scratch_dir.path().join("ledger.db");
    let database_path_str = database_path.to_str().unwrap().to_string();

    // --- FASE 1: proceso "anterior" deja una entrada running ---
    {
        let client = DbClient::connect(&database_path_str, 2).await.unwrap();
        let catalog = RepositoryCatalog::new(client.clone());
        let pull_requests = PullRequestRepository::new(client.clone());
        let queues = QueueRepository::new(client.clone());
        let entries = QueueEntryRepository::new(client.clone());

        let repository = catalog
            .ensure(&Repository::new("acme", "widgets", "main"))
            .await
            .unwrap();
        let queue = queues.ensure(&repository.id, "main").await.unwrap();

        for pr_number in [1u64, 2] {
            let pull_request = PullRequest::new(
                &repository.id,
                pr_number,
                "PR",
                "dev",
                "main",
                "head",
                &"f".repeat(40),
            );
            pull_requests.upsert(&pull_request).await.unwrap();
            entries.append(&queue.id, &pull_request.id).await.unwrap();
        }

        let live = entries.list_live(&queue.id).await.unwrap();
        entries
            .transition(&live[0].id, EntryStatus::Running)
            .await
            .unwrap();
        // El proceso muere aquí: la entrada queda 'running' en el Ledger.
    }

    // --- FASE 2: reinicio y recuperación ---
    let client = DbClient::connect(&database_path_str, 2).await.unwrap();
    let entries = QueueEntryRepository::new(client.clone());
    let queues = QueueRepository::new(client.clone());

    let resurrected_count = entries.reset_orphaned_running().await.unwrap();
    assert_eq!(resurrected_count, 1, "exactly one orphan expected");

    let queue = queues.list_all().await.unwrap().remove(0);
    let live = entries.list_live(&queue.id).await.unwrap();

    assert_eq!(live.len(), 2);
    assert!(
        live.iter().all(|entry| entry.status == EntryStatus::Pending),
        "no running entries may survive recovery"
    );

    let head = entries.head_pending(&queue.id).await.unwrap().unwrap();
    assert_eq!(head.position, 0);
    assert!(head.started_at.is_none(), "recovery clears started_at");

    println!("   ✅ [SUCCESS]: Orphaned entry resumed at the queue head.");
}
