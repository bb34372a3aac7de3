// [tests/mirror/apps/coordinator/services/admission_idempotency.test.rs]
/**
 * =================================================================
 * APARATO: ADMISSION IDEMPOTENCY TEST
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L4-MIRROR
 * OBJETIVO: Certificar que las dos fuentes de ingreso fusionan
 *           duplicados: un PR con entrada viva jamás se re-admite.
 * =================================================================
 */

use imq_domain_models::{EntryStatus, PullRequest, Repository};
use imq_infra_db::repositories::{
    PullRequestRepository, QueueEntryRepository, QueueRepository, RepositoryCatalog,
};
use imq_infra_db::DbClient;

#[tokio::test]
async fn certify_live_entry_coalesces_duplicate_admissions() {
    println!("\n🧪 [PROVING_GROUNDS]: Duplicate coalescence audit...");
    let scratch_dir = tempfile::tempdir().unwrap();
    let database_path = scratch_dir.path().join("ledger.db");
    let client = DbClient::connect(database_path.to_str().unwrap(), 3)
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
        42,
        "PR",
        "dev",
        "main",
        "head",
        &"a".repeat(40),
    );
    pull_requests.upsert(&pull_request).await.unwrap();
    let queue = queues.ensure(&repository.id, "main").await.unwrap();

    // Primera admisión (webhook, por ejemplo).
    let first_entry = entries.append(&queue.id, &pull_request.id).await.unwrap();

    // El evento duplicado (polling) consulta antes de admitir: la
    // entrada viva existente es la respuesta, no una fila nueva.
    let coalesced = entries
        .find_live_by_pull_request(&pull_request.id)
        .await
        .unwrap()
        .expect("live entry visible to the duplicate source");
    assert_eq!(coalesced.id, first_entry.id);

    let live = entries.list_live(&queue.id).await.unwrap();
    assert_eq!(live.len(), 1, "duplicate admission corrupted the order");
    println!("   ✅ [SUCCESS]: Duplicate coalesced onto the live entry.");

    // Tras el sellado terminal, una re-admisión legítima crea entrada nueva.
    entries
        .transition(&first_entry.id, EntryStatus::Cancelled)
        .await
        .unwrap();
    assert!(entries
        .find_live_by_pull_request(&pull_request.id)
        .await
        .unwrap()
        .is_none());

    let second_entry = entries.append(&queue.id, &pull_request.id).await.unwrap();
    assert_ne!(second_entry.id, first_entry.id);
    assert_eq!(second_entry.position, 0);
}
