// [tests/mirror/libs/infra/db/reorder_permutation.test.rs]
/**
 * =================================================================
 * APARATO: REORDER PERMUTATION TEST
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * OBJETIVO: Certificar que el reorden es una permutación estricta del
 *           orden vivo y que la entrada en ejecución no se desplaza.
 * =================================================================
 */

use std::collections::HashSet;

use imq_domain_models::{EntryStatus, PullRequest, Repository};
use imq_infra_db::repositories::{
    PullRequestRepository, QueueEntryRepository, QueueRepository, RepositoryCatalog,
};
use imq_infra_db::{DbClient, DbError};

async fn harness(entry_count: usize) -> (QueueEntryRepository, String, Vec<String>, tempfile::TempDir) {
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
    let queue = queues.ensure(&repository.id, "main").await.unwrap();

    let mut entry_ids = Vec::new();
    for pr_number in 0..entry_count as u64 {
        let pull_request = PullRequest::new(
            &repository.id,
            10 + pr_number,
            "PR",
            "dev",
            "main",
            "head",
            &"a".repeat(40),
        );
        pull_requests.upsert(&pull_request).await.unwrap();
        entry_ids.push(entries.append(&queue.id, &pull_request.id).await.unwrap().id);
    }

    (entries, queue.id, entry_ids, scratch_dir)
}

#[tokio::test]
async fn certify_reorder_is_an_exact_permutation() {
    println!("\n🧪 [PROVING_GROUNDS]: Reorder permutation audit...");
    let (entries, queue_id, entry_ids, _scratch) = harness(4).await;

    // Permutación inversa legal.
    let reversed: Vec<String> = entry_ids.iter().rev().cloned().collect();
    let reordered = entries.reorder(&queue_id, &reversed).await.unwrap();

    // Conjunto preservado y longitud idéntica.
    let original_set: HashSet<_> = entry_ids.iter().cloned().collect();
    let reordered_set: HashSet<_> = reordered.iter().map(|entry| entry.id.clone()).collect();
    assert_eq!(original_set, reordered_set);
    assert_eq!(reordered.len(), entry_ids.len());

    // Posiciones densas según el orden solicitado.
    for (dense_position, requested_id) in reversed.iter().enumerate() {
        let entry = reordered
            .iter()
            .find(|entry| &entry.id == requested_id)
            .unwrap();
        assert_eq!(entry.position, dense_position as u32);
    }
    println!("   ✅ [SUCCESS]: Permutation law held (set + length + density).");
}

#[tokio::test]
async fn certify_partial_or_foreign_payloads_are_vetoed() {
    let (entries, queue_id, entry_ids, _scratch) = harness(3).await;

    // Subconjunto: no es permutación.
    let partial = vec![entry_ids[0].clone(), entry_ids[1].clone()];
    assert!(matches!(
        entries.reorder(&queue_id, &partial).await,
        Err(DbError::InvalidOperation(_))
    ));

    // Identificador ajeno inyectado.
    let mut foreign = entry_ids.clone();
    foreign[2] = "ghost-entry".to_string();
    assert!(matches!(
        entries.reorder(&queue_id, &foreign).await,
        Err(DbError::InvalidOperation(_))
    ));
}

#[tokio::test]
async fn certify_running_entry_is_pinned_to_head() {
    let (entries, queue_id, entry_ids, _scratch) = harness(3).await;

    entries
        .transition(&entry_ids[0], EntryStatus::Running)
        .await
        .unwrap();

    // Desplazar a la entrada en ejecución es ilegal.
    let displacing = vec![
        entry_ids[1].clone(),
        entry_ids[0].clone(),
        entry_ids[2].clone(),
    ];
    assert!(matches!(
        entries.reorder(&queue_id, &displacing).await,
        Err(DbError::InvalidOperation(_))
    ));

    // Con la running en cabeza, el resto permuta libremente.
    let legal = vec![
        entry_ids[0].clone(),
        entry_ids[2].clone(),
        entry_ids[1].clone(),
    ];
    let reordered = entries.reorder(&queue_id, &legal).await.unwrap();
    assert_eq!(reordered[0].id, entry_ids[0]);
    assert_eq!(reordered[0].position, 0);
}
