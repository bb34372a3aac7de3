// [tests/mirror/libs/infra/db/persistence_roundtrip.test.rs]
/**
 * =================================================================
 * APARATO: PERSISTENCE ROUNDTRIP TEST
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * OBJETIVO: Certificar que persistir → recargar es identidad para
 *           cada entidad del dominio.
 * =================================================================
 */

use imq_domain_models::{PullRequest, Repository, SystemConfiguration};
use imq_infra_db::repositories::{
    ConfigurationRepository, PollCursorRepository, PullRequestRepository, QueueEntryRepository,
    QueueRepository, RepositoryCatalog,
};
use imq_infra_db::DbClient;

async fn open_test_ledger() -> (DbClient, tempfile::TempDir) {
    let scratch_dir = tempfile::tempdir().expect("scratch dir");
    let database_path = scratch_dir.path().join("ledger.db");
    let client = DbClient::connect(database_path.to_str().unwrap(), 3)
        .await
        .expect("ledger ignition failed");
    (client, scratch_dir)
}

#[tokio::test]
async fn certify_repository_and_pull_request_roundtrip() {
    println!("\n🧪 [PROVING_GROUNDS]: Ledger roundtrip audit...");
    let (client, _scratch) = open_test_ledger().await;

    let catalog = RepositoryCatalog::new(client.clone());
    let pull_requests = PullRequestRepository::new(client.clone());

    // 1. EXECUTION: primera observación del repositorio.
    let repository = catalog
        .ensure(&Repository::new("acme", "widgets", "main"))
        .await
        .expect("repository registration");

    let recovered_repository = catalog
        .find_by_full_name("acme/widgets")
        .await
        .expect("catalog read")
        .expect("repository present");
    assert_eq!(repository, recovered_repository);
    println!("   ✅ [SUCCESS]: Repository identity preserved.");

    // La identidad canónica es idempotente.
    let duplicate = catalog
        .ensure(&Repository::new("acme", "widgets", "main"))
        .await
        .expect("idempotent ensure");
    assert_eq!(duplicate.id, repository.id);

    // 2. EXECUTION: PR con SHA de 40 hex.
    let pull_request = PullRequest::new(
        &repository.id,
        42,
        "Add turbo mode",
        "octocat",
        "main",
        "feature/turbo",
        &"a".repeat(40),
    );
    pull_requests.upsert(&pull_request).await.expect("pr insert");

    let recovered_pr = pull_requests
        .find_by_repo_and_number(&repository.id, 42)
        .await
        .expect("pr read")
        .expect("pr present");
    assert_eq!(pull_request.id, recovered_pr.id);
    assert_eq!(recovered_pr.head_sha, "a".repeat(40));

    // 3. REFRESH: la cabeza avanza, la identidad se preserva.
    let advanced = recovered_pr.refreshed("Add turbo mode", &"b".repeat(40), false, true);
    pull_requests.upsert(&advanced).await.expect("pr refresh");
    let refreshed = pull_requests
        .find_by_id(&pull_request.id)
        .await
        .expect("pr read")
        .expect("pr present");
    assert_eq!(refreshed.head_sha, "b".repeat(40));
    assert!(refreshed.is_up_to_date);
    println!("   ✅ [SUCCESS]: Pull request refresh preserved identity.");
}

#[tokio::test]
async fn certify_queue_entry_and_configuration_roundtrip() {
    let (client, _scratch) = open_test_ledger().await;

    let catalog = RepositoryCatalog::new(client.clone());
    let pull_requests = PullRequestRepository::new(client.clone());
    let queues = QueueRepository::new(client.clone());
    let entries = QueueEntryRepository::new(client.clone());
    let configurations = ConfigurationRepository::new(client.clone());

    let repository = catalog
        .ensure(&Repository::new("acme", "widgets", "main"))
        .await
        .unwrap();
    let pull_request = PullRequest::new(
        &repository.id,
        7,
        "Fix",
        "dev",
        "main",
        "fix",
        &"c".repeat(40),
    );
    pull_requests.upsert(&pull_request).await.unwrap();

    // Cola perezosa e idempotente sobre (repo, rama).
    let queue = queues.ensure(&repository.id, "main").await.unwrap();
    let queue_again = queues.ensure(&repository.id, "main").await.unwrap();
    assert_eq!(queue.id, queue_again.id);

    let entry = entries.append(&queue.id, &pull_request.id).await.unwrap();
    let recovered_entry = entries
        .find_by_id(&entry.id)
        .await
        .unwrap()
        .expect("entry present");
    assert_eq!(entry, recovered_entry);
    assert_eq!(recovered_entry.position, 0);

    // Configuración de fila única: reemplazo íntegro.
    let configuration = SystemConfiguration::default();
    configurations.store(&configuration).await.unwrap();
    let recovered_configuration = configurations.load().await.unwrap();
    assert_eq!(configuration, recovered_configuration);

    println!("   ✅ [SUCCESS]: Queue, entry and configuration roundtrips sealed.");
}

#[tokio::test]
async fn certify_poll_cursor_survives_reload() {
    let (client, _scratch) = open_test_ledger().await;
    let cursors = PollCursorRepository::new(client.clone());

    assert_eq!(cursors.load("acme/widgets").await.unwrap(), None);
    cursors.store("acme/widgets", "31415926535").await.unwrap();
    assert_eq!(
        cursors.load("acme/widgets").await.unwrap().as_deref(),
        Some("31415926535")
    );

    // Avance del cursor.
    cursors.store("acme/widgets", "31415926600").await.unwrap();
    assert_eq!(
        cursors.load("acme/widgets").await.unwrap().as_deref(),
        Some("31415926600")
    );
}
