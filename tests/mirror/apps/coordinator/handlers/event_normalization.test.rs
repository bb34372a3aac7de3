// [tests/mirror/apps/coordinator/handlers/event_normalization.test.rs]
/**
 * =================================================================
 * APARATO: EVENT NORMALIZATION TEST
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L4-MIRROR
 * OBJETIVO: Certificar que webhook y feed de polling convergen en el
 *           mismo contrato de evento normalizado.
 * =================================================================
 */

use serde_json::json;

use imq_coordinator::handlers::webhook::normalize_webhook_payload;
use imq_coordinator::services::poller::normalize_feed_event;
use imq_domain_models::EventKind;
use imq_infra_forge::RepositoryEvent;

#[test]
fn certify_webhook_label_event_normalization() {
    println!("\n🧪 [PROVING_GROUNDS]: Webhook normalization audit...");
    let payload = json!({
        "action": "labeled",
        "label": { "name": "merge-queue" },
        "repository": { "full_name": "acme/widgets" },
        "pull_request": {
            "number": 42,
            "head": { "sha": "a".repeat(40) }
        }
    });

    let normalized = normalize_webhook_payload("pull_request", &payload).expect("normalized");
    assert_eq!(normalized.kind, EventKind::LabelAdded);
    assert_eq!(normalized.repository_full_name, "acme/widgets");
    assert_eq!(normalized.pr_number, 42);
    assert_eq!(normalized.label.as_deref(), Some("merge-queue"));
    assert_eq!(normalized.head_sha.as_deref(), Some("a".repeat(40).as_str()));
    println!("   ✅ [SUCCESS]: labeled → label_added sealed.");

    // Acciones del vocabulario restante.
    let unlabeled = json!({
        "action": "unlabeled",
        "label": { "name": "merge-queue" },
        "repository": { "full_name": "acme/widgets" },
        "pull_request": { "number": 42 }
    });
    assert_eq!(
        normalize_webhook_payload("pull_request", &unlabeled).unwrap().kind,
        EventKind::LabelRemoved
    );

    let closed = json!({
        "action": "closed",
        "repository": { "full_name": "acme/widgets" },
        "pull_request": { "number": 42 }
    });
    assert_eq!(
        normalize_webhook_payload("pull_request", &closed).unwrap().kind,
        EventKind::PrClosed
    );

    let synchronized = json!({
        "action": "synchronize",
        "repository": { "full_name": "acme/widgets" },
        "pull_request": { "number": 42 }
    });
    assert_eq!(
        normalize_webhook_payload("pull_request", &synchronized).unwrap().kind,
        EventKind::PrUpdated
    );
}

#[test]
fn certify_foreign_events_are_discarded() {
    let payload = json!({
        "action": "labeled",
        "repository": { "full_name": "acme/widgets" },
        "pull_request": { "number": 42 }
    });

    // Tipo de evento ajeno al vocabulario.
    assert!(normalize_webhook_payload("issues", &payload).is_none());
    assert!(normalize_webhook_payload("push", &payload).is_none());

    // Acción fuera del vocabulario del motor.
    let assigned = json!({
        "action": "assigned",
        "repository": { "full_name": "acme/widgets" },
        "pull_request": { "number": 42 }
    });
    assert!(normalize_webhook_payload("pull_request", &assigned).is_none());

    // Payload mutilado.
    let hollow = json!({ "action": "labeled" });
    assert!(normalize_webhook_payload("pull_request", &hollow).is_none());
}

#[test]
fn certify_feed_event_normalization_parity() {
    let raw_event = RepositoryEvent {
        id: "31415926535".into(),
        event_type: "PullRequestEvent".into(),
        payload: json!({
            "action": "labeled",
            "label": { "name": "merge-queue" },
            "pull_request": {
                "number": 42,
                "head": { "sha": "b".repeat(40) }
            }
        }),
        created_at: None,
    };

    let normalized = normalize_feed_event(&raw_event, "acme/widgets").expect("normalized");
    assert_eq!(normalized.kind, EventKind::LabelAdded);
    assert_eq!(normalized.repository_full_name, "acme/widgets");
    assert_eq!(normalized.pr_number, 42);
    assert_eq!(normalized.label.as_deref(), Some("merge-queue"));

    // Tipos de feed ajenos se descartan.
    let push_event = RepositoryEvent {
        id: "31415926536".into(),
        event_type: "PushEvent".into(),
        payload: json!({}),
        created_at: None,
    };
    assert!(normalize_feed_event(&push_event, "acme/widgets").is_none());
}
