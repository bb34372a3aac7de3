// [libs/domain/models/src/tests_serialization.rs]
/**
 * =================================================================
 * APARATO: DOMAIN SERIALIZATION TEST
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L2-MODELS)
 * RESPONSABILIDAD: CERTIFICACIÓN DE PARIDAD JSON DEL CONTRATO DE DOMINIO
 *
 * VISION:
 * 1. WIRE STABILITY: Los discriminadores serde (snake_case) son parte
 *    del contrato externo; cualquier deriva rompe Dashboard y WebSocket.
 * 2. ROUNDTRIP LAW: Persistir → recargar es identidad para cada entidad.
 * =================================================================
 */

use crate::check::{CheckConfiguration, CheckKind, CheckSpec};
use crate::configuration::SystemConfiguration;
use crate::events::{EventKind, NormalizedEvent, QueueEvent, RemovalReason};
use crate::queue::{EntryStatus, Queue, QueueEntry};
use serde_json::json;

/**
 * CERTIFICACIÓN: Roundtrip íntegro de una entrada de cola.
 */
#[test]
fn certify_queue_entry_roundtrip_identity() {
    let queue = Queue::new("repo-uuid", "main");
    let entry = QueueEntry::new(&queue.id, "pr-uuid", 0);

    let serialized_json = serde_json::to_string(&entry).expect("serialization collapsed");
    let recovered: QueueEntry =
        serde_json::from_str(&serialized_json).expect("schema drift detected");

    assert_eq!(entry, recovered);
    assert_eq!(recovered.status, EntryStatus::Pending);
}

/**
 * CERTIFICACIÓN: Discriminadores snake_case del contrato de estados.
 */
#[test]
fn certify_status_wire_discriminators() {
    assert_eq!(
        serde_json::to_string(&EntryStatus::Running).unwrap(),
        "\"running\""
    );
    assert_eq!(
        serde_json::to_string(&EventKind::LabelAdded).unwrap(),
        "\"label_added\""
    );
    assert_eq!(
        serde_json::to_string(&RemovalReason::PrClosed).unwrap(),
        "\"pr_closed\""
    );
    assert_eq!(
        serde_json::to_string(&CheckKind::ForgeWorkflow).unwrap(),
        "\"forge_workflow\""
    );
}

/**
 * CERTIFICACIÓN: Frame WebSocket {type, payload, timestamp}.
 */
#[test]
fn certify_websocket_frame_contract() {
    let queue = Queue::new("repo-uuid", "main");
    let entry = QueueEntry::new(&queue.id, "pr-uuid", 0);

    let signal = QueueEvent::EntryAdded {
        queue_id: queue.id.clone(),
        entry,
        pr_number: 42,
    };

    assert_eq!(signal.frame_type(), "queue.entry.added");
    assert_eq!(signal.queue_id(), Some(queue.id.as_str()));

    let frame = signal.to_frame();
    let frame_json = serde_json::to_value(&frame).expect("frame serialization collapsed");

    assert_eq!(frame_json["type"], "queue.entry.added");
    assert!(frame_json["payload"]["entry"]["id"].is_string());
    assert!(frame_json["timestamp"].is_string());
}

/**
 * CERTIFICACIÓN: La configuración normalizada transporta la suite intacta.
 */
#[test]
fn certify_system_configuration_roundtrip() {
    let mut configuration = SystemConfiguration::default();
    configuration.check_configuration = CheckConfiguration {
        checks: vec![CheckSpec {
            id: "ci".into(),
            name: "CI".into(),
            kind: CheckKind::ForgeWorkflow,
            kind_config: json!({"workflow": "ci.yml"}),
            timeout_seconds: Some(900),
            dependencies: vec![],
        }],
        fail_fast: true,
    };

    let serialized_json = serde_json::to_string(&configuration).unwrap();
    let recovered: SystemConfiguration = serde_json::from_str(&serialized_json).unwrap();

    assert_eq!(configuration, recovered);
    assert_eq!(recovered.trigger_label, "merge-queue");
    assert_eq!(
        recovered.notification_templates.merge_success,
        "✅ Successfully merged via IMQ!"
    );
}

/**
 * CERTIFICACIÓN: El evento normalizado omite campos ausentes en el wire.
 */
#[test]
fn certify_normalized_event_optional_fields() {
    let event = NormalizedEvent {
        kind: EventKind::PrClosed,
        repository_full_name: "acme/widgets".into(),
        pr_number: 42,
        head_sha: None,
        label: None,
    };

    let serialized_json = serde_json::to_string(&event).unwrap();
    assert!(!serialized_json.contains("head_sha"));
    assert!(!serialized_json.contains("label"));

    let recovered: NormalizedEvent = serde_json::from_str(&serialized_json).unwrap();
    assert_eq!(event, recovered);
}
