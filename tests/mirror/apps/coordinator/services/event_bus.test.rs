// [tests/mirror/apps/coordinator/services/event_bus.test.rs]
/**
 * =================================================================
 * APARATO: EVENT BUS PROPAGATION TEST
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L4-MIRROR
 * OBJETIVO: Certificar orden de entrega, filtros de suscripción y el
 *           contrato lossy ante suscriptores lentos.
 * =================================================================
 */

use imq_coordinator::services::{EventBus, SubscriberSignal};
use imq_domain_models::{Queue, QueueEntry, QueueEvent, RemovalReason};

fn scripted_entry(queue_id: &str, position: u32) -> QueueEntry {
    QueueEntry::new(queue_id, &format!("pr-{}", position), position)
}

#[tokio::test]
async fn certify_signals_arrive_in_emission_order() {
    println!("\n🧪 [PROVING_GROUNDS]: Event bus ordering audit...");
    let bus = EventBus::new();
    let mut subscriber = bus.subscribe();

    let queue = Queue::new("repo-uuid", "main");
    let entry = scripted_entry(&queue.id, 0);

    bus.emit_entry_added(&queue.id, entry.clone(), 42);
    bus.emit_entry_status_changed(&queue.id, entry.clone());
    bus.emit_entry_removed(&queue.id, &entry.id, RemovalReason::Completed);

    // Orden de emisión preservado por suscriptor.
    let first = subscriber.recv().await.unwrap();
    assert_eq!(first.frame_type(), "queue.entry.added");
    let second = subscriber.recv().await.unwrap();
    assert_eq!(second.frame_type(), "queue.entry.status_changed");
    let third = subscriber.recv().await.unwrap();
    assert_eq!(third.frame_type(), "queue.entry.removed");

    if let QueueEvent::EntryRemoved { reason, .. } = third {
        assert_eq!(reason, RemovalReason::Completed);
    } else {
        panic!("wrong event shape");
    }
    println!("   ✅ [SUCCESS]: Per-subscriber ordering sealed.");
}

#[tokio::test]
async fn certify_filtered_subscription_admits_only_matching_queues() {
    let bus = EventBus::new();
    let watched_queue = Queue::new("repo-uuid", "main");
    let noisy_queue = Queue::new("repo-uuid", "develop");

    let watched_id = watched_queue.id.clone();
    let mut filtered = bus.subscribe_filtered(move |event| {
        event.queue_id() == Some(watched_id.as_str())
    });

    bus.emit_entry_added(&noisy_queue.id, scripted_entry(&noisy_queue.id, 0), 1);
    bus.emit_entry_added(&watched_queue.id, scripted_entry(&watched_queue.id, 0), 2);

    // Sólo la señal de la cola vigilada atraviesa el filtro.
    match filtered.next().await {
        Some(SubscriberSignal::Event(QueueEvent::EntryAdded { queue_id, pr_number, .. })) => {
            assert_eq!(queue_id, watched_queue.id);
            assert_eq!(pr_number, 2);
        }
        other => panic!("unexpected signal: {:?}", other.is_some()),
    }
}

#[tokio::test]
async fn certify_slow_subscriber_observes_lossy_marker() {
    let bus = EventBus::new();
    let queue = Queue::new("repo-uuid", "main");

    let mut slow_subscriber = bus.subscribe_filtered(|_| true);

    // Saturación muy por encima de la capacidad del canal (1024):
    // el suscriptor jamás drena mientras el motor emite.
    for flood_index in 0..2000u64 {
        bus.emit_entry_added(&queue.id, scripted_entry(&queue.id, 0), flood_index);
    }

    // La primera lectura revela la pérdida, no un evento fantasma.
    match slow_subscriber.next().await {
        Some(SubscriberSignal::Lossy(skipped_count)) => {
            assert!(skipped_count > 0, "lossy marker without skipped count");
            println!("   ✅ [SUCCESS]: Lossy marker carried {} skipped.", skipped_count);
        }
        other => panic!("expected lossy marker, got event={:?}", other.is_some()),
    }

    // Tras el marcador, el flujo continúa con lo retenido.
    match slow_subscriber.next().await {
        Some(SubscriberSignal::Event(_)) => {}
        other => panic!("expected retained event, got {:?}", other.is_some()),
    }
}
