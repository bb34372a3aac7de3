// [tests/mirror/apps/coordinator/state/metrics_retention.test.rs]
/**
 * =================================================================
 * APARATO: METRICS RETENTION TEST
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * OBJETIVO: Certificar la retención acotada FIFO y los agregados del
 *           resumen de sólo lectura.
 * =================================================================
 */

use imq_coordinator::state::metrics::MetricsManager;
use imq_domain_models::{CheckStatus, EntryStatus};

#[test]
fn certify_bounded_retention_drops_fifo() {
    println!("\n🧪 [PROVING_GROUNDS]: Metrics retention audit...");
    let metrics = MetricsManager::new(1000);

    // Inundación por encima del tope de retención.
    for sample_index in 0..1200u64 {
        metrics.record_entry_processed(
            "queue-alpha",
            &format!("entry-{}", sample_index),
            EntryStatus::Completed,
            100,
        );
    }

    let retained = metrics.processing_samples_for_queue("queue-alpha");
    assert_eq!(retained.len(), 1000, "retention cap violated");

    // FIFO: las muestras más viejas cayeron primero.
    assert_eq!(retained.first().unwrap().entry_id, "entry-200");
    assert_eq!(retained.last().unwrap().entry_id, "entry-1199");
    println!("   ✅ [SUCCESS]: FIFO drop at the 1000-sample cap.");
}

#[test]
fn certify_summary_aggregates() {
    let metrics = MetricsManager::new(1000);

    metrics.record_entry_processed("q1", "e1", EntryStatus::Completed, 2000);
    metrics.record_entry_processed("q1", "e2", EntryStatus::Completed, 4000);
    metrics.record_entry_processed("q1", "e3", EntryStatus::Failed, 6000);
    metrics.record_entry_processed("q2", "e4", EntryStatus::Cancelled, 0);

    metrics.record_queue_length("q1", 5);
    metrics.record_queue_length("q1", 3);
    metrics.record_queue_length("q2", 1);

    metrics.record_check_outcome("CI", CheckStatus::Passed, 1500);
    metrics.record_processor_error();

    let summary = metrics.summary();

    assert_eq!(summary.totals.entries_processed, 4);
    assert_eq!(summary.totals.entries_completed, 2);
    assert_eq!(summary.totals.entries_failed, 1);
    assert_eq!(summary.totals.entries_cancelled, 1);
    assert_eq!(summary.totals.checks_recorded, 1);
    assert_eq!(summary.totals.processor_errors, 1);

    // Tasa de éxito: completadas / procesadas.
    assert!((summary.success_rate - 0.5).abs() < f64::EPSILON);

    // Duración media en segundos.
    assert!((summary.avg_processing_time_seconds - 3.0).abs() < 0.001);

    // La muestra más reciente por cola manda.
    assert_eq!(summary.current_queue_sizes.get("q1"), Some(&3));
    assert_eq!(summary.current_queue_sizes.get("q2"), Some(&1));

    assert!(!summary.recent_samples.is_empty());
}

#[test]
fn certify_forced_shutdown_tally() {
    let metrics = MetricsManager::new(100);
    metrics.record_forced_shutdown(3);
    metrics.record_forced_shutdown(2);

    let summary = metrics.summary();
    assert_eq!(summary.totals.forced_shutdowns, 2);
    assert_eq!(summary.totals.forced_shutdown_aborted_tasks, 5);
}
