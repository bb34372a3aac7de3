// [apps/coordinator/src/state/metrics.rs]
/*!
 * =================================================================
 * APARATO: METRICS MANAGER (PANOPTICON STATE)
 * CLASIFICACIÓN: APPLICATION STATE (ESTRATO L3)
 * RESPONSABILIDAD: MEMORIA ACOTADA DE MUESTRAS Y AGREGADOS OPERATIVOS
 *
 * VISION:
 * 1. BOUNDED STREAMS: Cada flujo retiene a lo sumo 'max_history'
 *    muestras (defecto 1000) con descarte FIFO; la RAM queda acotada
 *    sin importar la vida del proceso.
 * 2. READ-ONLY SUMMARY: 'summary' materializa totales, tasa de éxito,
 *    duración media y tamaños vigentes sin exponer los cerrojos.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use imq_domain_models::{CheckStatus, EntryStatus};

/// Retención por defecto por flujo de muestras.
pub const DEFAULT_MAX_HISTORY: usize = 1000;

/// Muestras recientes expuestas en el resumen.
const SUMMARY_RECENT_SAMPLES: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueLengthSample {
    pub queue_id: String,
    pub length: usize,
    pub sampled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingSample {
    pub queue_id: String,
    pub entry_id: String,
    pub outcome: EntryStatus,
    pub duration_ms: u64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckSample {
    pub check_name: String,
    pub status: CheckStatus,
    pub duration_ms: u64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MetricsTotals {
    pub entries_processed: u64,
    pub entries_completed: u64,
    pub entries_failed: u64,
    pub entries_cancelled: u64,
    pub checks_recorded: u64,
    pub processor_errors: u64,
    pub forced_shutdowns: u64,
    pub forced_shutdown_aborted_tasks: u64,
}

/// Resumen de sólo lectura del Panóptico.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub totals: MetricsTotals,
    /// Fracción de entradas procesadas que concluyeron 'completed'.
    pub success_rate: f64,
    pub avg_processing_time_seconds: f64,
    pub current_queue_sizes: HashMap<String, usize>,
    pub recent_samples: Vec<ProcessingSample>,
}

/// Sumidero de registros concurrente con retención acotada.
pub struct MetricsManager {
    max_history: usize,
    totals: RwLock<MetricsTotals>,
    queue_length_samples: RwLock<VecDeque<QueueLengthSample>>,
    processing_samples: RwLock<VecDeque<ProcessingSample>>,
    check_samples: RwLock<VecDeque<CheckSample>>,
}

fn push_bounded<T>(stream: &mut VecDeque<T>, sample: T, max_history: usize) {
    if stream.len() >= max_history {
        stream.pop_front();
    }
    stream.push_back(sample);
}

impl MetricsManager {
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history: max_history.max(1),
            totals: RwLock::new(MetricsTotals::default()),
            queue_length_samples: RwLock::new(VecDeque::with_capacity(64)),
            processing_samples: RwLock::new(VecDeque::with_capacity(64)),
            check_samples: RwLock::new(VecDeque::with_capacity(64)),
        }
    }

    pub fn record_queue_length(&self, queue_id: &str, length: usize) {
        let mut stream_guard = self
            .queue_length_samples
            .write()
            .expect("LOCK_POISONED");
        push_bounded(
            &mut stream_guard,
            QueueLengthSample {
                queue_id: queue_id.to_string(),
                length,
                sampled_at: Utc::now(),
            },
            self.max_history,
        );
    }

    pub fn record_entry_processed(
        &self,
        queue_id: &str,
        entry_id: &str,
        outcome: EntryStatus,
        duration_ms: u64,
    ) {
        {
            let mut totals_guard = self.totals.write().expect("LOCK_POISONED");
            totals_guard.entries_processed += 1;
            match outcome {
                EntryStatus::Completed => totals_guard.entries_completed += 1,
                EntryStatus::Failed => totals_guard.entries_failed += 1,
                EntryStatus::Cancelled => totals_guard.entries_cancelled += 1,
                _ => {}
            }
        }

        let mut stream_guard = self.processing_samples.write().expect("LOCK_POISONED");
        push_bounded(
            &mut stream_guard,
            ProcessingSample {
                queue_id: queue_id.to_string(),
                entry_id: entry_id.to_string(),
                outcome,
                duration_ms,
                recorded_at: Utc::now(),
            },
            self.max_history,
        );
    }

    pub fn record_check_outcome(&self, check_name: &str, status: CheckStatus, duration_ms: u64) {
        {
            let mut totals_guard = self.totals.write().expect("LOCK_POISONED");
            totals_guard.checks_recorded += 1;
        }
        let mut stream_guard = self.check_samples.write().expect("LOCK_POISONED");
        push_bounded(
            &mut stream_guard,
            CheckSample {
                check_name: check_name.to_string(),
                status,
                duration_ms,
                recorded_at: Utc::now(),
            },
            self.max_history,
        );
    }

    pub fn record_processor_error(&self) {
        self.totals.write().expect("LOCK_POISONED").processor_errors += 1;
    }

    pub fn record_forced_shutdown(&self, aborted_task_count: u64) {
        let mut totals_guard = self.totals.write().expect("LOCK_POISONED");
        totals_guard.forced_shutdowns += 1;
        totals_guard.forced_shutdown_aborted_tasks += aborted_task_count;
    }

    /// Muestras de checks recientes (para el estrato de stats).
    pub fn recent_check_samples(&self) -> Vec<CheckSample> {
        self.check_samples
            .read()
            .expect("LOCK_POISONED")
            .iter()
            .rev()
            .take(SUMMARY_RECENT_SAMPLES)
            .cloned()
            .collect()
    }

    /// Muestras de proceso de una cola específica.
    pub fn processing_samples_for_queue(&self, queue_id: &str) -> Vec<ProcessingSample> {
        self.processing_samples
            .read()
            .expect("LOCK_POISONED")
            .iter()
            .filter(|sample| sample.queue_id == queue_id)
            .cloned()
            .collect()
    }

    /// Materializa el resumen de sólo lectura del Panóptico.
    pub fn summary(&self) -> MetricsSummary {
        let totals = self.totals.read().expect("LOCK_POISONED").clone();

        let processing_guard = self.processing_samples.read().expect("LOCK_POISONED");
        let sample_count = processing_guard.len();
        let avg_processing_time_seconds = if sample_count == 0 {
            0.0
        } else {
            let total_ms: u64 = processing_guard.iter().map(|s| s.duration_ms).sum();
            (total_ms as f64 / sample_count as f64) / 1000.0
        };

        let recent_samples: Vec<ProcessingSample> = processing_guard
            .iter()
            .rev()
            .take(SUMMARY_RECENT_SAMPLES)
            .cloned()
            .collect();
        drop(processing_guard);

        // Tamaño vigente por cola: la muestra más reciente gana.
        let mut current_queue_sizes: HashMap<String, usize> = HashMap::new();
        {
            let length_guard = self.queue_length_samples.read().expect("LOCK_POISONED");
            for sample in length_guard.iter() {
                current_queue_sizes.insert(sample.queue_id.clone(), sample.length);
            }
        }

        let success_rate = if totals.entries_processed == 0 {
            0.0
        } else {
            totals.entries_completed as f64 / totals.entries_processed as f64
        };

        MetricsSummary {
            totals,
            success_rate,
            avg_processing_time_seconds,
            current_queue_sizes,
            recent_samples,
        }
    }
}

impl Default for MetricsManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}
