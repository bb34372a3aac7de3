// [apps/coordinator/src/state/driver_registry.rs]
/*!
 * =================================================================
 * APARATO: QUEUE DRIVER REGISTRY
 * CLASIFICACIÓN: APPLICATION STATE (ESTRATO L3)
 * RESPONSABILIDAD: RASTRO DE DRIVERS VIVOS, DESPERTAR Y CANCELACIÓN
 *
 * VISION:
 * 1. ONE DRIVER PER QUEUE: El registro garantiza a lo sumo un driver
 *    vivo por cola; los despertares y cancelaciones viajan por su
 *    handle, nunca por estado global.
 * 2. GRACEFUL REAPING: El apagado ordenado propaga la señal, espera la
 *    gracia configurada y aborta lo que siga vivo, contando las
 *    tareas segadas para el registro de 'forced_shutdown'.
 * =================================================================
 */

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Compuerta de cancelación de la entrada en vuelo de un driver.
pub struct CancellationGate {
    requested_entry: Mutex<Option<String>>,
    signal: Notify,
}

impl CancellationGate {
    pub fn new() -> Self {
        Self {
            requested_entry: Mutex::new(None),
            signal: Notify::new(),
        }
    }

    /// Solicita la cancelación de la entrada indicada.
    pub fn request(&self, entry_id: &str) {
        {
            let mut requested_guard = self.requested_entry.lock().expect("LOCK_POISONED");
            *requested_guard = Some(entry_id.to_string());
        }
        self.signal.notify_waiters();
    }

    /// ¿Hay una solicitud vigente para esta entrada?
    pub fn is_requested_for(&self, entry_id: &str) -> bool {
        self.requested_entry
            .lock()
            .expect("LOCK_POISONED")
            .as_deref()
            == Some(entry_id)
    }

    /// Consume la solicitud vigente si apunta a esta entrada.
    pub fn acknowledge(&self, entry_id: &str) -> bool {
        let mut requested_guard = self.requested_entry.lock().expect("LOCK_POISONED");
        if requested_guard.as_deref() == Some(entry_id) {
            *requested_guard = None;
            true
        } else {
            false
        }
    }

    /// Se resuelve cuando existe una solicitud para la entrada.
    /// Cancelable en cualquier punto de suspensión vía select!.
    pub async fn engaged(&self, entry_id: &str) {
        loop {
            let notified = self.signal.notified();
            if self.is_requested_for(entry_id) {
                return;
            }
            notified.await;
        }
    }
}

impl Default for CancellationGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle de mando de un driver vivo.
pub struct DriverHandle {
    pub wake_signal: Arc<Notify>,
    pub cancellation_gate: Arc<CancellationGate>,
    join_handle: JoinHandle<()>,
}

impl DriverHandle {
    pub fn new(
        wake_signal: Arc<Notify>,
        cancellation_gate: Arc<CancellationGate>,
        join_handle: JoinHandle<()>,
    ) -> Self {
        Self {
            wake_signal,
            cancellation_gate,
            join_handle,
        }
    }
}

/// Registro de drivers por cola con apagado ordenado.
pub struct DriverRegistry {
    drivers: Mutex<HashMap<String, DriverHandle>>,
    shutdown_channel: watch::Sender<bool>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        let (shutdown_sender, _) = watch::channel(false);
        Self {
            drivers: Mutex::new(HashMap::new()),
            shutdown_channel: shutdown_sender,
        }
    }

    /// Receptor de la señal de apagado (uno por daemon).
    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown_channel.subscribe()
    }

    /// ¿El apagado ordenado ya fue ordenado?
    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown_channel.borrow()
    }

    pub fn contains(&self, queue_id: &str) -> bool {
        self.drivers
            .lock()
            .expect("LOCK_POISONED")
            .contains_key(queue_id)
    }

    /// Registra el handle del driver recién lanzado.
    pub fn register(&self, queue_id: &str, handle: DriverHandle) {
        let mut drivers_guard = self.drivers.lock().expect("LOCK_POISONED");
        if drivers_guard.insert(queue_id.to_string(), handle).is_some() {
            warn!("⚠️ [DRIVERS]: Driver for queue {} replaced.", queue_id);
        } else {
            debug!("🧵 [DRIVERS]: Driver for queue {} registered.", queue_id);
        }
    }

    /// Despierta al driver de la cola (nueva entrada admitida).
    pub fn wake(&self, queue_id: &str) {
        if let Some(handle) = self.drivers.lock().expect("LOCK_POISONED").get(queue_id) {
            handle.wake_signal.notify_one();
        }
    }

    /// Solicita la cancelación de la entrada en vuelo de la cola.
    pub fn request_cancellation(&self, queue_id: &str, entry_id: &str) {
        if let Some(handle) = self.drivers.lock().expect("LOCK_POISONED").get(queue_id) {
            info!(
                "✋ [DRIVERS]: Cancellation requested for entry {} (queue {}).",
                entry_id, queue_id
            );
            handle.cancellation_gate.request(entry_id);
        }
    }

    /// Retira y aborta el driver de una cola eliminada.
    pub fn remove(&self, queue_id: &str) {
        if let Some(handle) = self
            .drivers
            .lock()
            .expect("LOCK_POISONED")
            .remove(queue_id)
        {
            handle.join_handle.abort();
            debug!("💀 [DRIVERS]: Driver for queue {} reaped.", queue_id);
        }
    }

    /// Apagado ordenado: señal global, espera de gracia, siega final.
    /// Devuelve el número de tareas abortadas a la fuerza.
    pub async fn shutdown_all(&self, grace: Duration) -> u64 {
        let _ = self.shutdown_channel.send(true);

        let drained_handles: Vec<(String, DriverHandle)> = {
            let mut drivers_guard = self.drivers.lock().expect("LOCK_POISONED");
            drivers_guard.drain().collect()
        };

        // Despertar a todos para que observen la señal de apagado.
        for (_, handle) in &drained_handles {
            handle.wake_signal.notify_one();
        }

        let grace_deadline = Instant::now() + grace;
        let mut forced_abort_count: u64 = 0;

        for (queue_id, handle) in drained_handles {
            let remaining_grace = grace_deadline.saturating_duration_since(Instant::now());
            let abort_handle = handle.join_handle.abort_handle();
            match tokio::time::timeout(remaining_grace, handle.join_handle).await {
                Ok(_) => debug!("🏁 [DRIVERS]: Driver {} drained gracefully.", queue_id),
                Err(_) => {
                    warn!("💀 [DRIVERS]: Driver {} exceeded grace; aborted.", queue_id);
                    abort_handle.abort();
                    forced_abort_count += 1;
                }
            }
        }

        forced_abort_count
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}
