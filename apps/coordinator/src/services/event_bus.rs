// [apps/coordinator/src/services/event_bus.rs]
/*!
 * =================================================================
 * APARATO: QUEUE EVENT BUS SERVICE
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: DIFUSIÓN DE SEÑALES DE ESTADO SIN BACK-PRESSURE
 *
 * VISION:
 * 1. LOSSY BY CONTRACT: Suscriptores lentos jamás frenan el motor; el
 *    canal descarta lo más viejo y marca el enlace como 'lossy'. El
 *    suscriptor resuelve re-sincronizando contra el snapshot REST.
 * 2. FILTER PREDICATES: La suscripción filtrada entrega sólo las
 *    señales que el predicado admite, preservando el orden de emisión.
 * =================================================================
 */

use tokio::sync::broadcast;
use tracing::{error, trace};

use imq_domain_models::{
    QueueEntry, QueueEvent, RemovalReason, SystemConfiguration,
};

/// Capacidad del canal de difusión por suscriptor.
const BROADCAST_CHANNEL_CAPACITY: usize = 1024;

/// Señal entregada a un suscriptor filtrado.
#[derive(Debug, Clone)]
pub enum SubscriberSignal {
    /// Señal de estado admitida por el predicado.
    Event(QueueEvent),
    /// El canal descartó `skipped` señales: re-sincronizar vía REST.
    Lossy(u64),
}

/// Suscripción con predicado sobre el bus de señales.
pub struct FilteredSubscriber {
    receiver: broadcast::Receiver<QueueEvent>,
    filter_predicate: Box<dyn Fn(&QueueEvent) -> bool + Send>,
}

impl FilteredSubscriber {
    /// Próxima señal admitida, marca de pérdida, o None al cerrar el bus.
    pub async fn next(&mut self) -> Option<SubscriberSignal> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if (self.filter_predicate)(&event) {
                        return Some(SubscriberSignal::Event(event));
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped_count)) => {
                    return Some(SubscriberSignal::Lossy(skipped_count));
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Orquestador central de señales de estado del motor de colas.
#[derive(Debug, Clone)]
pub struct EventBus {
    transmission_channel: broadcast::Sender<QueueEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CHANNEL_CAPACITY);
        Self {
            transmission_channel: sender,
        }
    }

    /// Receptor crudo del bus (el adaptador WebSocket lo consume).
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.transmission_channel.subscribe()
    }

    /// Suscripción con predicado de admisión.
    pub fn subscribe_filtered<F>(&self, filter_predicate: F) -> FilteredSubscriber
    where
        F: Fn(&QueueEvent) -> bool + Send + 'static,
    {
        FilteredSubscriber {
            receiver: self.transmission_channel.subscribe(),
            filter_predicate: Box::new(filter_predicate),
        }
    }

    // --- ESTRATO DE EMISIÓN ---

    pub fn emit_entry_added(&self, queue_id: &str, entry: QueueEntry, pr_number: u64) {
        self.dispatch(QueueEvent::EntryAdded {
            queue_id: queue_id.to_string(),
            entry,
            pr_number,
        });
    }

    pub fn emit_entry_removed(&self, queue_id: &str, entry_id: &str, reason: RemovalReason) {
        self.dispatch(QueueEvent::EntryRemoved {
            queue_id: queue_id.to_string(),
            entry_id: entry_id.to_string(),
            reason,
        });
    }

    pub fn emit_entry_status_changed(&self, queue_id: &str, entry: QueueEntry) {
        self.dispatch(QueueEvent::EntryStatusChanged {
            queue_id: queue_id.to_string(),
            entry,
        });
    }

    pub fn emit_config_updated(&self, configuration: SystemConfiguration) {
        self.dispatch(QueueEvent::ConfigUpdated { configuration });
    }

    // --- ESTRATO DE DESPACHO INTERNO ---

    fn dispatch(&self, event: QueueEvent) {
        match self.transmission_channel.send(event) {
            Ok(subscriber_count) => {
                if subscriber_count == 0 {
                    // Silencio nominal: sin operadores observando.
                    trace!("💤 [EVENT_BUS]: Signal discarded; no active links.");
                } else {
                    trace!(
                        "📡 [EVENT_BUS]: Signal broadcasted to {} active links.",
                        subscriber_count
                    );
                }
            }
            Err(_) => {
                error!("💀 [EVENT_BUS_FATAL]: Transmission channel collapsed.");
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
