// [libs/domain/models/src/events.rs]
/*!
 * =================================================================
 * APARATO: EVENT CONTRACTS (INGRESS & BROADCAST)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: NORMALIZACIÓN DE EVENTOS DEL FORGE Y SEÑALES DE UI
 *
 * VISION:
 * 1. DUAL SOURCE, ONE SHAPE: Webhooks y polling convergen en el mismo
 *    'NormalizedEvent'; el motor de colas es idempotente frente a
 *    duplicados de ambas fuentes.
 * 2. WIRE PARITY: 'QueueEventFrame' es el único contrato del túnel
 *    WebSocket: {type, payload, timestamp} con tipos estables.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::configuration::SystemConfiguration;
use crate::queue::QueueEntry;

/// Clase de evento de ciclo de vida de un PR, ya normalizada.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    LabelAdded,
    LabelRemoved,
    PrUpdated,
    PrClosed,
}

/// Evento normalizado que alimenta el motor de colas.
///
/// Producido por ambas fuentes de ingreso (webhook HMAC y polling del
/// feed de eventos); los duplicados se fusionan en la admisión.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizedEvent {
    pub kind: EventKind,
    /// Identidad canónica `owner/name` del repositorio origen.
    pub repository_full_name: String,
    pub pr_number: u64,
    /// SHA de cabeza si la fuente lo transporta.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_sha: Option<String>,
    /// Nombre de la etiqueta para eventos de etiquetado; el motor ignora
    /// etiquetas distintas de la disparadora.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Motivo de remoción de una entrada, transportado en la señal de UI.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    Completed,
    Failed,
    Cancelled,
    LabelRemoved,
    PrClosed,
    Administrative,
}

/// Señal de cambio de estado difundida por el bus interno.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum QueueEvent {
    /// Una entrada fue admitida al final de su cola.
    EntryAdded {
        queue_id: String,
        entry: QueueEntry,
        pr_number: u64,
    },
    /// Una entrada abandonó el orden vivo de su cola.
    EntryRemoved {
        queue_id: String,
        entry_id: String,
        reason: RemovalReason,
    },
    /// Una entrada transicionó de estado (incluye el arranque del pipeline).
    EntryStatusChanged {
        queue_id: String,
        entry: QueueEntry,
    },
    /// La configuración de fila única fue reemplazada.
    ConfigUpdated {
        configuration: SystemConfiguration,
    },
}

impl QueueEvent {
    /// Tipo estable del contrato WebSocket.
    pub fn frame_type(&self) -> &'static str {
        match self {
            Self::EntryAdded { .. } => "queue.entry.added",
            Self::EntryRemoved { .. } => "queue.entry.removed",
            Self::EntryStatusChanged { .. } => "queue.entry.status_changed",
            Self::ConfigUpdated { .. } => "config.updated",
        }
    }

    /// Cola afectada por la señal, si aplica (filtros de suscripción).
    pub fn queue_id(&self) -> Option<&str> {
        match self {
            Self::EntryAdded { queue_id, .. }
            | Self::EntryRemoved { queue_id, .. }
            | Self::EntryStatusChanged { queue_id, .. } => Some(queue_id),
            Self::ConfigUpdated { .. } => None,
        }
    }

    /// Renderiza el frame de transporte del túnel WebSocket.
    pub fn to_frame(&self) -> QueueEventFrame {
        QueueEventFrame {
            frame_type: self.frame_type().to_string(),
            payload: serde_json::to_value(self).unwrap_or(serde_json::Value::Null),
            timestamp: Utc::now(),
        }
    }
}

/// Mensaje del túnel `WS /ws/events`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueEventFrame {
    #[serde(rename = "type")]
    pub frame_type: String,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}
