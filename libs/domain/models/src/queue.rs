// [libs/domain/models/src/queue.rs]
/*!
 * =================================================================
 * APARATO: QUEUE & ENTRY CONTRACTS
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: ORDEN FIFO POR RAMA Y MÁQUINA DE ESTADOS DE ENTRADA
 *
 * VISION:
 * 1. DENSE ORDERING: Las posiciones vivas de una cola forman
 *    exactamente {0..n-1}; toda remoción re-densifica.
 * 2. STATE MACHINE DETERMINISM: Las transiciones de estado de una
 *    entrada siguen el DAG pending → running → {completed, failed,
 *    cancelled} sin aristas de retorno. El predicado 'can_transition'
 *    es la única autoridad de legalidad.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Cola de fusión por rama destino. Unicidad sobre
/// `(repository_id, base_branch)`; se crea perezosamente con la
/// primera entrada y no se destruye mientras el repo esté vigilado.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Queue {
    /// Identificador opaco (UUID v4).
    pub id: String,
    /// Repositorio referenciado (no poseído).
    pub repository_id: String,
    /// Rama destino que esta cola serializa.
    pub base_branch: String,
    /// Instante de creación perezosa.
    pub created_at: DateTime<Utc>,
}

impl Queue {
    pub fn new(repository_id: &str, base_branch: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            repository_id: repository_id.to_string(),
            base_branch: base_branch.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Estados del ciclo de vida de una entrada de cola.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// En espera de su turno en la cola.
    Pending,
    /// Pipeline en ejecución. A lo sumo una por cola, siempre en posición 0.
    Running,
    /// Fusión completada; la entrada abandona el orden vivo.
    Completed,
    /// Pipeline fallido; la entrada abandona el orden vivo.
    Failed,
    /// Retirada por mando administrativo o por el propio PR.
    Cancelled,
}

impl EntryStatus {
    /// Un estado terminal expulsa la entrada del orden vivo de la cola.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Predicado de legalidad de transición (DAG sin retornos).
    pub fn can_transition(&self, target: EntryStatus) -> bool {
        match (self, target) {
            (Self::Pending, Self::Running) => true,
            (Self::Pending, Self::Cancelled) => true,
            (Self::Running, Self::Completed) => true,
            (Self::Running, Self::Failed) => true,
            (Self::Running, Self::Cancelled) => true,
            // Recuperación de arranque: una entrada 'running' huérfana de un
            // proceso anterior regresa al frente como 'pending'.
            (Self::Running, Self::Pending) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Presencia de un PR dentro de una cola, con posición y estado.
///
/// La entrada referencia (no posee) su PullRequest: removerla nunca
/// destruye el PR, que se retiene para auditoría.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueEntry {
    /// Identificador opaco (UUID v4).
    pub id: String,
    /// Cola propietaria.
    pub queue_id: String,
    /// Pull Request referenciado en exclusiva.
    pub pull_request_id: String,
    /// Posición densa 0..n-1, consistente con el orden de admisión.
    pub position: u32,
    /// Estado vigente de la máquina de estados.
    pub status: EntryStatus,
    /// Instante de admisión a la cola.
    pub enqueued_at: DateTime<Utc>,
    /// Instante de arranque del pipeline (transición a running).
    pub started_at: Option<DateTime<Utc>>,
    /// Instante de llegada a un estado terminal.
    pub completed_at: Option<DateTime<Utc>>,
}

impl QueueEntry {
    /// Forja una entrada pendiente en la cola indicada.
    pub fn new(queue_id: &str, pull_request_id: &str, position: u32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            queue_id: queue_id.to_string(),
            pull_request_id: pull_request_id.to_string(),
            position,
            status: EntryStatus::Pending,
            enqueued_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }
}
