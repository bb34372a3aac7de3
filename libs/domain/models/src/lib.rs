// [libs/domain/models/src/lib.rs]
/*!
 * =================================================================
 * APARATO: DOMAIN MODELS ROOT (SSoT)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: AUTORIDAD ÚNICA DE CONTRATOS DEL DOMINIO
 *
 * VISION:
 * 1. VALUE SEMANTICS: Toda entidad es un valor serializable; la
 *    mutación produce un valor nuevo que se persiste vía repositorio.
 * 2. SNAKE_CASE WIRE: Contrato serde uniforme en todo el perímetro
 *    (REST, WebSocket, persistencia JSON).
 * =================================================================
 */

pub mod check;
pub mod configuration;
pub mod events;
pub mod pull_request;
pub mod queue;
pub mod repository;

pub use check::{
    Check, CheckConfiguration, CheckConfigurationError, CheckKind, CheckSpec, CheckStatus,
};
pub use configuration::{MergeMethod, NotificationTemplates, SystemConfiguration};
pub use events::{EventKind, NormalizedEvent, QueueEvent, QueueEventFrame, RemovalReason};
pub use pull_request::{is_valid_commit_sha, PullRequest};
pub use queue::{EntryStatus, Queue, QueueEntry};
pub use repository::Repository;

#[cfg(test)]
mod tests_serialization;
