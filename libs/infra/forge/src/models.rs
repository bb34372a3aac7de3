// [libs/infra/forge/src/models.rs]
/*!
 * =================================================================
 * APARATO: FORGE WIRE CONTRACTS (DTOs)
 * CLASIFICACIÓN: INFRASTRUCTURE LIB (ESTRATO L3)
 * RESPONSABILIDAD: DESERIALIZACIÓN FIEL DEL PROTOCOLO DEL FORGE
 *
 * VISION:
 * 1. WIRE FIDELITY: Los DTOs calcan el JSON del Forge (snake_case,
 *    opcionales reales); la traducción al dominio ocurre en el motor,
 *    nunca aquí.
 * 2. PLACEHOLDER TOLERANCE: 'WorkflowRun::placeholder' modela la
 *    ventana en la que el dispatch aún no materializó un run visible.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use imq_domain_models::MergeMethod;

/// Actor del Forge (autor de un PR).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ActorRef {
    pub login: String,
}

/// Etiqueta adherida a un PR.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelRef {
    pub name: String,
}

/// Repositorio embebido en una referencia de rama.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RepoRef {
    pub full_name: String,
    #[serde(default)]
    pub default_branch: String,
}

/// Referencia de rama (base o head) de un PR.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchRef {
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub sha: String,
    #[serde(default)]
    pub repo: Option<RepoRef>,
}

/// Vista del Forge de un Pull Request (GET pulls/{number}).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestView {
    pub number: u64,
    pub title: String,
    /// `open` o `closed`.
    pub state: String,
    #[serde(default)]
    pub merged: bool,
    /// El Forge computa la fusionabilidad de forma perezosa: None
    /// significa "aún calculando", no "sin conflicto".
    #[serde(default)]
    pub mergeable: Option<bool>,
    #[serde(default)]
    pub mergeable_state: Option<String>,
    #[serde(default)]
    pub user: ActorRef,
    #[serde(default)]
    pub labels: Vec<LabelRef>,
    pub base: BranchRef,
    pub head: BranchRef,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PullRequestView {
    pub fn is_open(&self) -> bool {
        self.state == "open"
    }

    pub fn has_label(&self, label_name: &str) -> bool {
        self.labels.iter().any(|label| label.name == label_name)
    }

    /// El estado 'dirty' del Forge señala conflicto contra la base.
    pub fn is_conflicted(&self) -> bool {
        self.mergeable == Some(false)
            || self.mergeable_state.as_deref() == Some("dirty")
    }
}

/// Resultado de la orden de actualización de rama (PUT update-branch).
///
/// El Forge responde 202 con la actualización en vuelo; el SHA
/// autoritativo sólo existe tras re-consultar el PR.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchUpdate {
    pub message: String,
    /// SHA de cabeza posterior a la actualización; lo completa el
    /// llamador tras el re-fetch del PR, nunca el parseo del mensaje.
    #[serde(default)]
    pub head_sha: Option<String>,
}

/// Comparación de commits base...head.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitComparison {
    /// `ahead`, `behind`, `identical` o `diverged`.
    pub status: String,
    pub ahead_by: u64,
    pub behind_by: u64,
}

/// Run de workflow del Forge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,
    /// `queued`, `in_progress`, `completed`.
    pub status: String,
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub head_branch: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl WorkflowRun {
    /// Run fantasma tolerado mientras el dispatch materializa el run real.
    pub fn placeholder() -> Self {
        Self {
            id: 0,
            status: "queued".to_string(),
            conclusion: None,
            head_branch: None,
            created_at: None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.id == 0
    }

    pub fn is_completed(&self) -> bool {
        self.status == "completed"
    }
}

/// Página de runs devuelta por el listado filtrado.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRunPage {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub workflow_runs: Vec<WorkflowRun>,
}

/// Opciones de la operación de fusión.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MergeOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub method: MergeMethod,
}

/// Veredicto de la operación de fusión.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeOutcome {
    #[serde(default)]
    pub sha: Option<String>,
    #[serde(default)]
    pub merged: bool,
    #[serde(default)]
    pub message: String,
}

/// Evento crudo del feed de eventos del repositorio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Página del feed de eventos con el cursor de deduplicación.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryEventPage {
    pub events: Vec<RepositoryEvent>,
    /// Identificador del evento más reciente (cursor persistible).
    pub latest_event_id: Option<String>,
}
