// [libs/domain/models/src/pull_request.rs]
/*!
 * =================================================================
 * APARATO: PULL REQUEST ENTITY CONTRACT
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: ESTADO OBSERVADO DE UN PR Y VALIDACIÓN DE SHA
 *
 * VISION:
 * 1. REFRESH SEMANTICS: 'head_sha' y los indicadores de conflicto se
 *    sincronizan en cada evento y al inicio de cada intento de
 *    procesamiento; el resto de campos son estables.
 * 2. SHA SOVEREIGNTY: Un SHA de commit válido es exactamente 40
 *    caracteres hexadecimales en minúscula. Nada más entra al Ledger.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longitud exacta de un SHA-1 de commit en representación hexadecimal.
const COMMIT_SHA_LENGTH: usize = 40;

/// Valida que un SHA de commit sea exactamente 40 hex minúsculas.
pub fn is_valid_commit_sha(candidate_sha: &str) -> bool {
    candidate_sha.len() == COMMIT_SHA_LENGTH
        && candidate_sha
            .bytes()
            .all(|byte| byte.is_ascii_digit() || (b'a'..=b'f').contains(&byte))
}

/// Pull Request observado desde el Forge.
///
/// Unicidad sobre `(repository_id, number)`. Nunca se destruye: se
/// retiene para auditoría incluso después de la fusión.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PullRequest {
    /// Identificador opaco (UUID v4) asignado por el coordinador.
    pub id: String,
    /// Repositorio propietario.
    pub repository_id: String,
    /// Número del PR en el Forge.
    pub number: u64,
    /// Título vigente.
    pub title: String,
    /// Autor (login del Forge).
    pub author: String,
    /// Rama destino de la fusión.
    pub base_branch: String,
    /// Rama de trabajo del PR.
    pub head_branch: String,
    /// SHA de la cabeza del PR (40 hex minúsculas). Muta en cada avance.
    pub head_sha: String,
    /// El Forge reporta conflictos de fusión contra la base.
    pub is_conflicted: bool,
    /// La cabeza contiene la punta actual de la base.
    pub is_up_to_date: bool,
    /// Primera observación.
    pub created_at: DateTime<Utc>,
    /// Última sincronización con el Forge.
    pub updated_at: DateTime<Utc>,
}

impl PullRequest {
    /// Forja la entidad en la primera observación del Forge.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repository_id: &str,
        number: u64,
        title: &str,
        author: &str,
        base_branch: &str,
        head_branch: &str,
        head_sha: &str,
    ) -> Self {
        let observation_instant = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            repository_id: repository_id.to_string(),
            number,
            title: title.to_string(),
            author: author.to_string(),
            base_branch: base_branch.to_string(),
            head_branch: head_branch.to_string(),
            head_sha: head_sha.to_string(),
            is_conflicted: false,
            is_up_to_date: false,
            created_at: observation_instant,
            updated_at: observation_instant,
        }
    }

    /// Produce el valor refrescado tras una sincronización con el Forge.
    pub fn refreshed(
        &self,
        title: &str,
        head_sha: &str,
        is_conflicted: bool,
        is_up_to_date: bool,
    ) -> Self {
        Self {
            title: title.to_string(),
            head_sha: head_sha.to_string(),
            is_conflicted,
            is_up_to_date,
            updated_at: Utc::now(),
            ..self.clone()
        }
    }
}
