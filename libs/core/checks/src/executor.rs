// [libs/core/checks/src/executor.rs]
/*!
 * =================================================================
 * APARATO: CHECK EXECUTOR CONTRACT
 * CLASIFICACIÓN: CORE LIB (ESTRATO L2)
 * RESPONSABILIDAD: CONTRATO POLIMÓRFICO DE EJECUCIÓN DE UN CHECK
 * =================================================================
 */

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use imq_domain_models::{CheckSpec, CheckStatus};

use crate::errors::CheckError;

/// Coordenadas del PR bajo verificación, inyectadas a cada ejecutor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckContext {
    pub pr_number: u64,
    pub head_sha: String,
    pub base_branch: String,
    pub head_branch: String,
    pub repo_owner: String,
    pub repo_name: String,
}

/// Veredicto de la ejecución de un check individual.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub status: CheckStatus,
    /// Salida capturada (stdout/stderr recortados o conclusión del run).
    pub output: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// Duración efectiva de la ejecución.
    pub duration: Duration,
}

impl CheckResult {
    /// Sella un veredicto con los instantes y la duración derivada.
    pub fn sealed(status: CheckStatus, output: String, started_at: DateTime<Utc>) -> Self {
        let completed_at = Utc::now();
        let duration = (completed_at - started_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        Self {
            status,
            output,
            started_at,
            completed_at,
            duration,
        }
    }
}

/// Contrato único de ejecución que ambos ejecutores materializan.
#[async_trait]
pub trait CheckExecutor: Send + Sync {
    /// Ejecuta el check descrito por `spec` sobre las coordenadas `context`.
    ///
    /// # Errors:
    /// Sólo fallos de infraestructura o configuración; un check que
    /// simplemente falla devuelve `Ok` con estado `Failed`.
    async fn execute(
        &self,
        spec: &CheckSpec,
        context: &CheckContext,
    ) -> Result<CheckResult, CheckError>;
}
