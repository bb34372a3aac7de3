// [libs/core/checks/src/forge_workflow.rs]
/*!
 * =================================================================
 * APARATO: FORGE WORKFLOW EXECUTOR
 * CLASIFICACIÓN: CORE EXECUTOR (ESTRATO L2)
 * RESPONSABILIDAD: DISPATCH Y SONDEO ADAPTATIVO DE RUNS DEL FORGE
 *
 * VISION:
 * 1. ADAPTIVE CADENCE: Intervalo inicial T durante los primeros 10
 *    intentos, 2T después; techo duro de intentos o deadline del
 *    check, lo que llegue primero.
 * 2. PLACEHOLDER TOLERANCE: El dispatch no devuelve run id; el run
 *    fantasma (id 0) se re-localiza durante los primeros ticks antes
 *    de declarar PollingTimeout.
 * 3. CONCLUSION MAP: success|neutral → passed; failure|action_required
 *    → failed; cancelled|skipped → cancelled; timed_out → timed_out;
 *    desconocida → failed preservando la conclusión cruda.
 * =================================================================
 */

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use imq_domain_models::{CheckSpec, CheckStatus};
use imq_infra_forge::{ForgeGateway, WorkflowRun};

use crate::errors::CheckError;
use crate::executor::{CheckContext, CheckExecutor, CheckResult};

/// Cadencia base de sondeo.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Intentos a cadencia base antes de duplicar el intervalo.
const DENSE_POLL_ATTEMPTS: u32 = 10;

/// Techo duro de intentos de sondeo.
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 60;

/// Ticks de tolerancia al run fantasma antes de declarar timeout.
const PLACEHOLDER_TOLERANCE_TICKS: u32 = 5;

/// Ejecutor de workflows del Forge vía dispatch + sondeo.
pub struct ForgeWorkflowExecutor {
    forge_gateway: Arc<ForgeGateway>,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

impl ForgeWorkflowExecutor {
    pub fn new(forge_gateway: Arc<ForgeGateway>) -> Self {
        Self {
            forge_gateway,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }

    /// Ajusta la cadencia de sondeo (reducible en pruebas).
    pub fn with_poll_cadence(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.poll_interval = interval;
        self.max_poll_attempts = max_attempts;
        self
    }

    fn resolve_workflow_file(spec: &CheckSpec) -> Result<String, CheckError> {
        spec.kind_config
            .get("workflow")
            .and_then(|value| value.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                CheckError::InvalidConfiguration(format!(
                    "check '{}' lacks kind_config.workflow",
                    spec.id
                ))
            })
    }

    /// Traduce la conclusión del Forge al veredicto del dominio.
    fn map_conclusion(raw_conclusion: Option<&str>) -> (CheckStatus, String) {
        match raw_conclusion {
            Some("success") | Some("neutral") => {
                (CheckStatus::Passed, "conclusion=success".to_string())
            }
            Some("failure") | Some("action_required") => (
                CheckStatus::Failed,
                format!("conclusion={}", raw_conclusion.unwrap_or("failure")),
            ),
            Some("cancelled") | Some("skipped") => (
                CheckStatus::Cancelled,
                format!("conclusion={}", raw_conclusion.unwrap_or("cancelled")),
            ),
            Some("timed_out") => (CheckStatus::TimedOut, "conclusion=timed_out".to_string()),
            other => (
                CheckStatus::Failed,
                format!("conclusion={}", other.unwrap_or("<missing>")),
            ),
        }
    }

    /// Cadencia adaptativa: T los primeros ticks densos, 2T después.
    fn interval_for_attempt(&self, attempt: u32) -> Duration {
        if attempt < DENSE_POLL_ATTEMPTS {
            self.poll_interval
        } else {
            self.poll_interval * 2
        }
    }
}

#[async_trait]
impl CheckExecutor for ForgeWorkflowExecutor {
    #[instrument(skip(self, spec, context), fields(check = %spec.id))]
    async fn execute(
        &self,
        spec: &CheckSpec,
        context: &CheckContext,
    ) -> Result<CheckResult, CheckError> {
        let workflow_file = Self::resolve_workflow_file(spec)?;
        let dispatch_inputs = spec
            .kind_config
            .get("inputs")
            .cloned()
            .unwrap_or_else(|| json!({}));

        let started_at = Utc::now();
        let dispatch_instant = started_at;

        let mut observed_run: WorkflowRun = self
            .forge_gateway
            .trigger_workflow(
                &context.repo_owner,
                &context.repo_name,
                &workflow_file,
                &context.head_branch,
                dispatch_inputs,
            )
            .await?;

        for poll_attempt in 0..self.max_poll_attempts {
            if observed_run.is_placeholder() {
                // El dispatch aún no materializó un run visible.
                if poll_attempt >= PLACEHOLDER_TOLERANCE_TICKS {
                    warn!(
                        "👻 [WORKFLOW]: Run for '{}' never became visible; declaring timeout.",
                        workflow_file
                    );
                    return Err(CheckError::PollingTimeout);
                }
                tokio::time::sleep(self.interval_for_attempt(poll_attempt)).await;
                observed_run = self
                    .forge_gateway
                    .locate_dispatched_run(
                        &context.repo_owner,
                        &context.repo_name,
                        &workflow_file,
                        &context.head_branch,
                        dispatch_instant,
                    )
                    .await?;
                continue;
            }

            if observed_run.is_completed() {
                let (verdict_status, verdict_output) =
                    Self::map_conclusion(observed_run.conclusion.as_deref());
                debug!(
                    "🏁 [WORKFLOW]: Run {} concluded as {:?}.",
                    observed_run.id, verdict_status
                );
                return Ok(CheckResult::sealed(
                    verdict_status,
                    format!("run_id={} {}", observed_run.id, verdict_output),
                    started_at,
                ));
            }

            tokio::time::sleep(self.interval_for_attempt(poll_attempt)).await;
            observed_run = self
                .forge_gateway
                .get_workflow_run(&context.repo_owner, &context.repo_name, observed_run.id)
                .await?;
        }

        Err(CheckError::PollingTimeout)
    }
}
