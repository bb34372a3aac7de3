// [libs/core/checks/src/engine.rs]
/*!
 * =================================================================
 * APARATO: CHECK EXECUTION ENGINE
 * CLASIFICACIÓN: CORE ENGINE (ESTRATO L2)
 * RESPONSABILIDAD: DESPLIEGUE ACOTADO DE LA SUITE CON FAIL-FAST
 *
 * VISION:
 * 1. BOUNDED FAN-OUT: A lo sumo 'max_concurrent' ejecuciones vivas
 *    bajo un semáforo cooperativo; el resto espera su permiso.
 * 2. DEPENDENCY GATES: Un check entra al conjunto listo sólo cuando
 *    todas sus dependencias concluyeron 'passed'; dependencias caídas
 *    degradan a 'cancelled' sin ejecutar.
 * 3. FAIL-FAST SCYTHE: El primer veredicto terminal no-passed aborta
 *    a los pares en vuelo y cancela a los que nunca arrancaron; el
 *    motor retorna temprano con el subconjunto completado.
 * 4. DEADLINE ENVELOPE: Cada ejecución viaja dentro de su deadline;
 *    el vencimiento produce 'timed_out' como veredicto, no como error.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use imq_domain_models::{CheckConfiguration, CheckKind, CheckSpec, CheckStatus};

use crate::cache::{ShaResultCache, DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL};
use crate::errors::CheckError;
use crate::executor::{CheckContext, CheckExecutor, CheckResult};

/// Concurrencia por defecto del despliegue.
pub const DEFAULT_MAX_CONCURRENT: usize = 5;

/// Deadline por defecto de un check individual.
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(600);

/// Configuración de ignición del motor.
#[derive(Debug, Clone)]
pub struct CheckEngineConfig {
    pub max_concurrent: usize,
    pub default_check_timeout: Duration,
    pub cache_time_to_live: Duration,
    pub cache_capacity: usize,
}

impl Default for CheckEngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            default_check_timeout: DEFAULT_CHECK_TIMEOUT,
            cache_time_to_live: DEFAULT_CACHE_TTL,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// Veredicto individual dentro del resultado de la suite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub check_id: String,
    pub name: String,
    pub status: CheckStatus,
    pub output: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl CheckOutcome {
    fn from_result(spec: &CheckSpec, result: CheckResult) -> Self {
        Self {
            check_id: spec.id.clone(),
            name: spec.name.clone(),
            status: result.status,
            output: result.output,
            started_at: result.started_at,
            completed_at: result.completed_at,
            duration_ms: result.duration.as_millis() as u64,
        }
    }

    /// Veredicto sintético para checks que nunca llegaron a ejecutar.
    fn synthesized(spec: &CheckSpec, status: CheckStatus, output: &str) -> Self {
        let sealing_instant = Utc::now();
        Self {
            check_id: spec.id.clone(),
            name: spec.name.clone(),
            status,
            output: output.to_string(),
            started_at: sealing_instant,
            completed_at: sealing_instant,
            duration_ms: 0,
        }
    }
}

/// Resultado agregado de la suite.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CheckExecutionResult {
    pub results: Vec<CheckOutcome>,
    pub all_passed: bool,
    /// Nombres de los checks con veredicto terminal no-passed.
    pub failed_checks: Vec<String>,
}

/// Motor de ejecución de suites de checks.
pub struct CheckEngine {
    executors: HashMap<CheckKind, Arc<dyn CheckExecutor>>,
    sha_result_cache: ShaResultCache,
    concurrency_semaphore: Arc<Semaphore>,
    default_check_timeout: Duration,
}

impl CheckEngine {
    pub fn new(
        configuration: CheckEngineConfig,
        executors: HashMap<CheckKind, Arc<dyn CheckExecutor>>,
    ) -> Self {
        Self {
            executors,
            sha_result_cache: ShaResultCache::new(
                configuration.cache_time_to_live,
                configuration.cache_capacity,
            ),
            concurrency_semaphore: Arc::new(Semaphore::new(configuration.max_concurrent.max(1))),
            default_check_timeout: configuration.default_check_timeout,
        }
    }

    /// Acceso al caché de veredictos (invalidación ante cambios de suite).
    pub fn cache(&self) -> &ShaResultCache {
        &self.sha_result_cache
    }

    /// Despliega la suite configurada para las coordenadas del PR.
    ///
    /// # Errors:
    /// Sólo ante configuración ilegal o ejecutor ausente; los fallos de
    /// checks individuales son veredictos dentro del resultado.
    #[instrument(skip(self, configuration, context), fields(head_sha = %context.head_sha))]
    pub async fn execute_suite(
        &self,
        configuration: &CheckConfiguration,
        context: &CheckContext,
    ) -> Result<CheckExecutionResult, CheckError> {
        configuration
            .validate()
            .map_err(|fault| CheckError::InvalidConfiguration(fault.to_string()))?;

        if configuration.is_empty() {
            return Ok(CheckExecutionResult {
                results: vec![],
                all_passed: true,
                failed_checks: vec![],
            });
        }

        // 1. MEMOIZACIÓN: una cabeza inmutable implica un veredicto inmutable.
        if let Some(memoized_verdict) = self.sha_result_cache.lookup(&context.head_sha) {
            info!(
                "♻️ [ENGINE]: Suite verdict for {} served from SHA cache.",
                context.head_sha
            );
            return Ok(memoized_verdict);
        }

        // Guardia temprana: todo kind debe tener ejecutor registrado.
        for spec in &configuration.checks {
            if !self.executors.contains_key(&spec.kind) {
                return Err(CheckError::InvalidConfiguration(format!(
                    "no executor registered for kind '{}'",
                    spec.kind.as_str()
                )));
            }
        }

        let suite_verdict = self.drive_suite(configuration, context).await;

        // 2. MEMO STORE: el veredicto (éxito o fallo) queda sellado por SHA.
        self.sha_result_cache
            .store(&context.head_sha, suite_verdict.clone());

        Ok(suite_verdict)
    }

    /// Bucle de admisión y recolección de la suite.
    async fn drive_suite(
        &self,
        configuration: &CheckConfiguration,
        context: &CheckContext,
    ) -> CheckExecutionResult {
        let specs_by_id: HashMap<&str, &CheckSpec> = configuration
            .checks
            .iter()
            .map(|spec| (spec.id.as_str(), spec))
            .collect();

        let mut statuses: HashMap<String, CheckStatus> = configuration
            .checks
            .iter()
            .map(|spec| (spec.id.clone(), CheckStatus::Pending))
            .collect();
        let mut outcomes: HashMap<String, CheckOutcome> = HashMap::new();
        let mut in_flight: HashSet<String> = HashSet::new();
        let mut execution_pool: JoinSet<(String, Result<CheckResult, CheckError>)> = JoinSet::new();
        let mut fail_fast_tripped = false;

        loop {
            // --- FASE DE ADMISIÓN: compuertas de dependencia ---
            if !fail_fast_tripped {
                for spec in &configuration.checks {
                    let is_pending = statuses.get(&spec.id) == Some(&CheckStatus::Pending);
                    if !is_pending || in_flight.contains(&spec.id) {
                        continue;
                    }

                    let gates_open = spec.dependencies.iter().all(|dependency_id| {
                        statuses.get(dependency_id) == Some(&CheckStatus::Passed)
                    });
                    let gates_burned = spec.dependencies.iter().any(|dependency_id| {
                        statuses
                            .get(dependency_id)
                            .map(|status| status.is_terminal() && *status != CheckStatus::Passed)
                            .unwrap_or(false)
                    });

                    if gates_burned {
                        // Dependencia caída: degradación sin ejecución.
                        statuses.insert(spec.id.clone(), CheckStatus::Cancelled);
                        outcomes.insert(
                            spec.id.clone(),
                            CheckOutcome::synthesized(
                                spec,
                                CheckStatus::Cancelled,
                                "dependency did not pass",
                            ),
                        );
                        continue;
                    }

                    if gates_open {
                        statuses.insert(spec.id.clone(), CheckStatus::Running);
                        in_flight.insert(spec.id.clone());
                        self.admit_execution(&mut execution_pool, spec, context);
                    }
                }
            }

            if in_flight.is_empty() {
                break;
            }

            // --- FASE DE RECOLECCIÓN ---
            let Some(joined) = execution_pool.join_next().await else {
                break;
            };

            match joined {
                Ok((check_id, execution_verdict)) => {
                    in_flight.remove(&check_id);
                    let spec = specs_by_id
                        .get(check_id.as_str())
                        .expect("INVARIANT: joined check belongs to the suite");

                    let outcome = match execution_verdict {
                        Ok(result) => CheckOutcome::from_result(spec, result),
                        Err(CheckError::PollingTimeout) => CheckOutcome::synthesized(
                            spec,
                            CheckStatus::TimedOut,
                            "polling budget exhausted",
                        ),
                        Err(infrastructure_fault) => CheckOutcome::synthesized(
                            spec,
                            CheckStatus::Failed,
                            &infrastructure_fault.to_string(),
                        ),
                    };

                    let terminal_status = outcome.status;
                    statuses.insert(check_id.clone(), terminal_status);
                    outcomes.insert(check_id.clone(), outcome);

                    if configuration.fail_fast && terminal_status != CheckStatus::Passed {
                        warn!(
                            "⚡ [ENGINE]: Fail-fast tripped by '{}' ({:?}); reaping peers.",
                            check_id, terminal_status
                        );
                        fail_fast_tripped = true;
                        execution_pool.abort_all();

                        // Drenaje: veredictos ya sellados se respetan; los
                        // abortados degradan a 'cancelled'.
                        while let Some(drained) = execution_pool.join_next().await {
                            if let Ok((drained_id, Ok(result))) = drained {
                                let drained_spec = specs_by_id
                                    .get(drained_id.as_str())
                                    .expect("INVARIANT: drained check belongs to the suite");
                                statuses.insert(drained_id.clone(), result.status);
                                outcomes.insert(
                                    drained_id.clone(),
                                    CheckOutcome::from_result(drained_spec, result),
                                );
                            }
                        }
                        in_flight.clear();
                        break;
                    }
                }
                // Tarea abortada o colapsada: degradación en el sellado final.
                Err(_) => continue,
            }
        }

        // --- SELLADO: todo check sin veredicto degrada a 'cancelled' ---
        let mut ordered_results = Vec::with_capacity(configuration.checks.len());
        let mut failed_check_names = Vec::new();

        for spec in &configuration.checks {
            let outcome = outcomes.remove(&spec.id).unwrap_or_else(|| {
                CheckOutcome::synthesized(spec, CheckStatus::Cancelled, "suite terminated early")
            });

            if outcome.status.is_terminal() && outcome.status != CheckStatus::Passed {
                failed_check_names.push(spec.name.clone());
            }
            ordered_results.push(outcome);
        }

        let all_passed = ordered_results
            .iter()
            .all(|outcome| outcome.status == CheckStatus::Passed);

        debug!(
            "🏁 [ENGINE]: Suite sealed (all_passed={}, failed={:?}).",
            all_passed, failed_check_names
        );

        CheckExecutionResult {
            results: ordered_results,
            all_passed,
            failed_checks: failed_check_names,
        }
    }

    /// Lanza una ejecución individual bajo semáforo y deadline.
    fn admit_execution(
        &self,
        execution_pool: &mut JoinSet<(String, Result<CheckResult, CheckError>)>,
        spec: &CheckSpec,
        context: &CheckContext,
    ) {
        let executor = Arc::clone(
            self.executors
                .get(&spec.kind)
                .expect("INVARIANT: executor presence verified at suite entry"),
        );
        let semaphore = Arc::clone(&self.concurrency_semaphore);
        let check_deadline = spec
            .timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(self.default_check_timeout);
        let spec_snapshot = spec.clone();
        let context_snapshot = context.clone();

        execution_pool.spawn(async move {
            let check_id = spec_snapshot.id.clone();

            let _concurrency_permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    return (
                        check_id,
                        Err(CheckError::ProcessExecutionFailed(
                            "concurrency semaphore closed".to_string(),
                        )),
                    )
                }
            };

            let execution_start = Utc::now();
            let verdict = match tokio::time::timeout(
                check_deadline,
                executor.execute(&spec_snapshot, &context_snapshot),
            )
            .await
            {
                Ok(executed) => executed,
                // Deadline vencido: veredicto, no error.
                Err(_) => Ok(CheckResult::sealed(
                    CheckStatus::TimedOut,
                    format!(
                        "check exceeded its {} second deadline",
                        check_deadline.as_secs()
                    ),
                    execution_start,
                )),
            };

            (check_id, verdict)
        });
    }
}
