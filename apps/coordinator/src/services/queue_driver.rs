// [apps/coordinator/src/services/queue_driver.rs]
/*!
 * =================================================================
 * APARATO: QUEUE DRIVER (PIPELINE SERIAL POR RAMA)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: PROCESAMIENTO ESTRICTAMENTE SERIAL DE UNA COLA
 *
 * VISION:
 * 1. SERIAL PER QUEUE: Un driver por cola; dentro de la cola jamás
 *    existe más de una entrada 'running', y siempre en posición 0.
 *    Drivers de colas distintas corren en paralelo.
 * 2. CANCELLABLE AT EVERY AWAIT: Toda suspensión del pipeline viaja
 *    bajo select! contra la compuerta de cancelación; remover una
 *    entrada en vuelo no espera a un sondeo de workflow.
 * 3. MERGE INDETERMINACY: Una cancelación que cruza el acuse de la
 *    fusión se resuelve re-consultando el PR: fusionado → completed;
 *    no fusionado → cancelled. Nunca doble intento de fusión.
 * 4. SYSTEMIC PAUSE: Agotamiento de rate-limit o indisponibilidad del
 *    Ledger pausan el driver con retroceso exponencial sin evictar.
 * =================================================================
 */

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::time::interval;
use tracing::{debug, error, info, instrument, warn};

use imq_core_checks::{CheckContext, CheckExecutionResult};
use imq_domain_models::{
    is_valid_commit_sha, Check, EntryStatus, PullRequest, Queue, QueueEntry, RemovalReason,
    Repository, SystemConfiguration,
};
use imq_infra_forge::{GatewayError, MergeOptions, PullRequestView};

use crate::state::driver_registry::{CancellationGate, DriverHandle};
use crate::state::AppState;

/// Tick periódico del driver en reposo.
const IDLE_TICK_INTERVAL: Duration = Duration::from_secs(30);

/// Asentamiento tras la actualización de rama, antes del re-fetch.
const BRANCH_UPDATE_SETTLE: Duration = Duration::from_secs(2);

/// Piso y techo de la pausa sistémica.
const SYSTEMIC_PAUSE_FLOOR: Duration = Duration::from_secs(30);
const SYSTEMIC_PAUSE_CEILING: Duration = Duration::from_secs(900);

/// Veredicto interno de una pasada del pipeline.
enum PipelineVerdict {
    /// La entrada alcanzó un estado terminal; continuar con la siguiente.
    Settled,
    /// Fallo sistémico: pausar el driver y reintentar la misma entrada.
    SystemicPause(Duration),
}

/// Driver serial de una cola de fusión.
pub struct QueueDriver {
    state: AppState,
    queue: Queue,
    repository: Repository,
    wake_signal: Arc<Notify>,
    cancellation_gate: Arc<CancellationGate>,
    shutdown_receiver: watch::Receiver<bool>,
}

impl QueueDriver {
    /// Lanza el driver de la cola si no existe ya uno vivo.
    pub fn spawn(state: &AppState, queue: Queue, repository: Repository) {
        if state.driver_registry.contains(&queue.id) {
            state.driver_registry.wake(&queue.id);
            return;
        }

        let wake_signal = Arc::new(Notify::new());
        let cancellation_gate = Arc::new(CancellationGate::new());
        let shutdown_receiver = state.driver_registry.shutdown_receiver();

        let driver = QueueDriver {
            state: state.clone(),
            queue: queue.clone(),
            repository,
            wake_signal: Arc::clone(&wake_signal),
            cancellation_gate: Arc::clone(&cancellation_gate),
            shutdown_receiver,
        };

        let join_handle = tokio::spawn(async move { driver.run().await });
        state.driver_registry.register(
            &queue.id,
            DriverHandle::new(wake_signal, cancellation_gate, join_handle),
        );
    }

    /// Bucle principal: cabeza pendiente → pipeline → siguiente.
    async fn run(mut self) {
        info!(
            "🧵 [DRIVER_ONLINE]: Serial driver active for {}@{}.",
            self.repository.full_name, self.queue.base_branch
        );
        let mut idle_ticker = interval(IDLE_TICK_INTERVAL);
        let mut consecutive_systemic_faults: u32 = 0;

        loop {
            if *self.shutdown_receiver.borrow() {
                break;
            }

            let head = match self
                .state
                .queue_entry_repository
                .head_pending(&self.queue.id)
                .await
            {
                Ok(head) => head,
                Err(ledger_fault) => {
                    error!("💀 [DRIVER]: Ledger read collapsed: {}", ledger_fault);
                    self.state.metrics.record_processor_error();
                    self.pause(self.systemic_backoff(consecutive_systemic_faults))
                        .await;
                    consecutive_systemic_faults += 1;
                    continue;
                }
            };

            match head {
                Some(entry) => match self.process_entry(entry).await {
                    PipelineVerdict::Settled => {
                        consecutive_systemic_faults = 0;
                    }
                    PipelineVerdict::SystemicPause(requested_pause) => {
                        let effective_pause = requested_pause
                            .max(self.systemic_backoff(consecutive_systemic_faults));
                        warn!(
                            "🧊 [DRIVER]: Systemic pause {:?} on {}@{}.",
                            effective_pause, self.repository.full_name, self.queue.base_branch
                        );
                        consecutive_systemic_faults += 1;
                        self.pause(effective_pause).await;
                    }
                },
                None => {
                    // Cola vacía: dormir hasta el despertar o el tick.
                    tokio::select! {
                        _ = self.wake_signal.notified() => {}
                        _ = idle_ticker.tick() => {}
                        _ = self.shutdown_receiver.changed() => {}
                    }
                }
            }
        }

        info!(
            "🏁 [DRIVER_OFFLINE]: Driver drained for {}@{}.",
            self.repository.full_name, self.queue.base_branch
        );
    }

    /// Pausa interrumpible por apagado.
    async fn pause(&mut self, pause_span: Duration) {
        tokio::select! {
            _ = tokio::time::sleep(pause_span) => {}
            _ = self.shutdown_receiver.changed() => {}
        }
    }

    /// Retroceso exponencial de fallos sistémicos consecutivos.
    fn systemic_backoff(&self, consecutive_faults: u32) -> Duration {
        let scaled = SYSTEMIC_PAUSE_FLOOR * 2u32.saturating_pow(consecutive_faults.min(5));
        scaled.min(SYSTEMIC_PAUSE_CEILING)
    }

    /// Pausa derivada del reinicio de presupuesto del Forge.
    fn rate_limit_pause(&self) -> Duration {
        let snapshot = self.state.forge_gateway.rate_limit_snapshot();
        let now_epoch = chrono::Utc::now().timestamp().max(0) as u64;
        match snapshot.reset_epoch_seconds {
            Some(reset_epoch) if reset_epoch > now_epoch => {
                Duration::from_secs(reset_epoch - now_epoch)
                    .clamp(SYSTEMIC_PAUSE_FLOOR, SYSTEMIC_PAUSE_CEILING)
            }
            _ => SYSTEMIC_PAUSE_FLOOR,
        }
    }

    /// Ejecuta un futuro cancelable: None cuando la compuerta se engancha.
    async fn cancellable<T>(
        &self,
        entry_id: &str,
        operation: impl std::future::Future<Output = T>,
    ) -> Option<T> {
        tokio::select! {
            outcome = operation => Some(outcome),
            _ = self.cancellation_gate.engaged(entry_id) => None,
        }
    }

    // =================================================================
    // PIPELINE: running → refresh → checks → branch-update → merge
    // =================================================================

    #[instrument(skip(self, entry), fields(queue = %self.queue.id, entry = %entry.id))]
    async fn process_entry(&self, entry: QueueEntry) -> PipelineVerdict {
        // --- ETAPA 1: TRANSICIÓN A RUNNING ---
        let entry = match self
            .state
            .queue_entry_repository
            .transition(&entry.id, EntryStatus::Running)
            .await
        {
            Ok(running_entry) => running_entry,
            Err(ledger_fault) => {
                error!("💀 [PIPELINE]: Running transition rejected: {}", ledger_fault);
                self.state.metrics.record_processor_error();
                return PipelineVerdict::SystemicPause(SYSTEMIC_PAUSE_FLOOR);
            }
        };
        self.state
            .event_bus
            .emit_entry_status_changed(&self.queue.id, entry.clone());
        self.sample_queue_length().await;

        let configuration = match self.state.configuration_repository.load().await {
            Ok(configuration) => configuration,
            Err(ledger_fault) => {
                error!("💀 [PIPELINE]: Configuration load collapsed: {}", ledger_fault);
                return PipelineVerdict::SystemicPause(SYSTEMIC_PAUSE_FLOOR);
            }
        };

        let pull_request = match self
            .state
            .pull_request_repository
            .find_by_id(&entry.pull_request_id)
            .await
        {
            Ok(Some(pull_request)) => pull_request,
            Ok(None) => {
                warn!("👻 [PIPELINE]: Entry {} references a ghost PR.", entry.id);
                self.settle_cancelled(&entry, RemovalReason::Cancelled).await;
                return PipelineVerdict::Settled;
            }
            Err(_) => return PipelineVerdict::SystemicPause(SYSTEMIC_PAUSE_FLOOR),
        };

        // --- ETAPA 2: REFRESCO DEL PR DESDE EL FORGE ---
        let refreshed_view = match self
            .cancellable(
                &entry.id,
                self.state.forge_gateway.get_pull_request(
                    &self.repository.owner,
                    &self.repository.name,
                    pull_request.number,
                ),
            )
            .await
        {
            None => {
                self.settle_cancelled(&entry, RemovalReason::Administrative).await;
                return PipelineVerdict::Settled;
            }
            Some(Err(gateway_fault)) => {
                return self
                    .settle_gateway_fault(&entry, &pull_request, &configuration, gateway_fault)
                    .await;
            }
            Some(Ok(view)) => view,
        };

        if refreshed_view.merged {
            // Recuperación at-least-once: la fusión ya ocurrió en un
            // intento anterior; el estado observado sella la entrada.
            info!(
                "🔁 [PIPELINE]: PR #{} already merged upstream; sealing.",
                pull_request.number
            );
            self.settle_completed(&entry, &pull_request, &configuration).await;
            return PipelineVerdict::Settled;
        }
        if !refreshed_view.is_open() {
            info!("🚪 [PIPELINE]: PR #{} closed upstream.", pull_request.number);
            self.settle_cancelled(&entry, RemovalReason::PrClosed).await;
            return PipelineVerdict::Settled;
        }
        if !refreshed_view.has_label(&configuration.trigger_label) {
            info!(
                "🏷️ [PIPELINE]: PR #{} lost the '{}' label.",
                pull_request.number, configuration.trigger_label
            );
            self.settle_cancelled(&entry, RemovalReason::LabelRemoved).await;
            return PipelineVerdict::Settled;
        }

        let pull_request = match self.persist_view(&pull_request, &refreshed_view).await {
            Ok(refreshed) => refreshed,
            Err(verdict) => return verdict,
        };

        // --- ETAPA 3: SUITE DE CHECKS ---
        if !configuration.check_configuration.is_empty() {
            let check_context = CheckContext {
                pr_number: pull_request.number,
                head_sha: pull_request.head_sha.clone(),
                base_branch: pull_request.base_branch.clone(),
                head_branch: pull_request.head_branch.clone(),
                repo_owner: self.repository.owner.clone(),
                repo_name: self.repository.name.clone(),
            };

            let suite_verdict = match self
                .cancellable(
                    &entry.id,
                    self.state
                        .check_engine
                        .execute_suite(&configuration.check_configuration, &check_context),
                )
                .await
            {
                None => {
                    self.settle_cancelled(&entry, RemovalReason::Administrative).await;
                    return PipelineVerdict::Settled;
                }
                Some(Err(check_fault)) => {
                    // Configuración ilegal o ejecutor ausente: accionable.
                    warn!("⚠️ [PIPELINE]: Suite collapsed: {}", check_fault);
                    self.settle_failed(
                        &entry,
                        &pull_request,
                        &configuration.notification_templates.checks_failed,
                    )
                    .await;
                    return PipelineVerdict::Settled;
                }
                Some(Ok(suite_verdict)) => suite_verdict,
            };

            self.persist_suite_verdict(&entry, &configuration, &suite_verdict)
                .await;

            if !suite_verdict.all_passed {
                info!(
                    "❌ [PIPELINE]: Checks failed for PR #{} ({:?}).",
                    pull_request.number, suite_verdict.failed_checks
                );
                self.settle_failed(
                    &entry,
                    &pull_request,
                    &configuration.notification_templates.checks_failed,
                )
                .await;
                return PipelineVerdict::Settled;
            }
        }

        // --- ETAPA 4: ACTUALIZACIÓN DE RAMA (FAST-FORWARD SOBRE LA BASE) ---
        let pull_request = match self
            .update_branch_stage(&entry, pull_request, &configuration)
            .await
        {
            Ok(Some(current)) => current,
            Ok(None) => return PipelineVerdict::Settled,
            Err(verdict) => return verdict,
        };

        // --- ETAPA 5: FUSIÓN ---
        self.merge_stage(&entry, &pull_request, &configuration).await
    }

    /// Persiste la vista refrescada del Forge sobre la fila del PR.
    async fn persist_view(
        &self,
        pull_request: &PullRequest,
        view: &PullRequestView,
    ) -> Result<PullRequest, PipelineVerdict> {
        if !is_valid_commit_sha(&view.head.sha) {
            warn!("🧪 [PIPELINE]: Forge served a malformed head SHA; keeping previous.");
            return Ok(pull_request.clone());
        }

        let refreshed = pull_request.refreshed(
            &view.title,
            &view.head.sha,
            view.is_conflicted(),
            view.mergeable_state.as_deref() == Some("clean"),
        );

        self.state
            .pull_request_repository
            .upsert(&refreshed)
            .await
            .map_err(|ledger_fault| {
                error!("💀 [PIPELINE]: PR persistence collapsed: {}", ledger_fault);
                PipelineVerdict::SystemicPause(SYSTEMIC_PAUSE_FLOOR)
            })
    }

    /// Etapa 4: adelanta la rama sobre la base y re-consulta el SHA
    /// autoritativo. `Ok(None)` significa entrada ya asentada.
    async fn update_branch_stage(
        &self,
        entry: &QueueEntry,
        pull_request: PullRequest,
        configuration: &SystemConfiguration,
    ) -> Result<Option<PullRequest>, PipelineVerdict> {
        // Una cabeza ya al día no necesita fast-forward.
        let comparison = self
            .cancellable(
                &entry.id,
                self.state.forge_gateway.compare_commits(
                    &self.repository.owner,
                    &self.repository.name,
                    &pull_request.base_branch,
                    &pull_request.head_sha,
                ),
            )
            .await;

        let needs_update = match comparison {
            None => {
                self.settle_cancelled(entry, RemovalReason::Administrative).await;
                return Ok(None);
            }
            Some(Ok(comparison)) => comparison.behind_by > 0,
            // La comparación es una optimización: su fallo no decide nada.
            Some(Err(comparison_fault)) => {
                debug!("🔍 [PIPELINE]: Compare degraded: {}", comparison_fault);
                true
            }
        };

        if !needs_update {
            debug!("✅ [PIPELINE]: Head already contains the base tip.");
            return Ok(Some(pull_request));
        }

        let update_verdict = self
            .cancellable(
                &entry.id,
                self.state.forge_gateway.update_pull_request_branch(
                    &self.repository.owner,
                    &self.repository.name,
                    pull_request.number,
                ),
            )
            .await;

        match update_verdict {
            None => {
                self.settle_cancelled(entry, RemovalReason::Administrative).await;
                return Ok(None);
            }
            Some(Err(gateway_fault)) => {
                if gateway_fault.is_rate_limited() {
                    return Err(PipelineVerdict::SystemicPause(self.rate_limit_pause()));
                }
                info!(
                    "❌ [PIPELINE]: Branch update rejected for PR #{}: {}",
                    pull_request.number, gateway_fault
                );
                self.settle_failed(
                    entry,
                    &pull_request,
                    &configuration.notification_templates.branch_update_failed,
                )
                .await;
                return Ok(None);
            }
            Some(Ok(_accepted)) => {}
        }

        // Asentamiento: el Forge ejecuta la actualización en vuelo.
        if self
            .cancellable(&entry.id, tokio::time::sleep(BRANCH_UPDATE_SETTLE))
            .await
            .is_none()
        {
            self.settle_cancelled(entry, RemovalReason::Administrative).await;
            return Ok(None);
        }

        // SHA autoritativo: re-fetch del PR, jamás el mensaje del Forge.
        let settled_view = self
            .cancellable(
                &entry.id,
                self.state.forge_gateway.get_pull_request(
                    &self.repository.owner,
                    &self.repository.name,
                    pull_request.number,
                ),
            )
            .await;

        match settled_view {
            None => {
                self.settle_cancelled(entry, RemovalReason::Administrative).await;
                Ok(None)
            }
            Some(Err(gateway_fault)) => {
                if gateway_fault.is_rate_limited() {
                    return Err(PipelineVerdict::SystemicPause(self.rate_limit_pause()));
                }
                self.settle_failed(
                    entry,
                    &pull_request,
                    &configuration.notification_templates.branch_update_failed,
                )
                .await;
                Ok(None)
            }
            Some(Ok(view)) => {
                if view.is_conflicted() {
                    info!(
                        "💥 [PIPELINE]: PR #{} conflicts with {} after update.",
                        pull_request.number, pull_request.base_branch
                    );
                    self.settle_failed(
                        entry,
                        &pull_request,
                        &configuration.notification_templates.branch_update_failed,
                    )
                    .await;
                    return Ok(None);
                }
                let refreshed = self.persist_view(&pull_request, &view).await?;
                Ok(Some(refreshed))
            }
        }
    }

    /// Etapa 5: fusión con resolución de indeterminación ante cancelación.
    async fn merge_stage(
        &self,
        entry: &QueueEntry,
        pull_request: &PullRequest,
        configuration: &SystemConfiguration,
    ) -> PipelineVerdict {
        let merge_options = MergeOptions {
            title: None,
            message: None,
            method: configuration.merge_method,
        };

        let merge_verdict = self
            .cancellable(
                &entry.id,
                self.state.forge_gateway.merge_pull_request(
                    &self.repository.owner,
                    &self.repository.name,
                    pull_request.number,
                    &merge_options,
                ),
            )
            .await;

        match merge_verdict {
            // Cancelación cruzando el acuse: el estado del Forge decide.
            None => self.resolve_indeterminate_merge(entry, pull_request, configuration).await,
            Some(Ok(outcome)) if outcome.merged => {
                self.settle_completed(entry, pull_request, configuration).await;
                PipelineVerdict::Settled
            }
            Some(Ok(outcome)) => {
                info!(
                    "❌ [PIPELINE]: Forge declined the merge of PR #{}: {}",
                    pull_request.number, outcome.message
                );
                self.settle_failed(
                    entry,
                    pull_request,
                    &configuration.notification_templates.merge_failed,
                )
                .await;
                PipelineVerdict::Settled
            }
            Some(Err(gateway_fault)) => {
                if gateway_fault.is_rate_limited() {
                    return PipelineVerdict::SystemicPause(self.rate_limit_pause());
                }
                // Un rechazo puede significar "ya fusionado" (reintento tras
                // recuperación): el estado observado del PR es la autoridad.
                if let Some(Ok(view)) = self
                    .cancellable(
                        &entry.id,
                        self.state.forge_gateway.get_pull_request(
                            &self.repository.owner,
                            &self.repository.name,
                            pull_request.number,
                        ),
                    )
                    .await
                {
                    if view.merged {
                        info!(
                            "🔁 [PIPELINE]: PR #{} already merged upstream; sealing.",
                            pull_request.number
                        );
                        self.settle_completed(entry, pull_request, configuration).await;
                        return PipelineVerdict::Settled;
                    }
                }
                self.settle_failed(
                    entry,
                    pull_request,
                    &configuration.notification_templates.merge_failed,
                )
                .await;
                PipelineVerdict::Settled
            }
        }
    }

    /// Cancelación indeterminada: re-consulta el PR antes de decidir.
    async fn resolve_indeterminate_merge(
        &self,
        entry: &QueueEntry,
        pull_request: &PullRequest,
        configuration: &SystemConfiguration,
    ) -> PipelineVerdict {
        warn!(
            "🌫️ [PIPELINE]: Cancellation raced the merge of PR #{}; observing.",
            pull_request.number
        );

        let observed = self
            .state
            .forge_gateway
            .get_pull_request(
                &self.repository.owner,
                &self.repository.name,
                pull_request.number,
            )
            .await;

        match observed {
            Ok(view) if view.merged => {
                self.settle_completed(entry, pull_request, configuration).await;
            }
            _ => {
                self.settle_cancelled(entry, RemovalReason::Administrative).await;
            }
        }
        PipelineVerdict::Settled
    }

    // =================================================================
    // SELLADO DE ESTADOS TERMINALES
    // =================================================================

    fn processing_duration_ms(entry: &QueueEntry) -> u64 {
        entry
            .started_at
            .map(|started_at| {
                (chrono::Utc::now() - started_at)
                    .num_milliseconds()
                    .max(0) as u64
            })
            .unwrap_or(0)
    }

    async fn settle_completed(
        &self,
        entry: &QueueEntry,
        pull_request: &PullRequest,
        configuration: &SystemConfiguration,
    ) {
        self.cancellation_gate.acknowledge(&entry.id);

        match self
            .state
            .queue_entry_repository
            .transition(&entry.id, EntryStatus::Completed)
            .await
        {
            Ok(sealed_entry) => {
                self.state
                    .event_bus
                    .emit_entry_status_changed(&self.queue.id, sealed_entry);
            }
            Err(ledger_fault) => {
                error!("💀 [PIPELINE]: Completion sealing collapsed: {}", ledger_fault);
                self.state.metrics.record_processor_error();
            }
        }

        self.state
            .event_bus
            .emit_entry_removed(&self.queue.id, &entry.id, RemovalReason::Completed);
        self.post_notification(
            pull_request,
            &configuration.notification_templates.merge_success,
        )
        .await;
        self.state.metrics.record_entry_processed(
            &self.queue.id,
            &entry.id,
            EntryStatus::Completed,
            Self::processing_duration_ms(entry),
        );
        self.sample_queue_length().await;

        info!(
            "✅ [PIPELINE]: PR #{} merged into {}.",
            pull_request.number, self.queue.base_branch
        );
    }

    async fn settle_failed(
        &self,
        entry: &QueueEntry,
        pull_request: &PullRequest,
        notification_body: &str,
    ) {
        self.cancellation_gate.acknowledge(&entry.id);

        match self
            .state
            .queue_entry_repository
            .transition(&entry.id, EntryStatus::Failed)
            .await
        {
            Ok(sealed_entry) => {
                self.state
                    .event_bus
                    .emit_entry_status_changed(&self.queue.id, sealed_entry);
            }
            Err(ledger_fault) => {
                error!("💀 [PIPELINE]: Failure sealing collapsed: {}", ledger_fault);
                self.state.metrics.record_processor_error();
            }
        }

        self.state
            .event_bus
            .emit_entry_removed(&self.queue.id, &entry.id, RemovalReason::Failed);
        self.post_notification(pull_request, notification_body).await;
        self.state.metrics.record_entry_processed(
            &self.queue.id,
            &entry.id,
            EntryStatus::Failed,
            Self::processing_duration_ms(entry),
        );
        self.sample_queue_length().await;
    }

    async fn settle_cancelled(&self, entry: &QueueEntry, reason: RemovalReason) {
        self.cancellation_gate.acknowledge(&entry.id);

        match self
            .state
            .queue_entry_repository
            .transition(&entry.id, EntryStatus::Cancelled)
            .await
        {
            Ok(sealed_entry) => {
                self.state
                    .event_bus
                    .emit_entry_status_changed(&self.queue.id, sealed_entry);
            }
            Err(ledger_fault) => {
                error!("💀 [PIPELINE]: Cancellation sealing collapsed: {}", ledger_fault);
                self.state.metrics.record_processor_error();
            }
        }

        self.state
            .event_bus
            .emit_entry_removed(&self.queue.id, &entry.id, reason);
        self.state.metrics.record_entry_processed(
            &self.queue.id,
            &entry.id,
            EntryStatus::Cancelled,
            Self::processing_duration_ms(entry),
        );
        self.sample_queue_length().await;
    }

    /// Clasifica un fallo de pasarela en la etapa de refresco.
    async fn settle_gateway_fault(
        &self,
        entry: &QueueEntry,
        pull_request: &PullRequest,
        configuration: &SystemConfiguration,
        gateway_fault: GatewayError,
    ) -> PipelineVerdict {
        if gateway_fault.is_rate_limited() {
            return PipelineVerdict::SystemicPause(self.rate_limit_pause());
        }

        // Fallos accionables y reintentos agotados son terminales para
        // la entrada; el driver continúa con la siguiente.
        warn!(
            "⚠️ [PIPELINE]: Refresh collapsed for PR #{}: {}",
            pull_request.number, gateway_fault
        );
        self.settle_failed(
            entry,
            pull_request,
            &configuration.notification_templates.merge_failed,
        )
        .await;
        PipelineVerdict::Settled
    }

    /// Persiste los veredictos individuales de la suite y sus métricas.
    async fn persist_suite_verdict(
        &self,
        entry: &QueueEntry,
        configuration: &SystemConfiguration,
        verdict: &CheckExecutionResult,
    ) {
        for outcome in &verdict.results {
            let Some(spec) = configuration
                .check_configuration
                .checks
                .iter()
                .find(|spec| spec.id == outcome.check_id)
            else {
                continue;
            };

            let mut check_row = Check::new(&entry.id, spec);
            check_row.status = outcome.status;
            check_row.started_at = Some(outcome.started_at);
            check_row.completed_at = Some(outcome.completed_at);
            check_row.output = outcome.output.clone();

            if let Err(ledger_fault) = self.state.check_repository.insert(&check_row).await {
                warn!("⚠️ [PIPELINE]: Check verdict persistence degraded: {}", ledger_fault);
            }
            self.state.metrics.record_check_outcome(
                &outcome.name,
                outcome.status,
                outcome.duration_ms,
            );
        }
    }

    /// Comentario de notificación best-effort (el fallo sólo se rastrea).
    async fn post_notification(&self, pull_request: &PullRequest, body: &str) {
        if let Err(gateway_fault) = self
            .state
            .forge_gateway
            .post_comment(
                &self.repository.owner,
                &self.repository.name,
                pull_request.number,
                body,
            )
            .await
        {
            warn!("⚠️ [PIPELINE]: Notification comment degraded: {}", gateway_fault);
        }
    }

    async fn sample_queue_length(&self) {
        if let Ok(live_entries) = self
            .state
            .queue_entry_repository
            .list_live(&self.queue.id)
            .await
        {
            self.state
                .metrics
                .record_queue_length(&self.queue.id, live_entries.len());
        }
    }
}
