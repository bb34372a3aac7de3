// [apps/coordinator/src/services/queue_engine.rs]
/*!
 * =================================================================
 * APARATO: QUEUE ENGINE (ADMISIÓN Y CONTRATO OPERATIVO)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: ADMISIÓN SERIALIZADA DE EVENTOS Y MANDO ADMIN
 *
 * VISION:
 * 1. SERIALIZED ADMISSION: Un único consumidor drena el canal de
 *    eventos normalizados; dos fuentes concurrentes (webhook y
 *    polling) jamás corrompen posiciones. Los duplicados se fusionan
 *    porque un PR con entrada viva no se re-admite.
 * 2. TRIGGER SOVEREIGNTY: Sólo la etiqueta disparadora configurada
 *    admite o evicta; el resto de etiquetas es ruido.
 * 3. ADMIN PARITY: Las operaciones administrativas (add, remove,
 *    reorder, create/delete queue) comparten el mismo camino que la
 *    admisión por eventos.
 * =================================================================
 */

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use imq_domain_models::{
    is_valid_commit_sha, EntryStatus, EventKind, NormalizedEvent, PullRequest, Queue, QueueEntry,
    RemovalReason, Repository,
};
use imq_infra_db::DbError;
use imq_infra_forge::{GatewayError, PullRequestView};

use crate::services::queue_driver::QueueDriver;
use crate::state::AppState;

/// Fallos del contrato operativo del motor.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("[L4_ENGINE_FAULT]: LEDGER_COLLAPSE -> {0}")]
    Ledger(#[from] DbError),

    #[error("[L4_ENGINE_FAULT]: GATEWAY_COLLAPSE -> {0}")]
    Gateway(#[from] GatewayError),

    #[error("[L4_ENGINE_FAULT]: NOT_FOUND -> {0}")]
    NotFound(String),

    #[error("[L4_ENGINE_FAULT]: INVALID_REQUEST -> {0}")]
    Invalid(String),
}

/// Motor de colas: admisión por eventos y contrato administrativo.
pub struct QueueEngine;

impl QueueEngine {
    /// Bucle consumidor del canal de admisión (serialización global).
    pub async fn run_admission_loop(
        state: AppState,
        mut admission_receiver: mpsc::Receiver<NormalizedEvent>,
    ) {
        info!("🎛️ [ENGINE_ONLINE]: Admission loop draining normalized events.");
        let mut shutdown_receiver = state.driver_registry.shutdown_receiver();

        loop {
            tokio::select! {
                _ = shutdown_receiver.changed() => {
                    info!("🏁 [ENGINE]: Admission loop stopped by shutdown.");
                    break;
                }
                maybe_event = admission_receiver.recv() => {
                    let Some(event) = maybe_event else { break };
                    if let Err(engine_fault) = Self::handle_event(&state, &event).await {
                        state.metrics.record_processor_error();
                        warn!("⚠️ [ENGINE]: Event rejected ({:?}): {}", event.kind, engine_fault);
                    }
                }
            }
        }
    }

    /// Despacho de un evento normalizado (idempotente ante duplicados).
    #[instrument(skip(state, event), fields(kind = ?event.kind, repo = %event.repository_full_name, pr = event.pr_number))]
    pub async fn handle_event(state: &AppState, event: &NormalizedEvent) -> Result<(), EngineError> {
        let configuration = state.configuration_repository.load().await?;
        let trigger_label = configuration.trigger_label.as_str();

        match event.kind {
            EventKind::LabelAdded => {
                if event.label.as_deref() != Some(trigger_label) {
                    debug!("🏷️ [ENGINE]: Ignoring non-trigger label event.");
                    return Ok(());
                }
                Self::admit_pull_request(state, &event.repository_full_name, event.pr_number)
                    .await
                    .map(|_| ())
            }
            EventKind::LabelRemoved => {
                if event.label.as_deref() != Some(trigger_label) {
                    return Ok(());
                }
                Self::evict_pull_request(
                    state,
                    &event.repository_full_name,
                    event.pr_number,
                    RemovalReason::LabelRemoved,
                )
                .await
            }
            EventKind::PrClosed => {
                Self::evict_pull_request(
                    state,
                    &event.repository_full_name,
                    event.pr_number,
                    RemovalReason::PrClosed,
                )
                .await
            }
            EventKind::PrUpdated => {
                Self::refresh_known_pull_request(state, &event.repository_full_name, event.pr_number)
                    .await
            }
        }
    }

    /// Admisión: asegura repo, refresca PR, asegura cola, encola y despierta.
    pub async fn admit_pull_request(
        state: &AppState,
        repository_full_name: &str,
        pr_number: u64,
    ) -> Result<QueueEntry, EngineError> {
        let (owner, name) = Repository::split_full_name(repository_full_name)
            .ok_or_else(|| EngineError::Invalid(format!("'{}' is not owner/name", repository_full_name)))?;

        // 1. REFRESCO AUTORITATIVO DESDE EL FORGE
        let view = state.forge_gateway.get_pull_request(owner, name, pr_number).await?;
        if !view.is_open() {
            return Err(EngineError::Invalid(format!(
                "PR #{} is not open; admission refused",
                pr_number
            )));
        }
        if !is_valid_commit_sha(&view.head.sha) {
            return Err(EngineError::Invalid(format!(
                "head SHA '{}' violates the 40-hex contract",
                view.head.sha
            )));
        }

        // 2. REPOSITORIO (creado en la primera observación)
        let default_branch = view
            .base
            .repo
            .as_ref()
            .map(|repo| repo.default_branch.clone())
            .filter(|branch| !branch.is_empty())
            .unwrap_or_else(|| view.base.ref_name.clone());
        let repository = state
            .repository_catalog
            .ensure(&Repository::new(owner, name, &default_branch))
            .await?;

        // 3. PULL REQUEST (upsert sobre (repo, number))
        let pull_request = Self::persist_pull_request(state, &repository, &view).await?;

        // 4. COALESCENCIA DE DUPLICADOS: una entrada viva basta.
        if let Some(existing_entry) = state
            .queue_entry_repository
            .find_live_by_pull_request(&pull_request.id)
            .await?
        {
            debug!("♻️ [ENGINE]: PR #{} already queued; coalescing.", pr_number);
            return Ok(existing_entry);
        }

        // 5. COLA PEREZOSA + ENTRADA EN LA COLA DE LA FILA
        let queue = state
            .queue_repository
            .ensure(&repository.id, &view.base.ref_name)
            .await?;
        let entry = state
            .queue_entry_repository
            .append(&queue.id, &pull_request.id)
            .await?;

        state
            .event_bus
            .emit_entry_added(&queue.id, entry.clone(), pr_number);
        Self::sample_queue_length(state, &queue.id).await;

        // 6. DRIVER VIVO Y DESPIERTO
        QueueDriver::spawn(state, queue.clone(), repository);
        state.driver_registry.wake(&queue.id);

        info!(
            "📥 [ENGINE]: PR #{} admitted to {}@{} at position {}.",
            pr_number, repository_full_name, queue.base_branch, entry.position
        );
        Ok(entry)
    }

    /// Evicción: entradas pendientes caen de inmediato; las que corren
    /// reciben una solicitud de cancelación hacia su driver.
    pub async fn evict_pull_request(
        state: &AppState,
        repository_full_name: &str,
        pr_number: u64,
        reason: RemovalReason,
    ) -> Result<(), EngineError> {
        let Some(repository) = state
            .repository_catalog
            .find_by_full_name(repository_full_name)
            .await?
        else {
            return Ok(());
        };
        let Some(pull_request) = state
            .pull_request_repository
            .find_by_repo_and_number(&repository.id, pr_number)
            .await?
        else {
            return Ok(());
        };
        let Some(entry) = state
            .queue_entry_repository
            .find_live_by_pull_request(&pull_request.id)
            .await?
        else {
            return Ok(());
        };

        Self::remove_entry_inner(state, entry, reason).await
    }

    /// Remoción administrativa de una entrada por identificador.
    pub async fn remove_entry(state: &AppState, entry_id: &str) -> Result<(), EngineError> {
        let entry = state
            .queue_entry_repository
            .find_by_id(entry_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(entry_id.to_string()))?;

        if entry.status.is_terminal() {
            return Err(EngineError::Invalid(format!(
                "entry {} already settled as {}",
                entry_id,
                entry.status.as_str()
            )));
        }

        Self::remove_entry_inner(state, entry, RemovalReason::Administrative).await
    }

    async fn remove_entry_inner(
        state: &AppState,
        entry: QueueEntry,
        reason: RemovalReason,
    ) -> Result<(), EngineError> {
        if entry.status == EntryStatus::Running {
            // El driver es el dueño del pipeline: cancelación cooperativa.
            state
                .driver_registry
                .request_cancellation(&entry.queue_id, &entry.id);
            return Ok(());
        }

        state
            .queue_entry_repository
            .transition(&entry.id, EntryStatus::Cancelled)
            .await?;
        state
            .event_bus
            .emit_entry_removed(&entry.queue_id, &entry.id, reason);
        state.metrics.record_entry_processed(
            &entry.queue_id,
            &entry.id,
            EntryStatus::Cancelled,
            0,
        );
        Self::sample_queue_length(state, &entry.queue_id).await;
        Ok(())
    }

    /// Alta administrativa de una entrada sobre una cola concreta.
    pub async fn add_entry(
        state: &AppState,
        queue_id: &str,
        pr_number: u64,
    ) -> Result<QueueEntry, EngineError> {
        let queue = state
            .queue_repository
            .find_by_id(queue_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(queue_id.to_string()))?;
        let repository = state
            .repository_catalog
            .find_by_id(&queue.repository_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(queue.repository_id.clone()))?;

        let entry =
            Self::admit_pull_request(state, &repository.full_name, pr_number).await?;

        if entry.queue_id != queue.id {
            return Err(EngineError::Invalid(format!(
                "PR #{} targets a different base branch than queue {}",
                pr_number, queue_id
            )));
        }
        Ok(entry)
    }

    /// Permutación administrativa del orden vivo.
    pub async fn reorder(
        state: &AppState,
        queue_id: &str,
        ordered_entry_ids: &[String],
    ) -> Result<Vec<QueueEntry>, EngineError> {
        let reordered = state
            .queue_entry_repository
            .reorder(queue_id, ordered_entry_ids)
            .await?;

        for entry in &reordered {
            state
                .event_bus
                .emit_entry_status_changed(queue_id, entry.clone());
        }
        state.driver_registry.wake(queue_id);
        Ok(reordered)
    }

    /// Alta administrativa de una cola (idempotente sobre su destino).
    pub async fn create_queue(
        state: &AppState,
        repository_full_name: &str,
        base_branch: &str,
    ) -> Result<Queue, EngineError> {
        Repository::split_full_name(repository_full_name)
            .ok_or_else(|| EngineError::Invalid(format!("'{}' is not owner/name", repository_full_name)))?;

        let repository = match state
            .repository_catalog
            .find_by_full_name(repository_full_name)
            .await?
        {
            Some(known) => known,
            None => {
                let (owner, name) = Repository::split_full_name(repository_full_name)
                    .expect("INVARIANT: identity verified above");
                state
                    .repository_catalog
                    .ensure(&Repository::new(owner, name, base_branch))
                    .await?
            }
        };

        let queue = state
            .queue_repository
            .ensure(&repository.id, base_branch)
            .await?;
        QueueDriver::spawn(state, queue.clone(), repository);
        Ok(queue)
    }

    /// Baja administrativa: cancela entradas vivas, siega el driver.
    pub async fn delete_queue(state: &AppState, queue_id: &str) -> Result<(), EngineError> {
        let queue = state
            .queue_repository
            .find_by_id(queue_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(queue_id.to_string()))?;

        state.driver_registry.remove(&queue.id);

        for entry in state.queue_entry_repository.list_live(&queue.id).await? {
            // El driver ya fue segado: el sellado directo es legal aquí.
            if state
                .queue_entry_repository
                .transition(&entry.id, EntryStatus::Cancelled)
                .await
                .is_ok()
            {
                state.event_bus.emit_entry_removed(
                    &queue.id,
                    &entry.id,
                    RemovalReason::Administrative,
                );
            }
        }

        state.queue_repository.delete(&queue.id).await?;
        info!("🗑️ [ENGINE]: Queue {} deleted.", queue_id);
        Ok(())
    }

    /// Refresco ligero de un PR conocido (avance de cabeza).
    async fn refresh_known_pull_request(
        state: &AppState,
        repository_full_name: &str,
        pr_number: u64,
    ) -> Result<(), EngineError> {
        let Some(repository) = state
            .repository_catalog
            .find_by_full_name(repository_full_name)
            .await?
        else {
            return Ok(());
        };
        let Some(_known) = state
            .pull_request_repository
            .find_by_repo_and_number(&repository.id, pr_number)
            .await?
        else {
            return Ok(());
        };

        let (owner, name) = Repository::split_full_name(repository_full_name)
            .ok_or_else(|| EngineError::Invalid(repository_full_name.to_string()))?;
        let view = state.forge_gateway.get_pull_request(owner, name, pr_number).await?;
        Self::persist_pull_request(state, &repository, &view).await?;
        Ok(())
    }

    /// Upsert del PR desde la vista del Forge.
    async fn persist_pull_request(
        state: &AppState,
        repository: &Repository,
        view: &PullRequestView,
    ) -> Result<PullRequest, EngineError> {
        let pull_request = match state
            .pull_request_repository
            .find_by_repo_and_number(&repository.id, view.number)
            .await?
        {
            Some(existing) => existing.refreshed(
                &view.title,
                &view.head.sha,
                view.is_conflicted(),
                view.mergeable_state.as_deref() == Some("clean"),
            ),
            None => PullRequest::new(
                &repository.id,
                view.number,
                &view.title,
                &view.user.login,
                &view.base.ref_name,
                &view.head.ref_name,
                &view.head.sha,
            ),
        };

        Ok(state.pull_request_repository.upsert(&pull_request).await?)
    }

    async fn sample_queue_length(state: &AppState, queue_id: &str) {
        if let Ok(live_entries) = state.queue_entry_repository.list_live(queue_id).await {
            state
                .metrics
                .record_queue_length(queue_id, live_entries.len());
        }
    }
}
