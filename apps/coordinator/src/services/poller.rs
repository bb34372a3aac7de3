// [apps/coordinator/src/services/poller.rs]
/*!
 * =================================================================
 * APARATO: FORGE EVENT POLLER
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: INGESTA PERIÓDICA DEL FEED DE EVENTOS DEL FORGE
 *
 * VISION:
 * 1. ADAPTIVE CADENCE: Cadencia densa (piso configurado) mientras
 *    fluyen eventos; dilatación ×2 por pasada silenciosa hasta el
 *    techo (8× piso). Un 304 condicional no penaliza el presupuesto.
 * 2. DURABLE CURSOR: El último identificador de evento visto se
 *    persiste por repositorio y sobrevive reinicios.
 * 3. IDEMPOTENT FEED: Los eventos ya vistos se filtran por cursor; el
 *    motor además fusiona duplicados en la admisión.
 * =================================================================
 */

use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use imq_domain_models::{EventKind, NormalizedEvent, Repository};
use imq_infra_forge::RepositoryEvent;

use crate::state::AppState;

/// Poller de eventos de un repositorio vigilado.
pub struct EventPoller {
    state: AppState,
    repository_full_name: String,
    interval_floor: Duration,
    interval_ceiling: Duration,
}

impl EventPoller {
    pub fn new(state: AppState, repository_full_name: &str) -> Self {
        let interval_floor = state.runtime_settings.polling_interval;
        let interval_ceiling = state.runtime_settings.polling_interval_ceiling();
        Self {
            state,
            repository_full_name: repository_full_name.to_string(),
            interval_floor,
            interval_ceiling,
        }
    }

    /// Lanza el daemon de polling del repositorio.
    pub fn spawn(state: &AppState, repository_full_name: &str) {
        let poller = Self::new(state.clone(), repository_full_name);
        tokio::spawn(async move { poller.run().await });
    }

    async fn run(self) {
        info!(
            "📡 [POLLER_ONLINE]: Watching {} every {:?} (ceiling {:?}).",
            self.repository_full_name, self.interval_floor, self.interval_ceiling
        );

        let Some((owner, name)) = Repository::split_full_name(&self.repository_full_name)
            .map(|(owner, name)| (owner.to_string(), name.to_string()))
        else {
            warn!(
                "⛔ [POLLER]: '{}' is not owner/name; poller refused.",
                self.repository_full_name
            );
            return;
        };

        let mut shutdown_receiver = self.state.driver_registry.shutdown_receiver();
        let mut current_interval = self.interval_floor;

        loop {
            tokio::select! {
                _ = tokio::time::sleep(current_interval) => {}
                _ = shutdown_receiver.changed() => {
                    info!("🏁 [POLLER]: {} drained by shutdown.", self.repository_full_name);
                    break;
                }
            }

            match self.poll_once(&owner, &name).await {
                Ok(ingested_count) if ingested_count > 0 => {
                    // Actividad: densificar la cadencia al piso.
                    current_interval = self.interval_floor;
                }
                Ok(_) => {
                    // Silencio: dilatar hacia el techo.
                    current_interval = (current_interval * 2).min(self.interval_ceiling);
                }
                Err(polling_fault) => {
                    warn!(
                        "⚠️ [POLLER]: Pass degraded for {}: {}",
                        self.repository_full_name, polling_fault
                    );
                    self.state.metrics.record_processor_error();
                    current_interval = (current_interval * 2).min(self.interval_ceiling);
                }
            }
        }
    }

    /// Una pasada: GET condicional, filtro por cursor, normalización.
    #[instrument(skip(self), fields(repo = %self.repository_full_name))]
    async fn poll_once(&self, owner: &str, name: &str) -> Result<usize, String> {
        let Some(page) = self
            .state
            .forge_gateway
            .list_repository_events(owner, name)
            .await
            .map_err(|fault| fault.to_string())?
        else {
            debug!("💤 [POLLER]: Feed unchanged (304).");
            return Ok(0);
        };

        let cursor = self
            .state
            .poll_cursor_repository
            .load(&self.repository_full_name)
            .await
            .map_err(|fault| fault.to_string())?;

        // El feed llega del más nuevo al más viejo: cortar en el cursor.
        let fresh_events: Vec<&RepositoryEvent> = page
            .events
            .iter()
            .take_while(|event| cursor.as_deref() != Some(event.id.as_str()))
            .collect();

        let mut ingested_count = 0usize;
        // Ingesta en orden cronológico (el feed viene invertido).
        for raw_event in fresh_events.iter().rev() {
            if let Some(normalized) =
                normalize_feed_event(raw_event, &self.repository_full_name)
            {
                if self.state.submit_event(normalized).await {
                    ingested_count += 1;
                }
            }
        }

        if let Some(latest_event_id) = page.latest_event_id {
            self.state
                .poll_cursor_repository
                .store(&self.repository_full_name, &latest_event_id)
                .await
                .map_err(|fault| fault.to_string())?;
        }

        if ingested_count > 0 {
            debug!("📥 [POLLER]: {} fresh events ingested.", ingested_count);
        }
        Ok(ingested_count)
    }
}

/// Normaliza un evento crudo del feed al contrato interno.
///
/// El feed del Forge transporta acciones de PR bajo 'PullRequestEvent';
/// las acciones fuera del vocabulario del motor se descartan.
pub fn normalize_feed_event(
    raw_event: &RepositoryEvent,
    repository_full_name: &str,
) -> Option<NormalizedEvent> {
    if raw_event.event_type != "PullRequestEvent" {
        return None;
    }

    let action = raw_event.payload.get("action")?.as_str()?;
    let pr_number = raw_event
        .payload
        .get("pull_request")?
        .get("number")?
        .as_u64()?;
    let head_sha = raw_event
        .payload
        .get("pull_request")
        .and_then(|pr| pr.get("head"))
        .and_then(|head| head.get("sha"))
        .and_then(|sha| sha.as_str())
        .map(str::to_string);
    let label = raw_event
        .payload
        .get("label")
        .and_then(|label| label.get("name"))
        .and_then(|name| name.as_str())
        .map(str::to_string);

    let kind = match action {
        "labeled" => EventKind::LabelAdded,
        "unlabeled" => EventKind::LabelRemoved,
        "closed" => EventKind::PrClosed,
        "synchronize" | "edited" | "reopened" => EventKind::PrUpdated,
        _ => return None,
    };

    Some(NormalizedEvent {
        kind,
        repository_full_name: repository_full_name.to_string(),
        pr_number,
        head_sha,
        label,
    })
}
