// [apps/coordinator/src/services/recovery.rs]
/*!
 * =================================================================
 * APARATO: STARTUP RECOVERY SERVICE
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: RESURRECCIÓN DE ENTRADAS HUÉRFANAS TRAS UN COLAPSO
 *
 * Un colapso a mitad de pipeline deja entradas en 'running'. En el
 * arranque, cada una regresa a 'pending' en posición 0: su cola
 * retoma desde la cabeza. El pipeline es at-least-once: la fusión es
 * idempotente en el Forge (re-fusionar un PR fusionado se rechaza y
 * el driver observa el estado real antes de sellar).
 * =================================================================
 */

use tracing::{info, instrument, warn};

use crate::services::queue_driver::QueueDriver;
use crate::state::AppState;

/// Ejecuta la recuperación de arranque y revive los drivers de colas
/// con trabajo pendiente.
#[instrument(skip(state))]
pub async fn perform_startup_recovery(state: &AppState) -> Result<u64, anyhow::Error> {
    // 1. RESET DE HUÉRFANAS: running → pending (posición 0).
    let resurrected_count = state.queue_entry_repository.reset_orphaned_running().await?;
    if resurrected_count > 0 {
        warn!(
            "🩹 [RECOVERY]: {} orphaned running entries reset to pending.",
            resurrected_count
        );
    }

    // 2. REVIVIR DRIVERS: toda cola con orden vivo recibe su driver.
    let queues = state.queue_repository.list_all().await?;
    for queue in queues {
        let live_entries = state.queue_entry_repository.list_live(&queue.id).await?;
        if live_entries.is_empty() {
            continue;
        }

        let Some(repository) = state
            .repository_catalog
            .find_by_id(&queue.repository_id)
            .await?
        else {
            warn!("👻 [RECOVERY]: Queue {} references a ghost repository.", queue.id);
            continue;
        };

        state
            .metrics
            .record_queue_length(&queue.id, live_entries.len());
        QueueDriver::spawn(state, queue, repository);
    }

    info!("🧬 [RECOVERY]: Startup recovery sealed.");
    Ok(resurrected_count)
}
