// [apps/coordinator/src/state/mod.rs]
/*!
 * =================================================================
 * APARATO: SOVEREIGN STATE ORCHESTRATOR
 * CLASIFICACIÓN: APPLICATION STATE (ESTRATO L1-APP)
 * RESPONSABILIDAD: ORQUESTACIÓN DE REPOSITORIOS, BUS, MOTOR Y DRIVERS
 *
 * VISION:
 * 1. COMPOSITION ROOT: Un único conjunto consistente de colaboradores
 *    construido en el arranque y enhebrado por constructores; cero
 *    singletons globales mutables.
 * 2. THREAD-SAFE FABRIC: Todo miembro compartido viaja bajo 'Arc';
 *    los puntos de coordinación (métricas, registro de drivers) son
 *    structs protegidos por cerrojos, no objetos con identidad.
 * =================================================================
 */

pub mod driver_registry;
pub mod metrics;

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use imq_core_checks::CheckEngine;
use imq_domain_models::NormalizedEvent;
use imq_infra_db::repositories::{
    CheckRepository, ConfigurationRepository, PollCursorRepository, PullRequestRepository,
    QueueEntryRepository, QueueRepository, RepositoryCatalog,
};
use imq_infra_db::DbClient;
use imq_infra_forge::ForgeGateway;

use crate::runtime_config::RuntimeSettings;
use crate::services::event_bus::EventBus;
use driver_registry::DriverRegistry;
use metrics::MetricsManager;

/**
 * Contenedor de estado compartido (Thread-Safe) del coordinador.
 * Actúa como la placa base donde se conectan todos los estratos.
 */
#[derive(Clone)]
pub struct AppState {
    /// Cliente del Ledger (libSQL) con pool serializado.
    pub database_client: DbClient,
    /// Configuración de proceso, inmutable tras la carga.
    pub runtime_settings: Arc<RuntimeSettings>,
    /// Pasarela semántica hacia el Forge.
    pub forge_gateway: Arc<ForgeGateway>,
    /// Motor de ejecución de suites de checks.
    pub check_engine: Arc<CheckEngine>,
    /// Bus de señales de estado para Dashboard y WebSocket.
    pub event_bus: Arc<EventBus>,
    /// Sumidero de métricas acotadas del Panóptico.
    pub metrics: Arc<MetricsManager>,
    /// Registro de drivers seriales por cola.
    pub driver_registry: Arc<DriverRegistry>,
    /// Canal serializado de admisión de eventos normalizados.
    pub admission_sender: mpsc::Sender<NormalizedEvent>,

    // --- REPOSITORIOS DEL LEDGER ---
    pub repository_catalog: Arc<RepositoryCatalog>,
    pub pull_request_repository: Arc<PullRequestRepository>,
    pub queue_repository: Arc<QueueRepository>,
    pub queue_entry_repository: Arc<QueueEntryRepository>,
    pub check_repository: Arc<CheckRepository>,
    pub configuration_repository: Arc<ConfigurationRepository>,
    pub poll_cursor_repository: Arc<PollCursorRepository>,
}

impl AppState {
    /**
     * Forja el Estado Maestro inyectando todas las dependencias.
     */
    pub fn new(
        database_client: DbClient,
        runtime_settings: Arc<RuntimeSettings>,
        forge_gateway: Arc<ForgeGateway>,
        check_engine: Arc<CheckEngine>,
        admission_sender: mpsc::Sender<NormalizedEvent>,
    ) -> Self {
        debug!("🧬 [APP_STATE]: Executing state fabric ignition sequence...");

        Self {
            repository_catalog: Arc::new(RepositoryCatalog::new(database_client.clone())),
            pull_request_repository: Arc::new(PullRequestRepository::new(database_client.clone())),
            queue_repository: Arc::new(QueueRepository::new(database_client.clone())),
            queue_entry_repository: Arc::new(QueueEntryRepository::new(database_client.clone())),
            check_repository: Arc::new(CheckRepository::new(database_client.clone())),
            configuration_repository: Arc::new(ConfigurationRepository::new(
                database_client.clone(),
            )),
            poll_cursor_repository: Arc::new(PollCursorRepository::new(database_client.clone())),
            event_bus: Arc::new(EventBus::new()),
            metrics: Arc::new(MetricsManager::default()),
            driver_registry: Arc::new(DriverRegistry::new()),
            database_client,
            runtime_settings,
            forge_gateway,
            check_engine,
            admission_sender,
        }
    }

    /// Encola un evento normalizado hacia el motor de admisión.
    /// El descarte silencioso durante el apagado es deliberado: el
    /// coordinador deja de aceptar eventos nuevos.
    pub async fn submit_event(&self, event: NormalizedEvent) -> bool {
        if self.driver_registry.is_shutting_down() {
            return false;
        }
        self.admission_sender.send(event).await.is_ok()
    }
}
