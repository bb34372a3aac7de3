// [apps/coordinator/src/kernel.rs]
/**
 * =================================================================
 * APARATO: COORDINATOR SOVEREIGN KERNEL
 * CLASIFICACIÓN: COMPOSITION ROOT (ESTRATO L1-APP)
 * RESPONSABILIDAD: BOOTSTRAP DE INFRAESTRUCTURA E IGNICIÓN SEGURA
 *
 * VISION:
 * Actúa como la placa base donde se conectan todos los servicios:
 * Ledger → Forge → Motor de Checks → Estado → Recuperación →
 * Admisión → Pollers → Transporte HTTP. El apagado ordenado detiene
 * el intake, concede la gracia configurada a los pipelines en vuelo
 * y registra 'forced_shutdown' con las tareas segadas.
 * =================================================================
 */

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, instrument, warn};

use imq_core_checks::{
    CheckEngine, CheckEngineConfig, CheckExecutor, ForgeWorkflowExecutor, LocalScriptExecutor,
};
use imq_domain_models::{CheckKind, NormalizedEvent};
use imq_infra_db::DbClient;
use imq_infra_forge::{ForgeClient, ForgeClientConfig, ForgeGateway};

use crate::routes::create_router;
use crate::runtime_config::{IngressMode, RuntimeSettings};
use crate::services::{perform_startup_recovery, EventPoller, QueueEngine};
use crate::state::AppState;

/// Capacidad del canal serializado de admisión.
const ADMISSION_CHANNEL_CAPACITY: usize = 256;

pub struct CoordinatorKernel {
    pub application_state: AppState,
    admission_receiver: mpsc::Receiver<NormalizedEvent>,
}

impl CoordinatorKernel {
    /**
     * Ignición del Ledger, la pasarela y el estado neural.
     * El esquema se aplica de forma síncrona antes de cualquier servicio.
     */
    #[instrument(skip(runtime_settings))]
    pub async fn ignite(runtime_settings: RuntimeSettings) -> anyhow::Result<Self> {
        let runtime_settings = Arc::new(runtime_settings);

        // --- 1. LEDGER (esquema síncrono, pool serializado) ---
        let database_client = DbClient::connect(
            &runtime_settings.database_path,
            runtime_settings.database_pool_size,
        )
        .await?;

        // --- 2. PASARELA DEL FORGE ---
        let forge_client = ForgeClient::new(ForgeClientConfig::new(
            &runtime_settings.github_api_url,
            &runtime_settings.github_token,
        ))?;
        let forge_gateway = Arc::new(ForgeGateway::new(forge_client));

        // --- 3. MOTOR DE CHECKS (ejecutores polimórficos) ---
        let mut executors: HashMap<CheckKind, Arc<dyn CheckExecutor>> = HashMap::new();
        executors.insert(CheckKind::LocalScript, Arc::new(LocalScriptExecutor::new()));
        executors.insert(
            CheckKind::ForgeWorkflow,
            Arc::new(ForgeWorkflowExecutor::new(Arc::clone(&forge_gateway))),
        );
        let check_engine = Arc::new(CheckEngine::new(CheckEngineConfig::default(), executors));

        // --- 4. ESTADO COMPARTIDO + CANAL DE ADMISIÓN ---
        let (admission_sender, admission_receiver) =
            mpsc::channel::<NormalizedEvent>(ADMISSION_CHANNEL_CAPACITY);
        let application_state = AppState::new(
            database_client,
            Arc::clone(&runtime_settings),
            forge_gateway,
            check_engine,
            admission_sender,
        );

        // --- 5. SEMBRADO DE LA FILA DE CONFIGURACIÓN ---
        Self::seed_configuration_row(&application_state).await?;

        Ok(Self {
            application_state,
            admission_receiver,
        })
    }

    /// Sincroniza la fila única con las copias del entorno: el secreto
    /// de webhook y el proxy son de sólo lectura; la etiqueta
    /// disparadora del entorno manda en el arranque cuando se declara.
    async fn seed_configuration_row(state: &AppState) -> anyhow::Result<()> {
        let mut configuration = state.configuration_repository.load().await?;

        if let Some(environment_trigger) = &state.runtime_settings.trigger_label {
            configuration.trigger_label = environment_trigger.clone();
        }
        configuration.webhook_secret = state.runtime_settings.webhook_secret.clone();
        configuration.webhook_proxy_url = state.runtime_settings.webhook_proxy_url.clone();

        state.configuration_repository.store(&configuration).await?;
        info!(
            "⚙️ [KERNEL]: Configuration row seeded (trigger '{}').",
            configuration.trigger_label
        );
        Ok(())
    }

    /**
     * Lanza las operaciones autónomas y el servidor HTTP principal.
     */
    pub async fn launch_operations(self) {
        let CoordinatorKernel {
            application_state,
            admission_receiver,
        } = self;

        // --- 1. RECUPERACIÓN DE ARRANQUE (huérfanas → pending) ---
        if let Err(recovery_fault) = perform_startup_recovery(&application_state).await {
            error!("💀 [KERNEL]: Startup recovery collapsed: {}", recovery_fault);
            std::process::exit(1);
        }

        // --- 2. MOTOR DE ADMISIÓN SERIALIZADA ---
        let admission_state = application_state.clone();
        tokio::spawn(async move {
            QueueEngine::run_admission_loop(admission_state, admission_receiver).await;
        });

        // --- 3. POLLERS DE EVENTOS (modo polling) ---
        if application_state.runtime_settings.github_mode == IngressMode::Polling {
            let mut watched_repositories: Vec<String> = Vec::new();
            if let Some(primary) = &application_state.runtime_settings.github_repo {
                watched_repositories.push(primary.clone());
            }
            match application_state.repository_catalog.list_all().await {
                Ok(known_repositories) => {
                    for repository in known_repositories {
                        if !watched_repositories.contains(&repository.full_name) {
                            watched_repositories.push(repository.full_name);
                        }
                    }
                }
                Err(catalog_fault) => {
                    warn!("⚠️ [KERNEL]: Catalog read degraded: {}", catalog_fault);
                }
            }

            for repository_full_name in watched_repositories {
                EventPoller::spawn(&application_state, &repository_full_name);
            }
        } else {
            info!("📮 [KERNEL]: Webhook mode active; polling ingress dormant.");
        }

        // --- 4. TRANSPORTE HTTP (AXUM) ---
        let bind_address: SocketAddr = format!(
            "{}:{}",
            application_state.runtime_settings.api_host,
            application_state.runtime_settings.api_port
        )
        .parse()
        .expect("FATAL: API host/port produced an illegal socket address.");

        let router = create_router(application_state.clone());
        let tcp_listener = tokio::net::TcpListener::bind(bind_address)
            .await
            .expect("CRITICAL_FAULT: Failed to bind network port.");

        info!("🚀 [KERNEL_ONLINE]: Coordinator listening at {}.", bind_address);

        // --- 5. SERVICIO HASTA LA SEÑAL DE TERMINACIÓN ---
        tokio::select! {
            serve_outcome = axum::serve(tcp_listener, router) => {
                if let Err(server_fault) = serve_outcome {
                    error!("💀 [KERNEL_COLLAPSE]: Runtime failure: {}", server_fault);
                }
            }
            _ = Self::termination_signal() => {
                info!("🛑 [KERNEL]: Termination signal received; intake closing.");
            }
        }

        // --- 6. APAGADO ORDENADO: gracia y siega contabilizada ---
        let shutdown_grace = application_state.runtime_settings.shutdown_grace;
        let forced_abort_count = application_state
            .driver_registry
            .shutdown_all(shutdown_grace)
            .await;

        if forced_abort_count > 0 {
            application_state
                .metrics
                .record_forced_shutdown(forced_abort_count);
            warn!(
                "💀 [KERNEL]: Forced shutdown reaped {} in-flight tasks.",
                forced_abort_count
            );
        }

        info!("🏁 [KERNEL_OFFLINE]: Coordinator drained.");
    }

    /// SIGINT o SIGTERM, el primero que llegue.
    async fn termination_signal() {
        let interrupt = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            let mut terminate =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("FATAL: SIGTERM handler installation failed.");
            tokio::select! {
                _ = interrupt => {}
                _ = terminate.recv() => {}
            }
        }

        #[cfg(not(unix))]
        {
            let _ = interrupt.await;
        }
    }
}
