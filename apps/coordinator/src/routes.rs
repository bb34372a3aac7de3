// [apps/coordinator/src/routes.rs]
/*!
 * =================================================================
 * APARATO: SOVEREIGN ROUTING MATRIX
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: TOPOLOGÍA DE RED REST, WEBHOOK Y WEBSOCKET
 *
 * VISION:
 * La topología soporta:
 * 1. REST administrativo (/api/v1): colas, entradas, config, stats.
 * 2. Webhook intake (POST /) con guardia HMAC.
 * 3. WebSocket (/ws/events) para señales en tiempo real.
 * =================================================================
 */

use axum::{
    http::{header, Method},
    routing::{get, post, put},
    Router,
};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{config, health, queues, stats, stream, webhook};
use crate::state::AppState;

pub fn create_router(application_shared_state: AppState) -> Router {
    // Escudo de red: CORS para el Dashboard y herramientas de Ops.
    let network_security_shield = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    // ESTRATO DE COLAS: administración del orden vivo.
    let queue_stratum = Router::new()
        .route(
            "/",
            get(queues::handle_list_queues).post(queues::handle_create_queue),
        )
        .route(
            "/:id",
            get(queues::handle_get_queue).delete(queues::handle_delete_queue),
        )
        .route(
            "/:id/entries",
            get(queues::handle_list_entries).post(queues::handle_add_entry),
        )
        .route(
            "/:id/entries/:entry_id",
            axum::routing::delete(queues::handle_remove_entry),
        )
        .route("/:id/reorder", put(queues::handle_reorder));

    // ESTRATO DE CONFIGURACIÓN: fila única.
    let config_stratum = Router::new()
        .route(
            "/",
            get(config::handle_get_config).put(config::handle_put_config),
        )
        .route("/reset", post(config::handle_reset_config));

    // ESTRATO DE OBSERVABILIDAD: stats y sondas.
    let stats_stratum = Router::new()
        .route("/", get(stats::handle_stats_summary))
        .route("/queues/:id", get(stats::handle_queue_stats))
        .route("/checks", get(stats::handle_check_stats))
        .route("/github", get(stats::handle_github_stats));

    let health_stratum = Router::new()
        .route("/", get(health::handle_service_health))
        .route("/github", get(health::handle_github_health))
        .route("/database", get(health::handle_database_health));

    // COMPOSICIÓN GLOBAL (Root Topology)
    Router::new()
        // Intake de webhooks del Forge (guardia HMAC en el handler).
        .route("/", post(webhook::handle_webhook_intake))
        .route("/health", get(health::handle_liveness))
        .nest(
            "/api/v1",
            Router::new()
                .nest("/queues", queue_stratum)
                .nest("/config", config_stratum)
                .nest("/stats", stats_stratum)
                .nest("/health", health_stratum),
        )
        // Túnel de señales en tiempo real (Full Duplex).
        .route("/ws/events", get(stream::establish_event_stream))
        .layer(TraceLayer::new_for_http())
        .layer(network_security_shield)
        .with_state(application_shared_state)
}
