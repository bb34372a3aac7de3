// [apps/coordinator/src/handlers/health.rs]
/*!
 * =================================================================
 * APARATO: HEALTH PROBE HANDLERS
 * CLASIFICACIÓN: API HANDLER (ESTRATO L4)
 * RESPONSABILIDAD: SONDAS DE VIDA DEL SERVICIO Y SUS DEPENDENCIAS
 * =================================================================
 */

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health — sonda de vida mínima.
pub async fn handle_liveness() -> &'static str {
    "STATUS_OK"
}

/// GET /api/v1/health — estado agregado del servicio.
pub async fn handle_service_health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": if state.driver_registry.is_shutting_down() { "draining" } else { "ok" },
        "environment": format!("{:?}", state.runtime_settings.environment).to_lowercase(),
    }))
}

/// GET /api/v1/health/github — salud del presupuesto del Forge.
pub async fn handle_github_health(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.forge_gateway.rate_limit_snapshot();
    let budget_status = match snapshot.remaining {
        Some(remaining) if remaining < 100 => "degraded",
        Some(_) => "ok",
        None => "unobserved",
    };

    Json(json!({
        "status": budget_status,
        "rate_limit_remaining": snapshot.remaining,
    }))
}

/// GET /api/v1/health/database — sonda de ida y vuelta del Ledger.
pub async fn handle_database_health(
    State(state): State<AppState>,
) -> (StatusCode, Json<Value>) {
    let probe = async {
        let connection = state.database_client.acquire().await?;
        connection.query("SELECT 1", ()).await?;
        Ok::<_, imq_infra_db::DbError>(())
    };

    match probe.await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(ledger_fault) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unavailable",
                "detail": ledger_fault.to_string(),
            })),
        ),
    }
}
