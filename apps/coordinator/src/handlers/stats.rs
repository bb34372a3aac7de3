// [apps/coordinator/src/handlers/stats.rs]
/*!
 * =================================================================
 * APARATO: METRICS & STATS HANDLERS
 * CLASIFICACIÓN: API HANDLER (ESTRATO L4)
 * RESPONSABILIDAD: LECTURAS DE SÓLO CONSULTA DEL PANÓPTICO
 * =================================================================
 */

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::handlers::ApiFault;
use crate::state::AppState;

/// GET /api/v1/stats — resumen agregado.
pub async fn handle_stats_summary(
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiFault> {
    let summary = state.metrics.summary();
    Ok(Json(serde_json::to_value(summary).unwrap_or(Value::Null)))
}

/// GET /api/v1/stats/queues/{id} — muestras de una cola.
pub async fn handle_queue_stats(
    State(state): State<AppState>,
    Path(queue_id): Path<String>,
) -> Result<Json<Value>, ApiFault> {
    let queue = state
        .queue_repository
        .find_by_id(&queue_id)
        .await?
        .ok_or_else(|| {
            ApiFault::new(StatusCode::NOT_FOUND, "NOT_FOUND", format!("queue {}", queue_id))
        })?;

    let live_entries = state.queue_entry_repository.list_live(&queue.id).await?;
    let samples = state.metrics.processing_samples_for_queue(&queue.id);

    Ok(Json(json!({
        "queue_id": queue.id,
        "base_branch": queue.base_branch,
        "current_length": live_entries.len(),
        "processing_samples": samples,
    })))
}

/// GET /api/v1/stats/checks — veredictos acumulados y recientes.
pub async fn handle_check_stats(
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiFault> {
    let tallies = state.check_repository.outcome_tallies().await?;
    let rendered_tallies: Vec<Value> = tallies
        .into_iter()
        .map(|(status, count)| json!({ "status": status, "count": count }))
        .collect();

    Ok(Json(json!({
        "tallies": rendered_tallies,
        "recent": state.metrics.recent_check_samples(),
    })))
}

/// GET /api/v1/stats/github — presupuesto observado del Forge.
pub async fn handle_github_stats(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.forge_gateway.rate_limit_snapshot();
    Json(json!({
        "rate_limit_remaining": snapshot.remaining,
        "rate_limit_reset_epoch_seconds": snapshot.reset_epoch_seconds,
    }))
}
