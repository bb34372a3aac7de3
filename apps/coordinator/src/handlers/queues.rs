// [apps/coordinator/src/handlers/queues.rs]
/*!
 * =================================================================
 * APARATO: QUEUE ADMINISTRATION HANDLERS
 * CLASIFICACIÓN: API HANDLER (ESTRATO L4)
 * RESPONSABILIDAD: SUPERFICIE REST DE COLAS, ENTRADAS Y REORDEN
 * =================================================================
 */

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::handlers::ApiFault;
use crate::services::queue_engine::QueueEngine;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateQueuePayload {
    pub repository_full_name: String,
    pub base_branch: String,
}

#[derive(Debug, Deserialize)]
pub struct AddEntryPayload {
    pub pr_number: u64,
}

#[derive(Debug, Deserialize)]
pub struct ReorderPayload {
    pub entry_ids: Vec<String>,
}

/// GET /api/v1/queues — listado con tamaños vivos.
pub async fn handle_list_queues(
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiFault> {
    let queues = state.queue_repository.list_all().await?;

    let mut rendered_queues = Vec::with_capacity(queues.len());
    for queue in queues {
        let live_entries = state.queue_entry_repository.list_live(&queue.id).await?;
        rendered_queues.push(json!({
            "queue": queue,
            "live_entry_count": live_entries.len(),
        }));
    }

    Ok(Json(json!({ "queues": rendered_queues })))
}

/// POST /api/v1/queues — alta idempotente sobre (repo, rama).
pub async fn handle_create_queue(
    State(state): State<AppState>,
    Json(payload): Json<CreateQueuePayload>,
) -> Result<(StatusCode, Json<Value>), ApiFault> {
    let queue = QueueEngine::create_queue(
        &state,
        &payload.repository_full_name,
        &payload.base_branch,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(json!({ "queue": queue }))))
}

/// GET /api/v1/queues/{id} — cola con su orden vivo.
pub async fn handle_get_queue(
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

    Ok(Json(json!({ "queue": queue, "entries": live_entries })))
}

/// DELETE /api/v1/queues/{id}
pub async fn handle_delete_queue(
    State(state): State<AppState>,
    Path(queue_id): Path<String>,
) -> Result<StatusCode, ApiFault> {
    QueueEngine::delete_queue(&state, &queue_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/queues/{id}/entries
pub async fn handle_list_entries(
    State(state): State<AppState>,
    Path(queue_id): Path<String>,
) -> Result<Json<Value>, ApiFault> {
    if state.queue_repository.find_by_id(&queue_id).await?.is_none() {
        return Err(ApiFault::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("queue {}", queue_id),
        ));
    }
    let live_entries = state.queue_entry_repository.list_live(&queue_id).await?;
    Ok(Json(json!({ "entries": live_entries })))
}

/// POST /api/v1/queues/{id}/entries — alta administrativa de un PR.
pub async fn handle_add_entry(
    State(state): State<AppState>,
    Path(queue_id): Path<String>,
    Json(payload): Json<AddEntryPayload>,
) -> Result<(StatusCode, Json<Value>), ApiFault> {
    let entry = QueueEngine::add_entry(&state, &queue_id, payload.pr_number).await?;
    Ok((StatusCode::CREATED, Json(json!({ "entry": entry }))))
}

/// DELETE /api/v1/queues/{id}/entries/{entry_id}
///
/// Una entrada en ejecución recibe una solicitud de cancelación
/// cooperativa (202); una pendiente cae de inmediato.
pub async fn handle_remove_entry(
    State(state): State<AppState>,
    Path((_queue_id, entry_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiFault> {
    QueueEngine::remove_entry(&state, &entry_id).await?;
    Ok(StatusCode::ACCEPTED)
}

/// PUT /api/v1/queues/{id}/reorder — permutación del orden vivo.
pub async fn handle_reorder(
    State(state): State<AppState>,
    Path(queue_id): Path<String>,
    Json(payload): Json<ReorderPayload>,
) -> Result<Json<Value>, ApiFault> {
    let reordered = QueueEngine::reorder(&state, &queue_id, &payload.entry_ids).await?;
    Ok(Json(json!({ "entries": reordered })))
}
