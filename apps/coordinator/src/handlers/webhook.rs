// [apps/coordinator/src/handlers/webhook.rs]
/*!
 * =================================================================
 * APARATO: WEBHOOK INTAKE HANDLER (HMAC GUARDED)
 * CLASIFICACIÓN: API HANDLER (ESTRATO L4)
 * RESPONSABILIDAD: INGESTA VERIFICADA DE EVENTOS PUSH DEL FORGE
 *
 * VISION:
 * 1. SIGNATURE SOVEREIGNTY: La firma X-Hub-Signature-256 se verifica
 *    con HMAC-SHA256 sobre el cuerpo crudo en comparación de tiempo
 *    constante; un byte alterado en cuerpo o secreto rechaza.
 * 2. NORMALIZE THEN ENQUEUE: El payload del Forge se traduce al
 *    contrato interno y viaja por el mismo canal serializado que el
 *    polling; el motor fusiona duplicados.
 * =================================================================
 */

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use tracing::{debug, instrument, warn};

use imq_domain_models::{EventKind, NormalizedEvent};

use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Verifica la firma `sha256=<hex>` contra el cuerpo crudo.
///
/// Comparación en tiempo constante vía `Mac::verify_slice`.
pub fn verify_webhook_signature(
    secret: &[u8],
    raw_body: &[u8],
    signature_header: &str,
) -> bool {
    let Some(hex_signature) = signature_header.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(claimed_signature) = hex::decode(hex_signature) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(raw_body);
    mac.verify_slice(&claimed_signature).is_ok()
}

/// Traduce un payload `pull_request` del Forge al contrato interno.
pub fn normalize_webhook_payload(event_type: &str, payload: &Value) -> Option<NormalizedEvent> {
    if event_type != "pull_request" {
        return None;
    }

    let action = payload.get("action")?.as_str()?;
    let repository_full_name = payload
        .get("repository")?
        .get("full_name")?
        .as_str()?
        .to_string();
    let pr_number = payload.get("pull_request")?.get("number")?.as_u64()?;
    let head_sha = payload
        .get("pull_request")
        .and_then(|pr| pr.get("head"))
        .and_then(|head| head.get("sha"))
        .and_then(|sha| sha.as_str())
        .map(str::to_string);
    let label = payload
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
        repository_full_name,
        pr_number,
        head_sha,
        label,
    })
}

/// POST / — intake de webhooks del Forge.
#[instrument(skip(state, headers, raw_body))]
pub async fn handle_webhook_intake(
    State(state): State<AppState>,
    headers: HeaderMap,
    raw_body: Bytes,
) -> (StatusCode, Json<Value>) {
    // 1. SECRETO CONFIGURADO (entorno manda; la fila única respalda)
    let configured_secret = match &state.runtime_settings.webhook_secret {
        Some(secret) => secret.clone(),
        None => match state.configuration_repository.load().await {
            Ok(configuration) => match configuration.webhook_secret {
                Some(secret) => secret,
                None => {
                    warn!("⛔ [WEBHOOK]: Intake without a configured secret refused.");
                    return (
                        StatusCode::SERVICE_UNAVAILABLE,
                        Json(json!({ "error": "WEBHOOK_SECRET_UNCONFIGURED" })),
                    );
                }
            },
            Err(_) => {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "LEDGER_FAULT" })),
                )
            }
        },
    };

    // 2. FIRMA HMAC SOBRE EL CUERPO CRUDO
    let signature_header = headers
        .get("x-hub-signature-256")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if !verify_webhook_signature(configured_secret.as_bytes(), &raw_body, signature_header) {
        warn!("⛔ [WEBHOOK]: Signature rejected.");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "SIGNATURE_REJECTED" })),
        );
    }

    // 3. NORMALIZACIÓN DEL PAYLOAD
    let event_type = headers
        .get("x-github-event")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    let payload: Value = match serde_json::from_slice(&raw_body) {
        Ok(payload) => payload,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "MALFORMED_PAYLOAD" })),
            )
        }
    };

    let Some(normalized) = normalize_webhook_payload(event_type, &payload) else {
        debug!("💤 [WEBHOOK]: Event '{}' outside the engine vocabulary.", event_type);
        return (StatusCode::OK, Json(json!({ "ignored": true })));
    };

    // 4. ENCOLADO HACIA LA ADMISIÓN SERIALIZADA
    if state.submit_event(normalized).await {
        (StatusCode::ACCEPTED, Json(json!({ "accepted": true })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "INTAKE_DRAINING" })),
        )
    }
}
