// [apps/coordinator/src/handlers/config.rs]
/*!
 * =================================================================
 * APARATO: SYSTEM CONFIGURATION HANDLERS
 * CLASIFICACIÓN: API HANDLER (ESTRATO L4)
 * RESPONSABILIDAD: LECTURA Y REEMPLAZO DE LA CONFIGURACIÓN DE FILA ÚNICA
 *
 * El secreto del webhook y la URL del proxy son copias del entorno:
 * el GET los enmascara y el PUT jamás los altera.
 * =================================================================
 */

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use imq_domain_models::{
    CheckConfiguration, MergeMethod, NotificationTemplates, SystemConfiguration,
};

use crate::handlers::ApiFault;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ConfigurationPayload {
    pub trigger_label: String,
    #[serde(default)]
    pub check_configuration: CheckConfiguration,
    #[serde(default)]
    pub merge_method: MergeMethod,
    #[serde(default)]
    pub notification_templates: Option<NotificationTemplates>,
}

/// Renderiza la configuración con el secreto enmascarado.
fn render_redacted(configuration: &SystemConfiguration) -> Value {
    let mut rendered = serde_json::to_value(configuration).unwrap_or(Value::Null);
    if let Some(secret_slot) = rendered.get_mut("webhook_secret") {
        *secret_slot = json!("********");
    }
    rendered
}

/// GET /api/v1/config
pub async fn handle_get_config(
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiFault> {
    let configuration = state.configuration_repository.load().await?;
    Ok(Json(render_redacted(&configuration)))
}

/// PUT /api/v1/config — reemplazo íntegro validado.
pub async fn handle_put_config(
    State(state): State<AppState>,
    Json(payload): Json<ConfigurationPayload>,
) -> Result<Json<Value>, ApiFault> {
    if payload.trigger_label.trim().is_empty() {
        return Err(ApiFault::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "INVALID_REQUEST",
            "trigger_label must not be empty",
        ));
    }

    payload.check_configuration.validate().map_err(|fault| {
        ApiFault::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "INVALID_CHECK_SUITE",
            fault.to_string(),
        )
    })?;

    let current = state.configuration_repository.load().await?;
    let replacement = SystemConfiguration {
        trigger_label: payload.trigger_label,
        check_configuration: payload.check_configuration,
        merge_method: payload.merge_method,
        notification_templates: payload
            .notification_templates
            .unwrap_or(current.notification_templates),
        // Copias del entorno: intocables desde la API.
        webhook_secret: current.webhook_secret,
        webhook_proxy_url: current.webhook_proxy_url,
    };

    state.configuration_repository.store(&replacement).await?;

    // Una suite nueva invalida todo veredicto memoizado.
    state.check_engine.cache().clear();
    state.event_bus.emit_config_updated(replacement.clone());

    info!("⚙️ [CONFIG]: Configuration replaced via API.");
    Ok(Json(render_redacted(&replacement)))
}

/// POST /api/v1/config/reset — valores de fábrica.
pub async fn handle_reset_config(
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiFault> {
    let factory = state.configuration_repository.reset().await?;
    state.check_engine.cache().clear();
    state.event_bus.emit_config_updated(factory.clone());

    info!("⚙️ [CONFIG]: Configuration reset to factory values.");
    Ok(Json(render_redacted(&factory)))
}
