// [libs/domain/models/src/configuration.rs]
/*!
 * =================================================================
 * APARATO: SYSTEM CONFIGURATION CONTRACT
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CONFIGURACIÓN OPERATIVA DE FILA ÚNICA
 *
 * VISION:
 * 1. SINGLETON ROW: La configuración vive en una única fila (id=1);
 *    toda mutación es un reemplazo íntegro difundido por el bus.
 * 2. ENV SHADOWING: El secreto de webhook y la URL del proxy son
 *    copias de sólo lectura del entorno; el PUT de la API nunca
 *    los altera.
 * =================================================================
 */

use serde::{Deserialize, Serialize};

use crate::check::CheckConfiguration;

/// Método de fusión solicitado al Forge.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MergeMethod {
    Merge,
    #[default]
    Squash,
    Rebase,
}

impl MergeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Squash => "squash",
            Self::Rebase => "rebase",
        }
    }
}

/// Plantillas de notificación publicadas como comentarios en el PR.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationTemplates {
    /// Fusión completada con éxito.
    pub merge_success: String,
    /// Suite de checks fallida; la entrada abandona la cola.
    pub checks_failed: String,
    /// Actualización de rama fallida (incluye conflictos).
    pub branch_update_failed: String,
    /// Operación de fusión rechazada por el Forge.
    pub merge_failed: String,
}

impl Default for NotificationTemplates {
    fn default() -> Self {
        Self {
            merge_success: "✅ Successfully merged via IMQ!".to_string(),
            checks_failed: "❌ Checks failed. Removed from merge queue.".to_string(),
            branch_update_failed:
                "❌ Branch update failed (conflicts with the base branch?). Removed from merge queue."
                    .to_string(),
            merge_failed: "❌ Merge was rejected by the forge. Removed from merge queue."
                .to_string(),
        }
    }
}

/// Configuración operativa del coordinador (entidad de fila única).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemConfiguration {
    /// Etiqueta disparadora que admite un PR a su cola.
    pub trigger_label: String,
    /// Suite de checks aplicada a cada entrada.
    pub check_configuration: CheckConfiguration,
    /// Método de fusión por defecto.
    pub merge_method: MergeMethod,
    /// Plantillas de comentarios de notificación.
    pub notification_templates: NotificationTemplates,
    /// Copia de sólo lectura del secreto HMAC del webhook (del entorno).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_secret: Option<String>,
    /// Copia de sólo lectura de la URL del proxy de webhooks (del entorno).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_proxy_url: Option<String>,
}

impl Default for SystemConfiguration {
    fn default() -> Self {
        Self {
            trigger_label: "merge-queue".to_string(),
            check_configuration: CheckConfiguration::default(),
            merge_method: MergeMethod::default(),
            notification_templates: NotificationTemplates::default(),
            webhook_secret: None,
            webhook_proxy_url: None,
        }
    }
}

impl SystemConfiguration {
    /// Reinstala los valores de fábrica preservando las copias del entorno.
    pub fn reset_preserving_environment(&self) -> Self {
        Self {
            webhook_secret: self.webhook_secret.clone(),
            webhook_proxy_url: self.webhook_proxy_url.clone(),
            ..Self::default()
        }
    }
}
