// [apps/coordinator/src/handlers/mod.rs]
/*!
 * =================================================================
 * APARATO: API HANDLER HUB
 * CLASIFICACIÓN: API ADAPTER (ESTRATO L4)
 * RESPONSABILIDAD: ADAPTADORES HTTP FINOS SOBRE EL CONTRATO DEL MOTOR
 *
 * Los handlers marshalan; el motor decide. Todo fallo del dominio se
 * traduce aquí a su estado HTTP y sobre JSON {error, detail}.
 * =================================================================
 */

pub mod config;
pub mod health;
pub mod queues;
pub mod stats;
pub mod stream;
pub mod webhook;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use imq_infra_db::DbError;

use crate::services::queue_engine::EngineError;

/// Fallo de API con traducción semántica a HTTP.
pub struct ApiFault {
    pub status: StatusCode,
    pub label: &'static str,
    pub detail: String,
}

impl ApiFault {
    pub fn new(status: StatusCode, label: &'static str, detail: impl Into<String>) -> Self {
        Self {
            status,
            label,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiFault {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({
                "error": self.label,
                "detail": self.detail,
            })),
        )
            .into_response()
    }
}

impl From<EngineError> for ApiFault {
    fn from(fault: EngineError) -> Self {
        match &fault {
            EngineError::NotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", fault.to_string())
            }
            EngineError::Invalid(_) => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, "INVALID_REQUEST", fault.to_string())
            }
            EngineError::Gateway(_) => {
                Self::new(StatusCode::BAD_GATEWAY, "FORGE_UPSTREAM_FAULT", fault.to_string())
            }
            EngineError::Ledger(ledger_fault) => match ledger_fault {
                DbError::NotFound(_) => {
                    Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", fault.to_string())
                }
                DbError::InvalidOperation(_) => Self::new(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "INVALID_REQUEST",
                    fault.to_string(),
                ),
                _ => Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "LEDGER_FAULT",
                    fault.to_string(),
                ),
            },
        }
    }
}

impl From<DbError> for ApiFault {
    fn from(fault: DbError) -> Self {
        ApiFault::from(EngineError::Ledger(fault))
    }
}
