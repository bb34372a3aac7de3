// [libs/infra/forge/src/errors.rs]
//! =================================================================
//! APARATO: FORGE ERROR CATALOG
//! RESPONSABILIDAD: TAXONOMÍA SEMÁNTICA DE FALLOS DEL FORGE
//! =================================================================

use thiserror::Error;

/// Taxonomía estable de fallos del cliente Forge.
///
/// La clasificación gobierna la política de reintentos: sólo
/// `Network` y `Http` 5xx son transitorios; el resto es accionable
/// por el operador y se propaga sin reintento.
#[derive(Error, Debug)]
pub enum ForgeError {
    /// Credenciales ausentes o revocadas (HTTP 401).
    #[error("[L3_FORGE_AUTH_FAULT]: TOKEN_REJECTED")]
    Unauthorized,

    /// Acceso denegado por política del Forge (HTTP 403 sin rate-limit).
    #[error("[L3_FORGE_AUTH_FAULT]: ACCESS_FORBIDDEN")]
    Forbidden,

    /// El recurso solicitado no existe (HTTP 404).
    #[error("[L3_FORGE_FAULT]: RESOURCE_NOT_FOUND")]
    NotFound,

    /// El Forge rechazó la semántica de la petición (HTTP 422).
    #[error("[L3_FORGE_FAULT]: VALIDATION_REJECTED -> {0}")]
    ValidationFailed(String),

    /// Presupuesto de rate-limit agotado (403 con firma 'rate limit').
    #[error("[L3_FORGE_BUDGET_FAULT]: RATE_LIMIT_EXHAUSTED")]
    RateLimitExceeded,

    /// Estado HTTP no clasificado (incluye 5xx antes del reintento).
    #[error("[L3_FORGE_HTTP_FAULT]: HTTP_{status} -> {message}")]
    Http { status: u16, message: String },

    /// Fallo de transporte (DNS, TLS, conexión, timeout de socket).
    #[error("[L3_FORGE_NET_FAULT]: TRANSPORT_SEVERED -> {0}")]
    Network(#[from] reqwest::Error),

    /// El cuerpo de la respuesta no respeta el contrato esperado.
    #[error("[L3_FORGE_DECODE_FAULT]: ENVELOPE_CORRUPTION -> {0}")]
    Decode(#[from] serde_json::Error),

    /// La política de reintentos agotó todos los intentos.
    #[error("[L3_FORGE_RETRY_FAULT]: ALL_ATTEMPTS_FAILED after {attempts} -> {last}")]
    AllAttemptsFailed {
        attempts: u32,
        #[source]
        last: Box<ForgeError>,
    },

    /// Señal interna de GET condicional: el recurso no cambió (HTTP 304).
    #[error("[L3_FORGE_SIGNAL]: NOT_MODIFIED")]
    NotModified,
}

impl ForgeError {
    /// Un fallo transitorio es candidato legítimo de reintento.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// El presupuesto del Forge se agotó: el pipeline debe pausar, no evictar.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::RateLimitExceeded => true,
            Self::AllAttemptsFailed { last, .. } => last.is_rate_limited(),
            _ => false,
        }
    }
}

/// Fallo de la pasarela: envuelve el error del cliente con la
/// operación de dominio que lo originó.
#[derive(Error, Debug)]
#[error("[L3_GATEWAY_FAULT]: OPERATION '{operation}' COLLAPSED -> {source}")]
pub struct GatewayError {
    /// Operación de dominio (get_pull_request, merge_pull_request, ...).
    pub operation: &'static str,
    #[source]
    pub source: ForgeError,
}

impl GatewayError {
    pub fn new(operation: &'static str, source: ForgeError) -> Self {
        Self { operation, source }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.source.is_rate_limited()
    }

    /// Fallos accionables por el operador (el pipeline evicta la entrada).
    pub fn is_user_actionable(&self) -> bool {
        matches!(
            self.source,
            ForgeError::Unauthorized
                | ForgeError::Forbidden
                | ForgeError::NotFound
                | ForgeError::ValidationFailed(_)
        )
    }
}
