// [libs/core/checks/src/errors.rs]
//! =================================================================
//! APARATO: CHECK ERROR CATALOG
//! RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DE EJECUCIÓN
//! =================================================================

use thiserror::Error;

use imq_infra_forge::GatewayError;

#[derive(Error, Debug)]
pub enum CheckError {
    /// La especificación del check es estructuralmente ilegal.
    #[error("[L2_CHECK_FAULT]: INVALID_CONFIGURATION -> {0}")]
    InvalidConfiguration(String),

    /// El script configurado no existe en el sistema de archivos.
    #[error("[L2_CHECK_FAULT]: SCRIPT_NOT_FOUND -> {0}")]
    ScriptNotFound(String),

    /// El script existe pero carece del bit de ejecución.
    #[error("[L2_CHECK_FAULT]: SCRIPT_NOT_EXECUTABLE -> {0}")]
    ScriptNotExecutable(String),

    /// El sondeo del run agotó su presupuesto de intentos.
    #[error("[L2_CHECK_FAULT]: POLLING_TIMEOUT")]
    PollingTimeout,

    /// El proceso hijo no pudo lanzarse o colapsó fuera de contrato.
    #[error("[L2_CHECK_FAULT]: PROCESS_EXECUTION_FAILED -> {0}")]
    ProcessExecutionFailed(String),

    /// Fallo de la pasarela del Forge durante dispatch o sondeo.
    #[error("[L2_CHECK_FAULT]: GATEWAY_COLLAPSE -> {0}")]
    Gateway(#[from] GatewayError),
}
