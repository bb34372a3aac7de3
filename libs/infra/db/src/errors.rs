// [libs/infra/db/src/errors.rs]
/*!
 * =================================================================
 * APARATO: DATABASE ERROR CATALOG
 * CLASIFICACIÓN: INFRASTRUCTURE CORE (ESTRATO L3)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DE PERSISTENCIA
 * =================================================================
 */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    /// Error de enlace físico con el motor libSQL.
    #[error("[L3_DB_NET_FAULT]: DATABASE_UPLINK_SEVERED -> {0}")]
    ConnectionError(String),

    /// El pool agotó sus arriendos y la espera fue cancelada.
    #[error("[L3_DB_POOL_FAULT]: CONNECTION_POOL_EXHAUSTED")]
    ConnectionPoolExhausted,

    /// Error de sintaxis o ejecución devuelto por el motor libSQL.
    #[error("[L3_DB_QUERY_FAULT]: SQL_QUERY_REJECTED -> {0}")]
    QueryError(#[from] libsql::Error),

    /// Violación de restricción (unicidad, clave foránea).
    #[error("[L3_DB_FAULT]: CONSTRAINT_VIOLATION -> {0}")]
    ConstraintViolation(String),

    /// Fallo en la transformación de tipos entre SQLite y el dominio.
    #[error("[L3_DB_MAPPING_FAULT]: DATA_MAPPING_VIOLATION -> {0}")]
    MappingError(String),

    /// La entidad solicitada no existe en las tablas activas.
    #[error("[L3_DB_FAULT]: IDENTIFIER_NOT_FOUND -> {0}")]
    NotFound(String),

    /// Petición semánticamente ilegal (transición prohibida, permutación rota).
    #[error("[L3_DB_FAULT]: INVALID_OPERATION -> {0}")]
    InvalidOperation(String),
}

impl DbError {
    /// Clasifica un rechazo del motor como violación de restricción
    /// cuando la firma del mensaje lo delata.
    pub fn classify(fault: libsql::Error) -> Self {
        let rendered = fault.to_string();
        if rendered.contains("UNIQUE constraint failed")
            || rendered.contains("FOREIGN KEY constraint failed")
        {
            Self::ConstraintViolation(rendered)
        } else {
            Self::QueryError(fault)
        }
    }
}
