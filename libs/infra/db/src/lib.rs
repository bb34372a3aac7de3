// [libs/infra/db/src/lib.rs]
/*!
 * =================================================================
 * APARATO: PERSISTENCE LIBRARY BARREL
 * CLASIFICACIÓN: INFRASTRUCTURE LIB (ESTRATO L3)
 * RESPONSABILIDAD: EXPOSICIÓN NOMINAL DEL CLIENTE Y REPOSITORIOS
 *
 * VISION:
 * 1. SYNCHRONOUS SCHEMA: 'DbClient::connect' aplica el esquema íntegro
 *    antes de devolver el control; ningún componente se construye
 *    sobre una base a medio materializar.
 * 2. REPOSITORY PER AGGREGATE: Un repositorio tipado por entidad;
 *    el SQL vive aquí y en ningún otro estrato.
 * =================================================================
 */

pub mod client;
pub mod errors;
pub mod repositories;
pub mod schema;
mod time_codec;

pub use client::{DbClient, PooledConnection};
pub use errors::DbError;
pub use repositories::{
    CheckRepository, ConfigurationRepository, PollCursorRepository, PullRequestRepository,
    QueueEntryRepository, QueueRepository, RepositoryCatalog,
};
