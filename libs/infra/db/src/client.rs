// [libs/infra/db/src/client.rs]
/*!
 * =================================================================
 * APARATO: DATABASE CONNECTION CLIENT (POOL SERIALIZADO)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: POOL DE CONEXIONES EXCLUSIVAS Y BOOTSTRAP DE ESQUEMA
 *
 * VISION:
 * 1. EXCLUSIVE LEASES: N conexiones pre-abiertas tras un semáforo;
 *    'acquire' entrega uso exclusivo con retorno RAII al pool. Con el
 *    pool saturado, los llamadores esperan su turno.
 * 2. PRAGMA DISCIPLINE: Cada conexión se configura una sola vez en el
 *    arranque: WAL, claves foráneas, busy_timeout 5s, synchronous
 *    NORMAL y temp store en memoria.
 * 3. SCHEMA FIRST: El esquema íntegro se aplica dentro de 'connect',
 *    antes de que exista cualquier repositorio.
 * 4. MEMORY ANCHOR: En modo ':memory:' una conexión ancla mantiene
 *    viva la base compartida evitando que SQLite la purgue.
 * =================================================================
 */

use std::ops::Deref;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use libsql::{Builder, Connection, Database};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, instrument};

use crate::errors::DbError;
use crate::schema::apply_full_schema;

/// Tamaño por defecto del pool de conexiones.
pub const DEFAULT_POOL_SIZE: usize = 5;

/// Espera máxima por un arriendo antes de declarar el pool agotado.
const LEASE_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

struct PoolCore {
    idle_connections: Mutex<Vec<Connection>>,
    lease_semaphore: Arc<Semaphore>,
    /// Mantiene viva la base en memoria evitando que SQLite la purgue.
    _memory_persistence_anchor: Option<Connection>,
    _database_driver: Database,
}

/// Cliente de persistencia compartido por todos los estratos.
#[derive(Clone)]
pub struct DbClient {
    pool_core: Arc<PoolCore>,
}

impl DbClient {
    /// Abre la base, configura cada conexión del pool y aplica el
    /// esquema íntegro antes de devolver el control.
    #[instrument(skip(database_path))]
    pub async fn connect(database_path: &str, pool_size: usize) -> Result<Self, DbError> {
        if database_path.is_empty() {
            return Err(DbError::ConnectionError(
                "DATABASE_PATH_UNDEFINED".to_string(),
            ));
        }

        let effective_pool_size = pool_size.max(1);
        info!(
            "🔌 [DATABASE]: Opening ledger at [{}] with pool of {}.",
            database_path, effective_pool_size
        );

        let database_driver = Builder::new_local(database_path)
            .build()
            .await
            .map_err(|fault| DbError::ConnectionError(fault.to_string()))?;

        let is_memory_mode =
            database_path.contains(":memory:") || database_path.contains("mode=memory");

        // Ancla de memoria: abierta ANTES de cualquier otra operación para
        // que el esquema resida en un segmento compartido.
        let memory_anchor = if is_memory_mode {
            let anchor_connection = database_driver
                .connect()
                .map_err(|fault| DbError::ConnectionError(fault.to_string()))?;
            Some(anchor_connection)
        } else {
            None
        };

        // Bootstrap del esquema sobre una conexión dedicada (o el ancla).
        {
            let bootstrap_connection = match &memory_anchor {
                Some(anchor) => anchor.clone(),
                None => database_driver
                    .connect()
                    .map_err(|fault| DbError::ConnectionError(fault.to_string()))?,
            };
            Self::apply_connection_pragmas(&bootstrap_connection).await?;
            apply_full_schema(&bootstrap_connection).await?;
        }

        // Pre-apertura del pool con PRAGMAs por conexión.
        let mut pool_connections = Vec::with_capacity(effective_pool_size);
        for _ in 0..effective_pool_size {
            let pooled_connection = database_driver
                .connect()
                .map_err(|fault| DbError::ConnectionError(fault.to_string()))?;
            Self::apply_connection_pragmas(&pooled_connection).await?;
            pool_connections.push(pooled_connection);
        }

        debug!("⚓ [DATABASE]: Schema applied; pool solidified.");

        Ok(Self {
            pool_core: Arc::new(PoolCore {
                idle_connections: Mutex::new(pool_connections),
                lease_semaphore: Arc::new(Semaphore::new(effective_pool_size)),
                _memory_persistence_anchor: memory_anchor,
                _database_driver: database_driver,
            }),
        })
    }

    /// Adquiere una conexión en uso exclusivo. Con el pool saturado el
    /// llamador espera; la espera agotada emerge como
    /// `ConnectionPoolExhausted`.
    pub async fn acquire(&self) -> Result<PooledConnection, DbError> {
        let lease_permit = tokio::time::timeout(
            LEASE_ACQUIRE_TIMEOUT,
            self.pool_core.lease_semaphore.clone().acquire_owned(),
        )
        .await
        .map_err(|_| DbError::ConnectionPoolExhausted)?
        .map_err(|_| DbError::ConnectionPoolExhausted)?;

        let leased_connection = {
            let mut idle_guard = self
                .pool_core
                .idle_connections
                .lock()
                .expect("FATAL: Connection pool lock poisoned.");
            idle_guard.pop()
        }
        .ok_or(DbError::ConnectionPoolExhausted)?;

        Ok(PooledConnection {
            connection: Some(leased_connection),
            pool_core: Arc::clone(&self.pool_core),
            _lease_permit: lease_permit,
        })
    }

    /// Configuración única por conexión (disciplina PRAGMA).
    async fn apply_connection_pragmas(connection: &Connection) -> Result<(), DbError> {
        // journal_mode y busy_timeout devuelven una fila: se consultan, no se ejecutan.
        connection
            .query("PRAGMA journal_mode=WAL", ())
            .await
            .map_err(DbError::QueryError)?;
        connection
            .query("PRAGMA busy_timeout=5000", ())
            .await
            .map_err(DbError::QueryError)?;

        for pragma_statement in [
            "PRAGMA foreign_keys=ON",
            "PRAGMA synchronous=NORMAL",
            "PRAGMA temp_store=MEMORY",
        ] {
            connection
                .execute(pragma_statement, ())
                .await
                .map_err(DbError::QueryError)?;
        }
        Ok(())
    }
}

/// Arriendo exclusivo de una conexión del pool (retorno RAII).
pub struct PooledConnection {
    connection: Option<Connection>,
    pool_core: Arc<PoolCore>,
    _lease_permit: OwnedSemaphorePermit,
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Self::Target {
        self.connection
            .as_ref()
            .expect("INVARIANT: leased connection present until drop")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(returned_connection) = self.connection.take() {
            if let Ok(mut idle_guard) = self.pool_core.idle_connections.lock() {
                idle_guard.push(returned_connection);
            }
        }
    }
}
