// [libs/infra/db/src/schema.rs]
/**
 * =================================================================
 * APARATO: SOVEREIGN DATABASE SCHEMA
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: GOBERNANZA ESTRUCTURAL E IDEMPOTENCIA TOTAL
 *
 * VISION:
 * 1. DETERMINISM: El esquema íntegro se declara aquí y se aplica en el
 *    arranque, antes de que exista cualquier componente.
 * 2. IDEMPOTENCIA: Tablas con IF NOT EXISTS e índices re-aplicables;
 *    el arranque repetido es un no-op estructural.
 * 3. CONVENTIONS: Booleanos como INTEGER 0/1, instantes como REAL
 *    epoch segundos, fila única id=1 para la configuración.
 * =================================================================
 */

use libsql::Connection;
use tracing::{debug, instrument};

use crate::errors::DbError;

/**
 * ESTRATO 1: SOLIDIFICACIÓN (Génesis de Tablas)
 */
const CORE_TABLES: &[(&str, &str)] = &[
    ("TABLE_REPOSITORIES", r#"
        CREATE TABLE IF NOT EXISTS repositories (
            id TEXT PRIMARY KEY,
            owner TEXT NOT NULL,
            name TEXT NOT NULL,
            full_name TEXT NOT NULL UNIQUE,
            default_branch TEXT NOT NULL DEFAULT 'main',
            created_at REAL NOT NULL
        );
    "#),
    ("TABLE_PULL_REQUESTS", r#"
        CREATE TABLE IF NOT EXISTS pull_requests (
            id TEXT PRIMARY KEY,
            repository_id TEXT NOT NULL REFERENCES repositories(id),
            number INTEGER NOT NULL,
            title TEXT NOT NULL,
            author TEXT NOT NULL,
            base_branch TEXT NOT NULL,
            head_branch TEXT NOT NULL,
            head_sha TEXT NOT NULL,
            is_conflicted INTEGER NOT NULL DEFAULT 0,
            is_up_to_date INTEGER NOT NULL DEFAULT 0,
            created_at REAL NOT NULL,
            updated_at REAL NOT NULL,
            UNIQUE(repository_id, number)
        );
    "#),
    ("TABLE_QUEUES", r#"
        CREATE TABLE IF NOT EXISTS queues (
            id TEXT PRIMARY KEY,
            repository_id TEXT NOT NULL REFERENCES repositories(id),
            base_branch TEXT NOT NULL,
            created_at REAL NOT NULL,
            UNIQUE(repository_id, base_branch)
        );
    "#),
    ("TABLE_QUEUE_ENTRIES", r#"
        CREATE TABLE IF NOT EXISTS queue_entries (
            id TEXT PRIMARY KEY,
            queue_id TEXT NOT NULL REFERENCES queues(id),
            pull_request_id TEXT NOT NULL REFERENCES pull_requests(id),
            position INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            enqueued_at REAL NOT NULL,
            started_at REAL,
            completed_at REAL
        );
    "#),
    ("TABLE_CHECKS", r#"
        CREATE TABLE IF NOT EXISTS checks (
            id TEXT PRIMARY KEY,
            entry_id TEXT NOT NULL REFERENCES queue_entries(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            kind TEXT NOT NULL,
            kind_config TEXT NOT NULL DEFAULT '{}',
            status TEXT NOT NULL DEFAULT 'pending',
            configuration TEXT NOT NULL DEFAULT '{}',
            started_at REAL,
            completed_at REAL,
            output TEXT NOT NULL DEFAULT ''
        );
    "#),
    ("TABLE_CONFIGURATIONS", r#"
        CREATE TABLE IF NOT EXISTS configurations (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            payload TEXT NOT NULL,
            updated_at REAL NOT NULL
        );
    "#),
    ("TABLE_EVENT_POLL_HISTORY", r#"
        CREATE TABLE IF NOT EXISTS event_poll_history (
            repository_full_name TEXT PRIMARY KEY,
            last_event_id TEXT,
            polled_at REAL NOT NULL
        );
    "#),
];

/**
 * ESTRATO 2: ENDURECIMIENTO (Índices de Aceleración)
 */
const ACCELERATION_INDEXES: &[(&str, &str)] = &[
    (
        "IDX_ENTRIES_QUEUE_ORDER",
        "CREATE INDEX IF NOT EXISTS idx_entries_queue_order ON queue_entries(queue_id, status, position);",
    ),
    (
        "IDX_ENTRIES_PULL_REQUEST",
        "CREATE INDEX IF NOT EXISTS idx_entries_pull_request ON queue_entries(pull_request_id);",
    ),
    (
        "IDX_CHECKS_ENTRY",
        "CREATE INDEX IF NOT EXISTS idx_checks_entry ON checks(entry_id);",
    ),
    (
        "IDX_PULL_REQUESTS_REPOSITORY",
        "CREATE INDEX IF NOT EXISTS idx_pull_requests_repository ON pull_requests(repository_id);",
    ),
];

/// Aplica el esquema íntegro (tablas, evoluciones, índices) de forma
/// idempotente sobre la conexión indicada.
#[instrument(skip(connection))]
pub async fn apply_full_schema(connection: &Connection) -> Result<(), DbError> {
    for (table_label, table_ddl) in CORE_TABLES {
        connection
            .execute(table_ddl, ())
            .await
            .map_err(DbError::QueryError)?;
        debug!("🧱 [SCHEMA]: {} solidified.", table_label);
    }

    for (index_label, index_ddl) in ACCELERATION_INDEXES {
        connection
            .execute(index_ddl, ())
            .await
            .map_err(DbError::QueryError)?;
        debug!("⚡ [SCHEMA]: {} hardened.", index_label);
    }

    Ok(())
}
