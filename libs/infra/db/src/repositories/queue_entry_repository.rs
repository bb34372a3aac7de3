// [libs/infra/db/src/repositories/queue_entry_repository.rs]
/*!
 * =================================================================
 * APARATO: QUEUE ENTRY OMNISCIENT REPOSITORY
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: ORDEN VIVO, TRANSICIONES MONÓTONAS Y RE-DENSIFICACIÓN
 *
 * VISION:
 * 1. LIVE ORDERING: El orden vivo de una cola son sus entradas
 *    pending/running; los estados terminales permanecen en el Ledger
 *    como historia pero abandonan la secuencia de posiciones.
 * 2. MONOTONIC TRANSITIONS: 'transition' es la única puerta de cambio
 *    de estado; el predicado del dominio veta toda arista ilegal.
 * 3. DENSITY INVARIANT: Tras cada remoción o transición terminal las
 *    posiciones vivas se re-densifican a {0..n-1} exactos.
 * =================================================================
 */

use libsql::{params, Row};
use tracing::{debug, instrument, warn};

use imq_domain_models::{EntryStatus, QueueEntry};

use crate::client::DbClient;
use crate::errors::DbError;
use crate::time_codec::{from_epoch_opt, from_epoch_seconds, to_epoch_opt, to_epoch_seconds};

const LIVE_STATUS_PREDICATE: &str = "status IN ('pending', 'running')";

pub struct QueueEntryRepository {
    database_client: DbClient,
}

impl QueueEntryRepository {
    pub fn new(client: DbClient) -> Self {
        Self {
            database_client: client,
        }
    }

    const SELECT_COLUMNS: &'static str =
        "id, queue_id, pull_request_id, position, status, enqueued_at, started_at, completed_at";

    fn map_row(row: &Row) -> Result<QueueEntry, DbError> {
        let raw_status = row.get::<String>(4)?;
        let status = EntryStatus::parse(&raw_status)
            .ok_or_else(|| DbError::MappingError(format!("unknown entry status '{}'", raw_status)))?;

        Ok(QueueEntry {
            id: row.get::<String>(0)?,
            queue_id: row.get::<String>(1)?,
            pull_request_id: row.get::<String>(2)?,
            position: row.get::<i64>(3)? as u32,
            status,
            enqueued_at: from_epoch_seconds(row.get::<f64>(5)?),
            started_at: from_epoch_opt(row.get::<Option<f64>>(6)?),
            completed_at: from_epoch_opt(row.get::<Option<f64>>(7)?),
        })
    }

    /// Admite una entrada pendiente en la cola de la posición de cola.
    #[instrument(skip(self))]
    pub async fn append(
        &self,
        queue_id: &str,
        pull_request_id: &str,
    ) -> Result<QueueEntry, DbError> {
        let connection = self.database_client.acquire().await?;

        let mut count_rows = connection
            .query(
                &format!(
                    "SELECT COUNT(*) FROM queue_entries WHERE queue_id = ?1 AND {}",
                    LIVE_STATUS_PREDICATE
                ),
                params![queue_id],
            )
            .await?;
        let tail_position = match count_rows.next().await? {
            Some(row) => row.get::<i64>(0)? as u32,
            None => 0,
        };

        let entry = QueueEntry::new(queue_id, pull_request_id, tail_position);
        connection
            .execute(
                "INSERT INTO queue_entries
                 (id, queue_id, pull_request_id, position, status, enqueued_at, started_at, completed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, NULL)",
                params![
                    entry.id.clone(),
                    entry.queue_id.clone(),
                    entry.pull_request_id.clone(),
                    entry.position as i64,
                    entry.status.as_str(),
                    to_epoch_seconds(entry.enqueued_at)
                ],
            )
            .await
            .map_err(DbError::classify)?;

        debug!(
            "➕ [ENTRIES]: Entry {} admitted at position {}.",
            entry.id, entry.position
        );
        Ok(entry)
    }

    pub async fn find_by_id(&self, entry_id: &str) -> Result<Option<QueueEntry>, DbError> {
        let connection = self.database_client.acquire().await?;
        let statement = format!(
            "SELECT {} FROM queue_entries WHERE id = ?1",
            Self::SELECT_COLUMNS
        );
        let mut rows = connection.query(&statement, params![entry_id]).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::map_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Entrada viva que referencia al PR dentro de cualquier cola.
    pub async fn find_live_by_pull_request(
        &self,
        pull_request_id: &str,
    ) -> Result<Option<QueueEntry>, DbError> {
        let connection = self.database_client.acquire().await?;
        let statement = format!(
            "SELECT {} FROM queue_entries WHERE pull_request_id = ?1 AND {}",
            Self::SELECT_COLUMNS,
            LIVE_STATUS_PREDICATE
        );
        let mut rows = connection.query(&statement, params![pull_request_id]).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::map_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Orden vivo completo de la cola, por posición ascendente.
    pub async fn list_live(&self, queue_id: &str) -> Result<Vec<QueueEntry>, DbError> {
        let connection = self.database_client.acquire().await?;
        let statement = format!(
            "SELECT {} FROM queue_entries WHERE queue_id = ?1 AND {} ORDER BY position ASC",
            Self::SELECT_COLUMNS,
            LIVE_STATUS_PREDICATE
        );
        let mut rows = connection.query(&statement, params![queue_id]).await?;

        let mut live_entries = Vec::new();
        while let Some(row) = rows.next().await? {
            live_entries.push(Self::map_row(&row)?);
        }
        Ok(live_entries)
    }

    /// Historia íntegra de la cola (incluye estados terminales).
    pub async fn list_all(&self, queue_id: &str) -> Result<Vec<QueueEntry>, DbError> {
        let connection = self.database_client.acquire().await?;
        let statement = format!(
            "SELECT {} FROM queue_entries WHERE queue_id = ?1 ORDER BY enqueued_at ASC",
            Self::SELECT_COLUMNS
        );
        let mut rows = connection.query(&statement, params![queue_id]).await?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(Self::map_row(&row)?);
        }
        Ok(entries)
    }

    /// Entrada pendiente en cabeza (posición 0), si existe.
    pub async fn head_pending(&self, queue_id: &str) -> Result<Option<QueueEntry>, DbError> {
        let connection = self.database_client.acquire().await?;
        let statement = format!(
            "SELECT {} FROM queue_entries
             WHERE queue_id = ?1 AND status = 'pending' AND position = 0",
            Self::SELECT_COLUMNS
        );
        let mut rows = connection.query(&statement, params![queue_id]).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::map_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Entrada en ejecución de la cola (a lo sumo una).
    pub async fn running_entry(&self, queue_id: &str) -> Result<Option<QueueEntry>, DbError> {
        let connection = self.database_client.acquire().await?;
        let statement = format!(
            "SELECT {} FROM queue_entries WHERE queue_id = ?1 AND status = 'running'",
            Self::SELECT_COLUMNS
        );
        let mut rows = connection.query(&statement, params![queue_id]).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::map_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Única puerta de transición de estado. Veta aristas ilegales,
    /// sella los instantes y re-densifica tras estados terminales.
    #[instrument(skip(self))]
    pub async fn transition(
        &self,
        entry_id: &str,
        target_status: EntryStatus,
    ) -> Result<QueueEntry, DbError> {
        let current_entry = self
            .find_by_id(entry_id)
            .await?
            .ok_or_else(|| DbError::NotFound(entry_id.to_string()))?;

        if !current_entry.status.can_transition(target_status) {
            return Err(DbError::InvalidOperation(format!(
                "illegal transition {} -> {} for entry {}",
                current_entry.status.as_str(),
                target_status.as_str(),
                entry_id
            )));
        }

        let mut updated_entry = current_entry.clone();
        updated_entry.status = target_status;

        match target_status {
            EntryStatus::Running => {
                updated_entry.started_at = Some(chrono::Utc::now());
            }
            EntryStatus::Pending => {
                // Recuperación de arranque: la entrada regresa al frente.
                updated_entry.started_at = None;
                updated_entry.position = 0;
            }
            terminal if terminal.is_terminal() => {
                updated_entry.completed_at = Some(chrono::Utc::now());
            }
            _ => {}
        }

        {
            let connection = self.database_client.acquire().await?;
            connection
                .execute(
                    "UPDATE queue_entries
                     SET status = ?2, position = ?3, started_at = ?4, completed_at = ?5
                     WHERE id = ?1",
                    params![
                        updated_entry.id.clone(),
                        updated_entry.status.as_str(),
                        updated_entry.position as i64,
                        to_epoch_opt(updated_entry.started_at),
                        to_epoch_opt(updated_entry.completed_at)
                    ],
                )
                .await?;
        }

        if target_status.is_terminal() {
            self.redensify(&current_entry.queue_id).await?;
        }

        debug!(
            "🔄 [ENTRIES]: Entry {} transitioned {} -> {}.",
            entry_id,
            current_entry.status.as_str(),
            target_status.as_str()
        );
        Ok(updated_entry)
    }

    /// Reasigna posiciones densas {0..n-1} al orden vivo de la cola.
    #[instrument(skip(self))]
    pub async fn redensify(&self, queue_id: &str) -> Result<(), DbError> {
        let live_entries = self.list_live(queue_id).await?;
        let connection = self.database_client.acquire().await?;

        for (dense_position, entry) in live_entries.iter().enumerate() {
            if entry.position != dense_position as u32 {
                connection
                    .execute(
                        "UPDATE queue_entries SET position = ?2 WHERE id = ?1",
                        params![entry.id.clone(), dense_position as i64],
                    )
                    .await?;
            }
        }
        Ok(())
    }

    /// Aplica una permutación administrativa al orden vivo.
    ///
    /// # Errors:
    /// - `InvalidOperation` si los identificadores no son una permutación
    ///   exacta del orden vivo, o si desplazan a la entrada en ejecución.
    #[instrument(skip(self, ordered_entry_ids))]
    pub async fn reorder(
        &self,
        queue_id: &str,
        ordered_entry_ids: &[String],
    ) -> Result<Vec<QueueEntry>, DbError> {
        let live_entries = self.list_live(queue_id).await?;

        let live_ids: std::collections::HashSet<&str> =
            live_entries.iter().map(|entry| entry.id.as_str()).collect();
        let requested_ids: std::collections::HashSet<&str> =
            ordered_entry_ids.iter().map(String::as_str).collect();

        if live_ids != requested_ids || ordered_entry_ids.len() != live_entries.len() {
            return Err(DbError::InvalidOperation(
                "reorder payload is not a permutation of the live ordering".to_string(),
            ));
        }

        if let Some(running) = live_entries
            .iter()
            .find(|entry| entry.status == EntryStatus::Running)
        {
            if ordered_entry_ids.first().map(String::as_str) != Some(running.id.as_str()) {
                warn!("⛔ [ENTRIES]: Reorder rejected; running entry must hold position 0.");
                return Err(DbError::InvalidOperation(
                    "the running entry must remain at position 0".to_string(),
                ));
            }
        }

        let connection = self.database_client.acquire().await?;
        for (dense_position, entry_id) in ordered_entry_ids.iter().enumerate() {
            connection
                .execute(
                    "UPDATE queue_entries SET position = ?2 WHERE id = ?1",
                    params![entry_id.clone(), dense_position as i64],
                )
                .await?;
        }

        self.list_live(queue_id).await
    }

    /// Recuperación de arranque: toda entrada 'running' huérfana de un
    /// proceso anterior regresa a 'pending' en posición 0.
    #[instrument(skip(self))]
    pub async fn reset_orphaned_running(&self) -> Result<u64, DbError> {
        let orphaned_entries = {
            let connection = self.database_client.acquire().await?;
            let statement = format!(
                "SELECT {} FROM queue_entries WHERE status = 'running'",
                Self::SELECT_COLUMNS
            );
            let mut rows = connection.query(&statement, ()).await?;
            let mut orphans = Vec::new();
            while let Some(row) = rows.next().await? {
                orphans.push(Self::map_row(&row)?);
            }
            orphans
        };

        for orphan in &orphaned_entries {
            self.transition(&orphan.id, EntryStatus::Pending).await?;
            warn!(
                "🩹 [RECOVERY]: Orphaned running entry {} reset to pending (queue {}).",
                orphan.id, orphan.queue_id
            );
        }

        Ok(orphaned_entries.len() as u64)
    }
}
