// [libs/infra/db/src/repositories/queue_repository.rs]
/*!
 * =================================================================
 * APARATO: QUEUE REPOSITORY
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA DE COLAS POR (REPOSITORIO, RAMA)
 * =================================================================
 */

use libsql::{params, Row};
use tracing::{debug, instrument};

use imq_domain_models::Queue;

use crate::client::DbClient;
use crate::errors::DbError;
use crate::time_codec::{from_epoch_seconds, to_epoch_seconds};

pub struct QueueRepository {
    database_client: DbClient,
}

impl QueueRepository {
    pub fn new(client: DbClient) -> Self {
        Self {
            database_client: client,
        }
    }

    fn map_row(row: &Row) -> Result<Queue, DbError> {
        Ok(Queue {
            id: row.get::<String>(0)?,
            repository_id: row.get::<String>(1)?,
            base_branch: row.get::<String>(2)?,
            created_at: from_epoch_seconds(row.get::<f64>(3)?),
        })
    }

    /// Creación perezosa: devuelve la cola existente para
    /// `(repository_id, base_branch)` o la materializa.
    #[instrument(skip(self))]
    pub async fn ensure(&self, repository_id: &str, base_branch: &str) -> Result<Queue, DbError> {
        if let Some(existing) = self.find_by_target(repository_id, base_branch).await? {
            return Ok(existing);
        }

        let queue = Queue::new(repository_id, base_branch);
        let connection = self.database_client.acquire().await?;
        connection
            .execute(
                "INSERT INTO queues (id, repository_id, base_branch, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    queue.id.clone(),
                    queue.repository_id.clone(),
                    queue.base_branch.clone(),
                    to_epoch_seconds(queue.created_at)
                ],
            )
            .await
            .map_err(DbError::classify)?;

        debug!(
            "🌱 [QUEUES]: Queue materialized for {}@{}.",
            repository_id, base_branch
        );
        Ok(queue)
    }

    pub async fn find_by_id(&self, queue_id: &str) -> Result<Option<Queue>, DbError> {
        let connection = self.database_client.acquire().await?;
        let mut rows = connection
            .query(
                "SELECT id, repository_id, base_branch, created_at FROM queues WHERE id = ?1",
                params![queue_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::map_row(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn find_by_target(
        &self,
        repository_id: &str,
        base_branch: &str,
    ) -> Result<Option<Queue>, DbError> {
        let connection = self.database_client.acquire().await?;
        let mut rows = connection
            .query(
                "SELECT id, repository_id, base_branch, created_at
                 FROM queues WHERE repository_id = ?1 AND base_branch = ?2",
                params![repository_id, base_branch],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::map_row(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn list_all(&self) -> Result<Vec<Queue>, DbError> {
        let connection = self.database_client.acquire().await?;
        let mut rows = connection
            .query(
                "SELECT id, repository_id, base_branch, created_at
                 FROM queues ORDER BY created_at ASC",
                (),
            )
            .await?;

        let mut queues = Vec::new();
        while let Some(row) = rows.next().await? {
            queues.push(Self::map_row(&row)?);
        }
        Ok(queues)
    }

    /// Elimina la cola y sus entradas (los PRs se retienen para auditoría).
    #[instrument(skip(self))]
    pub async fn delete(&self, queue_id: &str) -> Result<(), DbError> {
        let connection = self.database_client.acquire().await?;
        connection
            .execute(
                "DELETE FROM checks WHERE entry_id IN
                 (SELECT id FROM queue_entries WHERE queue_id = ?1)",
                params![queue_id],
            )
            .await?;
        connection
            .execute("DELETE FROM queue_entries WHERE queue_id = ?1", params![queue_id])
            .await?;
        let removed = connection
            .execute("DELETE FROM queues WHERE id = ?1", params![queue_id])
            .await?;

        if removed == 0 {
            return Err(DbError::NotFound(queue_id.to_string()));
        }
        Ok(())
    }
}
