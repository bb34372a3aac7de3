// [libs/infra/db/src/repositories/poll_cursor_repository.rs]
/*!
 * =================================================================
 * APARATO: EVENT POLL CURSOR REPOSITORY
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: CURSOR DE DEDUPLICACIÓN DEL FEED DE EVENTOS
 *
 * El cursor por repositorio sobrevive reinicios: el poller retoma la
 * deduplicación exactamente donde la dejó el proceso anterior.
 * =================================================================
 */

use libsql::params;
use tracing::instrument;

use crate::client::DbClient;
use crate::errors::DbError;
use crate::time_codec::to_epoch_seconds;

pub struct PollCursorRepository {
    database_client: DbClient,
}

impl PollCursorRepository {
    pub fn new(client: DbClient) -> Self {
        Self {
            database_client: client,
        }
    }

    /// Último identificador de evento visto para el repositorio.
    pub async fn load(&self, repository_full_name: &str) -> Result<Option<String>, DbError> {
        let connection = self.database_client.acquire().await?;
        let mut rows = connection
            .query(
                "SELECT last_event_id FROM event_poll_history WHERE repository_full_name = ?1",
                params![repository_full_name],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(row.get::<Option<String>>(0)?),
            None => Ok(None),
        }
    }

    /// Avanza el cursor tras una pasada de polling fructífera.
    #[instrument(skip(self))]
    pub async fn store(
        &self,
        repository_full_name: &str,
        last_event_id: &str,
    ) -> Result<(), DbError> {
        let connection = self.database_client.acquire().await?;
        connection
            .execute(
                "INSERT INTO event_poll_history (repository_full_name, last_event_id, polled_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(repository_full_name)
                 DO UPDATE SET last_event_id = ?2, polled_at = ?3",
                params![
                    repository_full_name,
                    last_event_id,
                    to_epoch_seconds(chrono::Utc::now())
                ],
            )
            .await
            .map_err(DbError::classify)?;
        Ok(())
    }
}
