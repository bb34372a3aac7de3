// [libs/infra/db/src/repositories/pull_request_repository.rs]
/*!
 * =================================================================
 * APARATO: PULL REQUEST REPOSITORY
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA Y REFRESCO DEL ESTADO OBSERVADO DE PRs
 *
 * VISION:
 * 1. UPSERT DISCIPLINE: La unicidad vive en (repository_id, number);
 *    cada refresco del Forge reemplaza los campos mutables.
 * 2. AUDIT RETENTION: Los PRs nunca se destruyen; la historia de
 *    fusiones queda auditable en el Ledger.
 * =================================================================
 */

use libsql::{params, Row};
use tracing::instrument;

use imq_domain_models::PullRequest;

use crate::client::DbClient;
use crate::errors::DbError;
use crate::time_codec::{from_epoch_seconds, to_epoch_seconds};

pub struct PullRequestRepository {
    database_client: DbClient,
}

impl PullRequestRepository {
    pub fn new(client: DbClient) -> Self {
        Self {
            database_client: client,
        }
    }

    fn map_row(row: &Row) -> Result<PullRequest, DbError> {
        Ok(PullRequest {
            id: row.get::<String>(0)?,
            repository_id: row.get::<String>(1)?,
            number: row.get::<i64>(2)? as u64,
            title: row.get::<String>(3)?,
            author: row.get::<String>(4)?,
            base_branch: row.get::<String>(5)?,
            head_branch: row.get::<String>(6)?,
            head_sha: row.get::<String>(7)?,
            is_conflicted: row.get::<i64>(8)? != 0,
            is_up_to_date: row.get::<i64>(9)? != 0,
            created_at: from_epoch_seconds(row.get::<f64>(10)?),
            updated_at: from_epoch_seconds(row.get::<f64>(11)?),
        })
    }

    const SELECT_COLUMNS: &'static str =
        "id, repository_id, number, title, author, base_branch, head_branch, head_sha,
         is_conflicted, is_up_to_date, created_at, updated_at";

    /// Inserta el PR en su primera observación o reemplaza los campos
    /// mutables en cada refresco posterior.
    #[instrument(skip(self, pull_request))]
    pub async fn upsert(&self, pull_request: &PullRequest) -> Result<PullRequest, DbError> {
        if let Some(existing) = self
            .find_by_repo_and_number(&pull_request.repository_id, pull_request.number)
            .await?
        {
            let refreshed = PullRequest {
                id: existing.id.clone(),
                created_at: existing.created_at,
                ..pull_request.clone()
            };

            let connection = self.database_client.acquire().await?;
            connection
                .execute(
                    "UPDATE pull_requests
                     SET title = ?2, author = ?3, base_branch = ?4, head_branch = ?5,
                         head_sha = ?6, is_conflicted = ?7, is_up_to_date = ?8, updated_at = ?9
                     WHERE id = ?1",
                    params![
                        refreshed.id.clone(),
                        refreshed.title.clone(),
                        refreshed.author.clone(),
                        refreshed.base_branch.clone(),
                        refreshed.head_branch.clone(),
                        refreshed.head_sha.clone(),
                        refreshed.is_conflicted as i64,
                        refreshed.is_up_to_date as i64,
                        to_epoch_seconds(refreshed.updated_at)
                    ],
                )
                .await
                .map_err(DbError::classify)?;

            return Ok(refreshed);
        }

        let connection = self.database_client.acquire().await?;
        connection
            .execute(
                "INSERT INTO pull_requests
                 (id, repository_id, number, title, author, base_branch, head_branch,
                  head_sha, is_conflicted, is_up_to_date, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    pull_request.id.clone(),
                    pull_request.repository_id.clone(),
                    pull_request.number as i64,
                    pull_request.title.clone(),
                    pull_request.author.clone(),
                    pull_request.base_branch.clone(),
                    pull_request.head_branch.clone(),
                    pull_request.head_sha.clone(),
                    pull_request.is_conflicted as i64,
                    pull_request.is_up_to_date as i64,
                    to_epoch_seconds(pull_request.created_at),
                    to_epoch_seconds(pull_request.updated_at)
                ],
            )
            .await
            .map_err(DbError::classify)?;

        Ok(pull_request.clone())
    }

    pub async fn find_by_id(&self, pull_request_id: &str) -> Result<Option<PullRequest>, DbError> {
        let connection = self.database_client.acquire().await?;
        let statement = format!(
            "SELECT {} FROM pull_requests WHERE id = ?1",
            Self::SELECT_COLUMNS
        );
        let mut rows = connection.query(&statement, params![pull_request_id]).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::map_row(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn find_by_repo_and_number(
        &self,
        repository_id: &str,
        number: u64,
    ) -> Result<Option<PullRequest>, DbError> {
        let connection = self.database_client.acquire().await?;
        let statement = format!(
            "SELECT {} FROM pull_requests WHERE repository_id = ?1 AND number = ?2",
            Self::SELECT_COLUMNS
        );
        let mut rows = connection
            .query(&statement, params![repository_id, number as i64])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::map_row(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn list_by_repository(
        &self,
        repository_id: &str,
    ) -> Result<Vec<PullRequest>, DbError> {
        let connection = self.database_client.acquire().await?;
        let statement = format!(
            "SELECT {} FROM pull_requests WHERE repository_id = ?1 ORDER BY number ASC",
            Self::SELECT_COLUMNS
        );
        let mut rows = connection.query(&statement, params![repository_id]).await?;

        let mut pull_requests = Vec::new();
        while let Some(row) = rows.next().await? {
            pull_requests.push(Self::map_row(&row)?);
        }
        Ok(pull_requests)
    }
}
