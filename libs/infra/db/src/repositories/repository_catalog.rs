// [libs/infra/db/src/repositories/repository_catalog.rs]
/*!
 * =================================================================
 * APARATO: REPOSITORY CATALOG
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA DE REPOSITORIOS VIGILADOS (INMUTABLES)
 * =================================================================
 */

use libsql::{params, Row};
use tracing::{debug, instrument};

use imq_domain_models::Repository;

use crate::client::DbClient;
use crate::errors::DbError;
use crate::time_codec::{from_epoch_seconds, to_epoch_seconds};

/// Repositorio de autoridad única para la entidad Repository.
pub struct RepositoryCatalog {
    database_client: DbClient,
}

impl RepositoryCatalog {
    pub fn new(client: DbClient) -> Self {
        Self {
            database_client: client,
        }
    }

    fn map_row(row: &Row) -> Result<Repository, DbError> {
        Ok(Repository {
            id: row.get::<String>(0)?,
            owner: row.get::<String>(1)?,
            name: row.get::<String>(2)?,
            full_name: row.get::<String>(3)?,
            default_branch: row.get::<String>(4)?,
            created_at: from_epoch_seconds(row.get::<f64>(5)?),
        })
    }

    /// Registra un repositorio en su primera observación. La identidad
    /// canónica ya registrada devuelve la fila existente (idempotencia).
    #[instrument(skip(self, repository))]
    pub async fn ensure(&self, repository: &Repository) -> Result<Repository, DbError> {
        if let Some(existing) = self.find_by_full_name(&repository.full_name).await? {
            return Ok(existing);
        }

        let connection = self.database_client.acquire().await?;
        connection
            .execute(
                "INSERT INTO repositories (id, owner, name, full_name, default_branch, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    repository.id.clone(),
                    repository.owner.clone(),
                    repository.name.clone(),
                    repository.full_name.clone(),
                    repository.default_branch.clone(),
                    to_epoch_seconds(repository.created_at)
                ],
            )
            .await
            .map_err(DbError::classify)?;

        debug!("📦 [CATALOG]: Repository {} registered.", repository.full_name);
        Ok(repository.clone())
    }

    pub async fn find_by_id(&self, repository_id: &str) -> Result<Option<Repository>, DbError> {
        let connection = self.database_client.acquire().await?;
        let mut rows = connection
            .query(
                "SELECT id, owner, name, full_name, default_branch, created_at
                 FROM repositories WHERE id = ?1",
                params![repository_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::map_row(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn find_by_full_name(
        &self,
        full_name: &str,
    ) -> Result<Option<Repository>, DbError> {
        let connection = self.database_client.acquire().await?;
        let mut rows = connection
            .query(
                "SELECT id, owner, name, full_name, default_branch, created_at
                 FROM repositories WHERE full_name = ?1",
                params![full_name],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::map_row(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn list_all(&self) -> Result<Vec<Repository>, DbError> {
        let connection = self.database_client.acquire().await?;
        let mut rows = connection
            .query(
                "SELECT id, owner, name, full_name, default_branch, created_at
                 FROM repositories ORDER BY full_name ASC",
                (),
            )
            .await?;

        let mut catalog = Vec::new();
        while let Some(row) = rows.next().await? {
            catalog.push(Self::map_row(&row)?);
        }
        Ok(catalog)
    }
}
