// [libs/infra/db/src/repositories/check_repository.rs]
/*!
 * =================================================================
 * APARATO: CHECK REPOSITORY
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA DE EJECUCIONES DE CHECKS POR ENTRADA
 * =================================================================
 */

use libsql::{params, Row};
use tracing::instrument;

use imq_domain_models::{Check, CheckKind, CheckStatus};

use crate::client::DbClient;
use crate::errors::DbError;
use crate::time_codec::{from_epoch_opt, to_epoch_opt};

pub struct CheckRepository {
    database_client: DbClient,
}

impl CheckRepository {
    pub fn new(client: DbClient) -> Self {
        Self {
            database_client: client,
        }
    }

    const SELECT_COLUMNS: &'static str =
        "id, entry_id, name, kind, kind_config, status, configuration, started_at, completed_at, output";

    fn map_row(row: &Row) -> Result<Check, DbError> {
        let raw_kind = row.get::<String>(3)?;
        let kind = CheckKind::parse(&raw_kind)
            .ok_or_else(|| DbError::MappingError(format!("unknown check kind '{}'", raw_kind)))?;

        let raw_status = row.get::<String>(5)?;
        let status = CheckStatus::parse(&raw_status)
            .ok_or_else(|| DbError::MappingError(format!("unknown check status '{}'", raw_status)))?;

        let kind_config = serde_json::from_str(&row.get::<String>(4)?)
            .map_err(|fault| DbError::MappingError(fault.to_string()))?;
        let configuration = serde_json::from_str(&row.get::<String>(6)?)
            .map_err(|fault| DbError::MappingError(fault.to_string()))?;

        Ok(Check {
            id: row.get::<String>(0)?,
            entry_id: row.get::<String>(1)?,
            name: row.get::<String>(2)?,
            kind,
            kind_config,
            status,
            configuration,
            started_at: from_epoch_opt(row.get::<Option<f64>>(7)?),
            completed_at: from_epoch_opt(row.get::<Option<f64>>(8)?),
            output: row.get::<String>(9)?,
        })
    }

    #[instrument(skip(self, check))]
    pub async fn insert(&self, check: &Check) -> Result<(), DbError> {
        let connection = self.database_client.acquire().await?;
        connection
            .execute(
                "INSERT INTO checks
                 (id, entry_id, name, kind, kind_config, status, configuration,
                  started_at, completed_at, output)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    check.id.clone(),
                    check.entry_id.clone(),
                    check.name.clone(),
                    check.kind.as_str(),
                    check.kind_config.to_string(),
                    check.status.as_str(),
                    check.configuration.to_string(),
                    to_epoch_opt(check.started_at),
                    to_epoch_opt(check.completed_at),
                    check.output.clone()
                ],
            )
            .await
            .map_err(DbError::classify)?;
        Ok(())
    }

    /// Sella el veredicto de una ejecución.
    #[instrument(skip(self, check))]
    pub async fn record_outcome(&self, check: &Check) -> Result<(), DbError> {
        let connection = self.database_client.acquire().await?;
        let updated = connection
            .execute(
                "UPDATE checks
                 SET status = ?2, started_at = ?3, completed_at = ?4, output = ?5
                 WHERE id = ?1",
                params![
                    check.id.clone(),
                    check.status.as_str(),
                    to_epoch_opt(check.started_at),
                    to_epoch_opt(check.completed_at),
                    check.output.clone()
                ],
            )
            .await?;

        if updated == 0 {
            return Err(DbError::NotFound(check.id.clone()));
        }
        Ok(())
    }

    pub async fn list_by_entry(&self, entry_id: &str) -> Result<Vec<Check>, DbError> {
        let connection = self.database_client.acquire().await?;
        let statement = format!(
            "SELECT {} FROM checks WHERE entry_id = ?1 ORDER BY started_at ASC",
            Self::SELECT_COLUMNS
        );
        let mut rows = connection.query(&statement, params![entry_id]).await?;

        let mut checks = Vec::new();
        while let Some(row) = rows.next().await? {
            checks.push(Self::map_row(&row)?);
        }
        Ok(checks)
    }

    /// Conteo de veredictos por estado para el estrato de métricas.
    pub async fn outcome_tallies(&self) -> Result<Vec<(CheckStatus, u64)>, DbError> {
        let connection = self.database_client.acquire().await?;
        let mut rows = connection
            .query(
                "SELECT status, COUNT(*) FROM checks GROUP BY status",
                (),
            )
            .await?;

        let mut tallies = Vec::new();
        while let Some(row) = rows.next().await? {
            let raw_status = row.get::<String>(0)?;
            if let Some(status) = CheckStatus::parse(&raw_status) {
                tallies.push((status, row.get::<i64>(1)? as u64));
            }
        }
        Ok(tallies)
    }
}
