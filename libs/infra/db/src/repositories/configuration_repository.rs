// [libs/infra/db/src/repositories/configuration_repository.rs]
/*!
 * =================================================================
 * APARATO: SYSTEM CONFIGURATION REPOSITORY
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA DE LA CONFIGURACIÓN DE FILA ÚNICA
 *
 * VISION:
 * 1. SINGLETON ROW: La fila id=1 es la única verdad; 'load' sin fila
 *    devuelve los valores de fábrica sin materializarlos.
 * 2. SUITE LEGALITY GATE: 'store' rechaza suites ilegales antes de
 *    tocar el Ledger.
 * =================================================================
 */

use libsql::params;
use tracing::{debug, instrument};

use imq_domain_models::SystemConfiguration;

use crate::client::DbClient;
use crate::errors::DbError;
use crate::time_codec::to_epoch_seconds;

pub struct ConfigurationRepository {
    database_client: DbClient,
}

impl ConfigurationRepository {
    pub fn new(client: DbClient) -> Self {
        Self {
            database_client: client,
        }
    }

    /// Carga la configuración vigente (o los valores de fábrica).
    pub async fn load(&self) -> Result<SystemConfiguration, DbError> {
        let connection = self.database_client.acquire().await?;
        let mut rows = connection
            .query("SELECT payload FROM configurations WHERE id = 1", ())
            .await?;

        match rows.next().await? {
            Some(row) => {
                let raw_payload = row.get::<String>(0)?;
                serde_json::from_str::<SystemConfiguration>(&raw_payload)
                    .map_err(|fault| DbError::MappingError(fault.to_string()))
            }
            None => Ok(SystemConfiguration::default()),
        }
    }

    /// Reemplaza íntegramente la fila única tras validar la suite.
    #[instrument(skip(self, configuration))]
    pub async fn store(&self, configuration: &SystemConfiguration) -> Result<(), DbError> {
        configuration
            .check_configuration
            .validate()
            .map_err(|fault| DbError::InvalidOperation(fault.to_string()))?;

        let serialized_payload = serde_json::to_string(configuration)
            .map_err(|fault| DbError::MappingError(fault.to_string()))?;

        let connection = self.database_client.acquire().await?;
        connection
            .execute(
                "INSERT INTO configurations (id, payload, updated_at) VALUES (1, ?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET payload = ?1, updated_at = ?2",
                params![serialized_payload, to_epoch_seconds(chrono::Utc::now())],
            )
            .await
            .map_err(DbError::classify)?;

        debug!("⚙️ [CONFIG]: Singleton configuration row replaced.");
        Ok(())
    }

    /// Reinstala los valores de fábrica preservando las copias del entorno.
    #[instrument(skip(self))]
    pub async fn reset(&self) -> Result<SystemConfiguration, DbError> {
        let current = self.load().await?;
        let factory = current.reset_preserving_environment();
        self.store(&factory).await?;
        Ok(factory)
    }
}
