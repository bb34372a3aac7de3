// [apps/coordinator/src/runtime_config.rs]
/*!
 * =================================================================
 * APARATO: RUNTIME ENVIRONMENT CONTRACT
 * CLASIFICACIÓN: CONFIGURATION STRATUM (ESTRATO L3)
 * RESPONSABILIDAD: VALIDACIÓN CENTRALIZADA DEL ENTORNO IMQ_*
 *
 * VISION:
 * 1. FATAL ON VIOLATION: Toda invariante (prefijo de token, rango de
 *    puerto, piso de polling, enumeraciones) se certifica aquí; una
 *    violación rehúsa el arranque antes de abrir conexión alguna.
 * 2. IMMUTABLE AFTER LOAD: El valor resultante se enhebra por
 *    constructores; no existe estado global mutable de configuración.
 * =================================================================
 */

use std::time::Duration;
use thiserror::Error;

/// Prefijos de token aceptados por el contrato del Forge.
const ACCEPTED_TOKEN_PREFIXES: &[&str] = &["ghp_", "github_pat_", "ghs_"];

/// Piso absoluto del intervalo de polling.
const POLLING_INTERVAL_FLOOR: Duration = Duration::from_secs(10);

/// Gracia por defecto del apagado ordenado.
const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("[L3_CONFIG_FAULT]: MISSING_REQUIRED -> {0}")]
    MissingRequired(&'static str),

    #[error("[L3_CONFIG_FAULT]: INVALID_VALUE -> {variable}: {reason}")]
    InvalidValue {
        variable: &'static str,
        reason: String,
    },
}

/// Fuente de eventos primaria del coordinador.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngressMode {
    Polling,
    Webhook,
}

/// Entorno de despliegue declarado.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentEnvironment {
    Development,
    Staging,
    Production,
}

/// Configuración de proceso, inmutable tras la carga.
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub github_token: String,
    /// Repositorio primario vigilado (`owner/name`), si se declara.
    pub github_repo: Option<String>,
    pub github_api_url: String,
    pub github_mode: IngressMode,
    pub polling_interval: Duration,
    pub webhook_secret: Option<String>,
    pub webhook_proxy_url: Option<String>,
    /// Etiqueta disparadora inicial (la fila de configuración manda después).
    pub trigger_label: Option<String>,
    pub database_path: String,
    pub database_pool_size: usize,
    pub api_host: String,
    pub api_port: u16,
    pub environment: DeploymentEnvironment,
    pub debug: bool,
    pub shutdown_grace: Duration,
}

fn read_env(variable: &'static str) -> Option<String> {
    std::env::var(variable)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl RuntimeSettings {
    /// Carga y certifica el contrato de entorno íntegro.
    pub fn from_environment() -> Result<Self, ConfigError> {
        // --- TOKEN DEL FORGE (obligatorio, prefijo certificado) ---
        let github_token =
            read_env("IMQ_GITHUB_TOKEN").ok_or(ConfigError::MissingRequired("IMQ_GITHUB_TOKEN"))?;

        if !ACCEPTED_TOKEN_PREFIXES
            .iter()
            .any(|prefix| github_token.starts_with(prefix))
        {
            return Err(ConfigError::InvalidValue {
                variable: "IMQ_GITHUB_TOKEN",
                reason: "token must carry a ghp_/github_pat_/ghs_ prefix".to_string(),
            });
        }

        // --- REPOSITORIO PRIMARIO (owner/name) ---
        let github_repo = read_env("IMQ_GITHUB_REPO");
        if let Some(candidate) = &github_repo {
            if imq_domain_models::Repository::split_full_name(candidate).is_none() {
                return Err(ConfigError::InvalidValue {
                    variable: "IMQ_GITHUB_REPO",
                    reason: format!("'{}' is not an owner/name identity", candidate),
                });
            }
        }

        let github_api_url = read_env("IMQ_GITHUB_API_URL")
            .unwrap_or_else(|| "https://api.github.com".to_string());

        // --- MODO DE INGRESO ---
        let github_mode = match read_env("IMQ_GITHUB_MODE").as_deref() {
            None | Some("polling") => IngressMode::Polling,
            Some("webhook") => IngressMode::Webhook,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    variable: "IMQ_GITHUB_MODE",
                    reason: format!("'{}' is neither 'polling' nor 'webhook'", other),
                })
            }
        };

        // --- PISO DE POLLING (≥ 10 s) ---
        let polling_interval = match read_env("IMQ_POLLING_INTERVAL") {
            None => POLLING_INTERVAL_FLOOR,
            Some(raw_interval) => {
                let seconds = raw_interval.parse::<u64>().map_err(|_| {
                    ConfigError::InvalidValue {
                        variable: "IMQ_POLLING_INTERVAL",
                        reason: format!("'{}' is not a whole number of seconds", raw_interval),
                    }
                })?;
                let interval = Duration::from_secs(seconds);
                if interval < POLLING_INTERVAL_FLOOR {
                    return Err(ConfigError::InvalidValue {
                        variable: "IMQ_POLLING_INTERVAL",
                        reason: format!(
                            "{} s is under the {} s floor",
                            seconds,
                            POLLING_INTERVAL_FLOOR.as_secs()
                        ),
                    });
                }
                interval
            }
        };

        let webhook_secret = read_env("IMQ_WEBHOOK_SECRET");
        if github_mode == IngressMode::Webhook && webhook_secret.is_none() {
            return Err(ConfigError::MissingRequired("IMQ_WEBHOOK_SECRET"));
        }

        // --- PERSISTENCIA ---
        let database_path =
            read_env("IMQ_DATABASE_PATH").unwrap_or_else(|| "./imq.db".to_string());
        let database_pool_size = match read_env("IMQ_DATABASE_POOL_SIZE") {
            None => imq_infra_db::client::DEFAULT_POOL_SIZE,
            Some(raw_size) => {
                let size = raw_size.parse::<usize>().map_err(|_| {
                    ConfigError::InvalidValue {
                        variable: "IMQ_DATABASE_POOL_SIZE",
                        reason: format!("'{}' is not a positive integer", raw_size),
                    }
                })?;
                if size == 0 {
                    return Err(ConfigError::InvalidValue {
                        variable: "IMQ_DATABASE_POOL_SIZE",
                        reason: "pool size must be at least 1".to_string(),
                    });
                }
                size
            }
        };

        // --- PERÍMETRO HTTP (puerto 1–65535) ---
        let api_host = read_env("IMQ_API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let api_port = match read_env("IMQ_API_PORT") {
            None => 8080,
            Some(raw_port) => {
                let port = raw_port.parse::<u32>().map_err(|_| ConfigError::InvalidValue {
                    variable: "IMQ_API_PORT",
                    reason: format!("'{}' is not a port number", raw_port),
                })?;
                if !(1..=65535).contains(&port) {
                    return Err(ConfigError::InvalidValue {
                        variable: "IMQ_API_PORT",
                        reason: format!("{} is outside 1–65535", port),
                    });
                }
                port as u16
            }
        };

        // --- ENTORNO DECLARADO ---
        let environment = match read_env("IMQ_ENVIRONMENT").as_deref() {
            None | Some("development") => DeploymentEnvironment::Development,
            Some("staging") => DeploymentEnvironment::Staging,
            Some("production") => DeploymentEnvironment::Production,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    variable: "IMQ_ENVIRONMENT",
                    reason: format!("'{}' is not development|staging|production", other),
                })
            }
        };

        // IMQ_LOG_LEVEL / IMQ_LOG_FORMAT los consume Heimdall; aquí sólo
        // se certifica la enumeración del formato.
        if let Some(raw_format) = read_env("IMQ_LOG_FORMAT") {
            if raw_format != "json" && raw_format != "pretty" {
                return Err(ConfigError::InvalidValue {
                    variable: "IMQ_LOG_FORMAT",
                    reason: format!("'{}' is neither 'json' nor 'pretty'", raw_format),
                });
            }
        }

        let debug = matches!(
            read_env("IMQ_DEBUG").as_deref(),
            Some("1") | Some("true") | Some("yes")
        );

        Ok(Self {
            github_token,
            github_repo,
            github_api_url,
            github_mode,
            polling_interval,
            webhook_secret,
            webhook_proxy_url: read_env("IMQ_WEBHOOK_PROXY_URL"),
            trigger_label: read_env("IMQ_TRIGGER_LABEL"),
            database_path,
            database_pool_size,
            api_host,
            api_port,
            environment,
            debug,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        })
    }

    /// Techo del intervalo adaptativo de polling (8× el piso configurado).
    pub fn polling_interval_ceiling(&self) -> Duration {
        self.polling_interval * 8
    }
}
