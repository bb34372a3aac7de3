// [libs/infra/forge/src/client.rs]
/*!
 * =================================================================
 * APARATO: SOVEREIGN FORGE UPLINK CLIENT
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: HTTP TIPADO CON ETAG, RATE-LIMIT Y REINTENTOS
 *
 * VISION:
 * 1. SINGLE SESSION: Un único reqwest::Client de larga vida con
 *    cabeceras por defecto (Accept, Authorization, API-Version, UA)
 *    compartido por todos los estratos.
 * 2. CONDITIONAL GETS: Caché ruta → ETag bajo mutex; un 304 no
 *    penaliza el presupuesto de rate-limit y emerge como señal
 *    'NotModified' sin reintento.
 * 3. BUDGET OBSERVATORY: Cada respuesta alimenta el observatorio de
 *    rate-limit; el descenso bajo 100 unidades dispara advertencia.
 * 4. RETRY ENVELOPE: Sólo fallos transitorios (red, 5xx) reintentan;
 *    el agotamiento emerge como 'AllAttemptsFailed'.
 * =================================================================
 */

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, IF_NONE_MATCH, USER_AGENT};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::endpoint::{ForgeEndpoint, HttpMethod};
use crate::errors::ForgeError;
use crate::retry::RetryPolicy;

/// Umbral de advertencia del presupuesto de rate-limit.
const RATE_LIMIT_WARNING_THRESHOLD: u64 = 100;

/// Versión del protocolo REST del Forge.
const FORGE_API_VERSION: &str = "2022-11-28";

/// Media type del contrato JSON del Forge.
const FORGE_ACCEPT_MEDIA_TYPE: &str = "application/vnd.github+json";

/// Última lectura del presupuesto de rate-limit del Forge.
#[derive(Debug, Clone, Copy, Default)]
pub struct RateLimitSnapshot {
    /// Unidades restantes reportadas por X-RateLimit-Remaining.
    pub remaining: Option<u64>,
    /// Instante de reinicio (epoch segundos) de X-RateLimit-Reset.
    pub reset_epoch_seconds: Option<u64>,
}

/// Configuración de ignición del cliente.
#[derive(Debug, Clone)]
pub struct ForgeClientConfig {
    /// URL base de la API (sin barra final).
    pub api_base_url: String,
    /// Token de acceso personal o de instalación.
    pub token: String,
    /// Identidad estable del agente.
    pub user_agent: String,
    /// Deadline por petición HTTP.
    pub request_timeout: Duration,
    /// Política de reintentos ante fallos transitorios.
    pub retry_policy: RetryPolicy,
}

impl ForgeClientConfig {
    pub fn new(api_base_url: &str, token: &str) -> Self {
        Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            user_agent: "imq-coordinator/0.1".to_string(),
            request_timeout: Duration::from_secs(30),
            retry_policy: RetryPolicy::default(),
        }
    }
}

/// Cliente HTTP de larga vida, seguro ante concurrencia.
pub struct ForgeClient {
    http_session_client: reqwest::Client,
    api_base_url: String,
    retry_policy: RetryPolicy,
    /// Caché ruta materializada → ETag. Las entradas no expiran: el
    /// universo de rutas visitadas está acotado por el sistema.
    etag_cache: Mutex<HashMap<String, String>>,
    /// Última lectura del presupuesto del Forge.
    rate_limit_observatory: Mutex<RateLimitSnapshot>,
}

impl ForgeClient {
    /// Forja el cliente con las cabeceras por defecto del protocolo.
    pub fn new(configuration: ForgeClientConfig) -> Result<Self, ForgeError> {
        let mut default_headers = HeaderMap::new();

        default_headers.insert(ACCEPT, HeaderValue::from_static(FORGE_ACCEPT_MEDIA_TYPE));
        default_headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static(FORGE_API_VERSION),
        );

        let bearer_value = format!("Bearer {}", configuration.token);
        let mut authorization_header = HeaderValue::from_str(&bearer_value)
            .map_err(|_| ForgeError::Unauthorized)?;
        authorization_header.set_sensitive(true);
        default_headers.insert(AUTHORIZATION, authorization_header);

        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&configuration.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static("imq-coordinator")),
        );

        let http_session_client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(configuration.request_timeout)
            .build()?;

        Ok(Self {
            http_session_client,
            api_base_url: configuration.api_base_url,
            retry_policy: configuration.retry_policy,
            etag_cache: Mutex::new(HashMap::new()),
            rate_limit_observatory: Mutex::new(RateLimitSnapshot::default()),
        })
    }

    /// Última lectura del presupuesto de rate-limit.
    pub fn rate_limit_snapshot(&self) -> RateLimitSnapshot {
        *self
            .rate_limit_observatory
            .lock()
            .expect("FATAL: Rate-limit observatory lock poisoned.")
    }

    /// Ejecuta el descriptor y decodifica el cuerpo JSON al contrato `T`.
    ///
    /// # Errors:
    /// - `NotModified` si el GET condicional devolvió 304 (sin cuerpo).
    /// - `Decode` si el cuerpo viola el contrato esperado.
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        endpoint: &ForgeEndpoint,
    ) -> Result<T, ForgeError> {
        let response_body = self.execute(endpoint).await?;
        serde_json::from_slice::<T>(&response_body).map_err(ForgeError::from)
    }

    /// Ejecuta el descriptor bajo la política de reintentos y devuelve
    /// el cuerpo crudo de la respuesta.
    #[instrument(skip(self, endpoint), fields(path = %endpoint.materialized_path()))]
    pub async fn execute(&self, endpoint: &ForgeEndpoint) -> Result<Vec<u8>, ForgeError> {
        let mut last_transient_fault: Option<ForgeError> = None;

        for attempt in 1..=self.retry_policy.max_attempts {
            let backoff_delay = self.retry_policy.jittered_delay(attempt);
            if !backoff_delay.is_zero() {
                debug!(
                    "⏳ [FORGE_RETRY]: Attempt {} of {} after {:?} backoff.",
                    attempt, self.retry_policy.max_attempts, backoff_delay
                );
                tokio::time::sleep(backoff_delay).await;
            }

            match self.send_once(endpoint).await {
                Ok(body) => return Ok(body),
                Err(fault) if fault.is_retryable() => {
                    warn!(
                        "⚠️ [FORGE_TRANSIENT]: {} on attempt {}/{}.",
                        fault, attempt, self.retry_policy.max_attempts
                    );
                    last_transient_fault = Some(fault);
                }
                Err(terminal_fault) => return Err(terminal_fault),
            }
        }

        Err(ForgeError::AllAttemptsFailed {
            attempts: self.retry_policy.max_attempts,
            last: Box::new(last_transient_fault.unwrap_or(ForgeError::Http {
                status: 0,
                message: "retry budget exhausted without recorded fault".to_string(),
            })),
        })
    }

    /// Una única ronda HTTP: materializa, condiciona, envía y clasifica.
    async fn send_once(&self, endpoint: &ForgeEndpoint) -> Result<Vec<u8>, ForgeError> {
        let materialized_path = endpoint.materialized_path();
        let target_url = format!("{}{}", self.api_base_url, materialized_path);

        let http_method = match endpoint.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        };

        let mut request_builder = self.http_session_client.request(http_method, &target_url);

        if endpoint.use_etag {
            let cached_etag = {
                let etag_guard = self
                    .etag_cache
                    .lock()
                    .expect("FATAL: ETag cache lock poisoned.");
                etag_guard.get(&materialized_path).cloned()
            };
            if let Some(etag_value) = cached_etag {
                request_builder = request_builder.header(IF_NONE_MATCH, etag_value);
            }
        }

        if let Some(body) = &endpoint.body {
            request_builder = request_builder.json(body);
        }

        let network_response = request_builder.send().await?;
        self.observe_rate_limit_budget(&network_response, &materialized_path);

        let response_status = network_response.status();

        if response_status == StatusCode::NOT_MODIFIED {
            debug!("💤 [FORGE_ETAG]: 304 for {} (budget preserved).", materialized_path);
            return Err(ForgeError::NotModified);
        }

        if response_status.is_success() {
            if let Some(etag_header) = network_response.headers().get("etag") {
                if let Ok(etag_value) = etag_header.to_str() {
                    self.etag_cache
                        .lock()
                        .expect("FATAL: ETag cache lock poisoned.")
                        .insert(materialized_path, etag_value.to_string());
                }
            }
            return Ok(network_response.bytes().await?.to_vec());
        }

        Err(Self::classify_rejection(response_status, network_response).await)
    }

    /// Clasificación semántica de respuestas de rechazo del Forge.
    async fn classify_rejection(status: StatusCode, response: Response) -> ForgeError {
        let response_body = response.text().await.unwrap_or_default();

        match status.as_u16() {
            401 => ForgeError::Unauthorized,
            403 => {
                if response_body.to_lowercase().contains("rate limit") {
                    ForgeError::RateLimitExceeded
                } else {
                    ForgeError::Forbidden
                }
            }
            404 => ForgeError::NotFound,
            422 => ForgeError::ValidationFailed(Self::extract_message(&response_body)),
            code => ForgeError::Http {
                status: code,
                message: Self::extract_message(&response_body),
            },
        }
    }

    /// Extrae el campo 'message' del sobre de error, o el cuerpo recortado.
    fn extract_message(raw_body: &str) -> String {
        serde_json::from_str::<serde_json::Value>(raw_body)
            .ok()
            .and_then(|envelope| {
                envelope
                    .get("message")
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| raw_body.chars().take(200).collect())
    }

    /// Alimenta el observatorio con las cabeceras de presupuesto.
    fn observe_rate_limit_budget(&self, response: &Response, materialized_path: &str) {
        let parse_header = |name: &str| -> Option<u64> {
            response
                .headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<u64>().ok())
        };

        let remaining_budget = parse_header("x-ratelimit-remaining");
        let reset_instant = parse_header("x-ratelimit-reset");

        if remaining_budget.is_none() && reset_instant.is_none() {
            return;
        }

        {
            let mut observatory_guard = self
                .rate_limit_observatory
                .lock()
                .expect("FATAL: Rate-limit observatory lock poisoned.");
            if remaining_budget.is_some() {
                observatory_guard.remaining = remaining_budget;
            }
            if reset_instant.is_some() {
                observatory_guard.reset_epoch_seconds = reset_instant;
            }
        }

        if let Some(remaining) = remaining_budget {
            if remaining < RATE_LIMIT_WARNING_THRESHOLD {
                warn!(
                    "🔻 [FORGE_BUDGET]: Rate-limit budget low ({} remaining) after {}.",
                    remaining, materialized_path
                );
            }
        }
    }
}
