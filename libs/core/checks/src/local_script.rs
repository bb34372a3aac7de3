// [libs/core/checks/src/local_script.rs]
/*!
 * =================================================================
 * APARATO: LOCAL SCRIPT EXECUTOR
 * CLASIFICACIÓN: CORE EXECUTOR (ESTRATO L2)
 * RESPONSABILIDAD: EJECUCIÓN DE PROCESOS HIJOS CON DEADLINE DURO
 *
 * VISION:
 * 1. ENVIRONMENT OVERLAY: El hijo hereda el entorno del proceso con
 *    las coordenadas del PR superpuestas (IMQ_PR_NUMBER, IMQ_PR_SHA,
 *    IMQ_PR_BASE_BRANCH, IMQ_PR_HEAD_BRANCH, IMQ_REPO_OWNER,
 *    IMQ_REPO_NAME).
 * 2. ESCALATION PROTOCOL: Al vencer el deadline, primero una señal
 *    de terminación cortés; tras 2 s de gracia, kill forzoso.
 * 3. VERDICT MAPPING: exit 0 → passed; cualquier otro código → failed
 *    con stdout/stderr recortados adjuntos al veredicto.
 * =================================================================
 */

use async_trait::async_trait;
use chrono::Utc;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use imq_domain_models::{CheckSpec, CheckStatus};

use crate::errors::CheckError;
use crate::executor::{CheckContext, CheckExecutor, CheckResult};

/// Deadline duro por defecto para un script local.
pub const DEFAULT_SCRIPT_TIMEOUT: Duration = Duration::from_secs(600);

/// Gracia entre la señal cortés y el kill forzoso.
const TERMINATION_GRACE: Duration = Duration::from_secs(2);

/// Tope de salida retenida por flujo (stdout / stderr).
const CAPTURED_OUTPUT_CAP_BYTES: usize = 64 * 1024;

/// Ejecutor de scripts locales del operador.
pub struct LocalScriptExecutor;

impl LocalScriptExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Extrae y valida la ruta del script desde la configuración del check.
    fn resolve_script_path(spec: &CheckSpec) -> Result<String, CheckError> {
        let script_path = spec
            .kind_config
            .get("path")
            .and_then(|value| value.as_str())
            .ok_or_else(|| {
                CheckError::InvalidConfiguration(format!(
                    "check '{}' lacks kind_config.path",
                    spec.id
                ))
            })?;

        let path_handle = Path::new(script_path);
        if !path_handle.exists() {
            return Err(CheckError::ScriptNotFound(script_path.to_string()));
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let metadata = std::fs::metadata(path_handle).map_err(|fault| {
                CheckError::ProcessExecutionFailed(format!("metadata: {}", fault))
            })?;
            if metadata.permissions().mode() & 0o111 == 0 {
                return Err(CheckError::ScriptNotExecutable(script_path.to_string()));
            }
        }

        Ok(script_path.to_string())
    }

    /// Recorta la salida capturada al tope retenido.
    fn trim_captured_output(raw_output: &[u8]) -> String {
        let text = String::from_utf8_lossy(raw_output);
        let trimmed = text.trim();
        if trimmed.len() > CAPTURED_OUTPUT_CAP_BYTES {
            trimmed.chars().take(CAPTURED_OUTPUT_CAP_BYTES).collect()
        } else {
            trimmed.to_string()
        }
    }

    /// Señal de terminación cortés previa al kill forzoso.
    #[cfg(unix)]
    fn send_polite_termination(process_id: u32) {
        unsafe {
            libc::kill(process_id as libc::pid_t, libc::SIGTERM);
        }
    }

    #[cfg(not(unix))]
    fn send_polite_termination(_process_id: u32) {
        // Sin señal cortés portable fuera de Unix: la escalada pasa
        // directamente al kill forzoso tras la gracia.
    }
}

impl Default for LocalScriptExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CheckExecutor for LocalScriptExecutor {
    #[instrument(skip(self, spec, context), fields(check = %spec.id))]
    async fn execute(
        &self,
        spec: &CheckSpec,
        context: &CheckContext,
    ) -> Result<CheckResult, CheckError> {
        let script_path = Self::resolve_script_path(spec)?;
        let hard_deadline = spec
            .timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_SCRIPT_TIMEOUT);

        let started_at = Utc::now();
        debug!("🧪 [SCRIPT]: Spawning '{}' (deadline {:?}).", script_path, hard_deadline);

        let mut child_process = Command::new(&script_path)
            .env("IMQ_PR_NUMBER", context.pr_number.to_string())
            .env("IMQ_PR_SHA", &context.head_sha)
            .env("IMQ_PR_BASE_BRANCH", &context.base_branch)
            .env("IMQ_PR_HEAD_BRANCH", &context.head_branch)
            .env("IMQ_REPO_OWNER", &context.repo_owner)
            .env("IMQ_REPO_NAME", &context.repo_name)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|fault| CheckError::ProcessExecutionFailed(fault.to_string()))?;

        // Sifones de salida desacoplados del wait del proceso.
        let mut stdout_pipe = child_process.stdout.take();
        let mut stderr_pipe = child_process.stderr.take();

        let stdout_siphon = tokio::spawn(async move {
            let mut captured = Vec::new();
            if let Some(pipe) = stdout_pipe.as_mut() {
                let _ = pipe.read_to_end(&mut captured).await;
            }
            captured
        });
        let stderr_siphon = tokio::spawn(async move {
            let mut captured = Vec::new();
            if let Some(pipe) = stderr_pipe.as_mut() {
                let _ = pipe.read_to_end(&mut captured).await;
            }
            captured
        });

        let wait_verdict = tokio::time::timeout(hard_deadline, child_process.wait()).await;

        let (exit_status, timed_out) = match wait_verdict {
            Ok(waited) => (
                Some(waited.map_err(|fault| {
                    CheckError::ProcessExecutionFailed(fault.to_string())
                })?),
                false,
            ),
            Err(_) => {
                // PROTOCOLO DE ESCALADA: señal cortés, gracia, kill forzoso.
                warn!("⏰ [SCRIPT]: Deadline exceeded for '{}'; escalating.", script_path);
                if let Some(process_id) = child_process.id() {
                    Self::send_polite_termination(process_id);
                }
                match tokio::time::timeout(TERMINATION_GRACE, child_process.wait()).await {
                    Ok(_) => {}
                    Err(_) => {
                        let _ = child_process.kill().await;
                    }
                }
                (None, true)
            }
        };

        let stdout_bytes = stdout_siphon.await.unwrap_or_default();
        let stderr_bytes = stderr_siphon.await.unwrap_or_default();

        let mut combined_output = Self::trim_captured_output(&stdout_bytes);
        let trimmed_stderr = Self::trim_captured_output(&stderr_bytes);
        if !trimmed_stderr.is_empty() {
            if !combined_output.is_empty() {
                combined_output.push('\n');
            }
            combined_output.push_str(&trimmed_stderr);
        }

        if timed_out {
            return Ok(CheckResult::sealed(
                CheckStatus::TimedOut,
                format!(
                    "script exceeded its {} second deadline\n{}",
                    hard_deadline.as_secs(),
                    combined_output
                ),
                started_at,
            ));
        }

        let verdict_status = match exit_status.and_then(|status| status.code()) {
            Some(0) => CheckStatus::Passed,
            Some(code) => {
                combined_output = format!("exit code {}\n{}", code, combined_output);
                CheckStatus::Failed
            }
            // Terminado por señal externa.
            None => CheckStatus::Failed,
        };

        Ok(CheckResult::sealed(verdict_status, combined_output, started_at))
    }
}
