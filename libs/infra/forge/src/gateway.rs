// [libs/infra/forge/src/gateway.rs]
/*!
 * =================================================================
 * APARATO: FORGE DOMAIN GATEWAY
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: OPERACIONES DE DOMINIO SOBRE EL UPLINK TIPADO
 *
 * VISION:
 * 1. SEMANTIC LAYER: Cada operación del pipeline (fetch, update-branch,
 *    dispatch, merge, comment) existe aquí una sola vez; todo fallo
 *    emerge como 'GatewayError' con la operación que lo originó.
 * 2. DISPATCH LOCATOR: El dispatch de workflows no devuelve run id;
 *    la pasarela espera una gracia corta y localiza el run más nuevo
 *    filtrado por rama + workflow + ventana de creación. Si no hay
 *    candidato aún, emite un run fantasma que el ejecutor tolera
 *    durante los primeros ticks de sondeo.
 * 3. SNAPSHOT FALLBACK: Un 304 de GET condicional de PR se resuelve
 *    con el snapshot retenido de la última lectura 200.
 * =================================================================
 */

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::client::{ForgeClient, RateLimitSnapshot};
use crate::endpoint::ForgeEndpoint;
use crate::errors::{ForgeError, GatewayError};
use crate::models::{
    BranchUpdate, CommitComparison, MergeOutcome, MergeOptions, PullRequestView,
    RepositoryEventPage, WorkflowRun, WorkflowRunPage,
};

/// Gracia entre el dispatch y la primera localización del run.
const DISPATCH_SETTLE_GRACE: Duration = Duration::from_secs(3);

/// Tolerancia de reloj al filtrar runs por ventana de creación.
const DISPATCH_CLOCK_SKEW_ALLOWANCE_SECONDS: i64 = 30;

/// Pasarela semántica hacia el Forge.
pub struct ForgeGateway {
    uplink_client: ForgeClient,
    /// Snapshot de la última vista 200 por PR, para resolver 304.
    pull_request_snapshots: Mutex<HashMap<String, PullRequestView>>,
    /// Gracia de asentamiento del dispatch (reducible en pruebas).
    dispatch_settle_grace: Duration,
}

impl ForgeGateway {
    pub fn new(uplink_client: ForgeClient) -> Self {
        Self {
            uplink_client,
            pull_request_snapshots: Mutex::new(HashMap::new()),
            dispatch_settle_grace: DISPATCH_SETTLE_GRACE,
        }
    }

    /// Ajusta la gracia de asentamiento del dispatch.
    pub fn with_dispatch_settle_grace(mut self, grace: Duration) -> Self {
        self.dispatch_settle_grace = grace;
        self
    }

    /// Última lectura del presupuesto de rate-limit del uplink.
    pub fn rate_limit_snapshot(&self) -> RateLimitSnapshot {
        self.uplink_client.rate_limit_snapshot()
    }

    /// Recupera la vista vigente de un Pull Request (GET condicional).
    #[instrument(skip(self))]
    pub async fn get_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequestView, GatewayError> {
        let snapshot_key = format!("{}/{}#{}", owner, repo, number);
        let endpoint = ForgeEndpoint::get(
            "/repos/{}/{}/pulls/{}",
            vec![owner.to_string(), repo.to_string(), number.to_string()],
        )
        .with_etag();

        match self.uplink_client.execute_json::<PullRequestView>(&endpoint).await {
            Ok(view) => {
                self.pull_request_snapshots
                    .lock()
                    .expect("FATAL: PR snapshot lock poisoned.")
                    .insert(snapshot_key, view.clone());
                Ok(view)
            }
            Err(ForgeError::NotModified) => {
                let retained_snapshot = self
                    .pull_request_snapshots
                    .lock()
                    .expect("FATAL: PR snapshot lock poisoned.")
                    .get(&snapshot_key)
                    .cloned();

                match retained_snapshot {
                    Some(view) => Ok(view),
                    // Arranque en frío sin snapshot: lectura incondicional.
                    None => {
                        let unconditional = ForgeEndpoint::get(
                            "/repos/{}/{}/pulls/{}",
                            vec![owner.to_string(), repo.to_string(), number.to_string()],
                        );
                        self.uplink_client
                            .execute_json::<PullRequestView>(&unconditional)
                            .await
                            .map_err(|fault| GatewayError::new("get_pull_request", fault))
                    }
                }
            }
            Err(fault) => Err(GatewayError::new("get_pull_request", fault)),
        }
    }

    /// Ordena al Forge adelantar la rama del PR sobre la base vigente.
    ///
    /// El Forge puede responder 202 con la actualización en vuelo: el
    /// llamador debe re-consultar el PR para obtener el SHA autoritativo.
    #[instrument(skip(self))]
    pub async fn update_pull_request_branch(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<BranchUpdate, GatewayError> {
        let endpoint = ForgeEndpoint::put(
            "/repos/{}/{}/pulls/{}/update-branch",
            vec![owner.to_string(), repo.to_string(), number.to_string()],
            None,
        );

        let response_body = self
            .uplink_client
            .execute(&endpoint)
            .await
            .map_err(|fault| GatewayError::new("update_pull_request_branch", fault))?;

        // Respuesta 202: {"message": "...", "url": "..."}; un cuerpo vacío
        // también cuenta como aceptación.
        let message = serde_json::from_slice::<serde_json::Value>(&response_body)
            .ok()
            .and_then(|envelope| {
                envelope
                    .get("message")
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "accepted".to_string());

        debug!("🔁 [GATEWAY]: Branch update accepted for {}/{}#{}.", owner, repo, number);
        Ok(BranchUpdate {
            message,
            head_sha: None,
        })
    }

    /// Compara dos referencias de commit (base...head).
    #[instrument(skip(self))]
    pub async fn compare_commits(
        &self,
        owner: &str,
        repo: &str,
        base: &str,
        head: &str,
    ) -> Result<CommitComparison, GatewayError> {
        let comparison_range = format!("{}...{}", base, head);
        let endpoint = ForgeEndpoint::get(
            "/repos/{}/{}/compare/{}",
            vec![owner.to_string(), repo.to_string(), comparison_range],
        );

        self.uplink_client
            .execute_json::<CommitComparison>(&endpoint)
            .await
            .map_err(|fault| GatewayError::new("compare_commits", fault))
    }

    /// Dispara un workflow por dispatch y localiza el run resultante.
    #[instrument(skip(self, inputs))]
    pub async fn trigger_workflow(
        &self,
        owner: &str,
        repo: &str,
        workflow: &str,
        git_ref: &str,
        inputs: serde_json::Value,
    ) -> Result<WorkflowRun, GatewayError> {
        let dispatch_instant = Utc::now();

        let dispatch_endpoint = ForgeEndpoint::post(
            "/repos/{}/{}/actions/workflows/{}/dispatches",
            vec![owner.to_string(), repo.to_string(), workflow.to_string()],
            json!({ "ref": git_ref, "inputs": inputs }),
        );

        self.uplink_client
            .execute(&dispatch_endpoint)
            .await
            .map_err(|fault| GatewayError::new("trigger_workflow", fault))?;

        info!(
            "🚀 [GATEWAY]: Workflow '{}' dispatched on {}/{}@{}.",
            workflow, owner, repo, git_ref
        );

        // El Forge no devuelve run id: gracia corta y localización best-effort.
        tokio::time::sleep(self.dispatch_settle_grace).await;
        self.locate_dispatched_run(owner, repo, workflow, git_ref, dispatch_instant)
            .await
    }

    /// Localiza el run más nuevo creado tras el dispatch (best-effort).
    ///
    /// Sin candidato visible todavía, devuelve un run fantasma (id 0)
    /// que el ejecutor tolera durante los primeros ticks de sondeo.
    #[instrument(skip(self))]
    pub async fn locate_dispatched_run(
        &self,
        owner: &str,
        repo: &str,
        workflow: &str,
        git_ref: &str,
        dispatched_at: DateTime<Utc>,
    ) -> Result<WorkflowRun, GatewayError> {
        let locator_path_args = vec![
            owner.to_string(),
            repo.to_string(),
            format!(
                "{}/runs?event=workflow_dispatch&branch={}&per_page=10",
                workflow, git_ref
            ),
        ];
        let locator_endpoint =
            ForgeEndpoint::get("/repos/{}/{}/actions/workflows/{}", locator_path_args);

        let run_page = self
            .uplink_client
            .execute_json::<WorkflowRunPage>(&locator_endpoint)
            .await
            .map_err(|fault| GatewayError::new("locate_dispatched_run", fault))?;

        let creation_window_floor = dispatched_at
            - chrono::Duration::seconds(DISPATCH_CLOCK_SKEW_ALLOWANCE_SECONDS);

        // Candidato: el run más nuevo dentro de la ventana de creación.
        let located_run = run_page
            .workflow_runs
            .into_iter()
            .filter(|run| match run.created_at {
                Some(created_at) => created_at >= creation_window_floor,
                None => false,
            })
            .max_by_key(|run| run.created_at);

        match located_run {
            Some(run) => {
                debug!("🎯 [GATEWAY]: Dispatched run located (id {}).", run.id);
                Ok(run)
            }
            None => {
                warn!(
                    "👻 [GATEWAY]: No visible run yet for '{}' on {}; emitting placeholder.",
                    workflow, git_ref
                );
                Ok(WorkflowRun::placeholder())
            }
        }
    }

    /// Recupera el estado vigente de un run de workflow.
    #[instrument(skip(self))]
    pub async fn get_workflow_run(
        &self,
        owner: &str,
        repo: &str,
        run_id: u64,
    ) -> Result<WorkflowRun, GatewayError> {
        let endpoint = ForgeEndpoint::get(
            "/repos/{}/{}/actions/runs/{}",
            vec![owner.to_string(), repo.to_string(), run_id.to_string()],
        );

        self.uplink_client
            .execute_json::<WorkflowRun>(&endpoint)
            .await
            .map_err(|fault| GatewayError::new("get_workflow_run", fault))
    }

    /// Publica un comentario de notificación en el PR.
    #[instrument(skip(self, body))]
    pub async fn post_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<(), GatewayError> {
        let endpoint = ForgeEndpoint::post(
            "/repos/{}/{}/issues/{}/comments",
            vec![owner.to_string(), repo.to_string(), number.to_string()],
            json!({ "body": body }),
        );

        self.uplink_client
            .execute(&endpoint)
            .await
            .map(|_| ())
            .map_err(|fault| GatewayError::new("post_comment", fault))
    }

    /// Ejecuta la fusión del PR con el método configurado.
    ///
    /// Idempotencia: el Forge rechaza la re-fusión de un PR ya fusionado;
    /// el llamador resuelve ese rechazo re-consultando el estado del PR.
    #[instrument(skip(self, options))]
    pub async fn merge_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        options: &MergeOptions,
    ) -> Result<MergeOutcome, GatewayError> {
        let mut merge_body = json!({ "merge_method": options.method.as_str() });
        if let Some(title) = &options.title {
            merge_body["commit_title"] = json!(title);
        }
        if let Some(message) = &options.message {
            merge_body["commit_message"] = json!(message);
        }

        let endpoint = ForgeEndpoint::put(
            "/repos/{}/{}/pulls/{}/merge",
            vec![owner.to_string(), repo.to_string(), number.to_string()],
            Some(merge_body),
        );

        self.uplink_client
            .execute_json::<MergeOutcome>(&endpoint)
            .await
            .map_err(|fault| GatewayError::new("merge_pull_request", fault))
    }

    /// Lee el feed de eventos del repositorio con GET condicional.
    ///
    /// Devuelve `None` cuando el feed no cambió desde el último ETag
    /// (presupuesto de rate-limit preservado).
    #[instrument(skip(self))]
    pub async fn list_repository_events(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Option<RepositoryEventPage>, GatewayError> {
        let endpoint = ForgeEndpoint::get(
            "/repos/{}/{}/events",
            vec![owner.to_string(), repo.to_string()],
        )
        .with_etag();

        match self
            .uplink_client
            .execute_json::<Vec<crate::models::RepositoryEvent>>(&endpoint)
            .await
        {
            Ok(events) => {
                let latest_event_id = events.first().map(|event| event.id.clone());
                Ok(Some(RepositoryEventPage {
                    events,
                    latest_event_id,
                }))
            }
            Err(ForgeError::NotModified) => Ok(None),
            Err(fault) => Err(GatewayError::new("list_repository_events", fault)),
        }
    }
}
