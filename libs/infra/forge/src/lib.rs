// [libs/infra/forge/src/lib.rs]
/*!
 * =================================================================
 * APARATO: FORGE CLIENT LIBRARY BARREL
 * CLASIFICACIÓN: INFRASTRUCTURE LIB (ESTRATO L3)
 * RESPONSABILIDAD: EXPOSICIÓN NOMINAL DEL CLIENTE Y LA PASARELA
 *
 * VISION:
 * 1. DOS CAPAS: 'client' habla HTTP tipado (auth, ETag, rate-limit,
 *    reintentos); 'gateway' habla el dominio (PRs, workflows, merges).
 * 2. TAXONOMÍA ESTABLE: Todo fallo aterriza en 'ForgeError'; la
 *    pasarela lo envuelve con la operación que lo originó.
 * =================================================================
 */

pub mod client;
pub mod endpoint;
pub mod errors;
pub mod gateway;
pub mod models;
pub mod retry;

pub use client::{ForgeClient, ForgeClientConfig, RateLimitSnapshot};
pub use endpoint::{ForgeEndpoint, HttpMethod};
pub use errors::{ForgeError, GatewayError};
pub use gateway::ForgeGateway;
pub use models::{
    BranchUpdate, CommitComparison, MergeOutcome, MergeOptions, PullRequestView,
    RepositoryEvent, RepositoryEventPage, WorkflowRun,
};
pub use retry::RetryPolicy;
