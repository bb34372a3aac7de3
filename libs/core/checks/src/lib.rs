// [libs/core/checks/src/lib.rs]
/*!
 * =================================================================
 * APARATO: CHECK ENGINE LIBRARY BARREL
 * CLASIFICACIÓN: CORE LIB (ESTRATO L2)
 * RESPONSABILIDAD: EXPOSICIÓN NOMINAL DEL MOTOR Y SUS EJECUTORES
 *
 * VISION:
 * 1. POLYMORPHIC EXECUTION: Un contrato único ('CheckExecutor') con
 *    dos materializaciones: workflow del Forge y script local.
 * 2. BOUNDED FAN-OUT: El motor despliega la suite bajo un semáforo
 *    cooperativo, honra dependencias y corta en el primer fallo
 *    cuando la suite lo exige.
 * 3. SHA MEMOIZATION: Un resultado por cabeza de PR; TTL + LRU.
 * =================================================================
 */

pub mod cache;
pub mod engine;
pub mod errors;
pub mod executor;
pub mod forge_workflow;
pub mod local_script;

pub use cache::ShaResultCache;
pub use engine::{CheckEngine, CheckEngineConfig, CheckExecutionResult, CheckOutcome};
pub use errors::CheckError;
pub use executor::{CheckContext, CheckExecutor, CheckResult};
pub use forge_workflow::ForgeWorkflowExecutor;
pub use local_script::LocalScriptExecutor;
