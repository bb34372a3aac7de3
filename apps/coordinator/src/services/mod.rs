// [apps/coordinator/src/services/mod.rs]
/**
 * =================================================================
 * APARATO: SERVICE ORCHESTRATION HUB
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: EXPOSICIÓN NOMINAL DE DAEMONS Y MOTORES
 * =================================================================
 */

pub mod event_bus;
pub mod poller;
pub mod queue_driver;
pub mod queue_engine;
pub mod recovery;

// --- RE-EXPORTACIONES SOBERANAS (NOMINAL ACCESS) ---

pub use event_bus::{EventBus, FilteredSubscriber, SubscriberSignal};
pub use poller::EventPoller;
pub use queue_driver::QueueDriver;
pub use queue_engine::{EngineError, QueueEngine};
pub use recovery::perform_startup_recovery;
