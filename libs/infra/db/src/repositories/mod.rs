// [libs/infra/db/src/repositories/mod.rs]
/*!
 * =================================================================
 * APARATO: REPOSITORY ACCESS MATRIX
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: EXPOSICIÓN NOMINAL DE REPOSITORIOS POR AGREGADO
 * =================================================================
 */

pub mod check_repository;
pub mod configuration_repository;
pub mod poll_cursor_repository;
pub mod pull_request_repository;
pub mod queue_entry_repository;
pub mod queue_repository;
pub mod repository_catalog;

pub use check_repository::CheckRepository;
pub use configuration_repository::ConfigurationRepository;
pub use poll_cursor_repository::PollCursorRepository;
pub use pull_request_repository::PullRequestRepository;
pub use queue_entry_repository::QueueEntryRepository;
pub use queue_repository::QueueRepository;
pub use repository_catalog::RepositoryCatalog;
