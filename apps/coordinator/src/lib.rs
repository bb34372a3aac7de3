// [apps/coordinator/src/lib.rs]
/*!
 * =================================================================
 * APARATO: COORDINATOR LIBRARY ROOT
 * CLASIFICACIÓN: CRATE ROOT (ESTRATO L3)
 * RESPONSABILIDAD: DEFINICIÓN SUPREMA DEL ÁRBOL DE MÓDULOS
 * =================================================================
 */

// --- ESTRATO DE CONFIGURACIÓN Y ARRANQUE ---
/// Validación centralizada del contrato de entorno IMQ_*.
pub mod runtime_config;
/// Núcleo de mando para la ignición de servicios.
pub mod kernel;

// --- ESTRATO DE ESTADO (L1-APP) ---
/// Placa base de estado compartido, métricas y registro de drivers.
pub mod state;

// --- ESTRATO DE TRANSPORTE Y ACCIÓN ---
/// Adaptadores de entrada para ráfagas HTTP y WebSockets.
pub mod handlers;
/// Topología de red: rutas REST, webhook y túnel de eventos.
pub mod routes;

// --- ESTRATO DE SERVICIOS ---
/// Motor de colas, drivers por rama, ingreso por polling y bus de señales.
pub mod services;

/**
 * PRELUDIO DEL COORDINADOR
 *
 * Re-exportación estratégica de los componentes necesarios para la
 * ignición mínima del sistema desde 'main.rs'.
 */
pub mod prelude {
    pub use crate::kernel::CoordinatorKernel;
    pub use crate::runtime_config::{IngressMode, RuntimeSettings};
    pub use crate::state::AppState;
}
