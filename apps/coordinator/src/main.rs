// [apps/coordinator/src/main.rs]
/*!
 * =================================================================
 * APARATO: COORDINATOR MAIN ENTRY POINT
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L3)
 * RESPONSABILIDAD: BOOTSTRAP DE INFRAESTRUCTURA E IGNICIÓN SEGURA
 *
 * VISION:
 * 1. VALIDATION FIRST: Toda invariante de entorno (prefijo del token,
 *    rango de puerto, piso de polling) se certifica antes de abrir
 *    cualquier conexión; un entorno ilegal rehúsa el arranque.
 * 2. DETERMINISTIC IGNITION: El esquema de base de datos se aplica de
 *    forma síncrona antes de levantar cualquier servicio o socket.
 * =================================================================
 */

use dotenvy::dotenv;
use imq_coordinator::prelude::*;
use imq_shared_heimdall::init_tracing;
use tracing::{error, info};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. CARGA DE ENTORNO
    // Hidrata las variables de .env en el espacio de nombres del proceso.
    dotenv().ok();

    // 2. INICIALIZACIÓN DE OBSERVABILIDAD (HEIMDALL)
    init_tracing("imq_coordinator");

    // 3. VALIDACIÓN CENTRALIZADA DEL ENTORNO
    // Un entorno ilegal rehúsa el arranque antes de tocar red o disco.
    let runtime_settings = match RuntimeSettings::from_environment() {
        Ok(settings) => settings,
        Err(configuration_fault) => {
            error!("❌ [IGNITION_REFUSED]: {}", configuration_fault);
            std::process::exit(1);
        }
    };

    // 4. RUNTIME ASÍNCRONO
    let runtime_coordinator = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime_coordinator.block_on(async {
        info!("🛰️  [COMMAND_CENTER]: Merge-queue ignition sequence starting...");

        // 5. CONSTRUCCIÓN DEL KERNEL (DB → Forge → Motor → Estado)
        let kernel_instance = match CoordinatorKernel::ignite(runtime_settings).await {
            Ok(kernel) => kernel,
            Err(ignition_fault) => {
                error!("❌ [IGNITION_FAILED]: {}", ignition_fault);
                std::process::exit(1);
            }
        };

        // 6. OPERACIONES: daemons, pollers, drivers y servidor HTTP.
        kernel_instance.launch_operations().await;

        Ok(())
    })
}
