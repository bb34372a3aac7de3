// [libs/shared/heimdall/src/lib.rs]
/*!
 * =================================================================
 * APARATO: HEIMDALL NEURAL OBSERVER
 * CLASIFICACIÓN: SHARED UTILITY (ESTRATO L4)
 * RESPONSABILIDAD: GESTIÓN DE TELEMETRÍA, TRAZADO Y CAPTURA DE PÁNICOS
 *
 * VISION:
 * 1. DUAL MODE: Emisión JSON plana para ingesta estructurada o modo
 *    compacto legible, seleccionado por la variable IMQ_LOG_FORMAT.
 * 2. SOVEREIGN FILTER: El nivel base proviene de IMQ_LOG_LEVEL con
 *    silenciamiento de ruido de infraestructura (Tower, Hyper, libSQL).
 * 3. PHOENIX SHIELD: Hook de pánico global con volcado de coordenadas
 *    y payload antes de la defunción del proceso.
 * =================================================================
 */

use std::panic;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt as formatting_layer, EnvFilter};

/// Formatos de emisión soportados por el contrato de entorno.
const LOG_FORMAT_JSON: &str = "json";
const LOG_FORMAT_PRETTY: &str = "pretty";

/// Inicializa el sistema de trazas Heimdall con blindaje de pánicos.
///
/// # Comportamiento:
/// - `IMQ_LOG_FORMAT=json`: Estructura JSON plana (flatten) por línea.
/// - `IMQ_LOG_FORMAT=pretty` (defecto): Logs compactos para el operador.
/// - `IMQ_LOG_LEVEL` fija el nivel del dominio; `RUST_LOG` tiene prioridad
///   absoluta si está presente.
///
/// # Panics:
/// Si otro suscriptor global ya ha sido inicializado en el runtime.
pub fn init_tracing(service_nominal_identifier: &str) {
    // 1. CONFIGURACIÓN DEL FILTRO DINÁMICO
    // Priorizamos los logs del dominio y silenciamos ruidos de infraestructura.
    let environmental_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let domain_level = std::env::var("IMQ_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        format!(
            "{service}={level},tower_http=warn,hyper=warn,libsql=error,reqwest=warn",
            service = service_nominal_identifier,
            level = domain_level
        )
        .into()
    });

    let requested_output_format = std::env::var("IMQ_LOG_FORMAT")
        .unwrap_or_else(|_| LOG_FORMAT_PRETTY.to_string())
        .to_lowercase();

    // 2. CONSTRUCCIÓN DE LA ARQUITECTURA DE SUSCRIPCIÓN (Dual Mode)
    if requested_output_format == LOG_FORMAT_JSON {
        tracing_subscriber::registry()
            .with(environmental_filter)
            .with(formatting_layer::layer().json().flatten_event(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(environmental_filter)
            .with(formatting_layer::layer().compact().with_target(false))
            .init();
    }

    // 3. PROTOCOLO PHOENIX SHIELD (Global Panic Hook)
    // Captura colapsos en hilos secundarios (drivers de cola, pollers)
    // y los persiste en el rastro antes de la terminación.
    let service_id_snapshot = service_nominal_identifier.to_string();

    panic::set_hook(Box::new(move |panic_metadata| {
        let panic_location = panic_metadata
            .location()
            .map(|location| format!("{}:{}:{}", location.file(), location.line(), location.column()))
            .unwrap_or_else(|| "UNKNOWN_STRATA_COORDINATES".to_string());

        let panic_payload_message = panic_metadata
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| {
                panic_metadata
                    .payload()
                    .downcast_ref::<String>()
                    .map(|s| s.as_str())
            })
            .unwrap_or("UNDEFINED_KERNEL_COLLAPSE_PAYLOAD");

        error!(
            target: "panic_monitor",
            service = %service_id_snapshot,
            estrato = %panic_location,
            "🔥 [CRITICAL_PANIC]: Thread terminated abruptly. Analysis: {}",
            panic_payload_message
        );
    }));

    info!(
        "👁️  [HEIMDALL_ONLINE]: Observability strata levelized for [{}].",
        service_nominal_identifier
    );
}
