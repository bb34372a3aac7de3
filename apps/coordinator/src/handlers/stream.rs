// [apps/coordinator/src/handlers/stream.rs]
/**
 * =================================================================
 * APARATO: EVENT STREAM SOCKET
 * CLASIFICACIÓN: API HANDLER (ESTRATO L4)
 * RESPONSABILIDAD: TÚNEL WEBSOCKET DE SEÑALES DE ESTADO
 *
 * VISION:
 * 1. LOSSY LINK CONTRACT: Un suscriptor lento jamás frena el motor;
 *    al detectar pérdida (Lagged) el túnel emite un frame 'resync'
 *    y el cliente recarga el snapshot REST.
 * 2. KEEPALIVE: Ping periódico para sobrevivir proxies de capa 7.
 * =================================================================
 */

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use chrono::Utc;
use futures::{sink::SinkExt, stream::StreamExt};
use serde_json::json;
use tokio::sync::broadcast;
use tokio::time::{interval, Duration};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::state::AppState;

/// Intervalo de latido (Keep-Alive).
const KEEPALIVE_INTERVAL_SECONDS: u64 = 25;

/**
 * Punto de entrada para la negociación del túnel de eventos.
 * Transición de protocolo HTTP a WebSocket (RFC 6455).
 */
#[instrument(skip(websocket_upgrade, application_state))]
pub async fn establish_event_stream(
    websocket_upgrade: WebSocketUpgrade,
    State(application_state): State<AppState>,
) -> impl IntoResponse {
    debug!("🔌 [SOCKET_UPGRADE]: Negotiating protocol transition...");
    websocket_upgrade.on_upgrade(move |socket| handle_active_stream(socket, application_state))
}

/**
 * Orquestador de la sesión: sifón del bus → socket, más keepalive.
 */
async fn handle_active_stream(socket: WebSocket, application_state: AppState) {
    let (mut socket_sender, mut socket_receiver) = socket.split();
    let mut bus_subscriber = application_state.event_bus.subscribe();

    let session_identifier = Uuid::new_v4().to_string();
    info!("⚡ [STREAM_OPEN]: Event stream session {} established.", session_identifier);

    // --- TAREA 1: DOWNSTREAM (Bus → Cliente) ---
    let session_id_downstream = session_identifier.clone();
    let mut downstream_task = tokio::spawn(async move {
        let mut keepalive_timer = interval(Duration::from_secs(KEEPALIVE_INTERVAL_SECONDS));

        loop {
            tokio::select! {
                // Brazo 1: pulso de vida físico (Ping).
                _ = keepalive_timer.tick() => {
                    if socket_sender.send(Message::Ping(vec![])).await.is_err() {
                        break;
                    }
                }

                // Brazo 2: sifón del bus de señales.
                bus_signal = bus_subscriber.recv() => {
                    let outbound_frame = match bus_signal {
                        Ok(event) => {
                            serde_json::to_string(&event.to_frame()).unwrap_or_default()
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped_count)) => {
                            // Enlace lossy: el cliente re-sincroniza vía REST.
                            debug!(
                                "🕳️ [STREAM]: Session {} lagged; {} signals dropped.",
                                session_id_downstream, skipped_count
                            );
                            serde_json::to_string(&json!({
                                "type": "resync",
                                "payload": { "skipped": skipped_count },
                                "timestamp": Utc::now(),
                            }))
                            .unwrap_or_default()
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    };

                    if !outbound_frame.is_empty()
                        && socket_sender.send(Message::Text(outbound_frame)).await.is_err()
                    {
                        break;
                    }
                }
            }
        }
    });

    // --- TAREA 2: UPSTREAM (Cliente → Servidor; sólo control) ---
    let mut upstream_task = tokio::spawn(async move {
        while let Some(Ok(inbound_message)) = socket_receiver.next().await {
            match inbound_message {
                Message::Close(_) => break,
                // Pong y texto entrante se drenan sin efecto.
                _ => continue,
            }
        }
    });

    // Limpieza determinista: la primera tarea caída arrastra a la otra.
    tokio::select! {
        _ = &mut downstream_task => upstream_task.abort(),
        _ = &mut upstream_task => downstream_task.abort(),
    }

    info!("🔌 [STREAM_CLOSED]: Event stream session {} drained.", session_identifier);
}
