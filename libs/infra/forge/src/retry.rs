// [libs/infra/forge/src/retry.rs]
/*!
 * =================================================================
 * APARATO: RETRY POLICY (EXPONENTIAL BACKOFF + JITTER)
 * CLASIFICACIÓN: INFRASTRUCTURE LIB (ESTRATO L3)
 * RESPONSABILIDAD: CADENCIA DE REINTENTOS ANTE FALLOS TRANSITORIOS
 *
 * VISION:
 * 1. DETERMINISTIC ENVELOPE: Retardo base · 2^(i-1), techo en
 *    'max_delay', jitter uniforme ±20% para decorrelacionar ráfagas.
 * 2. PURE POLICY: El cálculo de retardo es una función pura testeable;
 *    la aleatoriedad se inyecta en el último paso.
 * =================================================================
 */

use rand::Rng;
use std::time::Duration;

/// Fracción de jitter uniforme aplicada sobre el retardo nominal.
const JITTER_FRACTION: f64 = 0.2;

/// Política de reintentos con retroceso exponencial y jitter.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Número máximo de intentos (incluido el primero).
    pub max_attempts: u32,
    /// Retardo base del primer reintento.
    pub base_delay: Duration,
    /// Techo absoluto del retardo nominal.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Retardo nominal (sin jitter) previo al intento `attempt` (1-indexado:
    /// el intento 1 no espera; el intento 2 espera base; el 3, base·2...).
    pub fn nominal_delay(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exponent = attempt.saturating_sub(2).min(31);
        let scaled = self
            .base_delay
            .as_millis()
            .saturating_mul(1u128 << exponent);
        Duration::from_millis(scaled.min(self.max_delay.as_millis()) as u64)
    }

    /// Retardo efectivo: nominal ± 20% de jitter uniforme.
    pub fn jittered_delay(&self, attempt: u32) -> Duration {
        let nominal = self.nominal_delay(attempt);
        if nominal.is_zero() {
            return nominal;
        }
        let nominal_millis = nominal.as_millis() as f64;
        let jitter_span = nominal_millis * JITTER_FRACTION;
        let jitter_offset = rand::thread_rng().gen_range(-jitter_span..=jitter_span);
        Duration::from_millis((nominal_millis + jitter_offset).max(0.0) as u64)
    }
}
