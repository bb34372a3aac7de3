// [libs/infra/db/src/time_codec.rs]
//! Codificación temporal del Ledger: REAL epoch segundos ↔ DateTime<Utc>.

use chrono::{DateTime, TimeZone, Utc};

/// Serializa un instante como epoch segundos con fracción.
pub fn to_epoch_seconds(instant: DateTime<Utc>) -> f64 {
    instant.timestamp() as f64 + f64::from(instant.timestamp_subsec_micros()) / 1_000_000.0
}

/// Reconstruye el instante desde epoch segundos con fracción.
pub fn from_epoch_seconds(epoch: f64) -> DateTime<Utc> {
    let whole_seconds = epoch.floor() as i64;
    let fractional_micros = ((epoch - epoch.floor()) * 1_000_000.0).round() as u32;
    Utc.timestamp_opt(whole_seconds, fractional_micros * 1_000)
        .single()
        .unwrap_or_else(Utc::now)
}

/// Variante opcional para columnas anulables.
pub fn to_epoch_opt(instant: Option<DateTime<Utc>>) -> Option<f64> {
    instant.map(to_epoch_seconds)
}

/// Variante opcional para lecturas anulables.
pub fn from_epoch_opt(epoch: Option<f64>) -> Option<DateTime<Utc>> {
    epoch.map(from_epoch_seconds)
}
