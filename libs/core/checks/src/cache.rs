// [libs/core/checks/src/cache.rs]
/*!
 * =================================================================
 * APARATO: SHA RESULT CACHE (TTL + LRU)
 * CLASIFICACIÓN: CORE LIB (ESTRATO L2)
 * RESPONSABILIDAD: MEMOIZACIÓN DE RESULTADOS DE SUITE POR CABEZA DE PR
 *
 * VISION:
 * 1. KEYED BY HEAD: Una cabeza de PR inmutable implica un veredicto
 *    inmutable de la suite; la clave es el head_sha completo.
 * 2. DUAL EVICTION: Expiración por TTL (defecto 1 h) y desalojo LRU
 *    al superar la capacidad (defecto 1000).
 * =================================================================
 */

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::engine::CheckExecutionResult;

/// TTL por defecto de un veredicto memoizado.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Capacidad por defecto del caché.
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

struct CacheSlot {
    result: CheckExecutionResult,
    stored_at: Instant,
    last_touched_at: Instant,
}

/// Caché de veredictos de suite, seguro ante concurrencia.
pub struct ShaResultCache {
    slots: Mutex<HashMap<String, CacheSlot>>,
    time_to_live: Duration,
    capacity: usize,
}

impl ShaResultCache {
    pub fn new(time_to_live: Duration, capacity: usize) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            time_to_live,
            capacity: capacity.max(1),
        }
    }

    /// Recupera el veredicto memoizado para la cabeza, si sigue fresco.
    pub fn lookup(&self, head_sha: &str) -> Option<CheckExecutionResult> {
        let mut slots_guard = self.slots.lock().expect("FATAL: SHA cache lock poisoned.");

        let is_fresh = match slots_guard.get(head_sha) {
            Some(slot) => slot.stored_at.elapsed() < self.time_to_live,
            None => return None,
        };

        if !is_fresh {
            slots_guard.remove(head_sha);
            return None;
        }

        let slot = slots_guard
            .get_mut(head_sha)
            .expect("INVARIANT: slot present after freshness probe");
        slot.last_touched_at = Instant::now();
        debug!("♻️ [SHA_CACHE]: Verdict served from memo for {}.", head_sha);
        Some(slot.result.clone())
    }

    /// Memoiza el veredicto, desalojando al menos usado si desborda.
    pub fn store(&self, head_sha: &str, result: CheckExecutionResult) {
        let mut slots_guard = self.slots.lock().expect("FATAL: SHA cache lock poisoned.");

        // Purga perezosa de vencidos antes de evaluar capacidad.
        slots_guard.retain(|_, slot| slot.stored_at.elapsed() < self.time_to_live);

        if slots_guard.len() >= self.capacity && !slots_guard.contains_key(head_sha) {
            if let Some(least_recent_key) = slots_guard
                .iter()
                .min_by_key(|(_, slot)| slot.last_touched_at)
                .map(|(key, _)| key.clone())
            {
                slots_guard.remove(&least_recent_key);
                debug!("💀 [SHA_CACHE]: LRU eviction of {}.", least_recent_key);
            }
        }

        let storage_instant = Instant::now();
        slots_guard.insert(
            head_sha.to_string(),
            CacheSlot {
                result,
                stored_at: storage_instant,
                last_touched_at: storage_instant,
            },
        );
    }

    /// Invalida explícitamente la cabeza (cambios de suite configurada).
    pub fn invalidate(&self, head_sha: &str) {
        self.slots
            .lock()
            .expect("FATAL: SHA cache lock poisoned.")
            .remove(head_sha);
    }

    /// Vacía el caché íntegro (reemplazo de configuración).
    pub fn clear(&self) {
        self.slots
            .lock()
            .expect("FATAL: SHA cache lock poisoned.")
            .clear();
    }

    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .expect("FATAL: SHA cache lock poisoned.")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ShaResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL, DEFAULT_CACHE_CAPACITY)
    }
}
