// [tests/mirror/libs/infra/forge/retry_policy.test.rs]
/**
 * =================================================================
 * APARATO: RETRY POLICY TEST
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * OBJETIVO: Certificar el sobre de retroceso exponencial con techo y
 *           jitter uniforme ±20%.
 * =================================================================
 */

use std::time::Duration;

use imq_infra_forge::RetryPolicy;

#[test]
fn certify_exponential_envelope_with_ceiling() {
    println!("\n🧪 [PROVING_GROUNDS]: Backoff envelope audit...");
    let policy = RetryPolicy {
        max_attempts: 8,
        base_delay: Duration::from_millis(250),
        max_delay: Duration::from_secs(4),
    };

    // Primer intento: sin espera.
    assert_eq!(policy.nominal_delay(1), Duration::ZERO);

    // Escalera base · 2^(i-1).
    assert_eq!(policy.nominal_delay(2), Duration::from_millis(250));
    assert_eq!(policy.nominal_delay(3), Duration::from_millis(500));
    assert_eq!(policy.nominal_delay(4), Duration::from_millis(1000));
    assert_eq!(policy.nominal_delay(5), Duration::from_millis(2000));
    assert_eq!(policy.nominal_delay(6), Duration::from_millis(4000));

    // Techo absoluto alcanzado.
    assert_eq!(policy.nominal_delay(7), Duration::from_secs(4));
    assert_eq!(policy.nominal_delay(8), Duration::from_secs(4));
    println!("   ✅ [SUCCESS]: Ceiling held at {:?}.", policy.max_delay);
}

#[test]
fn certify_jitter_envelope_is_bounded() {
    let policy = RetryPolicy::default();
    let nominal_millis = policy.nominal_delay(3).as_millis() as f64;

    for _ in 0..500 {
        let jittered_millis = policy.jittered_delay(3).as_millis() as f64;
        assert!(
            jittered_millis >= nominal_millis * 0.79 && jittered_millis <= nominal_millis * 1.21,
            "jitter escaped the ±20% envelope: {}ms vs {}ms nominal",
            jittered_millis,
            nominal_millis
        );
    }
}

#[test]
fn certify_defaults_match_the_operational_contract() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_attempts, 3);
    assert!(policy.base_delay > Duration::ZERO);
    assert!(policy.max_delay >= policy.base_delay);
}
