// [tests/mirror/libs/shared/heimdall/heimdall_integrity.test.rs]
/**
 * =================================================================
 * APARATO: HEIMDALL INTEGRITY TEST
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L4-MIRROR
 * OBJETIVO: Certificar la ignición única del suscriptor y la
 *           supervivencia del hook de pánicos.
 * =================================================================
 */

use imq_shared_heimdall::init_tracing;

#[test]
fn certify_single_ignition_with_environment_contract() {
    println!("\n🧪 [PROVING_GROUNDS]: Heimdall ignition audit...");

    std::env::set_var("IMQ_LOG_FORMAT", "json");
    std::env::set_var("IMQ_LOG_LEVEL", "debug");

    // La ignición debe completar sin pánico con el contrato IMQ_*.
    init_tracing("imq_test_harness");

    // El hook de pánico instalado captura colapsos de hilos secundarios
    // sin derribar al proceso anfitrión.
    let worker = std::thread::spawn(|| {
        panic!("scripted collapse for the panic monitor");
    });
    assert!(worker.join().is_err(), "the collapse must surface to join");

    println!("   ✅ [SUCCESS]: Ignition and panic hook sealed.");

    std::env::remove_var("IMQ_LOG_FORMAT");
    std::env::remove_var("IMQ_LOG_LEVEL");
}
