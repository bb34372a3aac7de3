// [tests/mirror/apps/coordinator/runtime_config.test.rs]
/**
 * =================================================================
 * APARATO: RUNTIME CONFIG VALIDATION TEST
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * OBJETIVO: Certificar que todo entorno ilegal rehúsa el arranque.
 *
 * NOTA TÉCNICA: El entorno del proceso es global; los escenarios se
 * certifican en un único test secuencial para evitar carreras.
 * =================================================================
 */

use imq_coordinator::runtime_config::RuntimeSettings;

const MANAGED_VARIABLES: &[&str] = &[
    "IMQ_GITHUB_TOKEN",
    "IMQ_GITHUB_REPO",
    "IMQ_GITHUB_API_URL",
    "IMQ_GITHUB_MODE",
    "IMQ_POLLING_INTERVAL",
    "IMQ_WEBHOOK_SECRET",
    "IMQ_WEBHOOK_PROXY_URL",
    "IMQ_TRIGGER_LABEL",
    "IMQ_DATABASE_PATH",
    "IMQ_DATABASE_POOL_SIZE",
    "IMQ_API_HOST",
    "IMQ_API_PORT",
    "IMQ_LOG_FORMAT",
    "IMQ_ENVIRONMENT",
    "IMQ_DEBUG",
];

fn reset_environment() {
    for variable in MANAGED_VARIABLES {
        std::env::remove_var(variable);
    }
}

#[test]
fn certify_environment_contract_sequentially() {
    println!("\n🧪 [PROVING_GROUNDS]: Environment contract audit...");

    // --- ESCENARIO 1: token ausente rehúsa ---
    reset_environment();
    assert!(RuntimeSettings::from_environment().is_err());

    // --- ESCENARIO 2: prefijo de token ilegal rehúsa ---
    reset_environment();
    std::env::set_var("IMQ_GITHUB_TOKEN", "sk-not-a-forge-token");
    assert!(RuntimeSettings::from_environment().is_err());

    // --- ESCENARIO 3: mínimo legal con defaults ---
    reset_environment();
    std::env::set_var("IMQ_GITHUB_TOKEN", "ghp_abcdef0123456789");
    let settings = RuntimeSettings::from_environment().expect("legal environment");
    assert_eq!(settings.github_api_url, "https://api.github.com");
    assert_eq!(settings.api_port, 8080);
    assert_eq!(settings.polling_interval.as_secs(), 10);
    assert_eq!(settings.database_pool_size, 5);
    println!("   ✅ [SUCCESS]: Defaults materialized.");

    // Prefijos restantes aceptados.
    std::env::set_var("IMQ_GITHUB_TOKEN", "github_pat_abcdef0123456789");
    assert!(RuntimeSettings::from_environment().is_ok());
    std::env::set_var("IMQ_GITHUB_TOKEN", "ghs_abcdef0123456789");
    assert!(RuntimeSettings::from_environment().is_ok());
    std::env::set_var("IMQ_GITHUB_TOKEN", "ghp_abcdef0123456789");

    // --- ESCENARIO 4: piso de polling (≥ 10 s) ---
    std::env::set_var("IMQ_POLLING_INTERVAL", "9");
    assert!(RuntimeSettings::from_environment().is_err(), "sub-floor interval accepted");
    std::env::set_var("IMQ_POLLING_INTERVAL", "45");
    let settings = RuntimeSettings::from_environment().unwrap();
    assert_eq!(settings.polling_interval.as_secs(), 45);
    assert_eq!(settings.polling_interval_ceiling().as_secs(), 360);
    std::env::remove_var("IMQ_POLLING_INTERVAL");

    // --- ESCENARIO 5: rango de puerto (1–65535) ---
    std::env::set_var("IMQ_API_PORT", "0");
    assert!(RuntimeSettings::from_environment().is_err());
    std::env::set_var("IMQ_API_PORT", "70000");
    assert!(RuntimeSettings::from_environment().is_err());
    std::env::set_var("IMQ_API_PORT", "not-a-port");
    assert!(RuntimeSettings::from_environment().is_err());
    std::env::set_var("IMQ_API_PORT", "9090");
    assert_eq!(RuntimeSettings::from_environment().unwrap().api_port, 9090);
    std::env::remove_var("IMQ_API_PORT");

    // --- ESCENARIO 6: enumeraciones cerradas ---
    std::env::set_var("IMQ_GITHUB_MODE", "carrier-pigeon");
    assert!(RuntimeSettings::from_environment().is_err());
    std::env::remove_var("IMQ_GITHUB_MODE");

    std::env::set_var("IMQ_LOG_FORMAT", "xml");
    assert!(RuntimeSettings::from_environment().is_err());
    std::env::set_var("IMQ_LOG_FORMAT", "json");
    assert!(RuntimeSettings::from_environment().is_ok());
    std::env::remove_var("IMQ_LOG_FORMAT");

    std::env::set_var("IMQ_ENVIRONMENT", "chaos");
    assert!(RuntimeSettings::from_environment().is_err());
    std::env::set_var("IMQ_ENVIRONMENT", "production");
    assert!(RuntimeSettings::from_environment().is_ok());
    std::env::remove_var("IMQ_ENVIRONMENT");

    // --- ESCENARIO 7: modo webhook exige secreto ---
    std::env::set_var("IMQ_GITHUB_MODE", "webhook");
    assert!(RuntimeSettings::from_environment().is_err());
    std::env::set_var("IMQ_WEBHOOK_SECRET", "sovereign-secret");
    assert!(RuntimeSettings::from_environment().is_ok());
    std::env::remove_var("IMQ_GITHUB_MODE");
    std::env::remove_var("IMQ_WEBHOOK_SECRET");

    // --- ESCENARIO 8: identidad de repositorio malformada ---
    std::env::set_var("IMQ_GITHUB_REPO", "not-an-identity");
    assert!(RuntimeSettings::from_environment().is_err());
    std::env::set_var("IMQ_GITHUB_REPO", "acme/widgets");
    let settings = RuntimeSettings::from_environment().unwrap();
    assert_eq!(settings.github_repo.as_deref(), Some("acme/widgets"));

    reset_environment();
    println!("   ✅ [SUCCESS]: Environment contract sealed.");
}
