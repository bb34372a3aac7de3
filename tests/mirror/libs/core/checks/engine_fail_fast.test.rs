// [tests/mirror/libs/core/checks/engine_fail_fast.test.rs]
/**
 * =================================================================
 * APARATO: FAIL-FAST SCYTHE TEST
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L2-MIRROR
 * OBJETIVO: Certificar que el primer veredicto no-passed cancela a los
 *           pares en vuelo dentro de un tick cooperativo.
 * =================================================================
 */

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use imq_core_checks::{
    CheckContext, CheckEngine, CheckEngineConfig, CheckError, CheckExecutor, CheckResult,
};
use imq_domain_models::{CheckConfiguration, CheckKind, CheckSpec, CheckStatus};

/// Ejecutor guionado: cada check obtiene (retardo, veredicto) por id.
struct ScriptedExecutor {
    plan: HashMap<String, (Duration, CheckStatus)>,
}

#[async_trait]
impl CheckExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        spec: &CheckSpec,
        _context: &CheckContext,
    ) -> Result<CheckResult, CheckError> {
        let (delay, verdict) = self
            .plan
            .get(&spec.id)
            .cloned()
            .unwrap_or((Duration::ZERO, CheckStatus::Passed));

        let started_at = chrono::Utc::now();
        tokio::time::sleep(delay).await;
        Ok(CheckResult::sealed(verdict, format!("scripted {}", spec.id), started_at))
    }
}

fn spec(id: &str, timeout_seconds: u64) -> CheckSpec {
    CheckSpec {
        id: id.to_string(),
        name: id.to_string(),
        kind: CheckKind::LocalScript,
        kind_config: serde_json::json!({}),
        timeout_seconds: Some(timeout_seconds),
        dependencies: vec![],
    }
}

fn context(head_sha: &str) -> CheckContext {
    CheckContext {
        pr_number: 42,
        head_sha: head_sha.to_string(),
        base_branch: "main".into(),
        head_branch: "feature".into(),
        repo_owner: "acme".into(),
        repo_name: "widgets".into(),
    }
}

#[tokio::test]
async fn certify_fail_fast_reaps_peers_within_one_tick() {
    println!("\n🧪 [PROVING_GROUNDS]: Fail-fast scythe audit...");

    let mut plan = HashMap::new();
    plan.insert("A".to_string(), (Duration::from_millis(100), CheckStatus::Failed));
    plan.insert("B".to_string(), (Duration::from_secs(60), CheckStatus::Passed));
    plan.insert("C".to_string(), (Duration::from_secs(60), CheckStatus::Passed));

    let mut executors: HashMap<CheckKind, Arc<dyn CheckExecutor>> = HashMap::new();
    executors.insert(CheckKind::LocalScript, Arc::new(ScriptedExecutor { plan }));

    let engine = CheckEngine::new(CheckEngineConfig::default(), executors);
    let suite = CheckConfiguration {
        checks: vec![spec("A", 5), spec("B", 60), spec("C", 60)],
        fail_fast: true,
    };

    let launch_instant = Instant::now();
    let verdict = engine
        .execute_suite(&suite, &context(&"1".repeat(40)))
        .await
        .expect("suite execution");
    let elapsed = launch_instant.elapsed();

    // Runtime total « timeout de A + epsilon: los pares no corrieron 60s.
    assert!(
        elapsed < Duration::from_secs(5),
        "fail-fast took {:?}; peers were not reaped",
        elapsed
    );

    assert!(!verdict.all_passed);
    assert_eq!(verdict.failed_checks, vec!["A".to_string()]);

    let status_of = |id: &str| {
        verdict
            .results
            .iter()
            .find(|outcome| outcome.check_id == id)
            .map(|outcome| outcome.status)
            .unwrap()
    };
    assert_eq!(status_of("A"), CheckStatus::Failed);
    assert_eq!(status_of("B"), CheckStatus::Cancelled);
    assert_eq!(status_of("C"), CheckStatus::Cancelled);

    println!("   ✅ [SUCCESS]: Peers cancelled in {:?}.", elapsed);
}

#[tokio::test]
async fn certify_without_fail_fast_all_checks_conclude() {
    let mut plan = HashMap::new();
    plan.insert("A".to_string(), (Duration::from_millis(50), CheckStatus::Failed));
    plan.insert("B".to_string(), (Duration::from_millis(80), CheckStatus::Passed));

    let mut executors: HashMap<CheckKind, Arc<dyn CheckExecutor>> = HashMap::new();
    executors.insert(CheckKind::LocalScript, Arc::new(ScriptedExecutor { plan }));

    let engine = CheckEngine::new(CheckEngineConfig::default(), executors);
    let suite = CheckConfiguration {
        checks: vec![spec("A", 5), spec("B", 5)],
        fail_fast: false,
    };

    let verdict = engine
        .execute_suite(&suite, &context(&"2".repeat(40)))
        .await
        .unwrap();

    assert!(!verdict.all_passed);
    assert_eq!(verdict.failed_checks, vec!["A".to_string()]);
    // Sin fail-fast, B concluye con su veredicto propio.
    assert!(verdict
        .results
        .iter()
        .any(|outcome| outcome.check_id == "B" && outcome.status == CheckStatus::Passed));
}

#[tokio::test]
async fn certify_per_check_deadline_yields_timed_out_verdict() {
    let mut plan = HashMap::new();
    plan.insert("slow".to_string(), (Duration::from_secs(60), CheckStatus::Passed));

    let mut executors: HashMap<CheckKind, Arc<dyn CheckExecutor>> = HashMap::new();
    executors.insert(CheckKind::LocalScript, Arc::new(ScriptedExecutor { plan }));

    let engine = CheckEngine::new(CheckEngineConfig::default(), executors);
    let suite = CheckConfiguration {
        checks: vec![spec("slow", 1)],
        fail_fast: false,
    };

    let verdict = engine
        .execute_suite(&suite, &context(&"3".repeat(40)))
        .await
        .unwrap();

    // El vencimiento es un veredicto, no un error.
    assert_eq!(verdict.results[0].status, CheckStatus::TimedOut);
    assert!(!verdict.all_passed);
}
