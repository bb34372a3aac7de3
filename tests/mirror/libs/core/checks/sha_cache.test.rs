// [tests/mirror/libs/core/checks/sha_cache.test.rs]
/**
 * =================================================================
 * APARATO: SHA MEMOIZATION TEST
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L2-MIRROR
 * OBJETIVO: Certificar que una cabeza inmutable sirve su veredicto
 *           desde el memo sin despertar ejecutor alguno.
 * =================================================================
 */

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use imq_core_checks::{
    CheckContext, CheckEngine, CheckEngineConfig, CheckError, CheckExecutor, CheckResult,
};
use imq_domain_models::{CheckConfiguration, CheckKind, CheckSpec, CheckStatus};

/// Ejecutor contable: cada invocación real incrementa el tally.
struct TallyingExecutor {
    invocation_tally: Arc<AtomicUsize>,
}

#[async_trait]
impl CheckExecutor for TallyingExecutor {
    async fn execute(
        &self,
        spec: &CheckSpec,
        _context: &CheckContext,
    ) -> Result<CheckResult, CheckError> {
        self.invocation_tally.fetch_add(1, Ordering::SeqCst);
        Ok(CheckResult::sealed(
            CheckStatus::Passed,
            format!("executed {}", spec.id),
            chrono::Utc::now(),
        ))
    }
}

fn harness() -> (CheckEngine, Arc<AtomicUsize>, CheckConfiguration) {
    let invocation_tally = Arc::new(AtomicUsize::new(0));
    let mut executors: HashMap<CheckKind, Arc<dyn CheckExecutor>> = HashMap::new();
    executors.insert(
        CheckKind::LocalScript,
        Arc::new(TallyingExecutor {
            invocation_tally: Arc::clone(&invocation_tally),
        }),
    );

    let engine = CheckEngine::new(CheckEngineConfig::default(), executors);
    let suite = CheckConfiguration {
        checks: vec![CheckSpec {
            id: "ci".into(),
            name: "CI".into(),
            kind: CheckKind::LocalScript,
            kind_config: serde_json::json!({}),
            timeout_seconds: Some(5),
            dependencies: vec![],
        }],
        fail_fast: true,
    };

    (engine, invocation_tally, suite)
}

fn context(head_sha: String) -> CheckContext {
    CheckContext {
        pr_number: 42,
        head_sha,
        base_branch: "main".into(),
        head_branch: "feature".into(),
        repo_owner: "acme".into(),
        repo_name: "widgets".into(),
    }
}

#[tokio::test]
async fn certify_second_execution_serves_from_memo() {
    println!("\n🧪 [PROVING_GROUNDS]: SHA memoization audit...");
    let (engine, tally, suite) = harness();
    let stable_head = "b1".repeat(20);

    // 1. EXECUTION: primera pasada ejecuta de verdad.
    let first_verdict = engine
        .execute_suite(&suite, &context(stable_head.clone()))
        .await
        .unwrap();
    assert!(first_verdict.all_passed);
    assert_eq!(tally.load(Ordering::SeqCst), 1);

    // 2. RE-EXECUTION: cabeza idéntica → memo, cero ejecutores.
    let second_verdict = engine
        .execute_suite(&suite, &context(stable_head))
        .await
        .unwrap();
    assert!(second_verdict.all_passed);
    assert_eq!(
        tally.load(Ordering::SeqCst),
        1,
        "an executor awoke on a memoized head"
    );
    println!("   ✅ [SUCCESS]: Memoized verdict served without executors.");

    // 3. FRESH HEAD: una cabeza nueva ejecuta de nuevo.
    engine
        .execute_suite(&suite, &context("c1".repeat(20)))
        .await
        .unwrap();
    assert_eq!(tally.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn certify_failed_verdicts_are_memoized_too() {
    // Un veredicto fallido también se sella: reintentos con la misma
    // cabeza no queman presupuesto de ejecutores.
    struct FailingExecutor {
        invocation_tally: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl CheckExecutor for FailingExecutor {
        async fn execute(
            &self,
            _spec: &CheckSpec,
            _context: &CheckContext,
        ) -> Result<CheckResult, CheckError> {
            self.invocation_tally.fetch_add(1, Ordering::SeqCst);
            Ok(CheckResult::sealed(
                CheckStatus::Failed,
                "scripted failure".into(),
                chrono::Utc::now(),
            ))
        }
    }

    let invocation_tally = Arc::new(AtomicUsize::new(0));
    let mut executors: HashMap<CheckKind, Arc<dyn CheckExecutor>> = HashMap::new();
    executors.insert(
        CheckKind::LocalScript,
        Arc::new(FailingExecutor {
            invocation_tally: Arc::clone(&invocation_tally),
        }),
    );
    let engine = CheckEngine::new(CheckEngineConfig::default(), executors);

    let suite = CheckConfiguration {
        checks: vec![CheckSpec {
            id: "ci".into(),
            name: "CI".into(),
            kind: CheckKind::LocalScript,
            kind_config: serde_json::json!({}),
            timeout_seconds: Some(5),
            dependencies: vec![],
        }],
        fail_fast: true,
    };

    let head = "d2".repeat(20);
    let first = engine.execute_suite(&suite, &context(head.clone())).await.unwrap();
    let second = engine.execute_suite(&suite, &context(head)).await.unwrap();

    assert!(!first.all_passed);
    assert!(!second.all_passed);
    assert_eq!(invocation_tally.load(Ordering::SeqCst), 1);
}
