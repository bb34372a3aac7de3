#![cfg(unix)]
// [tests/mirror/libs/core/checks/local_script.test.rs]
/*
 * =================================================================
 * APARATO: LOCAL SCRIPT EXECUTOR TEST
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L2-MIRROR
 * OBJETIVO: Certificar entorno inyectado, mapeo de códigos de salida,
 *           validación de ejecutabilidad y deadline con escalada.
 * =================================================================
 */

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::time::{Duration, Instant};

use imq_core_checks::{CheckContext, CheckError, CheckExecutor, LocalScriptExecutor};
use imq_domain_models::{CheckKind, CheckSpec, CheckStatus};

fn write_script(directory: &Path, name: &str, body: &str, mode: u32) -> String {
    let script_path = directory.join(name);
    std::fs::write(&script_path, body).expect("script write");
    std::fs::set_permissions(&script_path, std::fs::Permissions::from_mode(mode))
        .expect("chmod");
    script_path.to_str().unwrap().to_string()
}

fn spec_for(script_path: &str, timeout_seconds: Option<u64>) -> CheckSpec {
    CheckSpec {
        id: "local".into(),
        name: "Local".into(),
        kind: CheckKind::LocalScript,
        kind_config: serde_json::json!({ "path": script_path }),
        timeout_seconds,
        dependencies: vec![],
    }
}

fn context() -> CheckContext {
    CheckContext {
        pr_number: 42,
        head_sha: "a".repeat(40),
        base_branch: "main".into(),
        head_branch: "feature/turbo".into(),
        repo_owner: "acme".into(),
        repo_name: "widgets".into(),
    }
}

#[tokio::test]
async fn certify_environment_overlay_and_passed_verdict() {
    println!("\n🧪 [PROVING_GROUNDS]: Local script environment audit...");
    let scratch = tempfile::tempdir().unwrap();
    let script_path = write_script(
        scratch.path(),
        "env_probe.sh",
        "#!/bin/sh\necho \"pr=$IMQ_PR_NUMBER sha=$IMQ_PR_SHA base=$IMQ_PR_BASE_BRANCH head=$IMQ_PR_HEAD_BRANCH owner=$IMQ_REPO_OWNER repo=$IMQ_REPO_NAME\"\n",
        0o755,
    );

    let executor = LocalScriptExecutor::new();
    let result = executor
        .execute(&spec_for(&script_path, Some(30)), &context())
        .await
        .expect("execution");

    assert_eq!(result.status, CheckStatus::Passed);
    assert!(result.output.contains("pr=42"));
    assert!(result.output.contains(&format!("sha={}", "a".repeat(40))));
    assert!(result.output.contains("base=main"));
    assert!(result.output.contains("head=feature/turbo"));
    assert!(result.output.contains("owner=acme"));
    assert!(result.output.contains("repo=widgets"));
    println!("   ✅ [SUCCESS]: IMQ_* overlay reached the child process.");
}

#[tokio::test]
async fn certify_nonzero_exit_maps_to_failed_with_output() {
    let scratch = tempfile::tempdir().unwrap();
    let script_path = write_script(
        scratch.path(),
        "fail.sh",
        "#!/bin/sh\necho 'lint violations found' >&2\nexit 3\n",
        0o755,
    );

    let executor = LocalScriptExecutor::new();
    let result = executor
        .execute(&spec_for(&script_path, Some(30)), &context())
        .await
        .unwrap();

    assert_eq!(result.status, CheckStatus::Failed);
    assert!(result.output.contains("exit code 3"));
    assert!(result.output.contains("lint violations found"));
}

#[tokio::test]
async fn certify_missing_and_non_executable_scripts_are_vetoed() {
    let scratch = tempfile::tempdir().unwrap();
    let executor = LocalScriptExecutor::new();

    // Fantasma en el sistema de archivos.
    let ghost = scratch.path().join("ghost.sh");
    let verdict = executor
        .execute(&spec_for(ghost.to_str().unwrap(), Some(5)), &context())
        .await;
    assert!(matches!(verdict, Err(CheckError::ScriptNotFound(_))));

    // Presente pero sin bit de ejecución.
    let inert_path = write_script(scratch.path(), "inert.sh", "#!/bin/sh\nexit 0\n", 0o644);
    let verdict = executor
        .execute(&spec_for(&inert_path, Some(5)), &context())
        .await;
    assert!(matches!(verdict, Err(CheckError::ScriptNotExecutable(_))));

    // Configuración sin ruta.
    let pathless = CheckSpec {
        id: "broken".into(),
        name: "Broken".into(),
        kind: CheckKind::LocalScript,
        kind_config: serde_json::json!({}),
        timeout_seconds: None,
        dependencies: vec![],
    };
    let verdict = executor.execute(&pathless, &context()).await;
    assert!(matches!(verdict, Err(CheckError::InvalidConfiguration(_))));
}

#[tokio::test]
async fn certify_deadline_escalation_yields_timed_out() {
    let scratch = tempfile::tempdir().unwrap();
    let script_path = write_script(
        scratch.path(),
        "sleeper.sh",
        "#!/bin/sh\nsleep 30\n",
        0o755,
    );

    let executor = LocalScriptExecutor::new();
    let launch_instant = Instant::now();
    let result = executor
        .execute(&spec_for(&script_path, Some(1)), &context())
        .await
        .unwrap();
    let elapsed = launch_instant.elapsed();

    assert_eq!(result.status, CheckStatus::TimedOut);
    // Deadline (1s) + gracia de escalada (2s) + margen: « 30s del sleep.
    assert!(
        elapsed < Duration::from_secs(10),
        "escalation took {:?}",
        elapsed
    );
    assert!(result.output.contains("deadline"));
}
