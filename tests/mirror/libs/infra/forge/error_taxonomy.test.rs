// [tests/mirror/libs/infra/forge/error_taxonomy.test.rs]
/**
 * =================================================================
 * APARATO: FORGE ERROR TAXONOMY TEST
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * OBJETIVO: Certificar la política de reintentos por clase de fallo y
 *           la propagación de rate-limit a través del sobre agotado.
 * =================================================================
 */

use imq_infra_forge::{ForgeError, GatewayError};

#[test]
fn certify_only_transient_faults_are_retryable() {
    println!("\n🧪 [PROVING_GROUNDS]: Retryability matrix audit...");

    // 5xx: transitorio.
    assert!(ForgeError::Http {
        status: 502,
        message: "bad gateway".into()
    }
    .is_retryable());
    assert!(ForgeError::Http {
        status: 500,
        message: "internal".into()
    }
    .is_retryable());

    // 4xx y clasificados: accionables, jamás reintentados.
    assert!(!ForgeError::Unauthorized.is_retryable());
    assert!(!ForgeError::Forbidden.is_retryable());
    assert!(!ForgeError::NotFound.is_retryable());
    assert!(!ForgeError::ValidationFailed("bad field".into()).is_retryable());
    assert!(!ForgeError::RateLimitExceeded.is_retryable());
    assert!(!ForgeError::Http {
        status: 404,
        message: "missing".into()
    }
    .is_retryable());
    assert!(!ForgeError::NotModified.is_retryable());

    println!("   ✅ [SUCCESS]: Retry matrix sealed.");
}

#[test]
fn certify_rate_limit_survives_the_exhausted_envelope() {
    let exhausted = ForgeError::AllAttemptsFailed {
        attempts: 3,
        last: Box::new(ForgeError::RateLimitExceeded),
    };
    assert!(exhausted.is_rate_limited());

    let exhausted_transient = ForgeError::AllAttemptsFailed {
        attempts: 3,
        last: Box::new(ForgeError::Http {
            status: 503,
            message: "unavailable".into(),
        }),
    };
    assert!(!exhausted_transient.is_rate_limited());
}

#[test]
fn certify_gateway_wrapper_classification() {
    let gateway_fault = GatewayError::new("merge_pull_request", ForgeError::NotFound);
    assert!(gateway_fault.is_user_actionable());
    assert!(!gateway_fault.is_rate_limited());

    let budget_fault = GatewayError::new("get_pull_request", ForgeError::RateLimitExceeded);
    assert!(budget_fault.is_rate_limited());
    assert!(!budget_fault.is_user_actionable());

    // El mensaje transporta la operación de origen.
    assert!(gateway_fault.to_string().contains("merge_pull_request"));
}
