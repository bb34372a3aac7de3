// [tests/mirror/apps/coordinator/handlers/webhook_signature.test.rs]
/**
 * =================================================================
 * APARATO: WEBHOOK SIGNATURE BOUNDARY TEST
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L4-MIRROR
 * OBJETIVO: Certificar que un solo byte alterado en cuerpo o secreto
 *           rechaza la firma HMAC-SHA256.
 * =================================================================
 */

use hmac::{Hmac, Mac};
use sha2::Sha256;

use imq_coordinator::handlers::webhook::verify_webhook_signature;

fn sign(secret: &[u8], body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret).unwrap();
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

#[test]
fn certify_valid_signature_is_accepted() {
    println!("\n🧪 [PROVING_GROUNDS]: HMAC boundary audit...");
    let secret = b"sovereign-webhook-secret";
    let body = br#"{"action":"labeled","pull_request":{"number":42}}"#;

    let signature = sign(secret, body);
    assert!(verify_webhook_signature(secret, body, &signature));
    println!("   ✅ [SUCCESS]: Genuine signature admitted.");
}

#[test]
fn certify_single_byte_mutations_reject() {
    let secret = b"sovereign-webhook-secret";
    let body = br#"{"action":"labeled","pull_request":{"number":42}}"#.to_vec();
    let signature = sign(secret, &body);

    // Mutación de cada byte del cuerpo: rechazo total.
    for byte_index in 0..body.len() {
        let mut mutated_body = body.clone();
        mutated_body[byte_index] ^= 0x01;
        assert!(
            !verify_webhook_signature(secret, &mutated_body, &signature),
            "mutated body byte {} slipped through",
            byte_index
        );
    }

    // Mutación del secreto: rechazo.
    let mut mutated_secret = secret.to_vec();
    mutated_secret[0] ^= 0x01;
    assert!(!verify_webhook_signature(&mutated_secret, &body, &signature));

    // Mutación de la firma misma: rechazo.
    let mut mutated_signature = signature.clone().into_bytes();
    let last_index = mutated_signature.len() - 1;
    mutated_signature[last_index] =
        if mutated_signature[last_index] == b'0' { b'1' } else { b'0' };
    assert!(!verify_webhook_signature(
        secret,
        &body,
        std::str::from_utf8(&mutated_signature).unwrap()
    ));
}

#[test]
fn certify_malformed_headers_reject() {
    let secret = b"sovereign-webhook-secret";
    let body = b"payload";

    // Sin prefijo del esquema.
    let bare_hex = sign(secret, body).trim_start_matches("sha256=").to_string();
    assert!(!verify_webhook_signature(secret, body, &bare_hex));

    // Esquema ajeno.
    assert!(!verify_webhook_signature(secret, body, "sha1=deadbeef"));

    // Hex corrupto.
    assert!(!verify_webhook_signature(secret, body, "sha256=zzzz"));

    // Vacío.
    assert!(!verify_webhook_signature(secret, body, ""));
}
