// PKCE S256 challenge generation (RFC 7636).

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};

use social_broker_core::random::generate_random_string;

/// base64url(SHA-256(code_verifier)), no padding.
pub fn generate_code_challenge(code_verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code_verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// A fresh 43-character code verifier.
pub fn generate_code_verifier() -> String {
    generate_random_string(43)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn challenge_matches_rfc_7636_vector() {
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        assert_eq!(
            generate_code_challenge(verifier),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn verifier_length_and_uniqueness() {
        let a = generate_code_verifier();
        let b = generate_code_verifier();
        assert_eq!(a.len(), 43);
        assert_ne!(a, b);
    }
}
