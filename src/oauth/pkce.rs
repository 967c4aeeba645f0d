//! Usage: Per-flow secrets for the authorization request: the PKCE pair (S256) and
//! the `state` nonce echoed back on the callback.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Verifier entropy; encodes to 86 characters, inside RFC 7636's 43..=128.
const VERIFIER_BYTES: usize = 64;
const STATE_BYTES: usize = 32;

pub(crate) const CHALLENGE_METHOD: &str = "S256";

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

#[derive(Debug, Clone)]
pub(crate) struct PkcePair {
    pub(crate) code_verifier: String,
    pub(crate) code_challenge: String,
}

impl PkcePair {
    pub(crate) fn generate() -> Self {
        Self::from_verifier(URL_SAFE_NO_PAD.encode(random_bytes::<VERIFIER_BYTES>()))
    }

    fn from_verifier(code_verifier: String) -> Self {
        let code_challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(code_verifier.as_bytes()));
        Self {
            code_verifier,
            code_challenge,
        }
    }
}

/// Lowercase hex of [`STATE_BYTES`] random bytes.
pub(crate) fn new_state() -> String {
    random_bytes::<STATE_BYTES>()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifier_uses_unreserved_characters_only() {
        let pair = PkcePair::generate();
        assert_eq!(pair.code_verifier.len(), 86);
        assert!(pair
            .code_verifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_eq!(
            PkcePair::from_verifier(pair.code_verifier.clone()).code_challenge,
            pair.code_challenge
        );
    }

    #[test]
    fn challenge_matches_rfc7636_appendix_b() {
        let pair = PkcePair::from_verifier("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk".to_string());
        assert_eq!(pair.code_challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn each_flow_gets_fresh_secrets() {
        let (a, b) = (new_state(), new_state());
        assert_eq!(a.len(), STATE_BYTES * 2);
        assert!(a.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
        assert_ne!(a, b);
        assert_ne!(PkcePair::generate().code_verifier, PkcePair::generate().code_verifier);
    }
}
