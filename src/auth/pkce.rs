//! PKCE (RFC 7636) values for the authorization-code flow.
//!
//! The verifier and the CSRF `state` are 32 random bytes, base64url without
//! padding (43 characters). The challenge is `BASE64URL(SHA256(verifier))`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

pub const CHALLENGE_METHOD: &str = "S256";

/// One login attempt's verifier, challenge and state.
#[derive(Debug, Clone)]
pub struct PkcePair {
    /// Kept locally until the token exchange
    pub verifier: String,
    /// Sent with the authorization request
    pub challenge: String,
    pub state: String,
}

impl PkcePair {
    pub fn generate() -> Self {
        let verifier = random_token();
        let challenge = challenge_for(&verifier);
        Self {
            verifier,
            challenge,
            state: random_token(),
        }
    }
}

pub fn challenge_for(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifier_length_within_rfc_bounds() {
        let pair = PkcePair::generate();
        assert!((43..=128).contains(&pair.verifier.len()));
        assert!(pair
            .verifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn values_are_unique_per_attempt() {
        let a = PkcePair::generate();
        let b = PkcePair::generate();
        assert_ne!(a.verifier, b.verifier);
        assert_ne!(a.state, b.state);
        assert_ne!(a.state, a.verifier);
    }

    #[test]
    fn challenge_matches_rfc_example() {
        // RFC 7636 appendix B
        assert_eq!(
            challenge_for("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn challenge_is_derived_from_verifier() {
        let pair = PkcePair::generate();
        assert_eq!(pair.challenge, challenge_for(&pair.verifier));
        assert!(!pair.challenge.contains('='));
    }
}
