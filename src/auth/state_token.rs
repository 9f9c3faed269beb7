//! auth::state_token
//!
//! Single-use anti-CSRF state carried through the OAuth round trip.

use serde::{Deserialize, Serialize};

/// Number of random bytes in a state token.
const STATE_BYTES: usize = 32;

/// Random, hex-encoded state value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateToken(String);

impl StateToken {
    /// Generate a fresh token from the thread RNG.
    pub fn generate() -> Self {
        let bytes: [u8; STATE_BYTES] = rand::random();
        Self(hex::encode(bytes))
    }

    /// The value to embed in the provider redirect.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare against the value returned on the callback.
    ///
    /// Runs in time independent of where the values first differ.
    pub fn verify(&self, returned: &str) -> bool {
        let expected = self.0.as_bytes();
        let returned = returned.as_bytes();
        if expected.len() != returned.len() {
            return false;
        }
        expected
            .iter()
            .zip(returned)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl std::fmt::Debug for StateToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StateToken([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_hex_and_unique() {
        let a = StateToken::generate();
        let b = StateToken::generate();
        assert_eq!(a.as_str().len(), STATE_BYTES * 2);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn verify_exact_match_only() {
        let token = StateToken::generate();
        assert!(token.verify(token.as_str()));
        assert!(!token.verify(""));
        assert!(!token.verify(&token.as_str()[1..]));

        let mut tampered = token.as_str()[..token.as_str().len() - 1].to_string();
        tampered.push(if token.as_str().ends_with('0') { '1' } else { '0' });
        assert!(!token.verify(&tampered));
    }

    #[test]
    fn debug_redacts_value() {
        let token = StateToken::generate();
        assert!(!format!("{:?}", token).contains(token.as_str()));
    }

    #[test]
    fn serializes_as_plain_string() {
        let token = StateToken::generate();
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(json, format!("\"{}\"", token.as_str()));
        let back: StateToken = serde_json::from_str(&json).unwrap();
        assert_eq!(back, token);
    }
}
