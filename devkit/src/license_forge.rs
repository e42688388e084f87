/*!
Forge de licences pour les tests.

Signe un payload `{"software": "<nom>:<nombre>", "customer": "<client>"}` en
ed25519 et l'encode comme le jeton réel: `base32(payload_json || signature)`.
La clé vient d'une graine fixe, donc les jetons sont déterministes.
*/

use data_encoding::BASE32;
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use serde_json::json;

pub struct LicenseForge {
    signing: SigningKey,
}

impl LicenseForge {
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            signing: SigningKey::from_bytes(&seed),
        }
    }

    /// The key a collector under test must be handed to accept these tokens.
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing.verifying_key()
    }

    /// Base32 form of the verifying key, as it would be compiled in.
    pub fn public_key_b32(&self) -> String {
        BASE32.encode(self.verifying_key().as_bytes())
    }

    /// Signed token for a well-formed payload.
    pub fn token(&self, software: &str, customer: &str) -> String {
        let payload = json!({ "software": software, "customer": customer });
        let bytes = serde_json::to_vec(&payload).expect("license payload serializes");
        self.token_for_payload(&bytes)
    }

    /// Signed token over arbitrary payload bytes, for malformed-payload tests.
    pub fn token_for_payload(&self, payload: &[u8]) -> String {
        let signature = self.signing.sign(payload);
        let mut raw = payload.to_vec();
        raw.extend_from_slice(&signature.to_bytes());
        BASE32.encode(&raw)
    }
}
