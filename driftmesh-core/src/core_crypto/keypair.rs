//! Keypair module
//!
//! Ed25519 key material used to author and verify replicated entries.
//! Every Add/Refresh/Remove request is signed by the entry owner; remote
//! peers verify provenance with the embedded public key.
//!
//! Security: secret keys are automatically zeroized on drop.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

/// Ed25519 keypair owning one or more replicated entries
#[derive(Clone, Serialize, Deserialize)]
pub struct Keypair {
    /// Public key bytes (32 bytes)
    public: Vec<u8>,
    /// Secret key bytes (32 bytes), zeroized on drop
    secret: Vec<u8>,
}

impl Keypair {
    /// Generate a new Ed25519 keypair
    pub fn generate() -> Self {
        use rand::Rng;
        let mut csprng = rand::rng();
        let seed_bytes: [u8; 32] = csprng.random();

        let signing_key = SigningKey::from_bytes(&seed_bytes);
        let verifying_key = signing_key.verifying_key();

        Keypair {
            public: verifying_key.to_bytes().to_vec(),
            secret: signing_key.to_bytes().to_vec(),
        }
    }

    /// Sign a message, returning the 64-byte signature
    pub fn sign(&self, msg: &[u8]) -> Vec<u8> {
        let secret: [u8; 32] = self
            .secret
            .as_slice()
            .try_into()
            .expect("secret key is always 32 bytes");
        let signing_key = SigningKey::from_bytes(&secret);

        let signature = signing_key.sign(msg);
        signature.to_bytes().to_vec()
    }

    /// Verify a signature against a public key
    pub fn verify(pubkey: &[u8], msg: &[u8], sig: &[u8]) -> bool {
        if pubkey.len() != 32 || sig.len() != 64 {
            return false;
        }

        let key_bytes: [u8; 32] = match pubkey.try_into() {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };
        let verifying_key = match VerifyingKey::from_bytes(&key_bytes) {
            Ok(vk) => vk,
            Err(_) => return false,
        };

        let signature = match Signature::from_slice(sig) {
            Ok(sig) => sig,
            Err(_) => return false,
        };

        verifying_key.verify(msg, &signature).is_ok()
    }

    /// Get reference to public key
    pub fn public_key(&self) -> &[u8] {
        &self.public
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("public", &hex::encode(&self.public))
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl Drop for Keypair {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_generation() {
        let kp = Keypair::generate();
        assert_eq!(kp.public_key().len(), 32);
    }

    #[test]
    fn test_sign_and_verify() {
        let kp = Keypair::generate();
        let msg = b"replicated entry bytes";
        let sig = kp.sign(msg);
        assert_eq!(sig.len(), 64);
        assert!(Keypair::verify(kp.public_key(), msg, &sig));
    }

    #[test]
    fn test_verify_rejects_tampered_message() {
        let kp = Keypair::generate();
        let sig = kp.sign(b"original");
        assert!(!Keypair::verify(kp.public_key(), b"tampered", &sig));
    }

    #[test]
    fn test_verify_rejects_wrong_key() {
        let kp = Keypair::generate();
        let other = Keypair::generate();
        let sig = kp.sign(b"message");
        assert!(!Keypair::verify(other.public_key(), b"message", &sig));
    }

    #[test]
    fn test_verify_rejects_malformed_inputs() {
        let kp = Keypair::generate();
        let sig = kp.sign(b"message");
        assert!(!Keypair::verify(&[0u8; 4], b"message", &sig));
        assert!(!Keypair::verify(kp.public_key(), b"message", &[0u8; 10]));
    }

    #[test]
    fn test_debug_does_not_leak_secret() {
        let kp = Keypair::generate();
        let debug_str = format!("{:?}", kp);
        assert!(debug_str.contains("<redacted>"));
    }
}
