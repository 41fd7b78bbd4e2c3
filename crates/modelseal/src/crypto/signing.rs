/*
 *  Copyright 2025-2026 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Ed25519 signing primitives.
//!
//! Provides functions for:
//! - Generating Ed25519 keypairs
//! - Computing SHA256 digests and key fingerprints
//! - Signing and verifying messages

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors from the low-level signing primitives.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid private key: expected 32 bytes, got {0}")]
    InvalidPrivateKeyLength(usize),

    #[error("Invalid public key: expected 32 bytes, got {0}")]
    InvalidPublicKeyLength(usize),

    #[error("Invalid signature: expected 64 bytes, got {0}")]
    InvalidSignatureLength(usize),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Signature verification failed")]
    VerificationFailed,
}

/// A generated Ed25519 keypair.
pub struct GeneratedKeypair {
    /// The 32-byte private key seed
    pub private_key: Vec<u8>,
    /// The 32-byte public key
    pub public_key: Vec<u8>,
    /// SHA256 hex fingerprint of the public key
    pub fingerprint: String,
}

/// Generates a new Ed25519 keypair from the thread-local CSPRNG.
pub fn generate_signing_keypair() -> GeneratedKeypair {
    let mut csprng = rand::thread_rng();
    let signing_key = SigningKey::generate(&mut csprng);
    let public_key = signing_key.verifying_key().to_bytes();

    GeneratedKeypair {
        private_key: signing_key.to_bytes().to_vec(),
        public_key: public_key.to_vec(),
        fingerprint: compute_key_fingerprint(&public_key),
    }
}

/// Derives the 32-byte public key for a 32-byte private key seed.
pub fn public_key_for(private_key: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let key_bytes: [u8; 32] = private_key
        .try_into()
        .map_err(|_| CryptoError::InvalidPrivateKeyLength(private_key.len()))?;
    Ok(SigningKey::from_bytes(&key_bytes)
        .verifying_key()
        .to_bytes()
        .to_vec())
}

/// Computes the SHA256 hex fingerprint of a public key.
pub fn compute_key_fingerprint(public_key: &[u8]) -> String {
    hex::encode(compute_digest(public_key))
}

/// Computes the raw SHA256 digest of `data`.
pub fn compute_digest(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Signs `message` with a 32-byte Ed25519 private key seed.
///
/// # Returns
///
/// The 64-byte Ed25519 signature.
pub fn sign_message(message: &[u8], private_key: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let key_bytes: [u8; 32] = private_key
        .try_into()
        .map_err(|_| CryptoError::InvalidPrivateKeyLength(private_key.len()))?;

    let signing_key = SigningKey::from_bytes(&key_bytes);
    Ok(signing_key.sign(message).to_bytes().to_vec())
}

/// Verifies an Ed25519 `signature` over `message`.
///
/// # Errors
///
/// Returns [`CryptoError::VerificationFailed`] if the signature does not
/// match, or a length error if the inputs are malformed.
pub fn verify_signature(
    message: &[u8],
    signature: &[u8],
    public_key: &[u8],
) -> Result<(), CryptoError> {
    let key_bytes: [u8; 32] = public_key
        .try_into()
        .map_err(|_| CryptoError::InvalidPublicKeyLength(public_key.len()))?;
    let sig_bytes: [u8; 64] = signature
        .try_into()
        .map_err(|_| CryptoError::InvalidSignatureLength(signature.len()))?;

    let verifying_key = VerifyingKey::from_bytes(&key_bytes)
        .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;

    verifying_key
        .verify(message, &Signature::from_bytes(&sig_bytes))
        .map_err(|_| CryptoError::VerificationFailed)
}
