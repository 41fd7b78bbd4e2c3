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

//! PEM encoding for Ed25519 keys.
//!
//! Public keys use the PKIX `SubjectPublicKeyInfo` form, private keys the
//! PKCS#8 `OneAsymmetricKey` form, so the files interoperate with OpenSSL.

use thiserror::Error;

/// PEM tag for Ed25519 public keys.
const PUBLIC_KEY_PEM_TAG: &str = "PUBLIC KEY";

/// PEM tag for Ed25519 private keys.
const PRIVATE_KEY_PEM_TAG: &str = "PRIVATE KEY";

/// ASN.1 DER prefix for Ed25519 public keys (SubjectPublicKeyInfo).
const ED25519_SPKI_PREFIX: [u8; 12] = [
    0x30, 0x2a, // SEQUENCE, 42 bytes
    0x30, 0x05, // SEQUENCE, 5 bytes (algorithm identifier)
    0x06, 0x03, // OID, 3 bytes
    0x2b, 0x65, 0x70, // 1.3.101.112 (Ed25519)
    0x03, 0x21, // BIT STRING, 33 bytes
    0x00, // unused bits
];

/// ASN.1 DER prefix for Ed25519 private keys (PKCS#8 v1).
const ED25519_PKCS8_PREFIX: [u8; 16] = [
    0x30, 0x2e, // SEQUENCE, 46 bytes
    0x02, 0x01, 0x00, // INTEGER 0 (version)
    0x30, 0x05, // SEQUENCE, 5 bytes (algorithm identifier)
    0x06, 0x03, // OID, 3 bytes
    0x2b, 0x65, 0x70, // 1.3.101.112 (Ed25519)
    0x04, 0x22, // OCTET STRING, 34 bytes
    0x04, 0x20, // OCTET STRING, 32 bytes (the seed)
];

#[derive(Debug, Error)]
pub enum KeyPemError {
    #[error("Invalid PEM format: {0}")]
    InvalidPem(String),

    #[error("Expected tag '{expected}', got '{actual}'")]
    WrongTag { expected: String, actual: String },

    #[error("Invalid DER encoding for Ed25519 key: {0}")]
    InvalidDer(String),
}

/// Encodes a raw 32-byte Ed25519 public key as PEM.
pub fn encode_public_key_pem(public_key: &[u8]) -> String {
    encode(PUBLIC_KEY_PEM_TAG, &ED25519_SPKI_PREFIX, public_key)
}

/// Encodes a raw 32-byte Ed25519 private key seed as PEM.
pub fn encode_private_key_pem(private_key: &[u8]) -> String {
    encode(PRIVATE_KEY_PEM_TAG, &ED25519_PKCS8_PREFIX, private_key)
}

/// Decodes a PEM-encoded Ed25519 public key to its raw 32 bytes.
pub fn decode_public_key_pem(pem_str: &str) -> Result<Vec<u8>, KeyPemError> {
    decode(pem_str, PUBLIC_KEY_PEM_TAG, &ED25519_SPKI_PREFIX)
}

/// Decodes a PEM-encoded Ed25519 private key to its raw 32-byte seed.
pub fn decode_private_key_pem(pem_str: &str) -> Result<Vec<u8>, KeyPemError> {
    decode(pem_str, PRIVATE_KEY_PEM_TAG, &ED25519_PKCS8_PREFIX)
}

fn encode(tag: &str, prefix: &[u8], key: &[u8]) -> String {
    let mut der = Vec::with_capacity(prefix.len() + key.len());
    der.extend_from_slice(prefix);
    der.extend_from_slice(key);
    pem::encode(&pem::Pem::new(tag, der))
}

fn decode(pem_str: &str, tag: &str, prefix: &[u8]) -> Result<Vec<u8>, KeyPemError> {
    let pem = pem::parse(pem_str).map_err(|e| KeyPemError::InvalidPem(e.to_string()))?;

    if pem.tag() != tag {
        return Err(KeyPemError::WrongTag {
            expected: tag.to_string(),
            actual: pem.tag().to_string(),
        });
    }

    let der = pem.contents();
    if der.len() != prefix.len() + 32 {
        return Err(KeyPemError::InvalidDer(format!(
            "expected {} bytes, got {}",
            prefix.len() + 32,
            der.len()
        )));
    }
    if &der[..prefix.len()] != prefix {
        return Err(KeyPemError::InvalidDer(
            "unexpected algorithm prefix".to_string(),
        ));
    }

    Ok(der[prefix.len()..].to_vec())
}
