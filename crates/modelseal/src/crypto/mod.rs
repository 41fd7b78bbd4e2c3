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

//! Cryptographic utilities backing the offline signing authority.
//!
//! This module provides:
//! - Ed25519 key generation, signing, and verification
//! - SHA256 payload digests and key fingerprints
//! - PEM import/export for root keys

mod key_pem;
mod signing;

pub use key_pem::{
    decode_private_key_pem, decode_public_key_pem, encode_private_key_pem, encode_public_key_pem,
    KeyPemError,
};
pub use signing::{
    compute_digest, compute_key_fingerprint, generate_signing_keypair, public_key_for,
    sign_message, verify_signature, CryptoError, GeneratedKeypair,
};
