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

//! Boundary to the keyless signing and verification authority.
//!
//! The orchestrators in [`crate::security`] only ever talk to an authority
//! through the traits in this module:
//!
//! ```text
//! IdentityProvider --> SigningAuthority::open --> SigningSession::sign* --> close
//!                      VerificationAuthority::open --> VerificationSession::verify* --> close
//! ```
//!
//! One session is opened per run and shared by every payload in that run.
//! Sessions take `&self` for `sign`/`verify` so many calls may be in flight
//! at once; implementations must be `Send + Sync`.
//!
//! [`SignatureBundle`] is opaque to everything except the authority that
//! produced it.

pub mod identity;
pub mod local;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub use identity::Identity;

/// Errors returned by a signing authority.
#[derive(Debug, Clone, Error)]
pub enum SigningError {
    #[error("Signing authority rejected the request: {0}")]
    Rejected(String),

    #[error("Signing authority unreachable: {0}")]
    Transport(String),

    #[error("Signing authority call timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors returned by a verification authority for a single payload.
#[derive(Debug, Clone, Error)]
pub enum VerificationError {
    #[error("Invalid signature: cryptographic verification failed")]
    InvalidSignature,

    #[error("Payload digest does not match the signed digest")]
    DigestMismatch,

    #[error("Certificate is not trusted: {0}")]
    UntrustedCertificate(String),

    #[error("Certificate was not valid at signing time {0}")]
    CertificateExpired(String),

    #[error("Signature bundle malformed: {0}")]
    MalformedBundle(String),

    #[error("Verification authority unreachable: {0}")]
    Transport(String),

    #[error("Verification authority call timed out after {0:?}")]
    Timeout(Duration),
}

/// An opaque, serializable proof object returned by a signing authority.
///
/// Nothing outside the authority that produced a bundle inspects it; the rest
/// of the crate only stores and replays its canonical form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignatureBundle(serde_json::Value);

impl SignatureBundle {
    /// Wrap an authority-defined canonical form.
    pub fn from_canonical_form(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// The authority-defined canonical form, for persistence.
    pub fn to_canonical_form(&self) -> serde_json::Value {
        self.0.clone()
    }

    pub(crate) fn as_canonical_form(&self) -> &serde_json::Value {
        &self.0
    }
}

/// Who signed a payload and when, as attested by the authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedSignature {
    pub signer_identity: String,
    pub timestamp: DateTime<Utc>,
}

/// Factory for signing sessions bound to an authenticated identity.
#[async_trait]
pub trait SigningAuthority: Send + Sync {
    /// Open a session for `identity`.
    async fn open(&self, identity: &Identity) -> Result<Box<dyn SigningSession>, SigningError>;
}

/// A scoped signing session.
#[async_trait]
pub trait SigningSession: Send + Sync {
    /// Sign `payload` and return its bundle.
    async fn sign(&self, payload: &[u8]) -> Result<SignatureBundle, SigningError>;

    /// Release the session. Called exactly once on every exit path.
    async fn close(self: Box<Self>) -> Result<(), SigningError>;
}

/// Factory for verification sessions.
#[async_trait]
pub trait VerificationAuthority: Send + Sync {
    async fn open(&self) -> Result<Box<dyn VerificationSession>, VerificationError>;
}

/// A scoped verification session.
#[async_trait]
pub trait VerificationSession: Send + Sync {
    /// Verify `payload` against `bundle`.
    async fn verify(
        &self,
        payload: &[u8],
        bundle: &SignatureBundle,
    ) -> Result<VerifiedSignature, VerificationError>;

    /// Release the session. Called exactly once on every exit path.
    async fn close(self: Box<Self>);
}
