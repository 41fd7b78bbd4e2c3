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

//! Offline keyless-style authority.
//!
//! Mirrors the shape of a Fulcio/Rekor deployment without any network:
//! a long-lived Ed25519 root key certifies one ephemeral key per signing
//! session, binds it to the session identity, and countersigns each log
//! entry. Intended for air-gapped pipelines and tests; it is not a
//! certificate authority or transparency log.
//!
//! Bundle layout:
//!
//! ```text
//! {
//!   "mediaType": "application/vnd.modelseal.bundle.v1+json",
//!   "verificationMaterial": {
//!     "certificate": { subject, issuer, publicKey, notBefore, notAfter, signature },
//!     "tlogEntry":   { logIndex, integratedTime, signedEntryTimestamp }
//!   },
//!   "messageSignature": { "messageDigest": { algorithm, digest }, "signature" }
//! }
//! ```

use super::identity::Identity;
use super::{
    SignatureBundle, SigningAuthority, SigningError, SigningSession, VerificationAuthority,
    VerificationError, VerificationSession, VerifiedSignature,
};
use crate::crypto::{
    compute_digest, compute_key_fingerprint, decode_private_key_pem, decode_public_key_pem,
    encode_private_key_pem, encode_public_key_pem, generate_signing_keypair, public_key_for,
    sign_message, verify_signature, KeyPemError,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Media type stamped on every bundle this authority produces.
pub const BUNDLE_MEDIA_TYPE: &str = "application/vnd.modelseal.bundle.v1+json";

/// Digest algorithm identifier recorded in bundles.
pub const DIGEST_ALGORITHM: &str = "SHA2_256";

/// File name of the root private key written by [`generate_root_keys`].
pub const ROOT_PRIVATE_KEY_FILE: &str = "root.key";

/// File name of the root public key written by [`generate_root_keys`].
pub const ROOT_PUBLIC_KEY_FILE: &str = "root.pub";

/// Default lifetime of a session certificate.
pub fn default_certificate_validity() -> Duration {
    Duration::minutes(10)
}

#[derive(Debug, Error)]
pub enum AuthorityKeyError {
    #[error("Failed to access key file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Pem(#[from] KeyPemError),

    #[error("Invalid root key: {0}")]
    InvalidKey(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CertificateBody {
    subject: String,
    issuer: String,
    public_key: String,
    not_before: String,
    not_after: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Certificate {
    #[serde(flatten)]
    body: CertificateBody,
    signature: String,
}

/// What the root countersigns for each log entry.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LogEntryBody<'a> {
    log_index: u64,
    integrated_time: &'a str,
    digest: &'a str,
    signature: &'a str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TlogEntry {
    log_index: u64,
    integrated_time: String,
    signed_entry_timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerificationMaterial {
    certificate: Certificate,
    tlog_entry: TlogEntry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MessageDigest {
    algorithm: String,
    digest: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageSignature {
    message_digest: MessageDigest,
    signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocalBundle {
    media_type: String,
    verification_material: VerificationMaterial,
    message_signature: MessageSignature,
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn log_entry_bytes(
    log_index: u64,
    integrated_time: &str,
    digest: &str,
    signature: &str,
) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&LogEntryBody {
        log_index,
        integrated_time,
        digest,
        signature,
    })
}

/// Signing side of the offline authority.
#[derive(Clone)]
pub struct LocalSigningAuthority {
    root_private_key: Vec<u8>,
    root_public_key: Vec<u8>,
    validity: Duration,
    log_index: Arc<AtomicU64>,
}

impl LocalSigningAuthority {
    /// Create an authority from a 32-byte root private key seed.
    pub fn new(root_private_key: Vec<u8>) -> Result<Self, AuthorityKeyError> {
        let root_public_key = public_key_for(&root_private_key)
            .map_err(|e| AuthorityKeyError::InvalidKey(e.to_string()))?;
        Ok(Self {
            root_private_key,
            root_public_key,
            validity: default_certificate_validity(),
            log_index: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Create an authority with a freshly generated root key.
    pub fn generate() -> Self {
        let keypair = generate_signing_keypair();
        Self {
            root_private_key: keypair.private_key,
            root_public_key: keypair.public_key,
            validity: default_certificate_validity(),
            log_index: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Load the root private key from a PEM file.
    pub fn from_pem_file(path: &Path) -> Result<Self, AuthorityKeyError> {
        let pem = std::fs::read_to_string(path).map_err(|source| AuthorityKeyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(decode_private_key_pem(&pem)?)
    }

    /// Override the lifetime of session certificates.
    pub fn with_certificate_validity(mut self, validity: Duration) -> Self {
        self.validity = validity;
        self
    }

    /// A verification authority that trusts this authority's root.
    pub fn trust_root(&self) -> LocalVerificationAuthority {
        LocalVerificationAuthority {
            root_public_key: self.root_public_key.clone(),
        }
    }

    pub fn root_fingerprint(&self) -> String {
        compute_key_fingerprint(&self.root_public_key)
    }
}

#[async_trait]
impl SigningAuthority for LocalSigningAuthority {
    async fn open(&self, identity: &Identity) -> Result<Box<dyn SigningSession>, SigningError> {
        if identity.subject.trim().is_empty() {
            return Err(SigningError::Rejected(
                "identity has no subject".to_string(),
            ));
        }

        let ephemeral = generate_signing_keypair();
        let now = Utc::now();
        let body = CertificateBody {
            subject: identity.subject.clone(),
            issuer: identity.issuer.clone(),
            public_key: BASE64.encode(&ephemeral.public_key),
            not_before: timestamp(now),
            not_after: timestamp(now + self.validity),
        };
        let body_bytes =
            serde_json::to_vec(&body).map_err(|e| SigningError::Rejected(e.to_string()))?;
        let signature = sign_message(&body_bytes, &self.root_private_key)
            .map_err(|e| SigningError::Rejected(e.to_string()))?;

        debug!(
            subject = %identity.subject,
            key_fingerprint = %ephemeral.fingerprint,
            "Issued session certificate"
        );

        Ok(Box::new(LocalSigningSession {
            certificate: Certificate {
                body,
                signature: BASE64.encode(signature),
            },
            not_after: now + self.validity,
            ephemeral_private_key: ephemeral.private_key,
            root_private_key: self.root_private_key.clone(),
            log_index: Arc::clone(&self.log_index),
        }))
    }
}

struct LocalSigningSession {
    certificate: Certificate,
    not_after: DateTime<Utc>,
    ephemeral_private_key: Vec<u8>,
    root_private_key: Vec<u8>,
    log_index: Arc<AtomicU64>,
}

impl LocalSigningSession {
    fn sign_now(&self, payload: &[u8], now: DateTime<Utc>) -> Result<SignatureBundle, SigningError> {
        if now > self.not_after {
            return Err(SigningError::Rejected(
                "session certificate expired".to_string(),
            ));
        }

        let raw_digest = compute_digest(payload);
        let digest = BASE64.encode(raw_digest);
        let signature = sign_message(&raw_digest, &self.ephemeral_private_key)
            .map(|s| BASE64.encode(s))
            .map_err(|e| SigningError::Rejected(e.to_string()))?;

        let log_index = self.log_index.fetch_add(1, Ordering::SeqCst);
        let integrated_time = timestamp(now);
        let entry = log_entry_bytes(log_index, &integrated_time, &digest, &signature)
            .map_err(|e| SigningError::Rejected(e.to_string()))?;
        let signed_entry_timestamp = sign_message(&entry, &self.root_private_key)
            .map(|s| BASE64.encode(s))
            .map_err(|e| SigningError::Rejected(e.to_string()))?;

        let bundle = LocalBundle {
            media_type: BUNDLE_MEDIA_TYPE.to_string(),
            verification_material: VerificationMaterial {
                certificate: self.certificate.clone(),
                tlog_entry: TlogEntry {
                    log_index,
                    integrated_time,
                    signed_entry_timestamp,
                },
            },
            message_signature: MessageSignature {
                message_digest: MessageDigest {
                    algorithm: DIGEST_ALGORITHM.to_string(),
                    digest,
                },
                signature,
            },
        };

        serde_json::to_value(&bundle)
            .map(SignatureBundle::from_canonical_form)
            .map_err(|e| SigningError::Rejected(e.to_string()))
    }
}

#[async_trait]
impl SigningSession for LocalSigningSession {
    async fn sign(&self, payload: &[u8]) -> Result<SignatureBundle, SigningError> {
        self.sign_now(payload, Utc::now())
    }

    async fn close(self: Box<Self>) -> Result<(), SigningError> {
        debug!(subject = %self.certificate.body.subject, "Closed signing session");
        Ok(())
    }
}

/// Verification side of the offline authority.
#[derive(Debug, Clone)]
pub struct LocalVerificationAuthority {
    root_public_key: Vec<u8>,
}

impl LocalVerificationAuthority {
    /// Trust bundles certified by the given 32-byte root public key.
    pub fn new(root_public_key: Vec<u8>) -> Result<Self, AuthorityKeyError> {
        if root_public_key.len() != 32 {
            return Err(AuthorityKeyError::InvalidKey(format!(
                "expected 32-byte public key, got {}",
                root_public_key.len()
            )));
        }
        Ok(Self { root_public_key })
    }

    /// Load the trusted root public key from a PEM file.
    pub fn from_pem_file(path: &Path) -> Result<Self, AuthorityKeyError> {
        let pem = std::fs::read_to_string(path).map_err(|source| AuthorityKeyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(decode_public_key_pem(&pem)?)
    }

    pub fn root_fingerprint(&self) -> String {
        compute_key_fingerprint(&self.root_public_key)
    }
}

#[async_trait]
impl VerificationAuthority for LocalVerificationAuthority {
    async fn open(&self) -> Result<Box<dyn VerificationSession>, VerificationError> {
        Ok(Box::new(LocalVerificationSession {
            root_public_key: self.root_public_key.clone(),
        }))
    }
}

struct LocalVerificationSession {
    root_public_key: Vec<u8>,
}

fn decode_b64(field: &str, value: &str) -> Result<Vec<u8>, VerificationError> {
    BASE64
        .decode(value)
        .map_err(|e| VerificationError::MalformedBundle(format!("{}: {}", field, e)))
}

fn parse_time(field: &str, value: &str) -> Result<DateTime<Utc>, VerificationError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| VerificationError::MalformedBundle(format!("{}: {}", field, e)))
}

impl LocalVerificationSession {
    fn check(&self, payload: &[u8], bundle: &SignatureBundle) -> Result<VerifiedSignature, VerificationError> {
        let bundle = LocalBundle::deserialize(bundle.as_canonical_form())
            .map_err(|e| VerificationError::MalformedBundle(e.to_string()))?;

        if bundle.media_type != BUNDLE_MEDIA_TYPE {
            return Err(VerificationError::MalformedBundle(format!(
                "unsupported media type '{}'",
                bundle.media_type
            )));
        }

        // 1. Certificate must chain to the trusted root
        let certificate = &bundle.verification_material.certificate;
        let body_bytes = serde_json::to_vec(&certificate.body)
            .map_err(|e| VerificationError::MalformedBundle(e.to_string()))?;
        let cert_signature = decode_b64("certificate.signature", &certificate.signature)?;
        verify_signature(&body_bytes, &cert_signature, &self.root_public_key).map_err(|_| {
            VerificationError::UntrustedCertificate(
                "certificate was not issued by the trusted root".to_string(),
            )
        })?;

        // 2. Log entry must be countersigned by the root
        let entry = &bundle.verification_material.tlog_entry;
        let message = &bundle.message_signature;
        let entry_bytes = log_entry_bytes(
            entry.log_index,
            &entry.integrated_time,
            &message.message_digest.digest,
            &message.signature,
        )
        .map_err(|e| VerificationError::MalformedBundle(e.to_string()))?;
        let set = decode_b64("tlogEntry.signedEntryTimestamp", &entry.signed_entry_timestamp)?;
        verify_signature(&entry_bytes, &set, &self.root_public_key).map_err(|_| {
            VerificationError::UntrustedCertificate(
                "log entry was not countersigned by the trusted root".to_string(),
            )
        })?;

        // 3. Signing time must fall inside the certificate window
        let integrated_time = parse_time("tlogEntry.integratedTime", &entry.integrated_time)?;
        let not_before = parse_time("certificate.notBefore", &certificate.body.not_before)?;
        let not_after = parse_time("certificate.notAfter", &certificate.body.not_after)?;
        if integrated_time < not_before || integrated_time > not_after {
            return Err(VerificationError::CertificateExpired(
                entry.integrated_time.clone(),
            ));
        }

        // 4. Payload digest must match
        if message.message_digest.algorithm != DIGEST_ALGORITHM {
            return Err(VerificationError::MalformedBundle(format!(
                "unsupported digest algorithm '{}'",
                message.message_digest.algorithm
            )));
        }
        let expected = decode_b64("messageDigest.digest", &message.message_digest.digest)?;
        let actual = compute_digest(payload);
        if expected.as_slice() != actual.as_slice() {
            return Err(VerificationError::DigestMismatch);
        }

        // 5. Message signature under the certified key
        let public_key = decode_b64("certificate.publicKey", &certificate.body.public_key)?;
        let signature = decode_b64("messageSignature.signature", &message.signature)?;
        verify_signature(&actual, &signature, &public_key)
            .map_err(|_| VerificationError::InvalidSignature)?;

        Ok(VerifiedSignature {
            signer_identity: certificate.body.subject.clone(),
            timestamp: integrated_time,
        })
    }
}

#[async_trait]
impl VerificationSession for LocalVerificationSession {
    async fn verify(
        &self,
        payload: &[u8],
        bundle: &SignatureBundle,
    ) -> Result<VerifiedSignature, VerificationError> {
        self.check(payload, bundle)
    }

    async fn close(self: Box<Self>) {}
}

/// Generate a root keypair and write it as `root.key` and `root.pub` under
/// `dir`. Returns the two paths.
pub fn generate_root_keys(dir: &Path) -> Result<(PathBuf, PathBuf), AuthorityKeyError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| AuthorityKeyError::Io { path, source }
    };

    std::fs::create_dir_all(dir).map_err(io_err(dir))?;
    let keypair = generate_signing_keypair();

    let private_path = dir.join(ROOT_PRIVATE_KEY_FILE);
    let public_path = dir.join(ROOT_PUBLIC_KEY_FILE);
    write_private_key(&private_path, encode_private_key_pem(&keypair.private_key).as_bytes())
        .map_err(io_err(&private_path))?;
    std::fs::write(&public_path, encode_public_key_pem(&keypair.public_key))
        .map_err(io_err(&public_path))?;

    Ok((private_path, public_path))
}

/// Writes key material readable by the owner only. On unix the file is
/// created with mode 0600, and an existing file is narrowed to it.
fn write_private_key(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(contents)?;
    file.sync_all()
}
