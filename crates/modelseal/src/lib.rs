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

//! # Modelseal
//!
//! Sign a model's artifact set (weight files, tokenizer files and a metadata
//! document) as one unit against a keyless signing authority, and later
//! replay verification file by file.
//!
//! ## Key Features
//!
//! - One signing session per run, shared by every payload in the run
//! - Bounded concurrent signing and verification with deterministic ordering
//! - The metadata document is signed from the exact bytes written to disk
//! - Atomic replacement of the signature bundle document
//! - Per-artifact verification report that never aborts on a single failure
//! - Structured audit events through `tracing`
//! - An offline authority in [`authority::local`] for air-gapped use and tests
//!
//! ## Example
//!
//! ```rust,no_run
//! use modelseal::authority::identity::{Identity, StaticIdentityProvider};
//! use modelseal::authority::local::LocalSigningAuthority;
//! use modelseal::metadata::{descriptive_fields, ModelDescriptor};
//! use modelseal::{
//!     ArtifactFile, ArtifactSetSigner, ArtifactSetVerifier, SigningConfig, VerificationConfig,
//! };
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn run() -> modelseal::Result<()> {
//! let authority = LocalSigningAuthority::generate();
//! let signer = ArtifactSetSigner::new(
//!     Arc::new(StaticIdentityProvider::new(Identity::new("ci@example.com", "local"))),
//!     Arc::new(authority.clone()),
//!     SigningConfig::default(),
//! );
//!
//! let model = ModelDescriptor {
//!     model_type: Some("bert".to_string()),
//!     model_name: Some("tiny-bert".to_string()),
//!     architecture: None,
//! };
//! let files = [ArtifactFile::new("pytorch_model.bin", b"weights".to_vec())];
//! signer
//!     .sign_artifact_set(&files, &descriptive_fields(Some(&model), None), Path::new("signed"))
//!     .await?;
//!
//! let verifier = ArtifactSetVerifier::new(
//!     Arc::new(authority.trust_root()),
//!     VerificationConfig::default(),
//! );
//! for entry in verifier.verify_artifact_set(Path::new("signed")).await? {
//!     println!("{}: {}", entry.name, entry.outcome.is_verified());
//! }
//! # Ok(())
//! # }
//! ```

pub mod artifact;
pub mod authority;
pub mod config;
pub mod crypto;
pub mod error;
pub mod metadata;
pub mod security;
pub mod store;

pub use artifact::{ArtifactFile, ArtifactSetWriter};
pub use authority::{
    Identity, SignatureBundle, SigningAuthority, SigningError, SigningSession,
    VerificationAuthority, VerificationError, VerificationSession, VerifiedSignature,
};
pub use config::{ExtensionPolicy, SigningConfig, VerificationConfig};
pub use error::{Error, Result};
pub use metadata::{DescriptiveFields, MetadataBuilder, MetadataRecord, MetadataValue};
pub use security::{
    ArtifactSetSigner, ArtifactSetVerifier, SigningResult, VerificationEntry, VerificationOutcome,
};
pub use store::{SignatureBundleMap, SignatureBundleStore};
