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

//! Signing an artifact set as one run.
//!
//! A run builds the metadata record, persists the files and the metadata
//! document, then signs the exact metadata bytes it wrote followed by every
//! qualifying file under the target directory. All payloads share one
//! signing session. The bundle document is only written once every payload
//! has been signed, so a failed run never leaves a partial bundle map behind.

use super::{audit, bounded};
use crate::artifact::{qualifying_files, ArtifactFile, ArtifactSetWriter, QualifyingFile};
use crate::authority::identity::IdentityProvider;
use crate::authority::{SignatureBundle, SigningAuthority, SigningError, SigningSession};
use crate::config::SigningConfig;
use crate::error::{Error, Result};
use crate::metadata::{DescriptiveFields, MetadataBuilder, MetadataRecord};
use crate::store::{SignatureBundleMap, SignatureBundleStore};
use futures::future::try_join_all;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// Summary of a completed signing run.
#[derive(Debug, Clone, Serialize)]
pub struct SigningResult {
    pub metadata: MetadataRecord,
    pub metadata_bundle: SignatureBundle,
    pub bundles: SignatureBundleMap,
    pub target_dir: PathBuf,
    pub signer_identity: String,
}

/// A failed signing run and the artifact being processed when it failed.
struct Aborted {
    artifact: Option<String>,
    error: Error,
}

impl Aborted {
    fn at(artifact: &str, error: impl Into<Error>) -> Self {
        Self {
            artifact: Some(artifact.to_string()),
            error: error.into(),
        }
    }
}

/// Persists and signs artifact sets.
///
/// Construct once with an identity provider and an authority, then call
/// [`sign_artifact_set`](Self::sign_artifact_set) for each run.
#[derive(Clone)]
pub struct ArtifactSetSigner {
    identity_provider: Arc<dyn IdentityProvider>,
    authority: Arc<dyn SigningAuthority>,
    config: SigningConfig,
    builder: MetadataBuilder,
    writer: ArtifactSetWriter,
    store: SignatureBundleStore,
}

impl ArtifactSetSigner {
    pub fn new(
        identity_provider: Arc<dyn IdentityProvider>,
        authority: Arc<dyn SigningAuthority>,
        config: SigningConfig,
    ) -> Self {
        Self {
            identity_provider,
            authority,
            config,
            builder: MetadataBuilder::new(),
            writer: ArtifactSetWriter::new(),
            store: SignatureBundleStore::new(),
        }
    }

    pub fn config(&self) -> &SigningConfig {
        &self.config
    }

    /// Persist `files` plus a fresh metadata record under `target_dir` and
    /// sign them.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] if there are no files and no descriptive
    ///   fields, or a file name is unsafe. Nothing is written.
    /// - [`Error::Identity`] if no signer identity can be acquired.
    /// - [`Error::Io`] on filesystem failure. Written files stay on disk.
    /// - [`Error::Signing`] if any signing call fails. Written files stay on
    ///   disk, no bundle document is written for this run.
    pub async fn sign_artifact_set(
        &self,
        files: &[ArtifactFile],
        descriptive_fields: &DescriptiveFields,
        target_dir: &Path,
    ) -> Result<SigningResult> {
        match self.run(files, descriptive_fields, target_dir).await {
            Ok(result) => Ok(result),
            Err(aborted) => {
                audit::log_artifact_sign_failed(
                    target_dir,
                    aborted.artifact.as_deref(),
                    &aborted.error.to_string(),
                );
                Err(aborted.error)
            }
        }
    }

    async fn run(
        &self,
        files: &[ArtifactFile],
        descriptive_fields: &DescriptiveFields,
        target_dir: &Path,
    ) -> Result<SigningResult, Aborted> {
        let fail = |error: Error| Aborted {
            artifact: None,
            error,
        };

        if files.is_empty() && descriptive_fields.is_empty() {
            return Err(fail(Error::InvalidInput(
                "nothing to sign: no files and no descriptive fields supplied".to_string(),
            )));
        }

        let identity = self
            .identity_provider
            .identity()
            .await
            .map_err(|e| fail(e.into()))?;

        let metadata = self.builder.build(descriptive_fields);
        let written = self
            .writer
            .write(target_dir, files, &metadata)
            .map_err(fail)?;
        let qualifying =
            qualifying_files(target_dir, &self.config.extensions).map_err(fail)?;

        let session = self
            .authority
            .open(&identity)
            .await
            .map_err(|e| fail(e.into()))?;

        let signed = self
            .sign_all(session.as_ref(), &written.metadata_bytes, &qualifying)
            .await;
        let closed = session.close().await;

        let (metadata_bundle, bundles) = signed?;
        closed.map_err(|e| fail(e.into()))?;

        for name in bundles.keys() {
            audit::log_artifact_signed(name, &identity.subject);
        }

        let document = self
            .store
            .save(target_dir, &metadata_bundle, &bundles)
            .map_err(fail)?;
        audit::log_bundle_store_saved(&document, bundles.len() + 1);
        audit::log_artifact_set_signed(target_dir, &identity.subject, bundles.len() + 1);

        info!(
            target_dir = %target_dir.display(),
            files = bundles.len(),
            "Signed artifact set"
        );

        Ok(SigningResult {
            metadata,
            metadata_bundle,
            bundles,
            target_dir: target_dir.to_path_buf(),
            signer_identity: identity.subject,
        })
    }

    /// Sign the metadata bytes first, then every qualifying file with at
    /// most `max_concurrency` calls in flight. The first failure wins.
    async fn sign_all(
        &self,
        session: &dyn SigningSession,
        metadata_bytes: &[u8],
        files: &[QualifyingFile],
    ) -> Result<(SignatureBundle, SignatureBundleMap), Aborted> {
        let timeout = self.config.call_timeout();

        let metadata_bundle = bounded(session.sign(metadata_bytes), timeout, SigningError::Timeout)
            .await
            .map_err(|e| Aborted::at(crate::artifact::METADATA_FILE_NAME, e))?;

        let permits = Semaphore::new(self.config.permits());
        let calls = files.iter().map(|file| {
            let permits = &permits;
            async move {
                let _permit = permits.acquire().await.map_err(|_| {
                    Aborted::at(
                        &file.name,
                        SigningError::Transport("signing pool closed".to_string()),
                    )
                })?;
                let contents =
                    std::fs::read(&file.path).map_err(|e| Aborted::at(&file.name, Error::io(&file.path, e)))?;
                let bundle = bounded(session.sign(&contents), timeout, SigningError::Timeout)
                    .await
                    .map_err(|e| Aborted::at(&file.name, e))?;
                Ok::<_, Aborted>((file.name.clone(), bundle))
            }
        });

        let signed = try_join_all(calls).await?;
        if signed.is_empty() {
            warn!("No qualifying files found, only the metadata document was signed");
        }

        Ok((metadata_bundle, signed.into_iter().collect()))
    }
}
