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

//! Replaying verification over a signed artifact set.
//!
//! Only a missing or malformed bundle document aborts a run. Every other
//! problem, from a tampered file to an unreachable authority, becomes a
//! [`VerificationOutcome::Failed`] entry next to the entries that passed.

use super::{audit, bounded};
use crate::artifact::{validate_artifact_name, METADATA_FILE_NAME};
use crate::authority::{
    SignatureBundle, VerificationAuthority, VerificationError, VerificationSession,
};
use crate::config::VerificationConfig;
use crate::error::Result;
use crate::store::SignatureBundleStore;
use chrono::{DateTime, SecondsFormat, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Verification status of one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VerificationOutcome {
    Verified {
        signer_identity: String,
        timestamp: DateTime<Utc>,
    },
    Failed {
        reason: String,
    },
}

impl VerificationOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified { .. })
    }
}

/// One line of a verification report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationEntry {
    /// Artifact name; the metadata document is reported as `metadata.json`.
    pub name: String,
    #[serde(flatten)]
    pub outcome: VerificationOutcome,
}

impl VerificationEntry {
    fn failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: VerificationOutcome::Failed {
                reason: reason.into(),
            },
        }
    }
}

/// A unit of work planned before the session is opened.
enum Check<'a> {
    Payload {
        name: String,
        path: PathBuf,
        bundle: &'a SignatureBundle,
    },
    Failed {
        name: String,
        reason: String,
    },
}

impl Check<'_> {
    fn name(&self) -> &str {
        match self {
            Check::Payload { name, .. } | Check::Failed { name, .. } => name,
        }
    }
}

/// Verifies persisted artifact sets.
#[derive(Clone)]
pub struct ArtifactSetVerifier {
    authority: Arc<dyn VerificationAuthority>,
    config: VerificationConfig,
    store: SignatureBundleStore,
}

impl ArtifactSetVerifier {
    pub fn new(authority: Arc<dyn VerificationAuthority>, config: VerificationConfig) -> Self {
        Self {
            authority,
            config,
            store: SignatureBundleStore::new(),
        }
    }

    pub fn config(&self) -> &VerificationConfig {
        &self.config
    }

    /// Verify the metadata document and every recorded file under
    /// `target_dir`.
    ///
    /// The metadata entry comes first, followed by files in bundle map
    /// order. Recorded files missing on disk are skipped unless the verifier
    /// is strict, in which case they are reported as failed.
    ///
    /// # Errors
    ///
    /// Only [`Error::NotFound`](crate::Error::NotFound) and
    /// [`Error::Format`](crate::Error::Format) from loading the bundle
    /// document, and I/O errors reading it.
    pub async fn verify_artifact_set(&self, target_dir: &Path) -> Result<Vec<VerificationEntry>> {
        let (metadata_bundle, bundles) = self.store.load(target_dir)?;

        let mut checks = Vec::with_capacity(bundles.len() + 1);
        checks.push(Check::Payload {
            name: METADATA_FILE_NAME.to_string(),
            path: target_dir.join(METADATA_FILE_NAME),
            bundle: &metadata_bundle,
        });
        for (name, bundle) in &bundles {
            if let Some(check) = self.plan(target_dir, name, bundle) {
                checks.push(check);
            }
        }

        let entries = match self.authority.open().await {
            Ok(session) => {
                let entries = self.run(session.as_ref(), checks).await;
                session.close().await;
                entries
            }
            Err(e) => {
                warn!(error = %e, "Could not open verification session");
                checks
                    .into_iter()
                    .map(|check| VerificationEntry::failed(check.name(), e.to_string()))
                    .collect()
            }
        };

        for entry in &entries {
            match &entry.outcome {
                VerificationOutcome::Verified {
                    signer_identity,
                    timestamp,
                } => audit::log_verification_success(
                    &entry.name,
                    signer_identity,
                    &timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
                ),
                VerificationOutcome::Failed { reason } => {
                    audit::log_verification_failure(&entry.name, reason)
                }
            }
        }

        Ok(entries)
    }

    fn plan<'a>(&self, target_dir: &Path, name: &str, bundle: &'a SignatureBundle) -> Option<Check<'a>> {
        let relative = match validate_artifact_name(name) {
            Ok(relative) => relative,
            Err(e) => {
                return Some(Check::Failed {
                    name: name.to_string(),
                    reason: e.to_string(),
                })
            }
        };

        let path = target_dir.join(relative);
        if path.is_file() {
            return Some(Check::Payload {
                name: name.to_string(),
                path,
                bundle,
            });
        }

        if self.config.strict {
            Some(Check::Failed {
                name: name.to_string(),
                reason: format!(
                    "artifact recorded in signature bundle is missing from {}",
                    target_dir.display()
                ),
            })
        } else {
            audit::log_verification_skipped(name, target_dir);
            None
        }
    }

    async fn run(&self, session: &dyn VerificationSession, checks: Vec<Check<'_>>) -> Vec<VerificationEntry> {
        let timeout = self.config.call_timeout();
        let permits = Semaphore::new(self.config.permits());

        let calls = checks.into_iter().map(|check| {
            let permits = &permits;
            async move {
                let (name, path, bundle) = match check {
                    Check::Failed { name, reason } => return VerificationEntry::failed(name, reason),
                    Check::Payload { name, path, bundle } => (name, path, bundle),
                };

                let Ok(_permit) = permits.acquire().await else {
                    return VerificationEntry::failed(name, "verification pool closed");
                };
                let payload = match std::fs::read(&path) {
                    Ok(payload) => payload,
                    Err(e) => {
                        return VerificationEntry::failed(
                            name,
                            format!("cannot read {}: {}", path.display(), e),
                        )
                    }
                };

                debug!(artifact = %name, bytes = payload.len(), "Verifying artifact");
                let outcome = match bounded(
                    session.verify(&payload, bundle),
                    timeout,
                    VerificationError::Timeout,
                )
                .await
                {
                    Ok(verified) => VerificationOutcome::Verified {
                        signer_identity: verified.signer_identity,
                        timestamp: verified.timestamp,
                    },
                    Err(e) => VerificationOutcome::Failed {
                        reason: e.to_string(),
                    },
                };
                VerificationEntry { name, outcome }
            }
        });

        join_all(calls).await
    }
}
