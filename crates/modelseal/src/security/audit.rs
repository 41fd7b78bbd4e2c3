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

//! Security audit logging for signing and verification runs.
//!
//! Every event carries an `event_type` field in dot notation so that log
//! pipelines can filter on it. Events are emitted through `tracing`; the
//! library never installs a subscriber.

use std::path::Path;

/// Event types for artifact set operations.
pub mod events {
    /// A single artifact was signed.
    pub const ARTIFACT_SIGNED: &str = "artifact.signed";
    /// A signing run was aborted.
    pub const ARTIFACT_SIGN_FAILURE: &str = "artifact.sign.failure";
    /// A whole artifact set was signed and persisted.
    pub const ARTIFACT_SET_SIGNED: &str = "artifact_set.signed";
    /// The bundle document was written.
    pub const BUNDLE_STORE_SAVED: &str = "bundle_store.saved";

    /// Verification success event type.
    pub const VERIFICATION_SUCCESS: &str = "verification.success";
    /// Verification failure event type.
    pub const VERIFICATION_FAILURE: &str = "verification.failure";
    /// A recorded artifact was missing and skipped.
    pub const VERIFICATION_SKIPPED: &str = "verification.skipped";
}

/// Log a signed artifact.
pub fn log_artifact_signed(artifact: &str, signer_identity: &str) {
    tracing::debug!(
        event_type = events::ARTIFACT_SIGNED,
        artifact = %artifact,
        signer_identity = %signer_identity,
        "Artifact signed"
    );
}

/// Log an aborted signing run.
pub fn log_artifact_sign_failed(target_dir: &Path, artifact: Option<&str>, error: &str) {
    tracing::error!(
        event_type = events::ARTIFACT_SIGN_FAILURE,
        target_dir = %target_dir.display(),
        artifact = artifact.unwrap_or("<none>"),
        error = %error,
        "Failed to sign artifact set"
    );
}

/// Log a completed signing run.
pub fn log_artifact_set_signed(target_dir: &Path, signer_identity: &str, artifact_count: usize) {
    tracing::info!(
        event_type = events::ARTIFACT_SET_SIGNED,
        target_dir = %target_dir.display(),
        signer_identity = %signer_identity,
        artifact_count = artifact_count,
        "Artifact set signed"
    );
}

pub fn log_bundle_store_saved(document: &Path, bundle_count: usize) {
    tracing::info!(
        event_type = events::BUNDLE_STORE_SAVED,
        document = %document.display(),
        bundle_count = bundle_count,
        "Signature bundle document saved"
    );
}

/// Log a verification success event.
pub fn log_verification_success(artifact: &str, signer_identity: &str, signed_at: &str) {
    tracing::info!(
        event_type = events::VERIFICATION_SUCCESS,
        artifact = %artifact,
        signer_identity = %signer_identity,
        signed_at = %signed_at,
        "Artifact signature verified successfully"
    );
}

/// Log a verification failure event.
pub fn log_verification_failure(artifact: &str, failure_reason: &str) {
    tracing::warn!(
        event_type = events::VERIFICATION_FAILURE,
        artifact = %artifact,
        failure_reason = %failure_reason,
        "Artifact signature verification failed"
    );
}

/// Log a recorded artifact that is missing on disk and was not verified.
pub fn log_verification_skipped(artifact: &str, target_dir: &Path) {
    tracing::warn!(
        event_type = events::VERIFICATION_SKIPPED,
        artifact = %artifact,
        target_dir = %target_dir.display(),
        "Recorded artifact missing, skipped"
    );
}
