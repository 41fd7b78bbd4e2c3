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

//! Artifact set signing and verification.
//!
//! This module provides:
//! - [`ArtifactSetSigner`] to persist and sign an artifact set in one run
//! - [`ArtifactSetVerifier`] to replay verification file by file
//! - Security audit logging in [`audit`]

mod artifact_signer;
pub mod audit;
mod verification;

pub use artifact_signer::{ArtifactSetSigner, SigningResult};
pub use verification::{ArtifactSetVerifier, VerificationEntry, VerificationOutcome};

use std::future::Future;
use std::time::Duration;

/// Await `call`, bounded by `timeout` when one is configured.
async fn bounded<T, E, F, G>(call: F, timeout: Option<Duration>, on_timeout: G) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    G: FnOnce(Duration) -> E,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .unwrap_or_else(|_| Err(on_timeout(limit))),
        None => call.await,
    }
}
