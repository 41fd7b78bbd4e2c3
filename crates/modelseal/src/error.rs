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

//! Run-level error type for signing and verification.
//!
//! Per-artifact verification failures are not errors at this level: they are
//! reported as [`crate::security::VerificationOutcome::Failed`] entries. Only
//! failures that make a whole run meaningless surface as [`Error`].

use crate::authority::identity::IdentityError;
use crate::authority::SigningError;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that abort a signing or verification run.
#[derive(Debug, Error)]
pub enum Error {
    /// Nothing to sign, or an artifact name that cannot be persisted safely.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Filesystem failure. Files written before the failure are left in place.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The signing authority rejected a request; the run was aborted.
    #[error("Signing failed: {0}")]
    Signing(#[from] SigningError),

    /// The signer identity could not be acquired.
    #[error("Identity unavailable: {0}")]
    Identity(#[from] IdentityError),

    /// The signature bundle document does not exist.
    #[error("Signature bundle document not found: {path}")]
    NotFound { path: PathBuf },

    /// The signature bundle document exists but has the wrong shape.
    #[error("Malformed signature bundle document {path}: {reason}")]
    Format { path: PathBuf, reason: String },
}

impl Error {
    /// Wrap an I/O error with the path it occurred at.
    pub(crate) fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
