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

//! Persistence of the signature bundle document.
//!
//! The document lives at `<target>/signatures.json`:
//!
//! ```json
//! {
//!   "metadata_signature": { ... },
//!   "file_signatures": { "pytorch_model.bin": { ... } }
//! }
//! ```
//!
//! Each bundle is stored in its authority-defined canonical form. The whole
//! document is replaced in one rename so readers see either the previous run
//! or the new one, never a mix.

use crate::artifact::SIGNATURES_FILE_NAME;
use crate::authority::SignatureBundle;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Artifact name to bundle, ordered lexicographically by name.
pub type SignatureBundleMap = BTreeMap<String, SignatureBundle>;

#[derive(Serialize)]
struct BundleDocumentRef<'a> {
    metadata_signature: &'a SignatureBundle,
    file_signatures: &'a SignatureBundleMap,
}

#[derive(Deserialize)]
struct BundleDocument {
    #[serde(alias = "metadataSignature")]
    metadata_signature: SignatureBundle,
    #[serde(alias = "fileSignatures")]
    file_signatures: SignatureBundleMap,
}

/// Reads and writes `signatures.json` under a target directory.
#[derive(Debug, Clone, Default)]
pub struct SignatureBundleStore;

impl SignatureBundleStore {
    pub fn new() -> Self {
        Self
    }

    /// Path of the bundle document for `target_dir`.
    pub fn document_path(target_dir: &Path) -> PathBuf {
        target_dir.join(SIGNATURES_FILE_NAME)
    }

    /// Atomically replace the bundle document under `target_dir`.
    pub fn save(
        &self,
        target_dir: &Path,
        metadata_bundle: &SignatureBundle,
        file_bundles: &SignatureBundleMap,
    ) -> Result<PathBuf> {
        let path = Self::document_path(target_dir);
        let document = BundleDocumentRef {
            metadata_signature: metadata_bundle,
            file_signatures: file_bundles,
        };
        let bytes = serde_json::to_vec_pretty(&document).map_err(|e| Error::Format {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        let mut temp = tempfile::Builder::new()
            .prefix(".signatures")
            .suffix(".tmp")
            .tempfile_in(target_dir)
            .map_err(|e| Error::io(target_dir, e))?;
        temp.write_all(&bytes)
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|e| Error::io(temp.path(), e))?;
        temp.persist(&path).map_err(|e| Error::io(&path, e.error))?;

        debug!(path = %path.display(), bundles = file_bundles.len() + 1, "Saved bundle document");
        Ok(path)
    }

    /// Load the metadata bundle and file bundles from `target_dir`.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the document is absent, [`Error::Format`] when
    /// it cannot be parsed into the expected shape.
    pub fn load(&self, target_dir: &Path) -> Result<(SignatureBundle, SignatureBundleMap)> {
        let path = Self::document_path(target_dir);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound { path })
            }
            Err(e) => return Err(Error::io(&path, e)),
        };

        let document: BundleDocument =
            serde_json::from_slice(&bytes).map_err(|e| Error::Format {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        Ok((document.metadata_signature, document.file_signatures))
    }
}
