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

//! Artifact sets on disk.
//!
//! This module provides:
//! - [`ArtifactFile`], a named byte payload to be persisted and signed
//! - [`ArtifactSetWriter`] for persisting files plus the metadata document
//! - [`qualifying_files`] for the stable enumeration of signable files

mod writer;

pub use writer::{qualifying_files, ArtifactSetWriter, QualifyingFile, WrittenArtifactSet};

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// File name of the persisted metadata document. Also the name under which
/// the metadata artifact is reported during verification.
pub const METADATA_FILE_NAME: &str = "metadata.json";

/// File name of the persisted signature bundle document.
pub const SIGNATURES_FILE_NAME: &str = "signatures.json";

/// Returns `true` for names reserved by the persisted layout.
pub fn is_reserved_name(name: &str) -> bool {
    name == METADATA_FILE_NAME || name == SIGNATURES_FILE_NAME
}

/// A named file payload belonging to an artifact set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactFile {
    name: String,
    contents: Vec<u8>,
}

impl ArtifactFile {
    /// Create an artifact from in-memory bytes.
    ///
    /// `name` is a relative, `/`-separated path inside the target directory.
    pub fn new(name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }

    /// Read an artifact's bytes from an existing file.
    pub fn from_path(name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read(path).map_err(|e| Error::io(path, e))?;
        Ok(Self::new(name, contents))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contents(&self) -> &[u8] {
        &self.contents
    }
}

/// Check that `name` can be persisted under a target directory without
/// escaping it or colliding with the layout documents, and return the
/// relative path it maps to.
pub fn validate_artifact_name(name: &str) -> Result<PathBuf> {
    if name.is_empty() {
        return Err(Error::InvalidInput("artifact name is empty".to_string()));
    }
    if is_reserved_name(name) {
        return Err(Error::InvalidInput(format!(
            "artifact name '{}' is reserved by the persisted layout",
            name
        )));
    }
    if name.starts_with('/') || name.contains('\\') {
        return Err(Error::InvalidInput(format!(
            "artifact name '{}' must be a relative '/'-separated path",
            name
        )));
    }

    let mut relative = PathBuf::new();
    for component in name.split('/') {
        if component.is_empty() || component == "." || component == ".." {
            return Err(Error::InvalidInput(format!(
                "artifact name '{}' contains an invalid path component",
                name
            )));
        }
        relative.push(component);
    }
    Ok(relative)
}
