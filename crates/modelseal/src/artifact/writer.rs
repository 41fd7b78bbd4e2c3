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

//! Persisting artifact sets and enumerating their signable files.

use super::{is_reserved_name, validate_artifact_name, ArtifactFile, METADATA_FILE_NAME};
use crate::config::ExtensionPolicy;
use crate::error::{Error, Result};
use crate::metadata::MetadataRecord;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// What [`ArtifactSetWriter::write`] put on disk.
#[derive(Debug, Clone)]
pub struct WrittenArtifactSet {
    pub target_dir: PathBuf,
    /// The exact bytes written to `metadata.json`.
    pub metadata_bytes: Vec<u8>,
    /// Names of the files written, in input order.
    pub files: Vec<String>,
}

/// Writes artifact files and the metadata document under a target directory.
///
/// Existing files with the same names are overwritten. A failure part-way
/// through leaves already written files in place.
#[derive(Debug, Clone, Default)]
pub struct ArtifactSetWriter;

impl ArtifactSetWriter {
    pub fn new() -> Self {
        Self
    }

    /// Persist `files` and `metadata` under `target_dir`.
    ///
    /// All names are validated before anything touches the filesystem, so an
    /// invalid name never results in a partial write.
    pub fn write(
        &self,
        target_dir: &Path,
        files: &[ArtifactFile],
        metadata: &MetadataRecord,
    ) -> Result<WrittenArtifactSet> {
        let mut seen = BTreeSet::new();
        let mut planned = Vec::with_capacity(files.len());
        for file in files {
            let relative = validate_artifact_name(file.name())?;
            if !seen.insert(file.name()) {
                return Err(Error::InvalidInput(format!(
                    "artifact name '{}' appears more than once",
                    file.name()
                )));
            }
            planned.push((file, target_dir.join(relative)));
        }

        let metadata_bytes = metadata.to_canonical_bytes().map_err(|e| {
            Error::InvalidInput(format!("metadata record cannot be serialized: {}", e))
        })?;

        std::fs::create_dir_all(target_dir).map_err(|e| Error::io(target_dir, e))?;

        let metadata_path = target_dir.join(METADATA_FILE_NAME);
        std::fs::write(&metadata_path, &metadata_bytes).map_err(|e| Error::io(&metadata_path, e))?;

        for (file, path) in &planned {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
            }
            std::fs::write(path, file.contents()).map_err(|e| Error::io(path, e))?;
            debug!(artifact = %file.name(), bytes = file.contents().len(), "Wrote artifact");
        }

        Ok(WrittenArtifactSet {
            target_dir: target_dir.to_path_buf(),
            metadata_bytes,
            files: planned.iter().map(|(f, _)| f.name().to_string()).collect(),
        })
    }
}

/// A persisted file that qualifies for signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifyingFile {
    /// Relative `/`-separated name; the key used in the bundle document.
    pub name: String,
    pub path: PathBuf,
}

/// Enumerate files under `target_dir` whose names match `policy`.
///
/// The result is sorted lexicographically by relative name so repeated runs
/// over an unchanged directory produce the same sequence. The layout
/// documents at the top level never qualify.
pub fn qualifying_files(target_dir: &Path, policy: &ExtensionPolicy) -> Result<Vec<QualifyingFile>> {
    let mut found = Vec::new();

    for entry in WalkDir::new(target_dir).min_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(target_dir).to_path_buf();
            Error::io(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Some(name) = relative_name(target_dir, entry.path()) else {
            warn!(path = %entry.path().display(), "Skipping file with non UTF-8 name");
            continue;
        };
        if is_reserved_name(&name) || !policy.qualifies(&name) {
            continue;
        }

        found.push(QualifyingFile {
            name,
            path: entry.into_path(),
        });
    }

    found.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(found)
}

fn relative_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("/"))
}
