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

//! Tampering after signing is reported per artifact.

use crate::support::{failed_names, model_fields, model_files, names, Harness};
use modelseal::artifact::{METADATA_FILE_NAME, SIGNATURES_FILE_NAME};
use modelseal::authority::local::LocalSigningAuthority;
use modelseal::{ArtifactSetVerifier, Error, VerificationConfig, VerificationOutcome};
use std::sync::Arc;
use tempfile::TempDir;

async fn signed_dir(harness: &Harness) -> TempDir {
    let temp = TempDir::new().unwrap();
    harness
        .signer
        .sign_artifact_set(&model_files(), &model_fields(), temp.path())
        .await
        .unwrap();
    temp
}

#[tokio::test]
async fn test_modified_file_fails_alone() {
    let harness = Harness::new();
    let temp = signed_dir(&harness).await;
    let verifier = harness.verifier(VerificationConfig::default());
    let before = verifier.verify_artifact_set(temp.path()).await.unwrap();

    let path = temp.path().join("pytorch_model.bin");
    let mut bytes = std::fs::read(&path).unwrap();
    bytes[0] ^= 0xFF;
    std::fs::write(&path, bytes).unwrap();

    let after = verifier.verify_artifact_set(temp.path()).await.unwrap();

    assert_eq!(names(&before), names(&after));
    assert_eq!(failed_names(&after), vec!["pytorch_model.bin"]);
    for (b, a) in before.iter().zip(&after) {
        if a.name != "pytorch_model.bin" {
            assert_eq!(b, a);
        }
    }
    match &after[2].outcome {
        VerificationOutcome::Failed { reason } => assert!(reason.contains("digest")),
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_modified_metadata_fails_alone() {
    let harness = Harness::new();
    let temp = signed_dir(&harness).await;

    let path = temp.path().join(METADATA_FILE_NAME);
    let tampered = String::from_utf8(std::fs::read(&path).unwrap())
        .unwrap()
        .replace("tiny-bert", "huge-bert");
    std::fs::write(&path, tampered).unwrap();

    let entries = harness
        .verifier(VerificationConfig::default())
        .verify_artifact_set(temp.path())
        .await
        .unwrap();

    assert_eq!(failed_names(&entries), vec![METADATA_FILE_NAME]);
    assert_eq!(entries.len(), 5);
}

#[tokio::test]
async fn test_untrusted_root_fails_every_entry() {
    let harness = Harness::new();
    let temp = signed_dir(&harness).await;

    let verifier = ArtifactSetVerifier::new(
        Arc::new(LocalSigningAuthority::generate().trust_root()),
        VerificationConfig::default(),
    );
    let entries = verifier.verify_artifact_set(temp.path()).await.unwrap();

    assert_eq!(entries.len(), 5);
    assert_eq!(failed_names(&entries).len(), 5);
}

#[tokio::test]
async fn test_swapped_bundles_fail() {
    let harness = Harness::new();
    let temp = signed_dir(&harness).await;

    let path = temp.path().join(SIGNATURES_FILE_NAME);
    let mut document: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    let files = document["file_signatures"].as_object_mut().unwrap();
    let config = files["config.json"].clone();
    let weights = files["pytorch_model.bin"].clone();
    files.insert("config.json".to_string(), weights);
    files.insert("pytorch_model.bin".to_string(), config);
    std::fs::write(&path, serde_json::to_vec(&document).unwrap()).unwrap();

    let entries = harness
        .verifier(VerificationConfig::default())
        .verify_artifact_set(temp.path())
        .await
        .unwrap();

    assert_eq!(failed_names(&entries), vec!["config.json", "pytorch_model.bin"]);
}

#[tokio::test]
async fn test_corrupt_bundle_document_is_format_error() {
    let harness = Harness::new();
    let temp = signed_dir(&harness).await;
    std::fs::write(temp.path().join(SIGNATURES_FILE_NAME), b"not json").unwrap();

    let result = harness
        .verifier(VerificationConfig::default())
        .verify_artifact_set(temp.path())
        .await;

    assert!(matches!(result, Err(Error::Format { .. })));
}

#[tokio::test]
async fn test_missing_bundle_document_is_not_found() {
    let harness = Harness::new();
    let temp = signed_dir(&harness).await;
    std::fs::remove_file(temp.path().join(SIGNATURES_FILE_NAME)).unwrap();

    let result = harness
        .verifier(VerificationConfig::default())
        .verify_artifact_set(temp.path())
        .await;

    assert!(matches!(result, Err(Error::NotFound { .. })));
}
