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

//! End-to-end signing followed by verification.

use crate::support::{
    failed_names, model_fields, model_files, names, CountingVerificationAuthority, Harness, SIGNER,
};
use modelseal::artifact::{METADATA_FILE_NAME, SIGNATURES_FILE_NAME};
use modelseal::metadata::{descriptive_fields, ModelDescriptor, TokenizerDescriptor};
use modelseal::{
    ArtifactFile, ArtifactSetVerifier, DescriptiveFields, Error, ExtensionPolicy, MetadataRecord,
    SignatureBundleStore, SigningConfig, VerificationConfig, VerificationOutcome,
};
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_sign_then_verify_all_verified() {
    let temp = TempDir::new().unwrap();
    let harness = Harness::new();

    let signed = harness
        .signer
        .sign_artifact_set(&model_files(), &model_fields(), temp.path())
        .await
        .unwrap();
    assert_eq!(signed.bundles.len(), 4);

    let entries = harness
        .verifier(VerificationConfig::default())
        .verify_artifact_set(temp.path())
        .await
        .unwrap();

    assert_eq!(entries.len(), 5);
    assert!(failed_names(&entries).is_empty());
    assert_eq!(entries[0].name, METADATA_FILE_NAME);
    for entry in &entries {
        match &entry.outcome {
            VerificationOutcome::Verified { signer_identity, .. } => {
                assert_eq!(signer_identity, SIGNER)
            }
            other => panic!("{} not verified: {:?}", entry.name, other),
        }
    }
}

#[tokio::test]
async fn test_report_follows_bundle_map_order() {
    let temp = TempDir::new().unwrap();
    let harness = Harness::new();
    harness
        .signer
        .sign_artifact_set(&model_files(), &DescriptiveFields::new(), temp.path())
        .await
        .unwrap();

    let entries = harness
        .verifier(VerificationConfig::default().with_max_concurrency(8))
        .verify_artifact_set(temp.path())
        .await
        .unwrap();

    assert_eq!(
        names(&entries),
        vec![
            METADATA_FILE_NAME,
            "config.json",
            "pytorch_model.bin",
            "tokenizer/tokenizer_config.json",
            "tokenizer/vocab.txt",
        ]
    );
}

#[tokio::test]
async fn test_enumeration_order_is_deterministic() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    let harness = Harness::new();

    let a = harness
        .signer
        .sign_artifact_set(&model_files(), &DescriptiveFields::new(), first.path())
        .await
        .unwrap();
    let mut reversed = model_files();
    reversed.reverse();
    let b = harness
        .signer
        .sign_artifact_set(&reversed, &DescriptiveFields::new(), second.path())
        .await
        .unwrap();

    assert_eq!(
        a.bundles.keys().collect::<Vec<_>>(),
        b.bundles.keys().collect::<Vec<_>>()
    );

    let (_, stored) = SignatureBundleStore::new().load(first.path()).unwrap();
    assert_eq!(
        stored.keys().collect::<Vec<_>>(),
        a.bundles.keys().collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_rerun_replaces_bundles() {
    let temp = TempDir::new().unwrap();
    let harness = Harness::new();

    harness
        .signer
        .sign_artifact_set(
            &[ArtifactFile::new("model.bin", b"first".to_vec())],
            &DescriptiveFields::new(),
            temp.path(),
        )
        .await
        .unwrap();
    let second = harness
        .signer
        .sign_artifact_set(
            &[ArtifactFile::new("model.bin", b"second".to_vec())],
            &DescriptiveFields::new(),
            temp.path(),
        )
        .await
        .unwrap();

    let (metadata_bundle, stored) = SignatureBundleStore::new().load(temp.path()).unwrap();
    assert_eq!(metadata_bundle, second.metadata_bundle);
    assert_eq!(stored, second.bundles);

    let verifier = harness.verifier(VerificationConfig::default());
    assert!(failed_names(&verifier.verify_artifact_set(temp.path()).await.unwrap()).is_empty());

    // The first run's content no longer verifies.
    std::fs::write(temp.path().join("model.bin"), b"first").unwrap();
    let entries = verifier.verify_artifact_set(temp.path()).await.unwrap();
    assert_eq!(failed_names(&entries), vec!["model.bin"]);
}

#[tokio::test]
async fn test_metadata_document_matches_signed_bytes() {
    let temp = TempDir::new().unwrap();
    let harness = Harness::new();
    let model = ModelDescriptor {
        model_type: Some("bert".to_string()),
        model_name: Some("tiny-bert".to_string()),
        architecture: Some("BertModel(layers=2)".to_string()),
    };
    let tokenizer = TokenizerDescriptor {
        tokenizer_name: Some("tiny-tokenizer".to_string()),
        vocab_size: Some(30522),
    };

    let signed = harness
        .signer
        .sign_artifact_set(
            &[],
            &descriptive_fields(Some(&model), Some(&tokenizer)),
            temp.path(),
        )
        .await
        .unwrap();

    let on_disk = std::fs::read(temp.path().join(METADATA_FILE_NAME)).unwrap();
    assert_eq!(on_disk, signed.metadata.to_canonical_bytes().unwrap());

    let record = MetadataRecord::from_slice(&on_disk).unwrap();
    assert_eq!(record, signed.metadata);
    assert_eq!(record.get("vocab_size").unwrap().to_string(), "30522");
    assert_eq!(record.descriptive_len(), 5);

    let entries = harness
        .verifier(VerificationConfig::default())
        .verify_artifact_set(temp.path())
        .await
        .unwrap();
    assert_eq!(names(&entries), vec![METADATA_FILE_NAME]);
    assert!(entries[0].outcome.is_verified());
}

#[tokio::test]
async fn test_custom_extension_policy() {
    let temp = TempDir::new().unwrap();
    let harness = Harness::with_config(
        SigningConfig::default().with_extensions(ExtensionPolicy::new([".safetensors"])),
    );

    let signed = harness
        .signer
        .sign_artifact_set(
            &[
                ArtifactFile::new("model.safetensors", b"tensors".to_vec()),
                ArtifactFile::new("config.json", b"{}".to_vec()),
            ],
            &DescriptiveFields::new(),
            temp.path(),
        )
        .await
        .unwrap();

    assert_eq!(
        signed.bundles.keys().collect::<Vec<_>>(),
        vec!["model.safetensors"]
    );
}

#[tokio::test]
async fn test_preexisting_files_in_target_are_signed() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("merges.txt"), b"a b").unwrap();
    let harness = Harness::new();

    let signed = harness
        .signer
        .sign_artifact_set(&model_files(), &DescriptiveFields::new(), temp.path())
        .await
        .unwrap();

    assert!(signed.bundles.contains_key("merges.txt"));
    assert!(!signed.bundles.contains_key(METADATA_FILE_NAME));
    assert!(!signed.bundles.contains_key(SIGNATURES_FILE_NAME));
}

#[tokio::test]
async fn test_empty_input_fails_without_writes() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("model");
    let harness = Harness::new();

    let result = harness
        .signer
        .sign_artifact_set(&[], &DescriptiveFields::new(), &target)
        .await;

    assert!(matches!(result, Err(Error::InvalidInput(_))));
    assert!(!target.exists());
}

#[tokio::test]
async fn test_one_verification_session_per_run() {
    let temp = TempDir::new().unwrap();
    let harness = Harness::new();
    harness
        .signer
        .sign_artifact_set(&model_files(), &DescriptiveFields::new(), temp.path())
        .await
        .unwrap();

    let authority = Arc::new(CountingVerificationAuthority::new(harness.trust_root()));
    let counters = Arc::clone(&authority.counters);
    let verifier = ArtifactSetVerifier::new(authority, VerificationConfig::default());
    verifier.verify_artifact_set(temp.path()).await.unwrap();

    assert_eq!(counters.opened(), 1);
    assert_eq!(counters.closed(), 1);
    assert_eq!(counters.calls(), 5);
}
