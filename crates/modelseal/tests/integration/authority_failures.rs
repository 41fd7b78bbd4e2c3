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

//! Authority failures abort signing cleanly and never leak a session.

use crate::support::{
    failed_names, identity_provider, model_files, names, CapturedLogs, Harness, Script,
    ScriptedSigningAuthority, StallingVerificationAuthority, UnreachableVerificationAuthority,
};
use modelseal::artifact::{METADATA_FILE_NAME, SIGNATURES_FILE_NAME};
use modelseal::authority::identity::ServiceAccountIdentityProvider;
use modelseal::authority::local::LocalSigningAuthority;
use modelseal::security::audit::events;
use modelseal::{
    ArtifactFile, ArtifactSetSigner, ArtifactSetVerifier, DescriptiveFields, Error,
    SigningConfig, SigningError, VerificationConfig, VerificationOutcome,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn scripted(script: Script, config: SigningConfig) -> (ArtifactSetSigner, Arc<ScriptedSigningAuthority>) {
    let authority = Arc::new(ScriptedSigningAuthority::new(
        LocalSigningAuthority::generate(),
        script,
    ));
    let signer = ArtifactSetSigner::new(identity_provider(), authority.clone(), config);
    (signer, authority)
}

#[tokio::test]
async fn test_one_session_per_run() {
    let temp = TempDir::new().unwrap();
    let (signer, authority) = scripted(Script::Succeed, SigningConfig::default());

    signer
        .sign_artifact_set(&model_files(), &DescriptiveFields::new(), temp.path())
        .await
        .unwrap();

    assert_eq!(authority.counters.opened(), 1);
    assert_eq!(authority.counters.closed(), 1);
    assert_eq!(authority.counters.calls(), 5);
}

#[tokio::test]
async fn test_rejection_aborts_and_closes_session() {
    let temp = TempDir::new().unwrap();
    let (signer, authority) = scripted(Script::RejectAfter(2), SigningConfig::default());
    let logs = CapturedLogs::start();

    let result = signer
        .sign_artifact_set(&model_files(), &DescriptiveFields::new(), temp.path())
        .await;

    assert!(matches!(result, Err(Error::Signing(SigningError::Rejected(_)))));
    assert_eq!(authority.counters.opened(), 1);
    assert_eq!(authority.counters.closed(), 1);

    // Files stay, no bundle document is written.
    assert!(temp.path().join("pytorch_model.bin").is_file());
    assert!(!temp.path().join(SIGNATURES_FILE_NAME).exists());
    assert!(logs.output().contains(events::ARTIFACT_SIGN_FAILURE));
}

#[tokio::test]
async fn test_metadata_rejection_aborts_before_files() {
    let temp = TempDir::new().unwrap();
    let (signer, authority) = scripted(Script::RejectAfter(0), SigningConfig::default());

    let result = signer
        .sign_artifact_set(&model_files(), &DescriptiveFields::new(), temp.path())
        .await;

    assert!(matches!(result, Err(Error::Signing(_))));
    assert_eq!(authority.counters.calls(), 1);
    assert_eq!(authority.counters.closed(), 1);
}

#[tokio::test]
async fn test_failed_rerun_keeps_previous_bundle_document() {
    let temp = TempDir::new().unwrap();
    let harness = Harness::new();
    harness
        .signer
        .sign_artifact_set(
            &[ArtifactFile::new("model.bin", b"v1".to_vec())],
            &DescriptiveFields::new(),
            temp.path(),
        )
        .await
        .unwrap();
    let before = std::fs::read(temp.path().join(SIGNATURES_FILE_NAME)).unwrap();

    let (signer, _) = scripted(Script::RejectAfter(1), SigningConfig::default());
    let result = signer
        .sign_artifact_set(
            &[ArtifactFile::new("model.bin", b"v2".to_vec())],
            &DescriptiveFields::new(),
            temp.path(),
        )
        .await;
    assert!(result.is_err());

    let after = std::fs::read(temp.path().join(SIGNATURES_FILE_NAME)).unwrap();
    assert_eq!(before, after);

    // The rewritten file no longer matches the surviving bundles.
    let entries = harness
        .verifier(VerificationConfig::default())
        .verify_artifact_set(temp.path())
        .await
        .unwrap();
    assert!(failed_names(&entries).contains(&"model.bin"));
}

#[tokio::test(start_paused = true)]
async fn test_hanging_authority_times_out() {
    let temp = TempDir::new().unwrap();
    let (signer, authority) = scripted(
        Script::Hang,
        SigningConfig::default().with_call_timeout(Some(Duration::from_secs(5))),
    );

    let result = signer
        .sign_artifact_set(&model_files(), &DescriptiveFields::new(), temp.path())
        .await;

    match result {
        Err(Error::Signing(SigningError::Timeout(limit))) => {
            assert_eq!(limit, Duration::from_secs(5))
        }
        other => panic!("expected timeout, got {:?}", other.map(|r| r.target_dir)),
    }
    assert_eq!(authority.counters.closed(), 1);
    assert!(!temp.path().join(SIGNATURES_FILE_NAME).exists());
}

#[tokio::test]
async fn test_identity_failure_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("model");
    let signer = ArtifactSetSigner::new(
        Arc::new(ServiceAccountIdentityProvider::new(temp.path().join("missing.json"))),
        Arc::new(LocalSigningAuthority::generate()),
        SigningConfig::default(),
    );

    let result = signer
        .sign_artifact_set(&model_files(), &DescriptiveFields::new(), &target)
        .await;

    assert!(matches!(result, Err(Error::Identity(_))));
    assert!(!target.exists());
}

#[tokio::test]
async fn test_unreachable_verifier_reports_every_entry() {
    let temp = TempDir::new().unwrap();
    let harness = Harness::new();
    harness
        .signer
        .sign_artifact_set(&model_files(), &DescriptiveFields::new(), temp.path())
        .await
        .unwrap();

    let verifier = ArtifactSetVerifier::new(
        Arc::new(UnreachableVerificationAuthority),
        VerificationConfig::default(),
    );
    let entries = verifier.verify_artifact_set(temp.path()).await.unwrap();

    assert_eq!(entries.len(), 5);
    for entry in &entries {
        match &entry.outcome {
            VerificationOutcome::Failed { reason } => assert!(reason.contains("connection refused")),
            other => panic!("expected failure, got {:?}", other),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_stalled_verification_fails_only_that_entry() {
    let temp = TempDir::new().unwrap();
    let harness = Harness::new();
    harness
        .signer
        .sign_artifact_set(&model_files(), &DescriptiveFields::new(), temp.path())
        .await
        .unwrap();

    let stalled = model_files()
        .into_iter()
        .find(|f| f.name() == "pytorch_model.bin")
        .unwrap();
    let verifier = ArtifactSetVerifier::new(
        Arc::new(StallingVerificationAuthority::new(
            harness.trust_root(),
            stalled.contents().to_vec(),
        )),
        VerificationConfig::default().with_call_timeout(Some(Duration::from_secs(5))),
    );

    let entries = verifier.verify_artifact_set(temp.path()).await.unwrap();

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
    assert_eq!(failed_names(&entries), vec!["pytorch_model.bin"]);
    match &entries[2].outcome {
        VerificationOutcome::Failed { reason } => assert!(reason.contains("timed out"), "{}", reason),
        other => panic!("expected timeout failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_oversized_concurrency_signs_and_verifies() {
    let temp = TempDir::new().unwrap();
    let harness = Harness::with_config(SigningConfig::default().with_max_concurrency(usize::MAX));
    harness
        .signer
        .sign_artifact_set(&model_files(), &DescriptiveFields::new(), temp.path())
        .await
        .unwrap();

    let config: VerificationConfig =
        serde_json::from_str(r#"{"max_concurrency": 9223372036854775807}"#).unwrap();
    let entries = harness.verifier(config).verify_artifact_set(temp.path()).await.unwrap();

    assert_eq!(entries.len(), 5);
    assert!(failed_names(&entries).is_empty());
}
