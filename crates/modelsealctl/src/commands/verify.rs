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

//! Implementation of the `verify` command.

use crate::config::ModelsealConfig;
use anyhow::{bail, Context, Result};
use chrono::SecondsFormat;
use modelseal::authority::local::LocalVerificationAuthority;
use modelseal::{ArtifactSetVerifier, VerificationEntry, VerificationOutcome};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct VerifyRequest {
    pub target_dir: PathBuf,
    pub trust_root: Option<PathBuf>,
    pub strict: bool,
    pub json: bool,
}

/// Render one report line.
fn render(entry: &VerificationEntry) -> String {
    match &entry.outcome {
        VerificationOutcome::Verified {
            signer_identity,
            timestamp,
        } => format!(
            "OK      {}  signed by {} at {}",
            entry.name,
            signer_identity,
            timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
        ),
        VerificationOutcome::Failed { reason } => format!("FAILED  {}  {}", entry.name, reason),
    }
}

/// Run the verify command. Fails when any entry failed.
pub async fn run(request: VerifyRequest, config: &ModelsealConfig) -> Result<()> {
    let trust_root = request
        .trust_root
        .clone()
        .or_else(|| config.authority.trust_root_path.clone())
        .context("No trust root configured. Pass --trust-root or set [authority] trust_root_path")?;
    let authority = LocalVerificationAuthority::from_pem_file(&trust_root)
        .with_context(|| format!("Failed to load trust root {}", trust_root.display()))?;

    let mut verification = config.verification.clone();
    verification.strict |= request.strict;

    let verifier = ArtifactSetVerifier::new(Arc::new(authority), verification);
    let entries = verifier
        .verify_artifact_set(&request.target_dir)
        .await
        .with_context(|| format!("Failed to verify {}", request.target_dir.display()))?;

    if request.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for entry in &entries {
            println!("{}", render(entry));
        }
    }

    let failed = entries.iter().filter(|e| !e.outcome.is_verified()).count();
    if failed > 0 {
        bail!("{} of {} artifacts failed verification", failed, entries.len());
    }
    Ok(())
}
