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

//! Implementation of the `sign` command.

use crate::config::{ModelsealConfig, LOCAL_ISSUER};
use anyhow::{anyhow, Context, Result};
use modelseal::artifact::METADATA_FILE_NAME;
use modelseal::authority::identity::{
    DefaultIdentityProvider, Identity, IdentityProvider, StaticIdentityProvider,
};
use modelseal::authority::local::LocalSigningAuthority;
use modelseal::metadata::{descriptive_fields, ModelDescriptor, TokenizerDescriptor};
use modelseal::{ArtifactFile, ArtifactSetSigner, ExtensionPolicy, MetadataRecord, SigningResult};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Inputs of one `sign` invocation after flag parsing.
#[derive(Debug, Default)]
pub struct SignRequest {
    pub target_dir: PathBuf,
    /// `NAME=PATH` pairs.
    pub files: Vec<String>,
    pub model: ModelDescriptor,
    pub tokenizer: TokenizerDescriptor,
    pub credentials: Option<PathBuf>,
    pub subject: Option<String>,
    pub authority_key: Option<PathBuf>,
    pub extensions: Vec<String>,
    pub max_concurrency: Option<usize>,
}

#[derive(Serialize)]
struct SigningSummary<'a> {
    target_dir: &'a Path,
    signer_identity: &'a str,
    metadata: &'a MetadataRecord,
    signed: Vec<&'a str>,
}

impl<'a> SigningSummary<'a> {
    fn from_result(result: &'a SigningResult) -> Self {
        let mut signed = vec![METADATA_FILE_NAME];
        signed.extend(result.bundles.keys().map(String::as_str));
        Self {
            target_dir: &result.target_dir,
            signer_identity: &result.signer_identity,
            metadata: &result.metadata,
            signed,
        }
    }
}

/// Split a `NAME=PATH` argument.
fn parse_file_arg(arg: &str) -> Result<(&str, &Path)> {
    match arg.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => Ok((name, Path::new(path))),
        _ => Err(anyhow!("Invalid --file '{}': expected NAME=PATH", arg)),
    }
}

fn is_empty_model(model: &ModelDescriptor) -> bool {
    model.model_type.is_none() && model.model_name.is_none() && model.architecture.is_none()
}

fn is_empty_tokenizer(tokenizer: &TokenizerDescriptor) -> bool {
    tokenizer.tokenizer_name.is_none() && tokenizer.vocab_size.is_none()
}

fn identity_provider(request: &SignRequest, config: &ModelsealConfig) -> Arc<dyn IdentityProvider> {
    let subject = request
        .subject
        .clone()
        .or_else(|| config.identity.subject.clone());
    match subject {
        Some(subject) => {
            let issuer = if request.subject.is_some() {
                LOCAL_ISSUER
            } else {
                config.identity.issuer()
            };
            Arc::new(StaticIdentityProvider::new(Identity::new(subject, issuer)))
        }
        None => Arc::new(DefaultIdentityProvider::new(
            request
                .credentials
                .clone()
                .or_else(|| config.identity.credentials_path.clone()),
        )),
    }
}

/// Run the sign command and print a JSON summary.
pub async fn run(request: SignRequest, config: &ModelsealConfig) -> Result<()> {
    let key_path = request
        .authority_key
        .clone()
        .or_else(|| config.authority.key_path.clone())
        .context(
            "No authority key configured. Pass --authority-key, set [authority] key_path, \
             or create one with `modelsealctl authority init`",
        )?;
    let authority = LocalSigningAuthority::from_pem_file(&key_path)
        .with_context(|| format!("Failed to load authority key {}", key_path.display()))?;

    let mut signing = config.signing.clone();
    if !request.extensions.is_empty() {
        signing = signing.with_extensions(ExtensionPolicy::new(request.extensions.iter().cloned()));
    }
    if let Some(max_concurrency) = request.max_concurrency {
        signing = signing.with_max_concurrency(max_concurrency);
    }

    let mut files = Vec::with_capacity(request.files.len());
    for arg in &request.files {
        let (name, path) = parse_file_arg(arg)?;
        files.push(
            ArtifactFile::from_path(name, path)
                .with_context(|| format!("Failed to read artifact {}", path.display()))?,
        );
    }

    let model = (!is_empty_model(&request.model)).then_some(&request.model);
    let tokenizer = (!is_empty_tokenizer(&request.tokenizer)).then_some(&request.tokenizer);
    let fields = descriptive_fields(model, tokenizer);

    let signer = ArtifactSetSigner::new(
        identity_provider(&request, config),
        Arc::new(authority),
        signing,
    );
    let result = signer
        .sign_artifact_set(&files, &fields, &request.target_dir)
        .await
        .with_context(|| format!("Failed to sign {}", request.target_dir.display()))?;

    let summary = serde_json::to_string_pretty(&SigningSummary::from_result(&result))?;
    println!("{}", summary);
    Ok(())
}
