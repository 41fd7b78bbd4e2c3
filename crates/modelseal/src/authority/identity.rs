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

//! Signer identity acquisition.
//!
//! An [`IdentityProvider`] is injected into [`crate::security::ArtifactSetSigner`]
//! and asked once per signing run for an authenticated [`Identity`]. There is
//! no process-wide credential state.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable consulted by [`DefaultIdentityProvider`] when no
/// explicit credentials file is configured.
pub const CREDENTIALS_ENV_VAR: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Issuer recorded for identities loaded from service-account files.
pub const SERVICE_ACCOUNT_ISSUER: &str = "https://accounts.google.com";

#[derive(Debug, Clone, Error)]
pub enum IdentityError {
    #[error("No credentials available: pass a credentials file or set GOOGLE_APPLICATION_CREDENTIALS")]
    NoCredentials,

    #[error("Failed to read credentials file {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("Invalid credentials file {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

/// An authenticated signer identity.
///
/// `token` is an opaque credential handed to the authority; it is never
/// logged or persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject: String,
    pub issuer: String,
    pub token: Option<String>,
}

impl Identity {
    pub fn new(subject: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            issuer: issuer.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("subject", &self.subject)
            .field("issuer", &self.issuer)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Supplies the identity a signing run acts as.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn identity(&self) -> Result<Identity, IdentityError>;
}

/// Always returns the same identity.
#[derive(Debug, Clone)]
pub struct StaticIdentityProvider {
    identity: Identity,
}

impl StaticIdentityProvider {
    pub fn new(identity: Identity) -> Self {
        Self { identity }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn identity(&self) -> Result<Identity, IdentityError> {
        Ok(self.identity.clone())
    }
}

#[derive(Deserialize)]
struct ServiceAccountFile {
    #[serde(rename = "type")]
    account_type: String,
    client_email: Option<String>,
    private_key_id: Option<String>,
}

/// Loads the identity from a service-account JSON credentials file.
#[derive(Debug, Clone)]
pub struct ServiceAccountIdentityProvider {
    path: PathBuf,
}

impl ServiceAccountIdentityProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> Result<Identity, IdentityError> {
        let content = std::fs::read_to_string(path).map_err(|e| IdentityError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let account: ServiceAccountFile =
            serde_json::from_str(&content).map_err(|e| IdentityError::Invalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if account.account_type != "service_account" {
            return Err(IdentityError::Invalid {
                path: path.to_path_buf(),
                reason: format!("expected type 'service_account', got '{}'", account.account_type),
            });
        }
        let subject = account.client_email.ok_or_else(|| IdentityError::Invalid {
            path: path.to_path_buf(),
            reason: "missing client_email".to_string(),
        })?;

        let identity = Identity::new(subject, SERVICE_ACCOUNT_ISSUER);
        Ok(match account.private_key_id {
            Some(key_id) => identity.with_token(key_id),
            None => identity,
        })
    }
}

#[async_trait]
impl IdentityProvider for ServiceAccountIdentityProvider {
    async fn identity(&self) -> Result<Identity, IdentityError> {
        Self::load(&self.path)
    }
}

/// Uses an explicit credentials file when it exists, otherwise the file named
/// by [`CREDENTIALS_ENV_VAR`].
#[derive(Debug, Clone, Default)]
pub struct DefaultIdentityProvider {
    credentials_path: Option<PathBuf>,
}

impl DefaultIdentityProvider {
    pub fn new(credentials_path: Option<PathBuf>) -> Self {
        Self { credentials_path }
    }

    fn resolve(&self) -> Option<PathBuf> {
        if let Some(path) = self.credentials_path.as_ref().filter(|p| p.exists()) {
            return Some(path.clone());
        }
        std::env::var_os(CREDENTIALS_ENV_VAR)
            .map(PathBuf::from)
            .filter(|p| !p.as_os_str().is_empty())
    }
}

#[async_trait]
impl IdentityProvider for DefaultIdentityProvider {
    async fn identity(&self) -> Result<Identity, IdentityError> {
        let path = self.resolve().ok_or(IdentityError::NoCredentials)?;
        tracing::debug!(credentials = %path.display(), "Loading service account identity");
        ServiceAccountIdentityProvider::load(&path)
    }
}
