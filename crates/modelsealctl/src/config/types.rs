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

use modelseal::{SigningConfig, VerificationConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Issuer recorded for identities given by subject alone.
pub const LOCAL_ISSUER: &str = "modelseal-local";

/// Contents of `modelseal.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsealConfig {
    pub signing: SigningConfig,
    pub verification: VerificationConfig,
    pub identity: IdentitySettings,
    pub authority: AuthoritySettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentitySettings {
    /// Service-account credentials file. Falls back to
    /// `GOOGLE_APPLICATION_CREDENTIALS` when unset or missing.
    pub credentials_path: Option<PathBuf>,
    /// Fixed signer subject. Takes precedence over credentials.
    pub subject: Option<String>,
    pub issuer: Option<String>,
}

impl IdentitySettings {
    pub fn issuer(&self) -> &str {
        self.issuer.as_deref().unwrap_or(LOCAL_ISSUER)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthoritySettings {
    /// Root private key used by the offline signing authority.
    pub key_path: Option<PathBuf>,
    /// Root public key trusted by the offline verification authority.
    pub trust_root_path: Option<PathBuf>,
}
