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

//! Implementation of the `authority init` command.

use anyhow::{Context, Result};
use modelseal::authority::local::{generate_root_keys, LocalVerificationAuthority};
use std::path::Path;
use tracing::info;

/// Generate a root keypair for the offline authority under `out`.
pub fn init(out: &Path) -> Result<()> {
    let (private_path, public_path) = generate_root_keys(out)
        .with_context(|| format!("Failed to generate root keys in {}", out.display()))?;
    let fingerprint = LocalVerificationAuthority::from_pem_file(&public_path)
        .context("Failed to read back the generated public key")?
        .root_fingerprint();

    info!(
        private_key = %private_path.display(),
        public_key = %public_path.display(),
        fingerprint = %fingerprint,
        "Generated authority root keypair"
    );
    println!("Root private key: {}", private_path.display());
    println!("Root public key:  {}", public_path.display());
    println!("Fingerprint:      {}", fingerprint);
    Ok(())
}
