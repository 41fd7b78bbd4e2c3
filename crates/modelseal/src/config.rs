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

//! Configuration for signing and verification runs.
//!
//! All structs deserialize from the `[signing]` and `[verification]` tables
//! of a `modelseal.toml` file and fall back to [`Default`] for missing keys.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Default number of authority calls allowed in flight at once.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Default per-call timeout for authority requests.
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 60;

/// Largest concurrency bound honoured; larger values are clamped to it.
pub const MAX_CONCURRENCY: usize = Semaphore::MAX_PERMITS;

/// Whole seconds for a timeout, rounding any fraction up.
fn timeout_secs(timeout: Duration) -> u64 {
    let secs = timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0);
    secs.max(1)
}

/// Which persisted files qualify for signing.
///
/// A file qualifies when its name ends with one of the configured
/// extensions. Extensions may be given with or without the leading dot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtensionPolicy {
    extensions: BTreeSet<String>,
}

impl ExtensionPolicy {
    /// Build a policy from a list of extensions.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extensions: extensions.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns `true` if `file_name` ends with a configured extension.
    pub fn qualifies(&self, file_name: &str) -> bool {
        self.extensions.iter().any(|ext| {
            let ext = ext.trim();
            if ext.is_empty() {
                return false;
            }
            if ext.starts_with('.') {
                file_name.ends_with(ext)
            } else {
                file_name
                    .strip_suffix(ext)
                    .is_some_and(|stem| stem.ends_with('.'))
            }
        })
    }

    /// The configured extensions, in sorted order.
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }
}

impl Default for ExtensionPolicy {
    fn default() -> Self {
        Self::new([".bin", ".json", ".txt"])
    }
}

/// Settings for a signing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Persisted files whose names match are signed.
    pub extensions: ExtensionPolicy,
    /// Maximum number of concurrent `sign` calls against the session.
    pub max_concurrency: usize,
    /// Timeout for each authority call, in seconds. `None` disables it.
    pub call_timeout_secs: Option<u64>,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            extensions: ExtensionPolicy::default(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            call_timeout_secs: Some(DEFAULT_CALL_TIMEOUT_SECS),
        }
    }
}

impl SigningConfig {
    /// Replace the qualifying-extension policy.
    pub fn with_extensions(mut self, extensions: ExtensionPolicy) -> Self {
        self.extensions = extensions;
        self
    }

    /// Set the concurrency bound. Values are clamped to `1..=MAX_CONCURRENCY`.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Set the per-call timeout.
    ///
    /// Timeouts are kept in whole seconds: a fractional value is rounded up,
    /// so 200ms becomes 1s and 1.5s becomes 2s.
    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout_secs = timeout.map(timeout_secs);
        self
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_secs.map(Duration::from_secs)
    }

    pub(crate) fn permits(&self) -> usize {
        self.max_concurrency.clamp(1, MAX_CONCURRENCY)
    }
}

/// Settings for a verification run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Report files that are recorded in the bundle document but missing on
    /// disk as failures instead of skipping them.
    pub strict: bool,
    /// Maximum number of concurrent `verify` calls against the session.
    pub max_concurrency: usize,
    /// Timeout for each authority call, in seconds. `None` disables it.
    pub call_timeout_secs: Option<u64>,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            strict: false,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            call_timeout_secs: Some(DEFAULT_CALL_TIMEOUT_SECS),
        }
    }
}

impl VerificationConfig {
    /// A config that flags recorded-but-missing files.
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Set the per-call timeout, rounded up to whole seconds.
    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout_secs = timeout.map(timeout_secs);
        self
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_secs.map(Duration::from_secs)
    }

    pub(crate) fn permits(&self) -> usize {
        self.max_concurrency.clamp(1, MAX_CONCURRENCY)
    }
}
