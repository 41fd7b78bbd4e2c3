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

use super::{ModelsealConfig, ValidationError};
use modelseal::config::MAX_CONCURRENCY;

fn concurrency_in_range(value: usize) -> bool {
    (1..=MAX_CONCURRENCY).contains(&value)
}

/// Check a loaded configuration, collecting every problem found.
pub fn validate(config: &ModelsealConfig) -> Result<(), ValidationError> {
    let mut errors = Vec::new();

    if !concurrency_in_range(config.signing.max_concurrency) {
        errors.push(ValidationError::InvalidConcurrency { section: "signing" });
    }
    if config.signing.call_timeout_secs == Some(0) {
        errors.push(ValidationError::InvalidTimeout {
            section: "signing",
            timeout: 0,
        });
    }
    if config.signing.extensions.extensions().next().is_none() {
        errors.push(ValidationError::NoExtensions);
    }
    if !concurrency_in_range(config.verification.max_concurrency) {
        errors.push(ValidationError::InvalidConcurrency {
            section: "verification",
        });
    }
    if config.verification.call_timeout_secs == Some(0) {
        errors.push(ValidationError::InvalidTimeout {
            section: "verification",
            timeout: 0,
        });
    }
    if matches!(&config.identity.subject, Some(s) if s.trim().is_empty()) {
        errors.push(ValidationError::BlankSubject);
    }

    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Multiple { errors }),
    }
}
