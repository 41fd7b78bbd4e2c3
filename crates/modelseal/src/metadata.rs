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

//! Metadata records describing a signed artifact set.
//!
//! A [`MetadataRecord`] is a flat, sorted key-value document that always
//! carries a UTC creation timestamp under [`TIMESTAMP_KEY`]. Its canonical
//! byte form is pretty-printed JSON with keys in sorted order; those exact
//! bytes are both persisted as `metadata.json` and signed.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Key under which the creation timestamp is stored.
pub const TIMESTAMP_KEY: &str = "timestamp";

/// A scalar metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", v),
            Self::Integer(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::String(v) => f.write_str(v),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u32> for MetadataValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Caller-supplied descriptive fields for an artifact set.
pub type DescriptiveFields = BTreeMap<String, MetadataValue>;

/// An immutable metadata record for one signing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataRecord {
    fields: BTreeMap<String, MetadataValue>,
}

impl MetadataRecord {
    /// The creation timestamp, as written (ISO-8601, UTC).
    pub fn timestamp(&self) -> Option<&str> {
        match self.fields.get(TIMESTAMP_KEY) {
            Some(MetadataValue::String(ts)) => Some(ts),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.fields.get(key)
    }

    /// Iterate fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetadataValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of descriptive fields, excluding the timestamp.
    pub fn descriptive_len(&self) -> usize {
        self.fields
            .keys()
            .filter(|k| k.as_str() != TIMESTAMP_KEY)
            .count()
    }

    /// Serialize to the canonical byte form that is persisted and signed.
    pub fn to_canonical_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(&self.fields)
    }

    /// Parse a record from its persisted form.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Builds [`MetadataRecord`]s, injecting the current UTC time.
#[derive(Debug, Clone, Default)]
pub struct MetadataBuilder;

impl MetadataBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build a record stamped with the current time.
    pub fn build(&self, fields: &DescriptiveFields) -> MetadataRecord {
        self.build_at(fields, Utc::now())
    }

    /// Build a record stamped with `created_at`.
    ///
    /// A caller-supplied `timestamp` field is replaced by the injected one.
    pub fn build_at(&self, fields: &DescriptiveFields, created_at: DateTime<Utc>) -> MetadataRecord {
        let mut record = fields.clone();
        record.insert(
            TIMESTAMP_KEY.to_string(),
            MetadataValue::String(created_at.to_rfc3339_opts(SecondsFormat::Micros, true)),
        );
        MetadataRecord { fields: record }
    }
}

/// Descriptive facts about a model, as extracted by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub model_type: Option<String>,
    pub model_name: Option<String>,
    /// Free-form architecture description (e.g. a rendered model config).
    pub architecture: Option<String>,
}

/// Descriptive facts about a tokenizer, as extracted by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenizerDescriptor {
    pub tokenizer_name: Option<String>,
    pub vocab_size: Option<u32>,
}

/// Flatten optional model and tokenizer descriptors into descriptive fields.
///
/// Missing descriptors or missing facts simply yield fewer fields.
pub fn descriptive_fields(
    model: Option<&ModelDescriptor>,
    tokenizer: Option<&TokenizerDescriptor>,
) -> DescriptiveFields {
    let mut fields = DescriptiveFields::new();

    if let Some(model) = model {
        let entries = [
            ("model_type", &model.model_type),
            ("model_name", &model.model_name),
            ("architecture", &model.architecture),
        ];
        for (key, value) in entries {
            if let Some(value) = value {
                fields.insert(key.to_string(), MetadataValue::from(value.as_str()));
            }
        }
    }

    if let Some(tokenizer) = tokenizer {
        if let Some(name) = &tokenizer.tokenizer_name {
            fields.insert("tokenizer_name".to_string(), name.as_str().into());
        }
        if let Some(vocab_size) = tokenizer.vocab_size {
            fields.insert("vocab_size".to_string(), vocab_size.into());
        }
    }

    fields
}
