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

//! Shared fixtures and authority test doubles.

use async_trait::async_trait;
use modelseal::authority::identity::{Identity, StaticIdentityProvider};
use modelseal::authority::local::{LocalSigningAuthority, LocalVerificationAuthority};
use modelseal::{
    ArtifactFile, ArtifactSetSigner, ArtifactSetVerifier, DescriptiveFields, SignatureBundle,
    SigningAuthority, SigningConfig, SigningError, SigningSession, VerificationAuthority,
    VerificationConfig, VerificationEntry, VerificationError, VerificationSession,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

pub const SIGNER: &str = "ci@example.com";

pub fn identity_provider() -> Arc<StaticIdentityProvider> {
    Arc::new(StaticIdentityProvider::new(Identity::new(
        SIGNER,
        "https://issuer.example.com",
    )))
}

pub fn model_files() -> Vec<ArtifactFile> {
    vec![
        ArtifactFile::new("pytorch_model.bin", b"\x00\x01weights\x02\x03".to_vec()),
        ArtifactFile::new("config.json", br#"{"hidden_size": 8}"#.to_vec()),
        ArtifactFile::new("tokenizer/vocab.txt", b"[PAD]\n[UNK]\nhello\n".to_vec()),
        ArtifactFile::new("tokenizer/tokenizer_config.json", br#"{"lower": true}"#.to_vec()),
    ]
}

pub fn model_fields() -> DescriptiveFields {
    let mut fields = DescriptiveFields::new();
    fields.insert("model_type".to_string(), "bert".into());
    fields.insert("model_name".to_string(), "tiny-bert".into());
    fields.insert("vocab_size".to_string(), 3u32.into());
    fields
}

/// A signer and a verifier sharing one offline root.
pub struct Harness {
    pub authority: LocalSigningAuthority,
    pub signer: ArtifactSetSigner,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(SigningConfig::default())
    }

    pub fn with_config(config: SigningConfig) -> Self {
        let authority = LocalSigningAuthority::generate();
        let signer = ArtifactSetSigner::new(identity_provider(), Arc::new(authority.clone()), config);
        Self { authority, signer }
    }

    pub fn trust_root(&self) -> LocalVerificationAuthority {
        self.authority.trust_root()
    }

    pub fn verifier(&self, config: VerificationConfig) -> ArtifactSetVerifier {
        ArtifactSetVerifier::new(Arc::new(self.trust_root()), config)
    }
}

pub fn failed_names(entries: &[VerificationEntry]) -> Vec<&str> {
    entries
        .iter()
        .filter(|e| !e.outcome.is_verified())
        .map(|e| e.name.as_str())
        .collect()
}

pub fn names(entries: &[VerificationEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.name.as_str()).collect()
}

/// Call counters shared between a scripted authority and its sessions.
#[derive(Debug, Default)]
pub struct Counters {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub calls: AtomicUsize,
}

impl Counters {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Script {
    Succeed,
    /// Reject every call after the first `n`.
    RejectAfter(usize),
    /// Never answer.
    Hang,
}

/// Wraps the offline authority and misbehaves on request.
pub struct ScriptedSigningAuthority {
    inner: LocalSigningAuthority,
    script: Script,
    pub counters: Arc<Counters>,
}

impl ScriptedSigningAuthority {
    pub fn new(inner: LocalSigningAuthority, script: Script) -> Self {
        Self {
            inner,
            script,
            counters: Arc::new(Counters::default()),
        }
    }
}

#[async_trait]
impl SigningAuthority for ScriptedSigningAuthority {
    async fn open(&self, identity: &Identity) -> Result<Box<dyn SigningSession>, SigningError> {
        let inner = self.inner.open(identity).await?;
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSigningSession {
            inner,
            script: self.script,
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct ScriptedSigningSession {
    inner: Box<dyn SigningSession>,
    script: Script,
    counters: Arc<Counters>,
}

#[async_trait]
impl SigningSession for ScriptedSigningSession {
    async fn sign(&self, payload: &[u8]) -> Result<SignatureBundle, SigningError> {
        let call = self.counters.calls.fetch_add(1, Ordering::SeqCst);
        match self.script {
            Script::Succeed => self.inner.sign(payload).await,
            Script::RejectAfter(n) if call >= n => {
                Err(SigningError::Rejected("policy rejected payload".to_string()))
            }
            Script::RejectAfter(_) => self.inner.sign(payload).await,
            Script::Hang => std::future::pending().await,
        }
    }

    async fn close(self: Box<Self>) -> Result<(), SigningError> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        self.inner.close().await
    }
}

/// A verification authority whose sessions cannot be opened.
pub struct UnreachableVerificationAuthority;

#[async_trait]
impl VerificationAuthority for UnreachableVerificationAuthority {
    async fn open(&self) -> Result<Box<dyn VerificationSession>, VerificationError> {
        Err(VerificationError::Transport("connection refused".to_string()))
    }
}

/// Counts sessions around the offline verifier.
pub struct CountingVerificationAuthority {
    inner: LocalVerificationAuthority,
    pub counters: Arc<Counters>,
}

impl CountingVerificationAuthority {
    pub fn new(inner: LocalVerificationAuthority) -> Self {
        Self {
            inner,
            counters: Arc::new(Counters::default()),
        }
    }
}

#[async_trait]
impl VerificationAuthority for CountingVerificationAuthority {
    async fn open(&self) -> Result<Box<dyn VerificationSession>, VerificationError> {
        let inner = self.inner.open().await?;
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CountingVerificationSession {
            inner,
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct CountingVerificationSession {
    inner: Box<dyn VerificationSession>,
    counters: Arc<Counters>,
}

#[async_trait]
impl VerificationSession for CountingVerificationSession {
    async fn verify(
        &self,
        payload: &[u8],
        bundle: &SignatureBundle,
    ) -> Result<modelseal::VerifiedSignature, VerificationError> {
        self.counters.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.verify(payload, bundle).await
    }

    async fn close(self: Box<Self>) {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        self.inner.close().await
    }
}

/// Verifies through the offline root but never answers for one payload.
pub struct StallingVerificationAuthority {
    inner: LocalVerificationAuthority,
    stall_on: Vec<u8>,
}

impl StallingVerificationAuthority {
    pub fn new(inner: LocalVerificationAuthority, stall_on: impl Into<Vec<u8>>) -> Self {
        Self {
            inner,
            stall_on: stall_on.into(),
        }
    }
}

#[async_trait]
impl VerificationAuthority for StallingVerificationAuthority {
    async fn open(&self) -> Result<Box<dyn VerificationSession>, VerificationError> {
        Ok(Box::new(StallingVerificationSession {
            inner: self.inner.open().await?,
            stall_on: self.stall_on.clone(),
        }))
    }
}

struct StallingVerificationSession {
    inner: Box<dyn VerificationSession>,
    stall_on: Vec<u8>,
}

#[async_trait]
impl VerificationSession for StallingVerificationSession {
    async fn verify(
        &self,
        payload: &[u8],
        bundle: &SignatureBundle,
    ) -> Result<modelseal::VerifiedSignature, VerificationError> {
        if payload == self.stall_on.as_slice() {
            std::future::pending::<()>().await;
        }
        self.inner.verify(payload, bundle).await
    }

    async fn close(self: Box<Self>) {
        self.inner.close().await
    }
}

#[derive(Clone)]
pub struct StringWriter(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for StringWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for StringWriter {
    type Writer = StringWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Captures log output on the current thread until dropped.
pub struct CapturedLogs {
    buffer: Arc<Mutex<Vec<u8>>>,
    _guard: tracing::subscriber::DefaultGuard,
}

impl CapturedLogs {
    pub fn start() -> Self {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::fmt()
            .with_writer(StringWriter(buffer.clone()))
            .with_ansi(false)
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        Self {
            buffer,
            _guard: guard,
        }
    }

    pub fn output(&self) -> String {
        String::from_utf8(self.buffer.lock().unwrap().clone()).unwrap()
    }
}
