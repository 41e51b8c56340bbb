//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use aikeys_core::index::IndexError;
use aikeys_core::{
    ApiKey, CredentialStore, CredentialVerifier, MemorySettingsStore, MemoryVault, MetadataIndex,
    Provider, ProviderRegistry, SecretVault, SettingsStore, ValidationOutcome, VaultError,
};
use async_trait::async_trait;

/// Memory vault with switchable failures per operation.
#[derive(Debug, Default)]
pub struct FaultyVault {
    inner: MemoryVault,
    pub fail_save: AtomicBool,
    pub fail_get: AtomicBool,
    pub fail_update: AtomicBool,
    pub fail_delete: AtomicBool,
}

impl FaultyVault {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Remove a secret behind the store's back.
    pub async fn remove_secret(&self, account: &str) {
        self.inner.delete(account).await.unwrap();
    }

    pub async fn secret(&self, account: &str) -> Result<ApiKey, VaultError> {
        self.inner.get(account).await
    }

    pub async fn len(&self) -> usize {
        self.inner.len().await
    }

    fn check(flag: &AtomicBool, op: &str) -> Result<(), VaultError> {
        if flag.load(Ordering::SeqCst) {
            Err(VaultError::Backend(format!("injected {op} failure")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SecretVault for FaultyVault {
    async fn save(&self, account: &str, secret: &ApiKey) -> Result<(), VaultError> {
        Self::check(&self.fail_save, "save")?;
        self.inner.save(account, secret).await
    }

    async fn get(&self, account: &str) -> Result<ApiKey, VaultError> {
        Self::check(&self.fail_get, "get")?;
        self.inner.get(account).await
    }

    async fn update(&self, account: &str, secret: &ApiKey) -> Result<(), VaultError> {
        Self::check(&self.fail_update, "update")?;
        self.inner.update(account, secret).await
    }

    async fn delete(&self, account: &str) -> Result<(), VaultError> {
        Self::check(&self.fail_delete, "delete")?;
        self.inner.delete(account).await
    }
}

/// Memory settings store that counts writes and can refuse them.
#[derive(Debug, Default)]
pub struct FaultySettings {
    inner: MemorySettingsStore,
    pub fail_store: AtomicBool,
    writes: AtomicUsize,
}

impl FaultySettings {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.load(key).await.unwrap()
    }

    pub async fn put_raw(&self, key: &str, value: &[u8]) {
        self.inner.store(key, value).await.unwrap();
    }
}

#[async_trait]
impl SettingsStore for FaultySettings {
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, IndexError> {
        self.inner.load(key).await
    }

    async fn store(&self, key: &str, value: &[u8]) -> Result<(), IndexError> {
        if self.fail_store.load(Ordering::SeqCst) {
            return Err(IndexError::Backend("injected store failure".into()));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.store(key, value).await
    }
}

pub async fn open_store(
    vault: Arc<FaultyVault>,
    settings: Arc<FaultySettings>,
    registry: ProviderRegistry,
) -> Arc<CredentialStore> {
    Arc::new(
        CredentialStore::open(vault, MetadataIndex::new(settings), registry)
            .await
            .unwrap(),
    )
}

/// Registry whose OpenAI entry points at a local mock server.
pub fn registry_for(base_url: &str) -> ProviderRegistry {
    ProviderRegistry::builtin().with_overrides(vec![Provider::new(
        "OpenAI",
        "https://openai.com",
        base_url,
        "OpenAI API",
        "gpt-3.5-turbo",
    )])
}

/// Verifier answering each call from a script, after a per-step delay.
pub struct ScriptedVerifier {
    script: Mutex<VecDeque<(Duration, ValidationOutcome)>>,
    calls: AtomicUsize,
}

impl ScriptedVerifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn queue(&self, delay: Duration, outcome: ValidationOutcome) {
        self.script.lock().unwrap().push_back((delay, outcome));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Wait until `n` calls have started.
    pub async fn wait_for_calls(&self, n: usize) {
        while self.calls() < n {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }
}

#[async_trait]
impl CredentialVerifier for ScriptedVerifier {
    async fn verify(&self, _provider: &Provider, _secret: &ApiKey) -> ValidationOutcome {
        let step = self.script.lock().unwrap().pop_front();
        self.calls.fetch_add(1, Ordering::SeqCst);
        match step {
            Some((delay, outcome)) => {
                tokio::time::sleep(delay).await;
                outcome
            }
            None => panic!("ScriptedVerifier called more times than scripted"),
        }
    }
}
