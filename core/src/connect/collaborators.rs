//! Seams to the hosting shell.
//!
//! The coordinator drives drive registration, environment export,
//! credential and certificate lookup, progress messages and interactive
//! prompts through these traits; the shell owns the implementations. The
//! in-memory implementations below back tests and headless hosts.

use crate::auth::certificate::{Certificate, CertificateStore};
use crate::auth::credentials::{Credential, CredentialStore};
use crate::auth::errors::ConnectError;
use crate::auth::types::AuthToken;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Drive/provider registration keyed by name. Replacement is idempotent:
/// the coordinator removes any same-named entry before adding.
pub trait DriveRegistry: Send + Sync {
    /// Removes the named drive, reporting whether one existed.
    fn remove(&self, name: &str) -> bool;
    fn add(&self, name: &str, root_url: &str);
    fn get(&self, name: &str) -> Option<String>;
}

/// Environment-variable-like key/value export consumed by downstream
/// commands.
pub trait EnvironmentSink: Send + Sync {
    fn set(&self, key: &str, value: &str);
    fn get(&self, key: &str) -> Option<String>;
}

/// Progress and instructional text during interactive flows.
pub trait MessageSink: Send + Sync {
    fn emit(&self, text: &str);

    /// Open a URL in the user's browser; hosts without one ignore this.
    fn open_url(&self, _url: &str) {}
}

/// Interactive credential prompt. Returning `None` means the user
/// declined, which ends the connect silently.
pub trait CredentialPrompter: Send + Sync {
    fn prompt(&self, caption: &str) -> Option<Credential>;
}

/// Browser-window sign-in owned by the hosting shell. The core validates
/// platform capability before this is consulted.
#[async_trait]
pub trait WebLoginBroker: Send + Sync {
    async fn login(
        &self,
        url: Option<&str>,
        force_authentication: bool,
    ) -> Result<AuthToken, ConnectError>;
}

/// Everything the coordinator needs from the hosting shell.
#[derive(Clone)]
pub struct Collaborators {
    pub credential_store: Arc<dyn CredentialStore>,
    pub certificate_store: Arc<dyn CertificateStore>,
    pub drive_registry: Arc<dyn DriveRegistry>,
    pub environment: Arc<dyn EnvironmentSink>,
    pub messages: Arc<dyn MessageSink>,
    pub prompter: Arc<dyn CredentialPrompter>,
    pub web_login: Arc<dyn WebLoginBroker>,
}

impl Collaborators {
    /// In-memory collaborators: empty stores, a prompter that declines,
    /// and no web login broker. Useful for tests and headless hosts.
    pub fn in_memory() -> Self {
        Self {
            credential_store: Arc::new(MemoryCredentialStore::new()),
            certificate_store: Arc::new(MemoryCertificateStore::new()),
            drive_registry: Arc::new(MemoryDriveRegistry::new()),
            environment: Arc::new(MemoryEnvironment::new()),
            messages: Arc::new(MemoryMessageSink::new()),
            prompter: Arc::new(NoPrompter),
            web_login: Arc::new(NoWebLoginBroker),
        }
    }
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    entries: Mutex<HashMap<String, Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: impl Into<String>, credential: Credential) {
        self.entries.lock().unwrap().insert(key.into(), credential);
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn lookup(&self, key: &str) -> Option<Credential> {
        self.entries.lock().unwrap().get(key).cloned()
    }
}

#[derive(Default)]
pub struct MemoryCertificateStore {
    entries: Mutex<HashMap<String, Certificate>>,
}

impl MemoryCertificateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores under the certificate's own thumbprint.
    pub fn insert(&self, certificate: Certificate) {
        self.entries
            .lock()
            .unwrap()
            .insert(certificate.thumbprint().to_string(), certificate);
    }
}

impl CertificateStore for MemoryCertificateStore {
    fn find_by_thumbprint(&self, thumbprint: &str) -> Option<Certificate> {
        self.entries.lock().unwrap().get(thumbprint).cloned()
    }
}

#[derive(Default)]
pub struct MemoryDriveRegistry {
    drives: Mutex<HashMap<String, String>>,
}

impl MemoryDriveRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DriveRegistry for MemoryDriveRegistry {
    fn remove(&self, name: &str) -> bool {
        self.drives.lock().unwrap().remove(name).is_some()
    }

    fn add(&self, name: &str, root_url: &str) {
        self.drives
            .lock()
            .unwrap()
            .insert(name.to_string(), root_url.to_string());
    }

    fn get(&self, name: &str) -> Option<String> {
        self.drives.lock().unwrap().get(name).cloned()
    }
}

#[derive(Default)]
pub struct MemoryEnvironment {
    vars: Mutex<HashMap<String, String>>,
}

impl MemoryEnvironment {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EnvironmentSink for MemoryEnvironment {
    fn set(&self, key: &str, value: &str) {
        self.vars
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    fn get(&self, key: &str) -> Option<String> {
        self.vars.lock().unwrap().get(key).cloned()
    }
}

/// Records emitted messages and opened URLs.
#[derive(Default)]
pub struct MemoryMessageSink {
    messages: Mutex<Vec<String>>,
    opened: Mutex<Vec<String>>,
}

impl MemoryMessageSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn opened_urls(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

impl MessageSink for MemoryMessageSink {
    fn emit(&self, text: &str) {
        self.messages.lock().unwrap().push(text.to_string());
    }

    fn open_url(&self, url: &str) {
        self.opened.lock().unwrap().push(url.to_string());
    }
}

/// Declines every prompt.
pub struct NoPrompter;

impl CredentialPrompter for NoPrompter {
    fn prompt(&self, _caption: &str) -> Option<Credential> {
        None
    }
}

/// Placeholder broker for hosts without a browser component.
pub struct NoWebLoginBroker;

#[async_trait]
impl WebLoginBroker for NoWebLoginBroker {
    async fn login(
        &self,
        _url: Option<&str>,
        _force_authentication: bool,
    ) -> Result<AuthToken, ConnectError> {
        Err(ConnectError::AuthenticationFailed(
            "no web login broker is configured for this host".to_string(),
        ))
    }
}
