//! The authenticated session: what a successful connect produces, and the
//! identity key that decides when its authentication manager can be
//! carried into the next connect.

pub mod store;

pub use store::SessionStore;

use crate::auth::manager::AuthenticationManager;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Which strategy produced a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionMethod {
    Credentials,
    AcsAppOnly,
    CertificateAppOnly,
    DeviceLogin,
    WebLogin,
    ManagedIdentity,
    AdminShell,
}

/// Exact-equivalence key for authentication manager reuse.
///
/// Two connects may share a manager only when their identities compare
/// equal on every field; `None` identities never match anything, including
/// each other. Redirect URIs and tenant admin URLs deliberately do not
/// participate for the credentials variants.
#[derive(Clone, PartialEq, Eq)]
pub enum SessionIdentity {
    UserCredentials {
        client_id: String,
        username: String,
        secret: String,
    },
    AppSecret {
        client_id: String,
        secret: String,
        aad_domain: String,
    },
    Certificate {
        client_id: String,
        tenant: String,
        thumbprint: String,
    },
    DeviceLogin {
        host: String,
    },
    None,
}

impl fmt::Debug for SessionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionIdentity::UserCredentials {
                client_id,
                username,
                ..
            } => f
                .debug_struct("UserCredentials")
                .field("client_id", client_id)
                .field("username", username)
                .field("secret", &"[redacted]")
                .finish(),
            SessionIdentity::AppSecret {
                client_id,
                aad_domain,
                ..
            } => f
                .debug_struct("AppSecret")
                .field("client_id", client_id)
                .field("secret", &"[redacted]")
                .field("aad_domain", aad_domain)
                .finish(),
            SessionIdentity::Certificate {
                client_id,
                tenant,
                thumbprint,
            } => f
                .debug_struct("Certificate")
                .field("client_id", client_id)
                .field("tenant", tenant)
                .field("thumbprint", thumbprint)
                .finish(),
            SessionIdentity::DeviceLogin { host } => {
                f.debug_struct("DeviceLogin").field("host", host).finish()
            }
            SessionIdentity::None => write!(f, "None"),
        }
    }
}

/// An authenticated session: the current process-wide context once
/// installed.
#[derive(Clone)]
pub struct Session {
    url: Option<String>,
    client_id: Option<String>,
    tenant: Option<String>,
    redirect_uri: Option<String>,
    tenant_admin_url: Option<String>,
    method: ConnectionMethod,
    identity: SessionIdentity,
    manager: Arc<AuthenticationManager>,
}

impl Session {
    pub(crate) fn new(
        method: ConnectionMethod,
        identity: SessionIdentity,
        manager: Arc<AuthenticationManager>,
    ) -> Self {
        Self {
            url: None,
            client_id: None,
            tenant: None,
            redirect_uri: None,
            tenant_admin_url: None,
            method,
            identity,
            manager,
        }
    }

    pub(crate) fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub(crate) fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub(crate) fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    pub(crate) fn with_redirect_uri(mut self, redirect_uri: Option<String>) -> Self {
        self.redirect_uri = redirect_uri;
        self
    }

    pub(crate) fn with_tenant_admin_url(mut self, tenant_admin_url: Option<String>) -> Self {
        self.tenant_admin_url = tenant_admin_url;
        self
    }

    /// Target URL, absent for identity-only (Graph) sessions.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub fn tenant(&self) -> Option<&str> {
        self.tenant.as_deref()
    }

    /// Redirect URI the interactive fallbacks in the hosting shell use.
    pub fn redirect_uri(&self) -> Option<&str> {
        self.redirect_uri.as_deref()
    }

    /// Tenant administration site override supplied at connect time.
    pub fn tenant_admin_url(&self) -> Option<&str> {
        self.tenant_admin_url.as_deref()
    }

    pub fn method(&self) -> ConnectionMethod {
        self.method
    }

    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    /// Handle to the token-acquisition engine behind this session.
    pub fn manager(&self) -> Arc<AuthenticationManager> {
        self.manager.clone()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("url", &self.url)
            .field("client_id", &self.client_id)
            .field("tenant", &self.tenant)
            .field("redirect_uri", &self.redirect_uri)
            .field("tenant_admin_url", &self.tenant_admin_url)
            .field("method", &self.method)
            .field("identity", &self.identity)
            .finish()
    }
}
