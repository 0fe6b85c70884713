//! One strategy per connection mode. Each turns validated request fields
//! into a [`Session`], consulting the resolvers and deciding manager reuse
//! along the way.

use super::coordinator::ConnectCoordinator;
use super::request::{
    AcsAppOnlyRequest, AdminShellRequest, CertificateRequest, CredentialsRequest,
    DeviceLoginRequest, WebLoginRequest,
};
use crate::auth::certificate::CertificateResolver;
use crate::auth::credentials::{Credential, CredentialResolver};
use crate::auth::device_code::DeviceCodeClient;
use crate::auth::errors::ConnectError;
use crate::auth::manager::{AuthenticationManager, TokenIdentity};
use crate::auth::types::{
    ADMIN_SHELL_CLIENT_ID, ADMIN_SHELL_REDIRECT_URI, AzureEnvironment,
    MANAGEMENT_SHELL_CLIENT_ID,
};
use crate::session::{ConnectionMethod, Session, SessionIdentity};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

impl ConnectCoordinator {
    /// Reuses the cached manager for an identity-equivalent connect, or
    /// builds a fresh one.
    async fn manager_for(
        &self,
        identity: &SessionIdentity,
        build: impl FnOnce() -> AuthenticationManager,
    ) -> Arc<AuthenticationManager> {
        if let Some(manager) = self.store.try_reuse_manager(identity).await {
            log::debug!("re-using the cached authentication manager");
            manager
        } else {
            Arc::new(build())
        }
    }

    pub(super) async fn connect_credentials(
        &self,
        request: &CredentialsRequest,
    ) -> Result<Option<Session>, ConnectError> {
        let client_id = request
            .client_id
            .clone()
            .unwrap_or_else(|| MANAGEMENT_SHELL_CLIENT_ID.to_string());
        self.credentials_session(
            ConnectionMethod::Credentials,
            &request.url,
            request.credential.clone(),
            request.current_user,
            client_id,
            request.redirect_uri.clone(),
            request.tenant_admin_url.clone(),
            request.environment,
        )
        .await
    }

    pub(super) async fn connect_admin_shell(
        &self,
        request: &AdminShellRequest,
    ) -> Result<Option<Session>, ConnectError> {
        self.credentials_session(
            ConnectionMethod::AdminShell,
            &request.url,
            request.credential.clone(),
            false,
            ADMIN_SHELL_CLIENT_ID.to_string(),
            Some(ADMIN_SHELL_REDIRECT_URI.to_string()),
            None,
            request.environment,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn credentials_session(
        &self,
        method: ConnectionMethod,
        url: &str,
        supplied: Option<Credential>,
        current_user: bool,
        client_id: String,
        redirect_uri: Option<String>,
        tenant_admin_url: Option<String>,
        environment: AzureEnvironment,
    ) -> Result<Option<Session>, ConnectError> {
        let credential = if current_user {
            None
        } else {
            let resolved = supplied.or_else(|| {
                CredentialResolver::new(self.collaborators.credential_store.as_ref()).resolve(url)
            });
            match resolved.or_else(|| self.collaborators.prompter.prompt("Enter your credentials"))
            {
                Some(credential) => Some(credential),
                None => {
                    log::debug!("credential prompt declined; no session established");
                    return Ok(None);
                }
            }
        };

        let identity = match &credential {
            Some(credential) => SessionIdentity::UserCredentials {
                client_id: client_id.clone(),
                username: credential.username().to_string(),
                secret: credential.secret().to_string(),
            },
            None => SessionIdentity::None,
        };

        let manager = self
            .manager_for(&identity, || {
                let token_identity = match credential {
                    Some(credential) => TokenIdentity::UserPassword {
                        client_id: client_id.clone(),
                        credential,
                    },
                    None => TokenIdentity::CurrentUser {
                        client_id: client_id.clone(),
                    },
                };
                AuthenticationManager::new(token_identity, None, environment)
            })
            .await;

        Ok(Some(
            Session::new(method, identity, manager)
                .with_url(url)
                .with_client_id(client_id)
                .with_redirect_uri(redirect_uri)
                .with_tenant_admin_url(tenant_admin_url),
        ))
    }

    pub(super) async fn connect_acs_app_only(
        &self,
        request: &AcsAppOnlyRequest,
    ) -> Result<Session, ConnectError> {
        let identity = SessionIdentity::AppSecret {
            client_id: request.client_id.clone(),
            secret: request.client_secret.clone(),
            aad_domain: request.aad_domain.clone(),
        };

        let manager = self
            .manager_for(&identity, || {
                AuthenticationManager::new(
                    TokenIdentity::ClientSecret {
                        client_id: request.client_id.clone(),
                        client_secret: request.client_secret.clone(),
                        realm: request.aad_domain.clone(),
                    },
                    Some(request.aad_domain.clone()),
                    request.environment,
                )
            })
            .await;

        Ok(
            Session::new(ConnectionMethod::AcsAppOnly, identity, manager)
                .with_url(&request.url)
                .with_client_id(&request.client_id)
                .with_tenant(&request.aad_domain)
                .with_tenant_admin_url(request.tenant_admin_url.clone()),
        )
    }

    pub(super) async fn connect_certificate(
        &self,
        request: &CertificateRequest,
    ) -> Result<Session, ConnectError> {
        let certificate = CertificateResolver::resolve(
            request.certificate_path.as_deref(),
            request.certificate_base64.as_deref(),
            request.thumbprint.as_deref(),
            self.collaborators.certificate_store.as_ref(),
        )?;

        let identity = SessionIdentity::Certificate {
            client_id: request.client_id.clone(),
            tenant: request.tenant.clone(),
            thumbprint: certificate.thumbprint().to_string(),
        };

        let manager = self
            .manager_for(&identity, || {
                AuthenticationManager::new(
                    TokenIdentity::Certificate {
                        client_id: request.client_id.clone(),
                        certificate,
                    },
                    Some(request.tenant.clone()),
                    request.environment,
                )
            })
            .await;

        Ok(
            Session::new(ConnectionMethod::CertificateAppOnly, identity, manager)
                .with_url(&request.url)
                .with_client_id(&request.client_id)
                .with_tenant(&request.tenant)
                .with_tenant_admin_url(request.tenant_admin_url.clone()),
        )
    }

    pub(super) async fn connect_device_login(
        &self,
        request: &DeviceLoginRequest,
        cancel: &CancellationToken,
    ) -> Result<Option<Session>, ConnectError> {
        // A bare https://host URL needs its root path back after
        // normalization stripped it.
        let mut url = request.url.clone();
        let parsed = Url::parse(&url).map_err(|e| {
            ConnectError::InvalidArguments(format!("'{url}' is not a valid URL: {e}"))
        })?;
        let host = parsed
            .host_str()
            .ok_or_else(|| ConnectError::InvalidArguments(format!("'{url}' has no host")))?
            .to_string();
        if url.eq_ignore_ascii_case(&format!("https://{host}")) {
            url.push('/');
        }

        let identity = SessionIdentity::DeviceLogin { host: host.clone() };
        let resource = format!("https://{host}");

        // An identity-equivalent connect is satisfied from the reused
        // manager's cached token; the interactive flow only runs again when
        // that token is gone or stale.
        let manager = match self.store.try_reuse_manager(&identity).await {
            Some(manager) => {
                if manager.acquire_token(&resource).await.is_ok() {
                    log::debug!("device login satisfied by the cached token");
                    return Ok(Some(
                        Session::new(ConnectionMethod::DeviceLogin, identity, manager)
                            .with_url(url)
                            .with_client_id(MANAGEMENT_SHELL_CLIENT_ID),
                    ));
                }
                manager
            }
            None => Arc::new(AuthenticationManager::new(
                TokenIdentity::DeviceCode {
                    client_id: MANAGEMENT_SHELL_CLIENT_ID.to_string(),
                },
                None,
                request.environment,
            )),
        };

        if cancel.is_cancelled() {
            return Ok(None);
        }

        let client = DeviceCodeClient::new(
            manager.http_client(),
            request.environment,
            MANAGEMENT_SHELL_CLIENT_ID,
            &resource,
        );

        // The interactive flow runs on its own task; instructions travel
        // back over a channel while this caller awaits completion or
        // cancellation.
        let (info_tx, mut info_rx) = tokio::sync::mpsc::unbounded_channel();
        let worker_cancel = cancel.clone();
        let mut worker = tokio::spawn(async move {
            if worker_cancel.is_cancelled() {
                return Ok(None);
            }
            let info = client.start().await?;
            let _ = info_tx.send(info.clone());
            client.poll(&info, &worker_cancel).await
        });

        let outcome = loop {
            tokio::select! {
                Some(info) = info_rx.recv() => {
                    self.collaborators.messages.emit(&info.message);
                    if request.launch_browser {
                        self.collaborators.messages.open_url(&info.verification_uri);
                    }
                }
                joined = &mut worker => break joined,
            }
        };

        let token = match outcome {
            Ok(Ok(Some(token))) => token,
            Ok(Ok(None)) => return Ok(None),
            Ok(Err(e)) => return Err(e),
            Err(e) => {
                log::warn!("device login task failed to complete: {e}");
                return Err(ConnectError::ConnectionFailed);
            }
        };

        manager.seed_token(&resource, &token).await;

        Ok(Some(
            Session::new(ConnectionMethod::DeviceLogin, identity, manager)
                .with_url(url)
                .with_client_id(MANAGEMENT_SHELL_CLIENT_ID),
        ))
    }

    pub(super) async fn connect_web_login(
        &self,
        request: &WebLoginRequest,
    ) -> Result<Session, ConnectError> {
        if !self.interactive_ui {
            return Err(ConnectError::UnsupportedPlatform(
                "web login requires a platform with an interactive login window".to_string(),
            ));
        }

        let token = self
            .collaborators
            .web_login
            .login(request.url.as_deref(), request.force_authentication)
            .await?;

        let manager = Arc::new(AuthenticationManager::new(
            TokenIdentity::Interactive,
            None,
            AzureEnvironment::Production,
        ));
        if let Some(url) = &request.url {
            manager.seed_token(url, &token).await;
        }

        let mut session = Session::new(ConnectionMethod::WebLogin, SessionIdentity::None, manager)
            .with_tenant_admin_url(request.tenant_admin_url.clone());
        if let Some(url) = &request.url {
            session = session.with_url(url);
        }
        Ok(session)
    }

    pub(super) fn connect_managed_identity(&self) -> Session {
        log::info!("connecting with the ambient managed identity");
        let manager = Arc::new(AuthenticationManager::new(
            TokenIdentity::ManagedIdentity,
            None,
            AzureEnvironment::Production,
        ));
        Session::new(
            ConnectionMethod::ManagedIdentity,
            SessionIdentity::None,
            manager,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::types::AuthToken;
    use crate::connect::collaborators::Collaborators;
    use crate::connect::request::{ConnectRequest, DeviceLoginRequest};
    use crate::session::SessionStore;

    #[tokio::test]
    async fn device_login_with_a_live_cached_token_skips_the_interactive_flow() {
        let host = "a.sharepoint.com";
        let resource = format!("https://{host}");
        let manager = Arc::new(AuthenticationManager::new(
            TokenIdentity::DeviceCode {
                client_id: MANAGEMENT_SHELL_CLIENT_ID.to_string(),
            },
            None,
            AzureEnvironment::Production,
        ));
        manager
            .seed_token(
                &resource,
                &AuthToken {
                    token: "seeded".into(),
                    token_type: "Bearer".into(),
                    expires_in_secs: Some(3600),
                },
            )
            .await;

        let store = Arc::new(SessionStore::new());
        store
            .install(
                Session::new(
                    ConnectionMethod::DeviceLogin,
                    SessionIdentity::DeviceLogin {
                        host: host.to_string(),
                    },
                    manager.clone(),
                )
                .with_url(format!("{resource}/")),
            )
            .await;

        // No network: the seeded token satisfies the connect without ever
        // starting a device-code flow.
        let coordinator = ConnectCoordinator::new(store, Collaborators::in_memory());
        let session = coordinator
            .connect(
                ConnectRequest::DeviceLogin(DeviceLoginRequest::new(resource.as_str())),
                CancellationToken::new(),
            )
            .await
            .expect("the connect should succeed")
            .expect("the cached token should produce a session");

        assert!(Arc::ptr_eq(&session.manager(), &manager));
        assert_eq!(session.method(), ConnectionMethod::DeviceLogin);
    }
}
