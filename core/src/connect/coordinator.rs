//! Connect orchestration: dispatch to the mode's strategy, decide manager
//! reuse, install the session atomically, then run the post-connect side
//! effects.

use super::collaborators::Collaborators;
use super::request::ConnectRequest;
use crate::auth::errors::{ConnectError, ConnectFailure};
use crate::session::{Session, SessionStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Environment key the target host is exported under.
pub const HOST_ENV_KEY: &str = "SPCONNECT_HOST";
/// Environment key the server-relative site path is exported under.
pub const SITE_ENV_KEY: &str = "SPCONNECT_SITE";

/// Sentinel exported for identity-only sessions with no site URL.
const GRAPH_SENTINEL: &str = "GRAPH";

/// Post-connect side-effect settings.
#[derive(Clone, Debug)]
pub struct ConnectOptions {
    /// Register a drive for the new session's URL.
    pub create_drive: bool,
    /// Name the drive is registered under; a pre-existing drive with the
    /// same name is replaced.
    pub drive_name: String,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            create_drive: false,
            drive_name: "SPO".to_string(),
        }
    }
}

/// Orchestrates a single logical connect.
pub struct ConnectCoordinator {
    pub(super) store: Arc<SessionStore>,
    pub(super) collaborators: Collaborators,
    pub(super) options: ConnectOptions,
    pub(super) interactive_ui: bool,
}

impl ConnectCoordinator {
    pub fn new(store: Arc<SessionStore>, collaborators: Collaborators) -> Self {
        Self {
            store,
            collaborators,
            options: ConnectOptions::default(),
            interactive_ui: cfg!(windows),
        }
    }

    pub fn with_options(mut self, options: ConnectOptions) -> Self {
        self.options = options;
        self
    }

    /// Overrides the platform's interactive-UI capability detection.
    pub fn with_interactive_ui(mut self, interactive_ui: bool) -> Self {
        self.interactive_ui = interactive_ui;
        self
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Establishes a session for `request`.
    ///
    /// `Ok(Some(session))` installs the session as the current one and
    /// runs the post-connect side effects. `Ok(None)` means the user
    /// cancelled or declined an interactive step: nothing was installed
    /// and the previously-current session is untouched. Failures are
    /// stamped with the moment they were raised.
    pub async fn connect(
        &self,
        request: ConnectRequest,
        cancel: CancellationToken,
    ) -> Result<Option<Session>, ConnectFailure> {
        self.connect_inner(&request, &cancel)
            .await
            .map_err(ConnectFailure::new)
    }

    async fn connect_inner(
        &self,
        request: &ConnectRequest,
        cancel: &CancellationToken,
    ) -> Result<Option<Session>, ConnectError> {
        request.validate()?;
        let request = request.normalized();

        let session = match &request {
            ConnectRequest::Credentials(r) => self.connect_credentials(r).await?,
            ConnectRequest::AdminShell(r) => self.connect_admin_shell(r).await?,
            ConnectRequest::AcsAppOnly(r) => Some(self.connect_acs_app_only(r).await?),
            ConnectRequest::CertificateAppOnly(r) => Some(self.connect_certificate(r).await?),
            ConnectRequest::DeviceLogin(r) => self.connect_device_login(r, cancel).await?,
            ConnectRequest::WebLogin(r) => Some(self.connect_web_login(r).await?),
            ConnectRequest::ManagedIdentity => Some(self.connect_managed_identity()),
        };

        // Cancelled or declined: a silent no-op, the previous session stays.
        let Some(session) = session else {
            log::debug!("connect ended without a session; nothing installed");
            return Ok(None);
        };

        log::info!(
            "spconnect {}: connected to {}",
            env!("CARGO_PKG_VERSION"),
            session.url().unwrap_or("<identity only>")
        );

        self.store.install(session.clone()).await;
        self.register_drive(&session);
        self.export_environment(&session);

        Ok(Some(session))
    }

    fn register_drive(&self, session: &Session) {
        if !self.options.create_drive {
            return;
        }
        let Some(url) = session.url() else {
            return;
        };
        let name = &self.options.drive_name;
        if self.collaborators.drive_registry.remove(name) {
            log::debug!("replaced existing drive '{name}'");
        }
        self.collaborators.drive_registry.add(name, url);
    }

    fn export_environment(&self, session: &Session) {
        match session.url().and_then(|url| Url::parse(url).ok()) {
            Some(url) => {
                let host = url.host_str().unwrap_or_default();
                self.collaborators.environment.set(HOST_ENV_KEY, host);
                self.collaborators.environment.set(SITE_ENV_KEY, url.path());
            }
            None => {
                self.collaborators
                    .environment
                    .set(HOST_ENV_KEY, GRAPH_SENTINEL);
                self.collaborators
                    .environment
                    .set(SITE_ENV_KEY, GRAPH_SENTINEL);
            }
        }
    }
}
