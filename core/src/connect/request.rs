//! The connect request: a sum type with one variant per authentication
//! mode, so a request can never carry an ambiguous mix of mode indicators.

use crate::auth::credentials::Credential;
use crate::auth::errors::ConnectError;
use crate::auth::types::AzureEnvironment;
use url::Url;

/// One coherent connect request. Exactly one mode is populated by
/// construction; per-variant field validation happens in
/// [`ConnectRequest::validate`].
#[derive(Clone, Debug)]
pub enum ConnectRequest {
    Credentials(CredentialsRequest),
    AcsAppOnly(AcsAppOnlyRequest),
    CertificateAppOnly(CertificateRequest),
    DeviceLogin(DeviceLoginRequest),
    WebLogin(WebLoginRequest),
    ManagedIdentity,
    AdminShell(AdminShellRequest),
}

/// Delegated sign-in with a resolved, supplied or prompted credential.
#[derive(Clone, Debug, Default)]
pub struct CredentialsRequest {
    pub url: String,
    /// Pipeline-supplied credential; when absent the store and then the
    /// prompter are consulted.
    pub credential: Option<Credential>,
    /// Use the ambient identity; skips resolution and prompting.
    pub current_user: bool,
    /// Defaults to the well-known management-shell public client.
    pub client_id: Option<String>,
    /// Consumed by interactive fallbacks in the hosting shell; does not
    /// participate in manager-reuse equivalence.
    pub redirect_uri: Option<String>,
    pub tenant_admin_url: Option<String>,
    pub environment: AzureEnvironment,
}

impl CredentialsRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

/// Legacy ACS app-only: AAD domain (realm) + client id + client secret.
#[derive(Clone, Debug, Default)]
pub struct AcsAppOnlyRequest {
    pub url: String,
    pub aad_domain: String,
    pub client_id: String,
    pub client_secret: String,
    pub tenant_admin_url: Option<String>,
    pub environment: AzureEnvironment,
}

/// App-only with an Azure AD registered application and a certificate from
/// one of three sources.
#[derive(Clone, Debug, Default)]
pub struct CertificateRequest {
    pub url: String,
    pub client_id: String,
    pub tenant: String,
    pub certificate_path: Option<String>,
    pub certificate_base64: Option<String>,
    pub thumbprint: Option<String>,
    pub tenant_admin_url: Option<String>,
    pub environment: AzureEnvironment,
}

#[derive(Clone, Debug, Default)]
pub struct DeviceLoginRequest {
    pub url: String,
    /// Ask the message sink to open the verification URL.
    pub launch_browser: bool,
    pub environment: AzureEnvironment,
}

impl DeviceLoginRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct WebLoginRequest {
    pub url: Option<String>,
    pub tenant_admin_url: Option<String>,
    pub force_authentication: bool,
}

/// Delegated admin-shell sign-in: identical to [`CredentialsRequest`] but
/// pinned to the well-known admin-shell client id and redirect URI.
#[derive(Clone, Debug, Default)]
pub struct AdminShellRequest {
    pub url: String,
    pub credential: Option<Credential>,
    pub environment: AzureEnvironment,
}

impl ConnectRequest {
    /// Rejects requests whose required fields are missing or empty.
    pub fn validate(&self) -> Result<(), ConnectError> {
        match self {
            ConnectRequest::Credentials(r) => require_url("url", &r.url),
            ConnectRequest::AcsAppOnly(r) => {
                require_url("url", &r.url)?;
                require("aad_domain", &r.aad_domain)?;
                require("client_id", &r.client_id)?;
                require("client_secret", &r.client_secret)
            }
            ConnectRequest::CertificateAppOnly(r) => {
                require_url("url", &r.url)?;
                require("client_id", &r.client_id)?;
                require("tenant", &r.tenant)
            }
            ConnectRequest::DeviceLogin(r) => require_url("url", &r.url),
            ConnectRequest::WebLogin(r) => match &r.url {
                Some(url) => require_url("url", url),
                None => Ok(()),
            },
            ConnectRequest::ManagedIdentity => Ok(()),
            ConnectRequest::AdminShell(r) => require_url("url", &r.url),
        }
    }

    /// Returns the request with every URL normalized by stripping trailing
    /// slashes.
    pub(crate) fn normalized(&self) -> Self {
        let mut request = self.clone();
        match &mut request {
            ConnectRequest::Credentials(r) => normalize(&mut r.url),
            ConnectRequest::AcsAppOnly(r) => normalize(&mut r.url),
            ConnectRequest::CertificateAppOnly(r) => normalize(&mut r.url),
            ConnectRequest::DeviceLogin(r) => normalize(&mut r.url),
            ConnectRequest::WebLogin(r) => {
                if let Some(url) = &mut r.url {
                    normalize(url);
                }
            }
            ConnectRequest::ManagedIdentity => {}
            ConnectRequest::AdminShell(r) => normalize(&mut r.url),
        }
        request
    }
}

fn require(field: &str, value: &str) -> Result<(), ConnectError> {
    if value.trim().is_empty() {
        Err(ConnectError::InvalidArguments(format!(
            "'{field}' is required for this connection mode"
        )))
    } else {
        Ok(())
    }
}

fn require_url(field: &str, value: &str) -> Result<(), ConnectError> {
    require(field, value)?;
    let parsed = Url::parse(value).map_err(|e| {
        ConnectError::InvalidArguments(format!("'{field}' is not a valid URL: {e}"))
    })?;
    if parsed.host_str().is_none() {
        return Err(ConnectError::InvalidArguments(format!(
            "'{field}' must include a host"
        )));
    }
    Ok(())
}

fn normalize(url: &mut String) {
    while url.ends_with('/') {
        url.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::{assert_err, assert_ok};

    #[test]
    fn empty_url_is_invalid() {
        let err = assert_err!(ConnectRequest::Credentials(CredentialsRequest::default()).validate());
        assert!(matches!(err, ConnectError::InvalidArguments(_)));
    }

    #[test]
    fn acs_requires_every_field() {
        let request = ConnectRequest::AcsAppOnly(AcsAppOnlyRequest {
            url: "https://a.sharepoint.com".into(),
            aad_domain: "contoso.onmicrosoft.com".into(),
            client_id: "client".into(),
            client_secret: String::new(),
            ..AcsAppOnlyRequest::default()
        });
        let err = assert_err!(request.validate());
        assert_eq!(
            err,
            ConnectError::InvalidArguments("'client_secret' is required for this connection mode".into())
        );
    }

    #[test]
    fn managed_identity_needs_nothing() {
        assert_ok!(ConnectRequest::ManagedIdentity.validate());
    }

    #[test]
    fn malformed_url_is_invalid() {
        let request =
            ConnectRequest::Credentials(CredentialsRequest::new("definitely not a url"));
        let err = assert_err!(request.validate());
        assert!(matches!(err, ConnectError::InvalidArguments(_)));
    }

    #[test]
    fn hostless_url_is_invalid() {
        let request = ConnectRequest::DeviceLogin(DeviceLoginRequest::new("file:///tmp/x"));
        let err = assert_err!(request.validate());
        assert!(matches!(err, ConnectError::InvalidArguments(_)));
    }

    #[test]
    fn web_login_url_is_validated_when_present() {
        let request = ConnectRequest::WebLogin(WebLoginRequest {
            url: Some("not a url".to_string()),
            ..WebLoginRequest::default()
        });
        assert_err!(request.validate());
        assert_ok!(ConnectRequest::WebLogin(WebLoginRequest::default()).validate());
    }

    #[test]
    fn normalization_strips_trailing_slashes() {
        let request = ConnectRequest::DeviceLogin(DeviceLoginRequest::new(
            "https://a.sharepoint.com/sites/s///",
        ));
        let ConnectRequest::DeviceLogin(normalized) = request.normalized() else {
            unreachable!();
        };
        assert_eq!(normalized.url, "https://a.sharepoint.com/sites/s");
    }
}
