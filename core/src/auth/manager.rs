//! The authentication manager: the token-acquisition engine behind every
//! session.
//!
//! Constructing a manager is the expensive part of a connect (HTTP client,
//! cache, signing material), which is why an identity-equivalent connect
//! carries the existing manager forward instead of rebuilding one. Token
//! acquisition itself is lazy: nothing is fetched until a caller asks for a
//! token against a resource. The exception is device login, whose
//! interactive flow completes during connect and seeds the cache here.

use super::certificate::Certificate;
use super::credentials::Credential;
use super::errors::ConnectError;
use super::token_cache::TokenCache;
use super::types::{
    AuthToken, AzureEnvironment, CachedToken, SHAREPOINT_PRINCIPAL_ID,
};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

const IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";

/// The credential material a manager acquires tokens with.
#[derive(Clone)]
pub enum TokenIdentity {
    /// Delegated user sign-in (resource owner password grant).
    UserPassword {
        client_id: String,
        credential: Credential,
    },
    /// The ambient user, with no secret this manager could replay.
    CurrentUser { client_id: String },
    /// ACS app-only: client id + secret scoped to a realm.
    ClientSecret {
        client_id: String,
        client_secret: String,
        realm: String,
    },
    /// App-only with a certificate-signed client assertion.
    Certificate {
        client_id: String,
        certificate: Certificate,
    },
    /// Device-code sign-in; the token is seeded by the interactive flow.
    DeviceCode { client_id: String },
    /// Browser sign-in brokered by the hosting shell.
    Interactive,
    /// Platform-assigned identity resolved through IMDS.
    ManagedIdentity,
}

impl TokenIdentity {
    fn tag(&self) -> &'static str {
        match self {
            TokenIdentity::UserPassword { .. } => "user",
            TokenIdentity::CurrentUser { .. } => "current-user",
            TokenIdentity::ClientSecret { .. } => "acs",
            TokenIdentity::Certificate { .. } => "certificate",
            TokenIdentity::DeviceCode { .. } => "device-code",
            TokenIdentity::Interactive => "interactive",
            TokenIdentity::ManagedIdentity => "managed-identity",
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct ImdsTokenResponse {
    access_token: String,
    token_type: String,
    /// Unix timestamp, as a string
    expires_on: String,
}

/// JWT claims of a certificate client assertion.
#[derive(Serialize)]
struct AssertionClaims {
    aud: String,
    exp: i64,
    iat: i64,
    iss: String,
    jti: String,
    nbf: i64,
    sub: String,
}

/// Opaque token-acquisition engine for one authenticated identity.
pub struct AuthenticationManager {
    identity: TokenIdentity,
    tenant: Option<String>,
    environment: AzureEnvironment,
    http_client: reqwest::Client,
    token_cache: TokenCache,
}

impl AuthenticationManager {
    pub fn new(
        identity: TokenIdentity,
        tenant: Option<String>,
        environment: AzureEnvironment,
    ) -> Self {
        Self {
            identity,
            tenant,
            environment,
            http_client: reqwest::Client::new(),
            token_cache: TokenCache::new(),
        }
    }

    pub fn identity(&self) -> &TokenIdentity {
        &self.identity
    }

    pub fn environment(&self) -> AzureEnvironment {
        self.environment
    }

    pub fn http_client(&self) -> reqwest::Client {
        self.http_client.clone()
    }

    /// Returns a valid token for `resource` (e.g. `https://c.sharepoint.com`),
    /// from cache when possible.
    pub async fn acquire_token(&self, resource: &str) -> Result<AuthToken, ConnectError> {
        let key = format!("{}|{resource}", self.identity.tag());
        if let Some(cached) = self.token_cache.get(&key).await {
            if !cached.needs_refresh() {
                return Ok(AuthToken {
                    token: cached.token,
                    token_type: cached.token_type,
                    expires_in_secs: None,
                });
            }
        }

        let token = self.fetch_token(resource).await?;
        self.token_cache
            .set(
                key,
                CachedToken::new(
                    token.token.clone(),
                    token.token_type.clone(),
                    Duration::from_secs(token.expires_in_secs.unwrap_or(3600)),
                ),
            )
            .await;
        Ok(token)
    }

    /// Stores a token obtained outside the manager (device login, web
    /// login) so later `acquire_token` calls find it.
    pub(crate) async fn seed_token(&self, resource: &str, token: &AuthToken) {
        let key = format!("{}|{resource}", self.identity.tag());
        self.token_cache
            .set(
                key,
                CachedToken::new(
                    token.token.clone(),
                    token.token_type.clone(),
                    Duration::from_secs(token.expires_in_secs.unwrap_or(3600)),
                ),
            )
            .await;
    }

    async fn fetch_token(&self, resource: &str) -> Result<AuthToken, ConnectError> {
        match &self.identity {
            TokenIdentity::UserPassword {
                client_id,
                credential,
            } => self.fetch_password_token(client_id, credential, resource).await,
            TokenIdentity::ClientSecret {
                client_id,
                client_secret,
                realm,
            } => {
                self.fetch_acs_token(client_id, client_secret, realm, resource)
                    .await
            }
            TokenIdentity::Certificate {
                client_id,
                certificate,
            } => {
                self.fetch_certificate_token(client_id, certificate, resource)
                    .await
            }
            TokenIdentity::ManagedIdentity => self.fetch_managed_identity_token(resource).await,
            TokenIdentity::DeviceCode { .. } => Err(ConnectError::AuthenticationFailed(
                "the device login token has expired; connect again to sign in".to_string(),
            )),
            TokenIdentity::Interactive => Err(ConnectError::AuthenticationFailed(
                "the web login token has expired; connect again to sign in".to_string(),
            )),
            TokenIdentity::CurrentUser { .. } => Err(ConnectError::AuthenticationFailed(
                "the ambient identity does not supply bearer tokens".to_string(),
            )),
        }
    }

    async fn fetch_password_token(
        &self,
        client_id: &str,
        credential: &Credential,
        resource: &str,
    ) -> Result<AuthToken, ConnectError> {
        let tenant = self.tenant.as_deref().unwrap_or("organizations");
        let token_url = format!(
            "{}/{tenant}/oauth2/v2.0/token",
            self.environment.authority_host()
        );
        let scope = scope_for(resource);

        let params = [
            ("grant_type", "password"),
            ("client_id", client_id),
            ("username", credential.username()),
            ("password", credential.secret()),
            ("scope", scope.as_str()),
        ];

        self.post_token_request(&token_url, &params).await
    }

    async fn fetch_acs_token(
        &self,
        client_id: &str,
        client_secret: &str,
        realm: &str,
        resource: &str,
    ) -> Result<AuthToken, ConnectError> {
        let token_url = format!(
            "https://{}/{realm}/tokens/OAuth/2",
            self.environment.acs_host()
        );
        let host = host_of(resource)?;
        let acs_client_id = format!("{client_id}@{realm}");
        let acs_resource = format!("{SHAREPOINT_PRINCIPAL_ID}/{host}@{realm}");

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", acs_client_id.as_str()),
            ("client_secret", client_secret),
            ("resource", acs_resource.as_str()),
        ];

        let response = self
            .http_client
            .post(&token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                ConnectError::AuthenticationFailed(format!("ACS token request failed: {e}"))
            })?;

        if !response.status().is_success() {
            return Err(token_endpoint_error(response).await);
        }

        // ACS reports numeric fields as strings.
        let body: serde_json::Value = response.json().await.map_err(|e| {
            ConnectError::AuthenticationFailed(format!("unable to parse the ACS token response: {e}"))
        })?;
        let access_token = body["access_token"].as_str().ok_or_else(|| {
            ConnectError::AuthenticationFailed("ACS response carried no access token".to_string())
        })?;
        let expires_in = body["expires_in"]
            .as_str()
            .and_then(|s| s.parse::<u64>().ok())
            .or_else(|| body["expires_in"].as_u64());

        Ok(AuthToken {
            token: access_token.to_string(),
            token_type: body["token_type"].as_str().unwrap_or("Bearer").to_string(),
            expires_in_secs: expires_in,
        })
    }

    async fn fetch_certificate_token(
        &self,
        client_id: &str,
        certificate: &Certificate,
        resource: &str,
    ) -> Result<AuthToken, ConnectError> {
        let tenant = self.tenant.as_deref().ok_or_else(|| {
            ConnectError::InvalidArguments(
                "a tenant is required for certificate authentication".to_string(),
            )
        })?;
        let token_url = format!(
            "{}/{tenant}/oauth2/v2.0/token",
            self.environment.authority_host()
        );
        let assertion = create_client_assertion(client_id, certificate, &token_url)?;
        let scope = scope_for(resource);

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", client_id),
            (
                "client_assertion_type",
                "urn:ietf:params:oauth:client-assertion-type:jwt-bearer",
            ),
            ("client_assertion", assertion.as_str()),
            ("scope", scope.as_str()),
        ];

        self.post_token_request(&token_url, &params).await
    }

    async fn fetch_managed_identity_token(
        &self,
        resource: &str,
    ) -> Result<AuthToken, ConnectError> {
        let mut imds_url = Url::parse(IMDS_ENDPOINT)
            .map_err(|e| ConnectError::AuthenticationFailed(format!("invalid IMDS endpoint: {e}")))?;
        imds_url
            .query_pairs_mut()
            .append_pair("api-version", "2018-02-01")
            .append_pair("resource", resource);

        let response = self
            .http_client
            .get(imds_url)
            .header("Metadata", "true")
            .send()
            .await
            .map_err(|e| {
                ConnectError::AuthenticationFailed(format!(
                    "managed identity token request failed; is a managed identity assigned to \
                     this host? {e}"
                ))
            })?;

        if !response.status().is_success() {
            return Err(token_endpoint_error(response).await);
        }

        let body: ImdsTokenResponse = response.json().await.map_err(|e| {
            ConnectError::AuthenticationFailed(format!(
                "unable to parse the IMDS token response: {e}"
            ))
        })?;

        let expires_in = body
            .expires_on
            .parse::<i64>()
            .ok()
            .map(|on| (on - chrono::Utc::now().timestamp()).max(0) as u64);

        Ok(AuthToken {
            token: body.access_token,
            token_type: body.token_type,
            expires_in_secs: expires_in,
        })
    }

    async fn post_token_request(
        &self,
        token_url: &str,
        params: &[(&str, &str)],
    ) -> Result<AuthToken, ConnectError> {
        let response = self
            .http_client
            .post(token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| {
                ConnectError::AuthenticationFailed(format!("token request failed: {e}"))
            })?;

        if !response.status().is_success() {
            return Err(token_endpoint_error(response).await);
        }

        let body: TokenResponse = response.json().await.map_err(|e| {
            ConnectError::AuthenticationFailed(format!("unable to parse the token response: {e}"))
        })?;

        Ok(AuthToken {
            token: body.access_token,
            token_type: body.token_type,
            expires_in_secs: Some(body.expires_in),
        })
    }
}

/// Maps a failed token endpoint response to a diagnostic, preferring the
/// OAuth `error_description`.
pub(crate) async fn token_endpoint_error(response: reqwest::Response) -> ConnectError {
    let status = response.status();
    let body: serde_json::Value = response.json().await.unwrap_or_default();
    let detail = body["error_description"]
        .as_str()
        .or_else(|| body["error"].as_str())
        .unwrap_or("no error detail supplied")
        .to_string();
    ConnectError::AuthenticationFailed(format!(
        "the token endpoint returned {status}: {detail}"
    ))
}

/// `{resource}/.default` scope for the v2 endpoints.
pub(crate) fn scope_for(resource: &str) -> String {
    format!("{}/.default", resource.trim_end_matches('/'))
}

fn host_of(resource: &str) -> Result<String, ConnectError> {
    let parsed = Url::parse(resource).map_err(|e| {
        ConnectError::InvalidArguments(format!("'{resource}' is not a valid URL: {e}"))
    })?;
    parsed
        .host_str()
        .map(|h| h.to_string())
        .ok_or_else(|| ConnectError::InvalidArguments(format!("'{resource}' has no host")))
}

fn create_client_assertion(
    client_id: &str,
    certificate: &Certificate,
    audience: &str,
) -> Result<String, ConnectError> {
    let key_pem = certificate.private_key_pem().ok_or_else(|| {
        ConnectError::InvalidCredentialMaterial(
            "the certificate does not have a private key".to_string(),
        )
    })?;

    let (key, algorithm) = match EncodingKey::from_rsa_pem(key_pem.as_bytes()) {
        Ok(key) => (key, Algorithm::RS256),
        Err(_) => {
            let key = EncodingKey::from_ec_pem(key_pem.as_bytes()).map_err(|e| {
                ConnectError::InvalidCredentialMaterial(format!(
                    "unable to parse the certificate private key: {e}"
                ))
            })?;
            (key, Algorithm::ES256)
        }
    };

    let mut header = Header::new(algorithm);
    header.x5t_s256 = Some(certificate.x5t_s256());

    let now = chrono::Utc::now().timestamp();
    let claims = AssertionClaims {
        aud: audience.to_string(),
        exp: now + 600,
        iat: now,
        iss: client_id.to_string(),
        jti: uuid::Uuid::new_v4().to_string(),
        nbf: now,
        sub: client_id.to_string(),
    };

    encode(&header, &claims, &key).map_err(|e| {
        ConnectError::InvalidCredentialMaterial(format!(
            "unable to sign the client assertion: {e}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_appends_default_suffix() {
        assert_eq!(
            scope_for("https://c.sharepoint.com"),
            "https://c.sharepoint.com/.default"
        );
        assert_eq!(
            scope_for("https://c.sharepoint.com/"),
            "https://c.sharepoint.com/.default"
        );
    }

    #[test]
    fn host_extraction() {
        assert_eq!(
            host_of("https://c.sharepoint.com/sites/s").unwrap(),
            "c.sharepoint.com"
        );
        assert!(host_of("not a url").is_err());
    }

    #[tokio::test]
    async fn seeded_tokens_are_served_from_cache() {
        let manager = AuthenticationManager::new(
            TokenIdentity::DeviceCode {
                client_id: "client".into(),
            },
            None,
            AzureEnvironment::Production,
        );
        manager
            .seed_token(
                "https://c.sharepoint.com",
                &AuthToken {
                    token: "seeded".into(),
                    token_type: "Bearer".into(),
                    expires_in_secs: Some(3600),
                },
            )
            .await;
        let token = manager
            .acquire_token("https://c.sharepoint.com")
            .await
            .expect("seeded token should be served");
        assert_eq!(token.token, "seeded");
    }

    #[tokio::test]
    async fn device_identity_without_seed_reports_expiry() {
        let manager = AuthenticationManager::new(
            TokenIdentity::DeviceCode {
                client_id: "client".into(),
            },
            None,
            AzureEnvironment::Production,
        );
        let err = manager
            .acquire_token("https://c.sharepoint.com")
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectError::AuthenticationFailed(_)));
    }

    #[test]
    fn client_assertion_is_signed_with_the_certificate_key() {
        let certified =
            rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let pem = format!(
            "{}{}",
            certified.cert.pem(),
            certified.key_pair.serialize_pem()
        );
        let certificate = Certificate::from_pem(pem.as_bytes()).unwrap();
        let assertion = create_client_assertion(
            "client-id",
            &certificate,
            "https://login.microsoftonline.com/tenant/oauth2/v2.0/token",
        )
        .unwrap();
        // compact JWS: header.claims.signature
        assert_eq!(assertion.split('.').count(), 3);
    }
}
