use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Well-known public client used for delegated credential flows when the
/// caller does not register an application of their own.
pub const MANAGEMENT_SHELL_CLIENT_ID: &str = "31359c7f-bd7e-475c-86db-fdb8c937548e";

/// Fixed client id of the tenant admin-shell application.
pub const ADMIN_SHELL_CLIENT_ID: &str = "9bc3ab49-b65d-410a-85ad-de819febfddc";

/// Fixed redirect URI paired with [`ADMIN_SHELL_CLIENT_ID`].
pub const ADMIN_SHELL_REDIRECT_URI: &str = "https://oauth.spops.microsoft.com/";

/// Service principal identifier used when requesting ACS app-only tokens.
pub const SHAREPOINT_PRINCIPAL_ID: &str = "00000003-0000-0ff1-ce00-000000000000";

/// Azure cloud the authentication endpoints live in.
///
/// Selects the Azure AD authority and ACS hosts a strategy talks to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AzureEnvironment {
    #[default]
    Production,
    UsGovernment,
    Germany,
    China,
}

impl AzureEnvironment {
    /// Azure AD authority host for this cloud.
    pub fn authority_host(&self) -> &'static str {
        match self {
            AzureEnvironment::Production => "https://login.microsoftonline.com",
            AzureEnvironment::UsGovernment => "https://login.microsoftonline.us",
            AzureEnvironment::Germany => "https://login.microsoftonline.de",
            AzureEnvironment::China => "https://login.partner.microsoftonline.cn",
        }
    }

    /// ACS token service host for this cloud.
    pub fn acs_host(&self) -> &'static str {
        match self {
            AzureEnvironment::China => "accounts.accesscontrol.chinacloudapi.cn",
            _ => "accounts.accesscontrol.windows.net",
        }
    }
}

/// Access token returned by a token endpoint.
#[derive(Clone, Debug)]
pub struct AuthToken {
    /// The access token string
    pub token: String,
    /// The type of token (e.g. "Bearer")
    pub token_type: String,
    /// Lifetime in seconds from issuance, when the endpoint reported one
    pub expires_in_secs: Option<u64>,
}

/// A cached token with expiration tracking.
#[derive(Clone, Debug)]
pub struct CachedToken {
    pub token: String,
    pub token_type: String,
    pub expires_at: Instant,
}

impl CachedToken {
    pub fn new(token: String, token_type: String, expires_in: Duration) -> Self {
        Self {
            token,
            token_type,
            expires_at: Instant::now() + expires_in,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Whether the token falls inside the 5 minute refresh window before
    /// its actual expiry.
    pub fn needs_refresh(&self) -> bool {
        let buffer = Duration::from_secs(300);
        Instant::now() + buffer >= self.expires_at
    }
}

/// Everything the user needs to complete a device-code sign-in, plus the
/// polling parameters the flow itself consumes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeviceCodeInfo {
    /// Opaque code presented back to the token endpoint while polling
    pub device_code: String,
    /// The code the user types on the verification page
    pub user_code: String,
    /// Where the user completes the sign-in
    pub verification_uri: String,
    /// Seconds until the device code expires
    pub expires_in: u64,
    /// Suggested seconds between polls
    pub interval: u64,
    /// Ready-made instruction text for display
    pub message: String,
}
